//! Property-based test generators using proptest.
//!
//! Ids are drawn from a small pool so that generated batches insert, delete
//! and retitle the same notes repeatedly.

use crate::fixtures::{note_args, DELETE_NOTE, INSERT_NOTE, RETITLE_NOTE};
use pith_core::{BatchOperation, CacheBehavior};
use pith_value::Value;
use proptest::prelude::*;

/// Strategy for note ids from a pool of ten.
pub fn note_id_strategy() -> impl Strategy<Value = String> {
    (0u8..10).prop_map(|n| format!("n{n}"))
}

/// Strategy for note titles, including non-ASCII text.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Zé ]{0,16}").expect("Invalid regex")
}

/// A generated write against the notes table.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteOperation {
    /// Insert or replace a note.
    Insert {
        /// Note id
        id: String,
        /// Note title
        title: String,
    },
    /// Delete a note.
    Delete {
        /// Note id
        id: String,
    },
    /// Change a note's title.
    Retitle {
        /// Note id
        id: String,
        /// New title
        title: String,
    },
}

impl NoteOperation {
    /// Returns the id of the note this operation writes.
    pub fn id(&self) -> &str {
        match self {
            Self::Insert { id, .. } | Self::Delete { id } | Self::Retitle { id, .. } => id,
        }
    }

    /// Converts to a single-execution batch operation.
    pub fn to_batch_operation(&self) -> BatchOperation {
        match self {
            Self::Insert { id, title } => {
                BatchOperation::insert("notes", INSERT_NOTE).with_args(note_args(id, title))
            }
            Self::Delete { id } => BatchOperation::delete("notes", DELETE_NOTE)
                .with_args(vec![Value::from(id.as_str())]),
            Self::Retitle { id, title } => {
                BatchOperation::new(CacheBehavior::None, "", RETITLE_NOTE)
                    .with_args(vec![Value::from(title.as_str()), Value::from(id.as_str())])
            }
        }
    }
}

/// Strategy for a single note operation.
pub fn note_operation_strategy() -> impl Strategy<Value = NoteOperation> {
    prop_oneof![
        3 => (note_id_strategy(), title_strategy())
            .prop_map(|(id, title)| NoteOperation::Insert { id, title }),
        2 => note_id_strategy().prop_map(|id| NoteOperation::Delete { id }),
        1 => (note_id_strategy(), title_strategy())
            .prop_map(|(id, title)| NoteOperation::Retitle { id, title }),
    ]
}

/// Strategy for a batch of 0 to `max_len - 1` note operations.
pub fn note_batch_strategy(max_len: usize) -> impl Strategy<Value = Vec<NoteOperation>> {
    prop::collection::vec(note_operation_strategy(), 0..max_len)
}

/// Converts generated operations into a batch.
pub fn to_batch(operations: &[NoteOperation]) -> Vec<BatchOperation> {
    operations
        .iter()
        .map(NoteOperation::to_batch_operation)
        .collect()
}
