//! # PithDB Value
//!
//! The host value model for PithDB.
//!
//! Everything the host environment hands to the database, and everything the
//! database hands back, is one of six shapes:
//! - null
//! - boolean
//! - number (double precision)
//! - string (UTF-8)
//! - array
//! - dictionary (string keys, order carries no meaning)
//!
//! Values are converted at the boundary, never shared by reference.
//!
//! ## Usage
//!
//! ```
//! use pith_value::{from_json, to_json, Value};
//!
//! let args = from_json(r#"["n1", 3, true, null]"#).unwrap();
//! assert_eq!(args.element(0).unwrap(), &Value::from("n1"));
//! assert_eq!(to_json(&args).unwrap(), r#"["n1",3,true,null]"#);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod json;
mod value;

pub use error::{ValueError, ValueResult};
pub use json::{from_json, to_json, to_json_pretty};
pub use value::{Dictionary, Value, ValueKind};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-1_000_000i32..1_000_000).prop_map(Value::from),
            "[a-z0-9 ]{0,12}".prop_map(Value::from),
        ]
    }

    fn nested() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(Value::Dictionary),
            ]
        })
    }

    proptest! {
        #[test]
        fn json_preserves_values(value in nested()) {
            let text = to_json(&value).unwrap();
            prop_assert_eq!(from_json(&text).unwrap(), value);
        }
    }
}
