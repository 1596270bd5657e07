//! Dynamic values carried in entity client data and method arguments.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A dynamically-typed value mirrored from the server.
///
/// Entity creation delivers a keyed bag of these; method arguments may also
/// decode into one when the handler declares no more specific type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent / null.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered list of values.
    List(Vec<FieldValue>),
    /// String-keyed map of values.
    Map(HashMap<String, FieldValue>),
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_values_roundtrip_through_postcard() {
        let mut map = HashMap::new();
        map.insert("name".to_owned(), FieldValue::from("tester"));
        map.insert(
            "inventory".to_owned(),
            FieldValue::List(vec![FieldValue::Int(3), FieldValue::Nil]),
        );
        let value = FieldValue::Map(map);

        let bytes = postcard::to_allocvec(&value).expect("serialize");
        let decoded: FieldValue = postcard::from_bytes(&bytes).expect("deserialize");
        assert_eq!(value, decoded);
    }
}
