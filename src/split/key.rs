use crate::error::{KeyError, SplitError};
use serde_json::Value;
use std::fmt;

/// Ordered field names leading from the record root to its routing key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn new<I, S>(segments: I) -> Result<Self, SplitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(SplitError::EmptyKeyPath);
        }
        Ok(KeyPath(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Resolve the routing key of a record
    pub fn extract(&self, record: &Value) -> Result<String, KeyError> {
        let mut node = record;
        for (depth, segment) in self.0.iter().enumerate() {
            let object = node.as_object().ok_or_else(|| KeyError::NotAnObject {
                field: self.prefix(depth),
            })?;
            node = object.get(segment).ok_or_else(|| KeyError::Missing {
                field: self.prefix(depth + 1),
            })?;
        }

        match node {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(KeyError::NotStringRepresentable {
                field: self.to_string(),
                found: json_type_name(other),
            }),
        }
    }

    fn prefix(&self, depth: usize) -> String {
        if depth == 0 {
            "<record>".to_string()
        } else {
            self.0[..depth].join(".")
        }
    }
}

impl Default for KeyPath {
    fn default() -> Self {
        KeyPath(vec!["inparams".to_string(), "target".to_string()])
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Resolve `path` through nested objects of `record`
pub fn extract_key(record: &Value, path: &KeyPath) -> Result<String, KeyError> {
    path.extract(record)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_path() {
        let path = KeyPath::default();
        assert_eq!(path.to_string(), "inparams.target");

        let record = json!({"inparams": {"target": "alpha", "other": 1}, "id": 7});
        assert_eq!(path.extract(&record).unwrap(), "alpha");
    }

    #[test]
    fn test_key_is_not_normalized() {
        let path = KeyPath::default();
        let upper = json!({"inparams": {"target": " Alpha"}});
        let lower = json!({"inparams": {"target": "alpha"}});
        assert_eq!(path.extract(&upper).unwrap(), " Alpha");
        assert_ne!(path.extract(&upper).unwrap(), path.extract(&lower).unwrap());
    }

    #[test]
    fn test_custom_path() {
        let path = KeyPath::new(["meta", "source", "name"]).unwrap();
        let record = json!({"meta": {"source": {"name": "s3"}}});
        assert_eq!(extract_key(&record, &path).unwrap(), "s3");

        let single = KeyPath::new(["kind"]).unwrap();
        assert_eq!(single.extract(&json!({"kind": "x"})).unwrap(), "x");
    }

    #[test]
    fn test_empty_path_rejected() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(KeyPath::new(empty), Err(SplitError::EmptyKeyPath)));
    }

    #[test]
    fn test_missing_intermediate() {
        let err = KeyPath::default().extract(&json!({"id": 1})).unwrap_err();
        assert_eq!(
            err,
            KeyError::Missing {
                field: "inparams".to_string()
            }
        );
    }

    #[test]
    fn test_missing_terminal() {
        let err = KeyPath::default()
            .extract(&json!({"inparams": {"tgt": "a"}}))
            .unwrap_err();
        assert_eq!(
            err,
            KeyError::Missing {
                field: "inparams.target".to_string()
            }
        );
    }

    #[test]
    fn test_intermediate_not_object() {
        let err = KeyPath::default()
            .extract(&json!({"inparams": ["target"]}))
            .unwrap_err();
        assert_eq!(
            err,
            KeyError::NotAnObject {
                field: "inparams".to_string()
            }
        );

        let err = KeyPath::default().extract(&json!("scalar")).unwrap_err();
        assert_eq!(
            err,
            KeyError::NotAnObject {
                field: "<record>".to_string()
            }
        );
    }

    #[test]
    fn test_scalar_terminals() {
        let path = KeyPath::default();
        assert_eq!(path.extract(&json!({"inparams": {"target": 42}})).unwrap(), "42");
        assert_eq!(path.extract(&json!({"inparams": {"target": true}})).unwrap(), "true");
    }

    #[test]
    fn test_non_scalar_terminal_rejected() {
        let path = KeyPath::default();
        for (target, found) in [
            (json!(null), "null"),
            (json!([1]), "an array"),
            (json!({"a": 1}), "an object"),
        ] {
            let err = path
                .extract(&json!({"inparams": {"target": target}}))
                .unwrap_err();
            assert_eq!(
                err,
                KeyError::NotStringRepresentable {
                    field: "inparams.target".to_string(),
                    found,
                }
            );
        }
    }
}
