use crate::error::ExecResult;
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// Named arguments a statement sequence is rendered against.
///
/// Argument expressions are dotted paths: `user.id` looks up `user`, then its `id` field;
/// numeric segments index into lists (`ids.0`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    vars: BTreeMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable (builder style).
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Bind a serializable value, e.g. a request struct.
    pub fn bind_serialize<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> ExecResult<Self> {
        self.vars.insert(name.into(), Value::from_serialize(value)?);
        Ok(self)
    }

    /// Build a scope from the fields of a serializable struct or map.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> ExecResult<Self> {
        let mut scope = Scope::new();
        match Value::from_serialize(value)? {
            Value::Map(fields) => scope.vars = fields,
            other => {
                scope.vars.insert("value".to_string(), other);
            }
        }
        Ok(scope)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Resolve a dotted path.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.trim().split('.');
        let head = segments.next()?;
        segments.try_fold(self.vars.get(head)?, |value, segment| value.get(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_maps_and_lists() {
        #[derive(Serialize)]
        struct Query {
            name: String,
            tags: Vec<&'static str>,
        }

        let scope = Scope::new()
            .bind("id", 42)
            .bind_serialize(
                "q",
                &Query {
                    name: "ann".into(),
                    tags: vec!["a", "b"],
                },
            )
            .unwrap();

        assert_eq!(scope.lookup("id"), Some(&Value::Int(42)));
        assert_eq!(scope.lookup(" q.name "), Some(&Value::from("ann")));
        assert_eq!(scope.lookup("q.tags.1"), Some(&Value::from("b")));
        assert_eq!(scope.lookup("q.missing"), None);
        assert_eq!(scope.lookup("id.x"), None);
        assert_eq!(scope.lookup("nope"), None);
    }

    #[test]
    fn struct_fields_become_top_level_names() {
        #[derive(Serialize)]
        struct Args {
            id: i64,
            status: Option<String>,
        }

        let scope = Scope::from_serialize(&Args {
            id: 3,
            status: None,
        })
        .unwrap();
        assert_eq!(scope.lookup("id"), Some(&Value::Int(3)));
        assert_eq!(scope.lookup("status"), Some(&Value::Null));
    }
}
