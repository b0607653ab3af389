use std::any::{Any, type_name};
use std::fmt;

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::{StateError, TaskConfigError};

type StateMap = HashMap<String, Box<dyn Any + Send + Sync>>;

/// Configuration and state of a loaded task.
///
/// The task context lives from [`Collector::load`](crate::Collector::load) until
/// [`Collector::unload`](crate::Collector::unload) and is shared by all collections of the task.
///
/// The configuration is a JSON object. Nested objects are addressed with dotted keys and arrays
/// of scalars are joined with commas:
///
/// ```
/// use mtree_collector::TaskContext;
///
/// let task = TaskContext::new(
///     "task-1",
///     serde_json::json!({"address": {"port": 8080}, "rights": ["admin", "reader"]}),
/// )
/// .unwrap();
///
/// assert_eq!(task.config("address.port"), Some("8080"));
/// assert_eq!(task.config("rights"), Some("admin,reader"));
/// ```
pub struct TaskContext {
    id: String,
    raw_config: Value,
    config: HashMap<String, String>,
    state: Mutex<StateMap>,
}

impl TaskContext {
    /// Creates the context of a task from its configuration.
    ///
    /// `null` stands for an empty configuration. Any other value than an object is rejected.
    pub fn new(id: impl Into<String>, config: Value) -> Result<Self, TaskConfigError> {
        let raw_config = match config {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => config,
            other => {
                return Err(TaskConfigError {
                    found: value_kind(&other),
                });
            }
        };

        let mut flat = HashMap::new();
        flatten("", &raw_config, &mut flat);

        Ok(Self {
            id: id.into(),
            raw_config,
            config: flat,
            state: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the id of the task.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the configuration value under a dotted key.
    ///
    /// Only leaves have values: `address.port` resolves, `address` does not.
    pub fn config(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Returns all configuration keys, sorted.
    pub fn config_keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.config.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the configuration as it was passed at load.
    pub fn raw_config(&self) -> &Value {
        &self.raw_config
    }

    /// Stores a value that is kept until the task is unloaded.
    ///
    /// A value stored earlier under the same key is replaced.
    pub fn store<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.state.lock().insert(key.into(), Box::new(value));
    }

    /// Returns a copy of the value stored under `key`.
    ///
    /// Values that are updated across collections are best stored behind an `Arc`.
    pub fn load<T>(&self, key: &str) -> Result<T, StateError>
    where
        T: Any + Clone,
    {
        let state = self.state.lock();
        let value = state
            .get(key)
            .ok_or_else(|| StateError::NotFound(key.to_owned()))?;

        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| StateError::TypeMismatch {
                key: key.to_owned(),
                expected: type_name::<T>(),
            })
    }

    /// Removes the value stored under `key` and returns `true` if there was one.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().remove(key).is_some()
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let mut stored: Vec<_> = state.keys().collect();
        stored.sort_unstable();

        f.debug_struct("TaskContext")
            .field("id", &self.id)
            .field("config", &self.config_keys())
            .field("state", &stored)
            .finish()
    }
}

fn flatten(path: &str, value: &Value, flat: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                let path = match path {
                    "" => key.clone(),
                    _ => format!("{path}.{key}"),
                };
                flatten(&path, value, flat);
            }
        }
        Value::Array(items) => {
            let joined: Vec<_> = items.iter().filter_map(scalar).collect();
            flat.insert(path.to_owned(), joined.join(","));
        }
        _ => {
            if let Some(scalar) = scalar(value) {
                flat.insert(path.to_owned(), scalar);
            }
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
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
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    fn agent_config() -> Value {
        json!({
            "address": {
                "ip": "192.153.25.123",
                "port": 34245
            },
            "rights": ["admin", "logger", "runner", "reader", "writer"],
            "user": "admin"
        })
    }

    #[test]
    fn test_config() {
        let task = TaskContext::new("task-1", agent_config()).unwrap();

        assert_eq!(
            task.config_keys(),
            vec!["address.ip", "address.port", "rights", "user"]
        );
        assert_eq!(task.config("address.ip"), Some("192.153.25.123"));
        assert_eq!(task.config("address.port"), Some("34245"));
        assert_eq!(task.config("rights"), Some("admin,logger,runner,reader,writer"));
        assert_eq!(task.config("user"), Some("admin"));
        assert_eq!(task.config("address"), None);
        assert_eq!(task.config("password"), None);

        assert_eq!(task.raw_config()["address"]["port"], json!(34245));
        assert_eq!(task.raw_config(), &agent_config());
    }

    #[test]
    fn test_config_scalars() {
        let task = TaskContext::new(
            "task-1",
            json!({
                "enabled": true,
                "ratio": 0.5,
                "missing": null,
                "mixed": ["a", 1, false, {"skipped": 1}, null],
                "empty": [],
                "deep": {"er": {"est": "x"}}
            }),
        )
        .unwrap();

        assert_eq!(task.config("enabled"), Some("true"));
        assert_eq!(task.config("ratio"), Some("0.5"));
        assert_eq!(task.config("missing"), None);
        assert_eq!(task.config("mixed"), Some("a,1,false"));
        assert_eq!(task.config("empty"), Some(""));
        assert_eq!(task.config("deep.er.est"), Some("x"));
    }

    #[test]
    fn test_empty_config() {
        let task = TaskContext::new("task-1", Value::Null).unwrap();
        assert!(task.config_keys().is_empty());
        assert_eq!(task.raw_config(), &json!({}));
    }

    #[test]
    fn test_invalid_config() {
        let error = TaskContext::new("task-1", json!(["a", "b"])).unwrap_err();
        insta::assert_snapshot!(error.to_string(), @"task configuration must be a JSON object, found an array");

        let error = TaskContext::new("task-1", json!("a")).unwrap_err();
        assert_eq!(error.found, "a string");
    }

    #[test]
    fn test_state() {
        let task = TaskContext::new("task-1", Value::Null).unwrap();

        task.store("client", "10.0.0.1".to_owned());
        task.store("requests", Arc::new(AtomicUsize::new(0)));

        assert_eq!(task.load::<String>("client"), Ok("10.0.0.1".to_owned()));

        let requests = task.load::<Arc<AtomicUsize>>("requests").unwrap();
        requests.fetch_add(2, Ordering::Relaxed);
        let requests = task.load::<Arc<AtomicUsize>>("requests").unwrap();
        assert_eq!(requests.load(Ordering::Relaxed), 2);

        task.store("client", 7u16);
        assert_eq!(task.load::<u16>("client"), Ok(7));
        assert_eq!(
            task.load::<String>("client"),
            Err(StateError::TypeMismatch {
                key: "client".to_owned(),
                expected: "alloc::string::String",
            })
        );

        assert!(task.remove("client"));
        assert!(!task.remove("client"));
        assert_eq!(
            task.load::<u16>("client"),
            Err(StateError::NotFound("client".to_owned()))
        );
    }

    #[test]
    fn test_debug() {
        let task = TaskContext::new("task-1", json!({"user": "admin"})).unwrap();
        task.store("b", 1u8);
        task.store("a", 2u8);
        insta::assert_debug_snapshot!(task, @r###"
        TaskContext {
            id: "task-1",
            config: [
                "user",
            ],
            state: [
                "a",
                "b",
            ],
        }
        "###);
    }
}
