use serde_json::Value;

/// A JSON-serializable summary of a task's commands, inputs, and outputs.
///
/// Signatures are always arrays of arrays and strings, never maps, so
/// structural equality coincides with canonical JSON string equality and a
/// signature round-trips through the cache file unchanged.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Value);

impl Signature {
    /// Build a signature from the command lines a task would execute
    /// followed by the content digests of its hashed file set.
    pub fn new(commands: &[Vec<String>], file_digests: Vec<String>) -> Self {
        let mut parts: Vec<Value> = commands
            .iter()
            .map(|argv| Value::Array(argv.iter().map(|t| Value::String(t.clone())).collect()))
            .collect();
        parts.extend(file_digests.into_iter().map(Value::String));
        Self(Value::Array(parts))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Signature {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
