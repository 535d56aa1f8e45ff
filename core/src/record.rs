/// A single field value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
}

/// An ordered flat key-value record, the unit of data a check hands to the
/// agent's output pipeline.
///
/// Field order is preserved: the agent serializes fields in the order the
/// check appended them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string field
    pub fn str(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), Value::Str(value.into())));
        self
    }

    /// Append an integer field
    pub fn int(mut self, key: &str, value: i64) -> Self {
        self.fields.push((key.to_string(), Value::Int(value)));
        self
    }

    /// Append a floating point field
    pub fn float(mut self, key: &str, value: f64) -> Self {
        self.fields.push((key.to_string(), Value::Float(value)));
        self
    }

    pub fn push(&mut self, key: &str, value: Value) {
        self.fields.push((key.to_string(), value));
    }

    /// Value of the first field carrying this key, if any
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
