use std::borrow::Cow;

use serde_json::Value;

use crate::record::Record;

/// Rule table of `{field -> default}` applied before a record is serialized.
///
/// A default fills a field that is missing or `null`; a field with any other
/// value is left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefaults {
    rules: Vec<(String, Value)>,
}

impl FieldDefaults {
    pub const INODE_FIELD: &'static str = "inode";

    /// A table with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds or replaces the default for `field`.
    pub fn with_default(mut self, field: impl Into<String>, default: impl Into<Value>) -> Self {
        self.set(field, default);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, default: impl Into<Value>) {
        let field = field.into();
        let default = default.into();
        match self.rules.iter_mut().find(|(name, _)| *name == field) {
            Some(rule) => rule.1 = default,
            None => self.rules.push((field, default)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.rules
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns a view of `record` with every default applied.
    ///
    /// Borrows the record unchanged when no rule fires, so the common case of
    /// fully populated records does not clone.
    pub fn apply<'a>(&self, record: &'a Record) -> Cow<'a, Record> {
        let mut normalized = Cow::Borrowed(record);
        for (field, default) in &self.rules {
            if !normalized.is_set(field) {
                normalized.to_mut().insert(field.clone(), default.clone());
            }
        }
        normalized
    }
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self::empty().with_default(Self::INODE_FIELD, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_inode_defaults_to_zero() {
        let record = Record::new().with_field("name", "a");
        let normalized = FieldDefaults::default().apply(&record);
        assert_eq!(normalized.get("inode"), Some(&json!(0)));
        assert!(record.get("inode").is_none(), "caller's record is untouched");
    }

    #[test]
    fn null_inode_is_treated_as_unset() {
        let record = Record::new().with_field("inode", Value::Null);
        let normalized = FieldDefaults::default().apply(&record);
        assert_eq!(normalized.get("inode"), Some(&json!(0)));
    }

    #[test]
    fn explicit_inode_is_borrowed_unchanged() {
        let record = Record::new().with_field("inode", 5);
        let normalized = FieldDefaults::default().apply(&record);
        assert!(matches!(normalized, Cow::Borrowed(_)));
        assert_eq!(normalized.get("inode"), Some(&json!(5)));
    }

    #[test]
    fn later_set_replaces_earlier_rule() {
        let mut defaults = FieldDefaults::default();
        defaults.set("inode", -1);
        assert_eq!(defaults.get("inode"), Some(&json!(-1)));
        assert!(FieldDefaults::empty().is_empty());
    }
}
