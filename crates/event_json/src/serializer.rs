use std::convert::Infallible;
use std::error::Error;

use serde_json::{Map, Value};

use crate::record::Record;

/// Plain mapping a record is converted into before text encoding.
pub type FieldMapping = Map<String, Value>;

/// Converts one record into a [`FieldMapping`].
///
/// Implementations must be deterministic for a given record content. Key
/// iteration order of the returned mapping does not matter; the encoder sorts.
pub trait RecordSerializer {
    type Error: ClassifiedSerializerError;

    fn serialize(&mut self, record: &Record) -> Result<FieldMapping, Self::Error>;
}

pub trait ClassifiedSerializerError: Error {
    /// Short description safe to surface in errors and logs.
    fn redacted_summary(&self) -> String;
    fn full_details(&self) -> String;
}

impl ClassifiedSerializerError for Infallible {
    fn redacted_summary(&self) -> String {
        match *self {}
    }

    fn full_details(&self) -> String {
        match *self {}
    }
}

impl<F, E> RecordSerializer for F
where
    F: FnMut(&Record) -> Result<FieldMapping, E>,
    E: ClassifiedSerializerError,
{
    type Error = E;

    fn serialize(&mut self, record: &Record) -> Result<FieldMapping, Self::Error> {
        self(record)
    }
}

/// General-purpose serializer failure for closures and ad-hoc serializers.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{summary}")]
pub struct MappingError {
    summary: String,
    details: String,
}

impl MappingError {
    pub fn new(summary: impl Into<String>) -> Self {
        let summary = summary.into();
        Self {
            details: summary.clone(),
            summary,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}

impl ClassifiedSerializerError for MappingError {
    fn redacted_summary(&self) -> String {
        self.summary.clone()
    }

    fn full_details(&self) -> String {
        self.details.clone()
    }
}

/// Copies a record's public attributes into a mapping.
///
/// Attributes whose names start with `_` are private to the producer and are
/// dropped unless [`AttributeSerializer::keep_private`] is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeSerializer {
    keep_private: bool,
}

impl AttributeSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep_private(mut self, keep: bool) -> Self {
        self.keep_private = keep;
        self
    }
}

impl RecordSerializer for AttributeSerializer {
    type Error = Infallible;

    fn serialize(&mut self, record: &Record) -> Result<FieldMapping, Self::Error> {
        Ok(record
            .iter()
            .filter(|(name, _)| self.keep_private || !name.starts_with('_'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect())
    }
}
