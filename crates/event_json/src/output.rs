//! Named output modules and the registry drivers pick them from.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::EncoderConfig;
use crate::encoder::JsonEventEncoder;
use crate::error::{EncoderError, RegistryError};
use crate::record::Record;
use crate::serializer::{AttributeSerializer, RecordSerializer};
use crate::sink::OutputSink;

/// An output that writes a header, one body per event, then a footer.
pub trait LinearOutputModule {
    fn name(&self) -> &'static str;

    fn write_header(&mut self) -> Result<(), EncoderError>;

    fn write_event(&mut self, record: &Record) -> Result<(), EncoderError>;

    fn write_footer(&mut self) -> Result<(), EncoderError>;
}

impl<W: OutputSink, S: RecordSerializer> LinearOutputModule for JsonEventEncoder<W, S> {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn write_header(&mut self) -> Result<(), EncoderError> {
        self.open()
    }

    fn write_event(&mut self, record: &Record) -> Result<(), EncoderError> {
        self.write_record(record)
    }

    fn write_footer(&mut self) -> Result<(), EncoderError> {
        self.close()
    }
}

pub type OutputFactory =
    fn(Box<dyn OutputSink + Send>, EncoderConfig) -> Box<dyn LinearOutputModule + Send>;

#[derive(Clone, Copy)]
pub struct OutputDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub factory: OutputFactory,
}

impl fmt::Debug for OutputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

fn json_output(
    sink: Box<dyn OutputSink + Send>,
    config: EncoderConfig,
) -> Box<dyn LinearOutputModule + Send> {
    Box::new(JsonEventEncoder::with_config(
        sink,
        AttributeSerializer::new(),
        config,
    ))
}

pub const JSON_OUTPUT: OutputDescriptor = OutputDescriptor {
    name: "json",
    description: "Saves the events into a JSON format.",
    factory: json_output,
};

/// Output modules keyed by lowercase name.
#[derive(Debug, Default, Clone)]
pub struct OutputRegistry {
    modules: BTreeMap<String, OutputDescriptor>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `json` module.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.modules.insert(JSON_OUTPUT.name.to_string(), JSON_OUTPUT);
        registry
    }

    pub fn register(&mut self, descriptor: OutputDescriptor) -> Result<(), RegistryError> {
        let key = descriptor.name.to_ascii_lowercase();
        if self.modules.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered { name: key });
        }
        self.modules.insert(key, descriptor);
        Ok(())
    }

    pub fn deregister(&mut self, name: &str) -> Result<OutputDescriptor, RegistryError> {
        self.modules
            .remove(&name.to_ascii_lowercase())
            .ok_or_else(|| RegistryError::UnknownModule {
                name: name.to_string(),
            })
    }

    pub fn get(&self, name: &str) -> Result<&OutputDescriptor, RegistryError> {
        self.modules
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| RegistryError::UnknownModule {
                name: name.to_string(),
            })
    }

    pub fn create(
        &self,
        name: &str,
        sink: Box<dyn OutputSink + Send>,
        config: EncoderConfig,
    ) -> Result<Box<dyn LinearOutputModule + Send>, RegistryError> {
        let descriptor = self.get(name)?;
        Ok((descriptor.factory)(sink, config))
    }

    /// `(name, description)` pairs in name order.
    pub fn names_and_descriptions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.modules
            .values()
            .map(|descriptor| (descriptor.name, descriptor.description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_creates_json_module() {
        let registry = OutputRegistry::with_defaults();
        let names: Vec<_> = registry.names_and_descriptions().collect();
        assert_eq!(names, vec![("json", "Saves the events into a JSON format.")]);

        let mut module = registry
            .create("JSON", Box::new(String::new()), EncoderConfig::default())
            .unwrap();
        assert_eq!(module.name(), "json");
        module.write_header().unwrap();
        module.write_footer().unwrap();
    }

    #[test]
    fn duplicate_and_unknown_names_are_rejected() {
        let mut registry = OutputRegistry::with_defaults();
        let err = registry.register(JSON_OUTPUT).unwrap_err();
        assert_eq!(
            err,
            RegistryError::AlreadyRegistered {
                name: "json".to_string()
            }
        );

        registry.deregister("json").unwrap();
        assert!(matches!(
            registry.get("json"),
            Err(RegistryError::UnknownModule { .. })
        ));
        registry.register(JSON_OUTPUT).unwrap();
    }
}
