#![forbid(unsafe_code)]
//! Streaming output of event records as one JSON object.
//!
//! Records are written one at a time as the members `event_0`, `event_1`, ...
//! of a single top-level object, without holding the document in memory:
//!
//! ```text
//! {"event_0": {"inode": 0, "name": "a"}
//! , "event_1": {"inode": 5, "name": "b"}
//! }
//! ```
//!
//! The crate provides:
//! - [`JsonEventEncoder`], the envelope/counter state machine over an
//!   append-only [`OutputSink`] (and [`AsyncJsonEventEncoder`] behind the
//!   `tokio` feature).
//! - Field defaulting ([`FieldDefaults`]) and the [`RecordSerializer`] seam that
//!   turns a [`Record`] into a [`FieldMapping`].
//! - Deterministic member encoding ([`CanonicalEncoder`]).
//! - A JSONL [`RecordReader`] and an [`OutputRegistry`] for drivers.

mod canonical;
mod config;
mod encoder;
mod envelope;
mod error;
mod normalize;
mod output;
mod reader;
mod record;
mod serializer;
mod sink;

#[cfg(feature = "tokio")]
mod async_encoder;

pub use canonical::CanonicalEncoder;
pub use config::{EncoderConfig, ErrorDetailCapture, ReaderLimits};
pub use encoder::JsonEventEncoder;
pub use envelope::{Envelope, EnvelopeState, Operation, StateViolation};
pub use error::{EncoderError, EncoderErrorCode, ReadError, RegistryError};
pub use normalize::FieldDefaults;
pub use output::{
    LinearOutputModule, OutputDescriptor, OutputFactory, OutputRegistry, JSON_OUTPUT,
};
pub use reader::{RecordLine, RecordReader};
pub use record::Record;
pub use serializer::{
    AttributeSerializer, ClassifiedSerializerError, FieldMapping, MappingError, RecordSerializer,
};
pub use sink::{OutputSink, WriterSink};

#[cfg(feature = "tokio")]
pub use async_encoder::AsyncJsonEventEncoder;
