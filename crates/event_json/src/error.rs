use std::io;

use thiserror::Error;

use crate::envelope::{EnvelopeState, Operation, StateViolation};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EncoderErrorCode {
    State,
    Serialization,
    Sink,
}

#[derive(Debug, Error)]
pub enum EncoderError {
    /// The stream must be considered corrupt; the call wrote nothing.
    #[error("cannot {operation} while the encoder is {state}")]
    InvalidState {
        operation: Operation,
        state: EnvelopeState,
    },
    /// The record was rejected before anything reached the sink.
    #[error("record serialization failed: {summary}")]
    Serialization { summary: String },
    #[error("output sink write failed: {source}")]
    Sink {
        #[source]
        source: io::Error,
    },
}

impl EncoderError {
    pub fn code(&self) -> EncoderErrorCode {
        match self {
            Self::InvalidState { .. } => EncoderErrorCode::State,
            Self::Serialization { .. } => EncoderErrorCode::Serialization,
            Self::Sink { .. } => EncoderErrorCode::Sink,
        }
    }
}

impl From<StateViolation> for EncoderError {
    fn from(violation: StateViolation) -> Self {
        Self::InvalidState {
            operation: violation.operation,
            state: violation.state,
        }
    }
}

/// Failure to turn one input line into a [`crate::Record`].
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ReadError {
    #[error("I/O error while reading input")]
    Io,
    #[error("invalid UTF-8 in input")]
    InvalidUtf8,
    #[error("line too long (observed_bytes={observed_bytes}, max_line_bytes={max_line_bytes})")]
    LineTooLong {
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum RegistryError {
    #[error("output module `{name}` is already registered")]
    AlreadyRegistered { name: String },
    #[error("no output module named `{name}`")]
    UnknownModule { name: String },
}
