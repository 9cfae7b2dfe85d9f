//! Incremental builder for the `{ "event_N": ... }` envelope.
//!
//! The builder owns the lifecycle and the event counter; it produces the exact
//! bytes for each step but never touches a sink. Encoders write what it
//! returns and report back with [`Envelope::commit_member`] or
//! [`Envelope::fail`].

use std::fmt;
use std::io::Write;

pub const OPEN: &str = "{";
pub const CLOSE: &str = "}";
pub const SEPARATOR: &str = ", ";
pub const MEMBER_PREFIX: &str = "event_";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EnvelopeState {
    Unopened,
    Opened,
    Closed,
    /// A sink write failed mid-stream; the written bytes are not recoverable.
    Failed,
}

impl fmt::Display for EnvelopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unopened => "unopened",
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Operation {
    Open,
    WriteRecord,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::WriteRecord => "write_record",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

/// Returned when an operation is attempted outside its lifecycle state.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StateViolation {
    pub operation: Operation,
    pub state: EnvelopeState,
}

#[derive(Debug, Clone)]
pub struct Envelope {
    state: EnvelopeState,
    event_count: u64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            state: EnvelopeState::Unopened,
            event_count: 0,
        }
    }

    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Members committed since the envelope was opened.
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    fn require(&self, operation: Operation, state: EnvelopeState) -> Result<(), StateViolation> {
        if self.state == state {
            Ok(())
        } else {
            Err(StateViolation {
                operation,
                state: self.state,
            })
        }
    }

    /// Checks that a member may be written right now.
    pub fn check_member(&self) -> Result<(), StateViolation> {
        self.require(Operation::WriteRecord, EnvelopeState::Opened)
    }

    /// Moves to `Opened` and returns the opening text to write.
    ///
    /// The state changes before the write happens; a failed write must be
    /// reported through [`Envelope::fail`].
    pub fn open(&mut self) -> Result<&'static str, StateViolation> {
        self.require(Operation::Open, EnvelopeState::Unopened)?;
        self.state = EnvelopeState::Opened;
        self.event_count = 0;
        Ok(OPEN)
    }

    /// Appends the complete text of the next member to `out`: the separator
    /// when this is not the first member, then `"event_<n>": <fragment>\n`.
    ///
    /// Does not advance the counter; call [`Envelope::commit_member`] once the
    /// text has been written.
    pub fn render_member(&self, fragment: &[u8], out: &mut Vec<u8>) -> Result<(), StateViolation> {
        self.check_member()?;
        out.reserve(fragment.len() + MEMBER_PREFIX.len() + 32);
        if self.event_count != 0 {
            out.extend_from_slice(SEPARATOR.as_bytes());
        }
        // Writing into a Vec cannot fail.
        let _ = write!(out, "\"{MEMBER_PREFIX}{}\": ", self.event_count);
        out.extend_from_slice(fragment);
        out.push(b'\n');
        Ok(())
    }

    pub fn commit_member(&mut self) {
        self.event_count += 1;
    }

    pub fn close(&mut self) -> Result<&'static str, StateViolation> {
        self.require(Operation::Close, EnvelopeState::Opened)?;
        self.state = EnvelopeState::Closed;
        Ok(CLOSE)
    }

    /// Marks the stream unusable after a sink failure.
    pub fn fail(&mut self) {
        self.state = EnvelopeState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(envelope: &mut Envelope, fragment: &str) -> String {
        let mut out = Vec::new();
        envelope.render_member(fragment.as_bytes(), &mut out).unwrap();
        envelope.commit_member();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn separator_precedes_every_member_but_the_first() {
        let mut envelope = Envelope::new();
        assert_eq!(envelope.open().unwrap(), "{");
        assert_eq!(member(&mut envelope, "{}"), "\"event_0\": {}\n");
        assert_eq!(member(&mut envelope, "{}"), ", \"event_1\": {}\n");
        assert_eq!(envelope.event_count(), 2);
        assert_eq!(envelope.close().unwrap(), "}");
    }

    #[test]
    fn uncommitted_member_does_not_advance_counter() {
        let mut envelope = Envelope::new();
        envelope.open().unwrap();
        let mut scratch = Vec::new();
        envelope.render_member(b"{}", &mut scratch).unwrap();
        assert_eq!(envelope.event_count(), 0);
        assert_eq!(member(&mut envelope, "{}"), "\"event_0\": {}\n");
    }

    #[test]
    fn lifecycle_violations_are_reported() {
        let mut envelope = Envelope::new();
        let err = envelope.close().unwrap_err();
        assert_eq!(err.operation, Operation::Close);
        assert_eq!(err.state, EnvelopeState::Unopened);
        assert!(envelope.check_member().is_err());

        envelope.open().unwrap();
        assert_eq!(envelope.open().unwrap_err().state, EnvelopeState::Opened);

        envelope.close().unwrap();
        assert_eq!(envelope.check_member().unwrap_err().state, EnvelopeState::Closed);

        let mut failed = Envelope::new();
        failed.open().unwrap();
        failed.fail();
        assert_eq!(failed.close().unwrap_err().state, EnvelopeState::Failed);
    }
}
