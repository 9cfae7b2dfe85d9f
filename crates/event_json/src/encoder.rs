use tracing::{debug, trace, warn};

use crate::canonical::CanonicalEncoder;
use crate::config::{EncoderConfig, ErrorDetailCapture};
use crate::envelope::{Envelope, EnvelopeState};
use crate::error::EncoderError;
use crate::normalize::FieldDefaults;
use crate::record::Record;
use crate::serializer::{AttributeSerializer, ClassifiedSerializerError, RecordSerializer};
use crate::sink::OutputSink;

/// Per-record half of the encoder: normalization, serialization and member
/// rendering, with no I/O. Shared by the sync and async encoders.
pub(crate) struct MemberEncoder<S> {
    serializer: S,
    canonical: CanonicalEncoder,
    field_defaults: FieldDefaults,
    error_detail_capture: ErrorDetailCapture,
    fragment: Vec<u8>,
}

impl<S: RecordSerializer> MemberEncoder<S> {
    pub(crate) fn new(serializer: S, config: EncoderConfig) -> Self {
        Self {
            serializer,
            canonical: CanonicalEncoder::new(config.ensure_ascii),
            field_defaults: config.field_defaults,
            error_detail_capture: config.error_detail_capture,
            fragment: Vec::new(),
        }
    }

    pub(crate) fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Renders the complete member text for `record` into `out`, replacing
    /// its previous contents. Nothing is committed on the envelope.
    pub(crate) fn render(
        &mut self,
        envelope: &Envelope,
        record: &Record,
        out: &mut Vec<u8>,
    ) -> Result<(), EncoderError> {
        envelope.check_member()?;

        let normalized = self.field_defaults.apply(record);
        let mapping = self.serializer.serialize(&normalized).map_err(|err| {
            let summary = match self.error_detail_capture {
                ErrorDetailCapture::RedactedSummaryOnly => err.redacted_summary(),
                ErrorDetailCapture::FullDetails => err.full_details(),
            };
            warn!(
                event_number = envelope.event_count(),
                %summary,
                "record serializer rejected event"
            );
            EncoderError::Serialization { summary }
        })?;

        self.fragment.clear();
        self.canonical
            .encode_into(&mapping, &mut self.fragment)
            .map_err(|err| EncoderError::Serialization {
                summary: err.to_string(),
            })?;

        out.clear();
        envelope.render_member(&self.fragment, out)?;
        Ok(())
    }
}

pub(crate) fn member_text(bytes: &[u8]) -> Result<&str, EncoderError> {
    std::str::from_utf8(bytes).map_err(|err| EncoderError::Serialization {
        summary: format!("encoded member is not UTF-8: {err}"),
    })
}

/// Streams records as the members `event_0`, `event_1`, ... of a single JSON
/// object.
///
/// Call [`open`](Self::open) once, [`write_record`](Self::write_record) per
/// record in arrival order, then [`close`](Self::close). The encoder has
/// exactly one writer: callers with concurrent producers must funnel records
/// through a single owner before they reach it.
///
/// Each member is assembled in memory and handed to the sink in one write, so
/// a rejected record leaves no partial text behind. A sink failure leaves the
/// encoder in [`EnvelopeState::Failed`]; the stream must be restarted from a
/// fresh sink.
pub struct JsonEventEncoder<W, S = AttributeSerializer> {
    sink: W,
    members: MemberEncoder<S>,
    envelope: Envelope,
    buffer: Vec<u8>,
}

impl<W: OutputSink> JsonEventEncoder<W> {
    pub fn new(sink: W) -> Self {
        Self::with_serializer(sink, AttributeSerializer::new())
    }
}

impl<W: OutputSink, S: RecordSerializer> JsonEventEncoder<W, S> {
    pub const NAME: &'static str = "json";
    pub const DESCRIPTION: &'static str = "Saves the events into a JSON format.";

    pub fn with_serializer(sink: W, serializer: S) -> Self {
        Self::with_config(sink, serializer, EncoderConfig::default())
    }

    pub fn with_config(sink: W, serializer: S, config: EncoderConfig) -> Self {
        Self {
            sink,
            members: MemberEncoder::new(serializer, config),
            envelope: Envelope::new(),
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    /// Records written since [`open`](Self::open).
    pub fn event_count(&self) -> u64 {
        self.envelope.event_count()
    }

    pub fn serializer(&self) -> &S {
        self.members.serializer()
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    fn write(&mut self, text: &str) -> Result<(), EncoderError> {
        self.sink.write_text(text).map_err(|source| {
            warn!(
                event_count = self.envelope.event_count(),
                error = %source,
                "output sink write failed; stream abandoned"
            );
            self.envelope.fail();
            EncoderError::Sink { source }
        })
    }

    /// Writes `{` and resets the event counter.
    pub fn open(&mut self) -> Result<(), EncoderError> {
        let text = self.envelope.open()?;
        self.write(text)?;
        debug!(module = Self::NAME, "opened JSON event stream");
        Ok(())
    }

    /// Writes one record as the next `event_<n>` member.
    ///
    /// On a serializer error nothing is written and the counter is unchanged;
    /// the caller decides whether to continue with the next record.
    pub fn write_record(&mut self, record: &Record) -> Result<(), EncoderError> {
        let mut buffer = std::mem::take(&mut self.buffer);
        let result = self.write_member(record, &mut buffer);
        self.buffer = buffer;
        result
    }

    fn write_member(&mut self, record: &Record, buffer: &mut Vec<u8>) -> Result<(), EncoderError> {
        self.members.render(&self.envelope, record, buffer)?;
        let text = member_text(buffer)?;
        self.write(text)?;
        trace!(
            event_number = self.envelope.event_count(),
            bytes = buffer.len(),
            "wrote event member"
        );
        self.envelope.commit_member();
        Ok(())
    }

    /// Writes `}` and flushes the sink.
    pub fn close(&mut self) -> Result<(), EncoderError> {
        let text = self.envelope.close()?;
        self.write(text)?;
        self.sink.flush().map_err(|source| {
            self.envelope.fail();
            EncoderError::Sink { source }
        })?;
        debug!(
            module = Self::NAME,
            events = self.envelope.event_count(),
            "closed JSON event stream"
        );
        Ok(())
    }
}
