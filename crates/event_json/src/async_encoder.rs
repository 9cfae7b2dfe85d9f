use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::config::EncoderConfig;
use crate::encoder::{member_text, MemberEncoder};
use crate::envelope::{Envelope, EnvelopeState};
use crate::error::EncoderError;
use crate::record::Record;
use crate::serializer::{AttributeSerializer, RecordSerializer};

/// Async counterpart of [`crate::JsonEventEncoder`] writing to a tokio
/// [`AsyncWrite`]. Produces the same bytes and follows the same lifecycle;
/// drive it from a single task.
pub struct AsyncJsonEventEncoder<W, S = AttributeSerializer> {
    writer: W,
    members: MemberEncoder<S>,
    envelope: Envelope,
    buffer: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> AsyncJsonEventEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, AttributeSerializer::new(), EncoderConfig::default())
    }
}

impl<W: AsyncWrite + Unpin, S: RecordSerializer> AsyncJsonEventEncoder<W, S> {
    pub fn with_config(writer: W, serializer: S, config: EncoderConfig) -> Self {
        Self {
            writer,
            members: MemberEncoder::new(serializer, config),
            envelope: Envelope::new(),
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> EnvelopeState {
        self.envelope.state()
    }

    pub fn event_count(&self) -> u64 {
        self.envelope.event_count()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write(&mut self, text: &str) -> Result<(), EncoderError> {
        if let Err(source) = self.writer.write_all(text.as_bytes()).await {
            warn!(
                event_count = self.envelope.event_count(),
                error = %source,
                "output writer failed; stream abandoned"
            );
            self.envelope.fail();
            return Err(EncoderError::Sink { source });
        }
        Ok(())
    }

    pub async fn open(&mut self) -> Result<(), EncoderError> {
        let text = self.envelope.open()?;
        self.write(text).await?;
        debug!("opened async JSON event stream");
        Ok(())
    }

    pub async fn write_record(&mut self, record: &Record) -> Result<(), EncoderError> {
        let mut buffer = std::mem::take(&mut self.buffer);
        let result = self.write_member(record, &mut buffer).await;
        self.buffer = buffer;
        result
    }

    async fn write_member(
        &mut self,
        record: &Record,
        buffer: &mut Vec<u8>,
    ) -> Result<(), EncoderError> {
        self.members.render(&self.envelope, record, buffer)?;
        self.write(member_text(buffer)?).await?;
        self.envelope.commit_member();
        Ok(())
    }

    /// Writes `}` and flushes; the writer is not shut down.
    pub async fn close(&mut self) -> Result<(), EncoderError> {
        let text = self.envelope.close()?;
        self.write(text).await?;
        if let Err(source) = self.writer.flush().await {
            self.envelope.fail();
            return Err(EncoderError::Sink { source });
        }
        debug!(
            events = self.envelope.event_count(),
            "closed async JSON event stream"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncoderErrorCode;
    use crate::JsonEventEncoder;

    #[tokio::test]
    async fn async_output_matches_sync_output() {
        let records = [
            Record::new().with_field("name", "a"),
            Record::new()
                .with_field("inode", 7)
                .with_field("tags", serde_json::json!(["x", "y"])),
        ];

        let mut sync = JsonEventEncoder::new(String::new());
        sync.open().unwrap();
        for record in &records {
            sync.write_record(record).unwrap();
        }
        sync.close().unwrap();

        let mut encoder = AsyncJsonEventEncoder::new(Vec::new());
        encoder.open().await.unwrap();
        for record in &records {
            encoder.write_record(record).await.unwrap();
        }
        encoder.close().await.unwrap();

        assert_eq!(encoder.event_count(), 2);
        assert_eq!(
            String::from_utf8(encoder.into_inner()).unwrap(),
            sync.into_sink()
        );
    }

    #[tokio::test]
    async fn write_before_open_is_a_state_error() {
        let mut encoder = AsyncJsonEventEncoder::new(Vec::new());
        let err = encoder
            .write_record(&Record::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), EncoderErrorCode::State);
        assert!(encoder.into_inner().is_empty());
    }
}
