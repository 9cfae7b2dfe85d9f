use crate::normalize::FieldDefaults;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ErrorDetailCapture {
    #[default]
    RedactedSummaryOnly,
    FullDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub field_defaults: FieldDefaults,
    pub ensure_ascii: bool,
    pub error_detail_capture: ErrorDetailCapture,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            field_defaults: FieldDefaults::default(),
            ensure_ascii: true,
            error_detail_capture: ErrorDetailCapture::RedactedSummaryOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReaderLimits {
    pub max_line_bytes: usize,
}

impl Default for ReaderLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 1024 * 1024,
        }
    }
}
