use std::io::{BufRead, ErrorKind};

use serde_json::Value;

use crate::config::ReaderLimits;
use crate::error::ReadError;
use crate::record::Record;

#[derive(Debug)]
enum BoundedLine {
    Line {
        line_number: usize,
        bytes: Vec<u8>,
    },
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    IoError {
        line_number: usize,
    },
}

/// Splits input on `\n` while holding at most `max_line_bytes` of any line.
///
/// Longer lines are dropped as they stream past and reported once, after
/// which iteration continues with the next line. A read error ends iteration.
struct BoundedLineReader<R> {
    reader: R,
    max_line_bytes: usize,
    current_line: Vec<u8>,
    observed_bytes: usize,
    line_number: usize,
    done: bool,
}

impl<R: BufRead> BoundedLineReader<R> {
    fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            max_line_bytes,
            current_line: Vec::new(),
            observed_bytes: 0,
            line_number: 0,
            done: false,
        }
    }

    fn finish_line(&mut self) -> BoundedLine {
        self.line_number += 1;
        let line_number = self.line_number;
        let observed_bytes = std::mem::take(&mut self.observed_bytes);

        if observed_bytes > self.max_line_bytes {
            self.current_line.clear();
            return BoundedLine::LineTooLong {
                line_number,
                observed_bytes,
                max_line_bytes: self.max_line_bytes,
            };
        }
        BoundedLine::Line {
            line_number,
            bytes: std::mem::take(&mut self.current_line),
        }
    }
}

impl<R: BufRead> Iterator for BoundedLineReader<R> {
    type Item = BoundedLine;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => {
                    self.done = true;
                    self.line_number += 1;
                    return Some(BoundedLine::IoError {
                        line_number: self.line_number,
                    });
                }
            };

            if available.is_empty() {
                self.done = true;
                if self.observed_bytes > 0 {
                    return Some(self.finish_line());
                }
                return None;
            }

            let newline = available.iter().position(|b| *b == b'\n');
            let segment_len = newline.unwrap_or(available.len());
            let observed = self.observed_bytes.saturating_add(segment_len);
            if observed <= self.max_line_bytes {
                self.current_line
                    .extend_from_slice(&available[..segment_len]);
            } else {
                self.current_line.clear();
            }
            self.observed_bytes = observed;

            match newline {
                Some(_) => {
                    self.reader.consume(segment_len + 1);
                    return Some(self.finish_line());
                }
                None => self.reader.consume(segment_len),
            }
        }
    }
}

/// One input line and what became of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLine {
    /// 1-based line number in the input.
    pub line_number: usize,
    pub outcome: Result<Record, ReadError>,
}

/// Reads newline-delimited JSON objects as [`Record`]s.
///
/// Blank lines are skipped and a trailing `\r` is ignored. Every other line
/// yields a [`RecordLine`], so a malformed line never stops iteration; only an
/// I/O error does.
pub struct RecordReader<R> {
    lines: BoundedLineReader<R>,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R, limits: ReaderLimits) -> Self {
        Self {
            lines: BoundedLineReader::new(reader, limits.max_line_bytes),
        }
    }

    fn parse(line: &str) -> Result<Record, ReadError> {
        let value: Value = serde_json::from_str(line).map_err(|err| ReadError::InvalidJson {
            message: err.to_string(),
        })?;
        let found = json_kind(&value);
        Record::from_value(value).ok_or(ReadError::NotAnObject { found })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = RecordLine;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (line_number, outcome) = match self.lines.next()? {
                BoundedLine::IoError { line_number } => (line_number, Err(ReadError::Io)),
                BoundedLine::LineTooLong {
                    line_number,
                    observed_bytes,
                    max_line_bytes,
                } => (
                    line_number,
                    Err(ReadError::LineTooLong {
                        observed_bytes,
                        max_line_bytes,
                    }),
                ),
                BoundedLine::Line { line_number, bytes } => {
                    let Ok(raw) = String::from_utf8(bytes) else {
                        return Some(RecordLine {
                            line_number,
                            outcome: Err(ReadError::InvalidUtf8),
                        });
                    };
                    let line = raw.strip_suffix('\r').unwrap_or(&raw);
                    if line.chars().all(char::is_whitespace) {
                        continue;
                    }
                    (line_number, Self::parse(line))
                }
            };
            return Some(RecordLine {
                line_number,
                outcome,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufReader, Cursor, Read};

    use serde_json::json;

    use super::*;

    fn read_all(input: &[u8], max_line_bytes: usize) -> Vec<RecordLine> {
        RecordReader::new(Cursor::new(input.to_vec()), ReaderLimits { max_line_bytes }).collect()
    }

    #[test]
    fn oversized_line_is_discarded_and_iteration_continues() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"{\"a\":1}\n");
        bytes.extend_from_slice(&[b'x'; 50]);
        bytes.extend_from_slice(b"\n{\"b\":2}\n");

        let lines = read_all(&bytes, 16);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].outcome.is_ok());
        assert_eq!(
            lines[1].outcome,
            Err(ReadError::LineTooLong {
                observed_bytes: 50,
                max_line_bytes: 16
            })
        );
        assert_eq!(lines[2].line_number, 3);
        assert_eq!(lines[2].outcome.as_ref().unwrap().get("b"), Some(&json!(2)));
    }

    #[test]
    fn long_line_split_across_small_buffers_is_measured_whole() {
        let mut bytes = vec![b' '; 40];
        bytes.extend_from_slice(b"{}\n{}");
        let reader = BufReader::with_capacity(8, Cursor::new(bytes));
        let lines: Vec<_> = RecordReader::new(reader, ReaderLimits { max_line_bytes: 32 }).collect();
        assert_eq!(lines.len(), 2);
        assert!(matches!(
            lines[0].outcome,
            Err(ReadError::LineTooLong { observed_bytes: 42, .. })
        ));
        assert!(lines[1].outcome.is_ok(), "final line without newline is kept");
    }

    #[test]
    fn blank_lines_and_carriage_returns_are_tolerated() {
        let lines = read_all(b"\n  \r\n{\"k\":\"v\"}\r\n", 1024);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].line_number, 3);
    }

    #[test]
    fn bad_lines_are_classified() {
        let lines = read_all(b"not json\n[1]\n\xff\n", 1024);
        assert!(matches!(lines[0].outcome, Err(ReadError::InvalidJson { .. })));
        assert_eq!(
            lines[1].outcome,
            Err(ReadError::NotAnObject { found: "array" })
        );
        assert_eq!(lines[2].outcome, Err(ReadError::InvalidUtf8));
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
        }
    }

    #[test]
    fn io_error_ends_iteration() {
        let mut reader = RecordReader::new(BufReader::new(BrokenReader), ReaderLimits::default());
        let line = reader.next().unwrap();
        assert_eq!(line.outcome, Err(ReadError::Io));
        assert!(reader.next().is_none());
    }
}
