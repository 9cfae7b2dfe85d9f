//! Deterministic JSON text for a single [`FieldMapping`].
//!
//! Object keys are sorted at every nesting level, items are separated by
//! `", "` and keys by `": "`. With `ensure_ascii` every character outside
//! printable ASCII is written as a `\uXXXX` escape (UTF-16 surrogate pairs
//! above the BMP), and floats use the shortest round-trip digits with a
//! signed two-digit exponent outside `1e-4..1e16`.

use std::io;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::Formatter;
use serde_json::{Map, Value};

use crate::serializer::FieldMapping;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CanonicalEncoder {
    ensure_ascii: bool,
}

impl Default for CanonicalEncoder {
    fn default() -> Self {
        Self { ensure_ascii: true }
    }
}

impl CanonicalEncoder {
    pub fn new(ensure_ascii: bool) -> Self {
        Self { ensure_ascii }
    }

    pub fn ensure_ascii(&self) -> bool {
        self.ensure_ascii
    }

    /// Appends the canonical encoding of `mapping` to `out`.
    pub fn encode_into(
        &self,
        mapping: &FieldMapping,
        out: &mut Vec<u8>,
    ) -> Result<(), serde_json::Error> {
        let formatter = SpacedFormatter {
            ensure_ascii: self.ensure_ascii,
        };
        let mut serializer = serde_json::Serializer::with_formatter(out, formatter);
        SortedMap(mapping).serialize(&mut serializer)
    }

    pub fn encode(&self, mapping: &FieldMapping) -> Result<String, serde_json::Error> {
        let mut out = Vec::new();
        self.encode_into(mapping, &mut out)?;
        // The formatter only ever emits valid UTF-8.
        String::from_utf8(out).map_err(|err| {
            <serde_json::Error as serde::ser::Error>::custom(err.utf8_error().to_string())
        })
    }
}

struct SortedMap<'a>(&'a Map<String, Value>);

impl Serialize for SortedMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, &Sorted(value))?;
        }
        map.end()
    }
}

struct Sorted<'a>(&'a Value);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => SortedMap(map).serialize(serializer),
            Value::Array(items) => serializer.collect_seq(items.iter().map(Sorted)),
            other => other.serialize(serializer),
        }
    }
}

struct SpacedFormatter {
    ensure_ascii: bool,
}

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(float_repr(value).as_bytes())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        if !self.ensure_ascii {
            return writer.write_all(fragment.as_bytes());
        }

        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if (' '..='~').contains(&ch) {
                continue;
            }
            writer.write_all(fragment[start..idx].as_bytes())?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Shortest round-trip float text: positional for exponents in `-4..16`
/// (always with a fractional part), otherwise `<mantissa>e<sign><exp>` with at
/// least two exponent digits.
fn float_repr(value: f64) -> String {
    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs());
    }

    let (negative, unsigned) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa),
    };
    let digits: String = unsigned.chars().filter(|ch| *ch != '.').collect();

    let mut out = String::with_capacity(digits.len() + 8);
    if negative {
        out.push('-');
    }
    if exponent < 0 {
        out.push_str("0.");
        for _ in 0..(exponent.unsigned_abs() - 1) {
            out.push('0');
        }
        out.push_str(&digits);
    } else {
        let int_len = exponent as usize + 1;
        if digits.len() > int_len {
            out.push_str(&digits[..int_len]);
            out.push('.');
            out.push_str(&digits[int_len..]);
        } else {
            out.push_str(&digits);
            for _ in digits.len()..int_len {
                out.push('0');
            }
            out.push_str(".0");
        }
    }
    out
}
