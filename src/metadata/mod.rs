//! SigMF metadata documents (`.sigmf-meta`).
//!
//! A document is a JSON object with three required members:
//!
//! ```json
//! { "global": { "core:datatype": "cf32_le", "core:version": "1.0.0" },
//!   "captures": [ { "core:sample_start": 0 } ],
//!   "annotations": [] }
//! ```
//!
//! Only the structural rules the reader depends on are checked here; the
//! full JSON schema is not.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DATATYPE_KEY:     &str = "core:datatype";
pub const VERSION_KEY:      &str = "core:version";
pub const SAMPLE_RATE_KEY:  &str = "core:sample_rate";
pub const NUM_CHANNELS_KEY: &str = "core:num_channels";
pub const SHA512_KEY:       &str = "core:sha512";
pub const AUTHOR_KEY:       &str = "core:author";
pub const DESCRIPTION_KEY:  &str = "core:description";
pub const SAMPLE_START_KEY: &str = "core:sample_start";
pub const SAMPLE_COUNT_KEY: &str = "core:sample_count";
pub const DATETIME_KEY:     &str = "core:datetime";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required field {section}.{field}")]
    MissingField { section: &'static str, field: &'static str },
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
    #[error("{section} has bad order at index {index}")]
    BadOrder { section: &'static str, index: usize },
    #[error("invalid datatype: {0}")]
    InvalidDatatype(String),
}

// ── DataType ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    F64,
    F32,
    I32,
    I16,
    U32,
    U16,
    I8,
    U8,
}

impl SampleFormat {
    /// Bytes per component.
    pub fn size(self) -> usize {
        match self {
            SampleFormat::F64                                         => 8,
            SampleFormat::F32 | SampleFormat::I32 | SampleFormat::U32 => 4,
            SampleFormat::I16 | SampleFormat::U16                     => 2,
            SampleFormat::I8  | SampleFormat::U8                      => 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            SampleFormat::F64 => "f64",
            SampleFormat::F32 => "f32",
            SampleFormat::I32 => "i32",
            SampleFormat::I16 => "i16",
            SampleFormat::U32 => "u32",
            SampleFormat::U16 => "u16",
            SampleFormat::I8  => "i8",
            SampleFormat::U8  => "u8",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Parsed `core:datatype`, e.g. `cf32_le` or `ru8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataType {
    pub complex: bool,
    pub format:  SampleFormat,
    /// `None` only for single-byte formats.
    pub endian:  Option<Endian>,
}

impl DataType {
    /// Bytes per sample of one channel (both components when complex).
    pub fn sample_size(&self) -> usize {
        self.format.size() * if self.complex { 2 } else { 1 }
    }
}

impl FromStr for DataType {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || MetadataError::InvalidDatatype(s.to_owned());
        let complex = match s.as_bytes().first().copied() {
            Some(b'c') => true,
            Some(b'r') => false,
            _          => return Err(bad()),
        };
        let (fmt, endian) = match s[1..].split_once('_') {
            Some((f, "le")) => (f, Some(Endian::Little)),
            Some((f, "be")) => (f, Some(Endian::Big)),
            Some(_)         => return Err(bad()),
            None            => (&s[1..], None),
        };
        let format = match fmt {
            "f64" => SampleFormat::F64,
            "f32" => SampleFormat::F32,
            "i32" => SampleFormat::I32,
            "i16" => SampleFormat::I16,
            "u32" => SampleFormat::U32,
            "u16" => SampleFormat::U16,
            "i8"  => SampleFormat::I8,
            "u8"  => SampleFormat::U8,
            _     => return Err(bad()),
        };
        // Multi-byte formats need an explicit byte order; single bytes forbid one.
        if (format.size() > 1) != endian.is_some() {
            return Err(bad());
        }
        Ok(Self { complex, format, endian })
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.complex { 'c' } else { 'r' }, self.format.name())?;
        match self.endian {
            Some(Endian::Little) => f.write_str("_le"),
            Some(Endian::Big)    => f.write_str("_be"),
            None                 => Ok(()),
        }
    }
}

// ── MetadataDocument ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub global:      Map<String, Value>,
    pub captures:    Vec<Map<String, Value>>,
    pub annotations: Vec<Map<String, Value>>,
}

impl MetadataDocument {
    /// Parse and validate.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MetadataError> {
        let doc = Self::parse(bytes)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Parse without structural validation.
    pub fn parse(bytes: &[u8]) -> Result<Self, MetadataError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        let datatype = self.global.get(DATATYPE_KEY)
            .ok_or(MetadataError::MissingField { section: "global", field: DATATYPE_KEY })?;
        datatype.as_str()
            .ok_or_else(|| invalid(DATATYPE_KEY, "expected a string"))?
            .parse::<DataType>()?;

        match self.global.get(VERSION_KEY) {
            Some(Value::String(_)) => {}
            Some(_) => return Err(invalid(VERSION_KEY, "expected a string")),
            None    => return Err(MetadataError::MissingField { section: "global", field: VERSION_KEY }),
        }

        if let Some(rate) = self.global.get(SAMPLE_RATE_KEY) {
            match rate.as_f64() {
                Some(r) if r > 0.0 => {}
                _ => return Err(invalid(SAMPLE_RATE_KEY, "expected a positive number")),
            }
        }

        if let Some(n) = self.global.get(NUM_CHANNELS_KEY) {
            match n.as_u64() {
                Some(n) if n > 0 => {}
                _ => return Err(invalid(NUM_CHANNELS_KEY, "expected a positive integer")),
            }
        }

        if let Some(digest) = self.global.get(SHA512_KEY) {
            let ok = digest.as_str()
                .map(|d| d.len() == 128 && d.bytes().all(|b| b.is_ascii_hexdigit()))
                .unwrap_or(false);
            if !ok {
                return Err(invalid(SHA512_KEY, "expected 128 hex digits"));
            }
        }

        check_segments("captures", &self.captures)?;
        check_segments("annotations", &self.annotations)?;

        for capture in &self.captures {
            if let Some(dt) = capture.get(DATETIME_KEY) {
                let s = dt.as_str().ok_or_else(|| invalid(DATETIME_KEY, "expected a string"))?;
                chrono::DateTime::parse_from_rfc3339(s)
                    .map_err(|e| invalid(DATETIME_KEY, &e.to_string()))?;
            }
        }
        for annotation in &self.annotations {
            if let Some(count) = annotation.get(SAMPLE_COUNT_KEY) {
                if count.as_u64().is_none() {
                    return Err(invalid(SAMPLE_COUNT_KEY, "expected a non-negative integer"));
                }
            }
        }
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn datatype(&self) -> Result<DataType, MetadataError> {
        self.global_str(DATATYPE_KEY)
            .ok_or(MetadataError::MissingField { section: "global", field: DATATYPE_KEY })?
            .parse()
    }

    pub fn version(&self) -> Option<&str> { self.global_str(VERSION_KEY) }
    pub fn author(&self) -> Option<&str> { self.global_str(AUTHOR_KEY) }
    pub fn description(&self) -> Option<&str> { self.global_str(DESCRIPTION_KEY) }
    pub fn sha512(&self) -> Option<&str> { self.global_str(SHA512_KEY) }

    pub fn sample_rate(&self) -> Option<f64> {
        self.global.get(SAMPLE_RATE_KEY).and_then(Value::as_f64)
    }

    /// `core:num_channels`, defaulting to 1.
    pub fn num_channels(&self) -> u64 {
        self.global.get(NUM_CHANNELS_KEY).and_then(Value::as_u64).unwrap_or(1)
    }

    pub fn global_field(&self, key: &str) -> Option<&Value> {
        self.global.get(key)
    }

    fn global_str(&self, key: &str) -> Option<&str> {
        self.global.get(key).and_then(Value::as_str)
    }
}

fn invalid(field: &str, reason: &str) -> MetadataError {
    MetadataError::InvalidField { field: field.to_owned(), reason: reason.to_owned() }
}

/// Every segment carries a `core:sample_start`, in non-decreasing order.
fn check_segments(section: &'static str, items: &[Map<String, Value>]) -> Result<(), MetadataError> {
    let mut last = 0u64;
    for (index, item) in items.iter().enumerate() {
        let start = item.get(SAMPLE_START_KEY)
            .ok_or(MetadataError::MissingField { section, field: SAMPLE_START_KEY })?
            .as_u64()
            .ok_or_else(|| invalid(
                &format!("{section}[{index}].{SAMPLE_START_KEY}"),
                "expected a non-negative integer",
            ))?;
        if start < last {
            return Err(MetadataError::BadOrder { section, index });
        }
        last = start;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Result<MetadataDocument, MetadataError> {
        MetadataDocument::from_slice(&serde_json::to_vec(&v).unwrap())
    }

    fn minimal() -> Value {
        json!({
            "global": { "core:datatype": "rf32_le", "core:version": "1.0.0" },
            "captures": [ { "core:sample_start": 0 } ],
            "annotations": [ { "core:sample_start": 0, "core:sample_count": 16 } ]
        })
    }

    #[test]
    fn minimal_document_is_valid() {
        let d = doc(minimal()).unwrap();
        assert_eq!(d.version(), Some("1.0.0"));
        assert_eq!(d.num_channels(), 1);
        assert_eq!(d.datatype().unwrap().sample_size(), 4);
    }

    #[test]
    fn missing_datatype_is_rejected() {
        let mut v = minimal();
        v["global"].as_object_mut().unwrap().remove(DATATYPE_KEY);
        assert!(matches!(doc(v), Err(MetadataError::MissingField { field: DATATYPE_KEY, .. })));
    }

    #[test]
    fn missing_top_level_member_is_a_json_error() {
        let v = json!({ "global": { "core:datatype": "rf32_le", "core:version": "1.0.0" } });
        assert!(matches!(doc(v), Err(MetadataError::Json(_))));
    }

    #[test]
    fn out_of_order_captures_are_rejected() {
        let mut v = minimal();
        v["captures"] = json!([ { "core:sample_start": 10 }, { "core:sample_start": 5 } ]);
        assert!(matches!(doc(v), Err(MetadataError::BadOrder { section: "captures", index: 1 })));
    }

    #[test]
    fn bad_datetime_is_rejected() {
        let mut v = minimal();
        v["captures"][0]["core:datetime"] = json!("yesterday");
        assert!(matches!(doc(v), Err(MetadataError::InvalidField { .. })));

        let mut v = minimal();
        v["captures"][0]["core:datetime"] = json!("2021-06-18T23:17:51.163959Z");
        assert!(doc(v).is_ok());
    }

    #[test]
    fn short_sha512_is_rejected() {
        let mut v = minimal();
        v["global"]["core:sha512"] = json!("abcd");
        assert!(matches!(doc(v), Err(MetadataError::InvalidField { .. })));
    }

    #[test]
    fn datatype_grammar() {
        for ok in ["cf32_le", "ri16_be", "cf64_le", "ru8", "ci8", "ru32_le"] {
            assert_eq!(ok.parse::<DataType>().unwrap().to_string(), ok);
        }
        for bad in ["", "f32_le", "cf32", "ru8_le", "xf32_le", "cf32_xx", "ci64_le"] {
            assert!(bad.parse::<DataType>().is_err(), "{bad}");
        }
        assert_eq!("cf32_le".parse::<DataType>().unwrap().sample_size(), 8);
        assert_eq!("ci8".parse::<DataType>().unwrap().sample_size(), 2);
    }
}
