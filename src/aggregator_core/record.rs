//! Record parsing: `<key><delimiter><JSON object>` lines into keyed payloads

use super::value::{Object, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: String,
    pub payload: Object,
}

#[derive(Debug)]
pub enum RecordError {
    /// The line has no delimiter; the input is unusable from here on
    MissingDelimiter { line: String },
    InvalidJson {
        payload: String,
        source: serde_json::Error,
    },
    NotAnObject { kind: &'static str },
}

impl RecordError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecordError::MissingDelimiter { .. })
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingDelimiter { line } => {
                write!(f, "no delimiter in line: '{}'", line)
            }
            RecordError::InvalidJson { payload, source } => {
                write!(f, "couldn't parse JSON object '{}': {}", payload, source)
            }
            RecordError::NotAnObject { kind } => {
                write!(f, "payload is a JSON {}, expected an object", kind)
            }
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecordError::InvalidJson { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Split at the first occurrence of `delimiter`; the payload may contain it, the key may not.
pub fn split_record_line<'a>(line: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    line.split_once(delimiter)
}

impl Record {
    pub fn parse(line: &str, delimiter: &str) -> Result<Self, RecordError> {
        let (key, payload) =
            split_record_line(line, delimiter).ok_or_else(|| RecordError::MissingDelimiter {
                line: line.to_string(),
            })?;

        let value: Value =
            serde_json::from_str(payload).map_err(|source| RecordError::InvalidJson {
                payload: payload.to_string(),
                source,
            })?;

        match value {
            Value::Object(payload) => Ok(Self {
                key: key.to_string(),
                payload,
            }),
            other => Err(RecordError::NotAnObject {
                kind: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tab_delimited_record() {
        let record = Record::parse("foo\t{\"chips\": 1, \"frugal\": false}", "\t").unwrap();
        assert_eq!(record.key, "foo");
        assert_eq!(record.payload["chips"], Value::UnsignedInt(1));
        assert_eq!(record.payload["frugal"], Value::Bool(false));
    }

    #[test]
    fn test_split_only_at_first_delimiter() {
        let record = Record::parse("k|{\"note\": \"a|b\"}", "|").unwrap();
        assert_eq!(record.key, "k");
        assert_eq!(record.payload["note"], Value::String("a|b".into()));

        assert_eq!(split_record_line("a::b::c", "::"), Some(("a", "b::c")));
        assert_eq!(split_record_line("\t{}", "\t"), Some(("", "{}")));
    }

    #[test]
    fn test_missing_delimiter_is_fatal() {
        let err = Record::parse("foo {\"a\": 1}", "\t").unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, RecordError::MissingDelimiter { ref line } if line == "foo {\"a\": 1}"));

        assert!(Record::parse("", "\t").unwrap_err().is_fatal());
    }

    #[test]
    fn test_malformed_payload_is_recoverable() {
        let err = Record::parse("foo\t{\"invalid\": \"json", "\t").unwrap_err();
        assert!(matches!(err, RecordError::InvalidJson { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_non_object_payload_rejected() {
        for (payload, kind) in [("[1, 2]", "array"), ("5", "unsigned integer"), ("null", "null"), ("\"s\"", "string")] {
            let err = Record::parse(&format!("foo\t{}", payload), "\t").unwrap_err();
            assert!(!err.is_fatal());
            assert!(matches!(err, RecordError::NotAnObject { kind: k } if k == kind));
        }
    }
}
