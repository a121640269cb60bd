//! Evaluation requests and batch record decoding.

use serde::Deserialize;

use super::verdict::Provenance;
use crate::error::RecordError;

/// One unit of work: a candidate source and the dialect to check it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    pub dialect: String,
    pub source: String,
    pub provenance: Provenance,
}

impl EvaluationRequest {
    pub fn new(dialect: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            source: source.into(),
            provenance: Provenance::default(),
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

/// Wire shape of one JSONL record.
#[derive(Debug, Deserialize)]
struct RawRecord {
    dialect: Option<String>,
    fixed: Option<String>,
    middle: Option<String>,
    repo: Option<String>,
    path: Option<String>,
}

/// Decodes one input line into a request.
///
/// The source is the first non-empty of `fixed` and `middle`.
pub fn parse_record(line: usize, bytes: &[u8]) -> Result<EvaluationRequest, RecordError> {
    let raw: RawRecord =
        serde_json::from_slice(bytes).map_err(|e| RecordError::Decode(e.to_string()))?;

    let dialect = raw
        .dialect
        .filter(|d| !d.trim().is_empty())
        .ok_or(RecordError::MissingField("dialect"))?;

    let source = [raw.fixed, raw.middle]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .ok_or(RecordError::MissingField("fixed"))?;

    Ok(EvaluationRequest {
        dialect,
        source,
        provenance: Provenance {
            line: Some(line),
            repo: raw.repo,
            path: raw.path,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed_record() {
        let line = br#"{"dialect":"clj","fixed":"(ns a)","middle":"(ns b)","repo":"acme/tools","path":"src/a.clj"}"#;
        let request = parse_record(3, line).unwrap();

        assert_eq!(request.dialect, "clj");
        assert_eq!(request.source, "(ns a)");
        assert_eq!(request.provenance.line, Some(3));
        assert_eq!(request.provenance.repo.as_deref(), Some("acme/tools"));
        assert_eq!(request.provenance.path.as_deref(), Some("src/a.clj"));
    }

    #[test]
    fn test_middle_used_when_fixed_absent_or_empty() {
        let request = parse_record(1, br#"{"dialect":"el","middle":"(message \"hi\")"}"#).unwrap();
        assert_eq!(request.source, "(message \"hi\")");

        let request = parse_record(1, br#"{"dialect":"el","fixed":"","middle":"(x)"}"#).unwrap();
        assert_eq!(request.source, "(x)");
        assert_eq!(request.provenance.repo, None);
    }

    #[test]
    fn test_missing_source() {
        let err = parse_record(1, br#"{"dialect":"scm"}"#).unwrap_err();
        assert!(matches!(err, RecordError::MissingField("fixed")));

        let err = parse_record(1, br#"{"dialect":"scm","fixed":"","middle":""}"#).unwrap_err();
        assert!(matches!(err, RecordError::MissingField("fixed")));
    }

    #[test]
    fn test_missing_dialect() {
        let err = parse_record(1, br#"{"fixed":"(a)"}"#).unwrap_err();
        assert!(matches!(err, RecordError::MissingField("dialect")));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(parse_record(1, b"{not json"), Err(RecordError::Decode(_))));
        assert!(matches!(parse_record(1, b""), Err(RecordError::Decode(_))));
        assert!(matches!(parse_record(1, b"[1,2]"), Err(RecordError::Decode(_))));
        assert!(matches!(parse_record(1, b"\xff\xfe"), Err(RecordError::Decode(_))));
    }
}
