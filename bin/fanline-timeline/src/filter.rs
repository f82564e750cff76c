//! Timeline id allowlist.
//!
//! The firehose carries every post in the system; a node run with a filter
//! only stores posts for the listed timelines and acknowledges the rest
//! without writing them. One decimal id per line, `#` starts a comment.

use fanline_common::{Error, Result, TimelineId};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug)]
pub struct TimelineFilter {
    ids: HashSet<TimelineId>,
}

impl TimelineFilter {
    /// Parse the filter file. An unreadable file or one with no ids is a
    /// startup error: a node filtered down to nothing is a misconfiguration.
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read filter {}: {e}", path.display()))
        })?;
        Self::parse_str(&raw)
    }

    fn parse_str(raw: &str) -> Result<Self> {
        let mut ids = HashSet::new();
        for (number, line) in raw.lines().enumerate() {
            let line = line.split('#').next().unwrap_or(line).trim();
            if line.is_empty() {
                continue;
            }
            let id: TimelineId = line.parse().map_err(|_| {
                Error::configuration(format!(
                    "filter line {}: not a timeline id: {line}",
                    number + 1
                ))
            })?;
            ids.insert(id);
        }
        if ids.is_empty() {
            return Err(Error::configuration("filter file contains no timeline ids"));
        }
        Ok(Self { ids })
    }

    pub fn contains(&self, id: TimelineId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_ids_comments_and_blanks() {
        let filter = TimelineFilter::parse_str("5\n\n# full line comment\n7 # trailing\n  42\n")
            .unwrap();
        assert_eq!(filter.len(), 3);
        assert!(filter.contains(5));
        assert!(filter.contains(7));
        assert!(filter.contains(42));
        assert!(!filter.contains(6));
    }

    #[test]
    fn test_parse_rejects_garbage_line() {
        let err = TimelineFilter::parse_str("5\nnot-a-number\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_parse_rejects_empty_filter() {
        let err = TimelineFilter::parse_str("# only comments\n\n").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_parse_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "11\n12").unwrap();
        let filter = TimelineFilter::parse(file.path()).unwrap();
        assert!(filter.contains(11));
        assert!(filter.contains(12));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = TimelineFilter::parse("/nonexistent/filter.txt").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
