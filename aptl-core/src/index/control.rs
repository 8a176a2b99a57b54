use crate::{AptlError, Result};
use std::collections::BTreeMap;
use std::path::Path;

type Record = BTreeMap<String, String>;

/// One paragraph of a Debian control file (`Packages`, `status`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stanza {
    fields: Vec<(String, String)>,
    raw: String,
}

impl Stanza {
    /// Field lookup is case-insensitive, as in dpkg.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Splits `text` on blank lines and hands every paragraph to the RFC 822
/// deserializer. The paragraph text is kept verbatim for display.
pub fn parse_stanzas(path: &Path, text: &str) -> Result<Vec<Stanza>> {
    paragraphs(text)
        .into_iter()
        .map(|(line, raw)| parse_paragraph(path, line, raw))
        .collect()
}

fn parse_paragraph(path: &Path, line: usize, raw: String) -> Result<Stanza> {
    let invalid = |reason: String| AptlError::InvalidRecord {
        path: path.to_path_buf(),
        reason: format!("line {}: {}", line, reason),
    };

    if raw.starts_with([' ', '\t']) {
        return Err(invalid("continuation line without a field".to_string()));
    }

    let mut records: Vec<Record> =
        rfc822_like::from_str(&raw).map_err(|err| invalid(err.to_string()))?;

    let record = match records.len() {
        1 => records.remove(0),
        n => return Err(invalid(format!("expected one record, found {}", n))),
    };

    let fields = record
        .into_iter()
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    Ok(Stanza { fields, raw })
}

// (first line number, paragraph text) with `#` comment lines dropped.
fn paragraphs(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            out.extend(current.take());
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        match current.as_mut() {
            Some((_, raw)) => {
                raw.push('\n');
                raw.push_str(line);
            }
            None => current = Some((index + 1, line.to_string())),
        }
    }

    out.extend(current);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_paragraphs_and_keeps_continuations() {
        let text = "Package: foo\nVersion: 1.0\nDescription: short\n long line one\n .\n\n\nPackage: bar\nversion: 2\n";
        let stanzas = parse_stanzas(Path::new("Packages"), text).unwrap();

        assert_eq!(stanzas.len(), 2);
        assert_eq!(stanzas[0].get("package"), Some("foo"));
        let description = stanzas[0].get("Description").unwrap();
        assert!(description.starts_with("short"));
        assert!(description.contains("long line one"));
        assert!(stanzas[0].raw().starts_with("Package: foo\nVersion: 1.0"));
        assert!(stanzas[0].raw().ends_with(" long line one\n ."));
        assert_eq!(stanzas[1].get("Version"), Some("2"));
    }

    #[test]
    fn comment_lines_are_skipped() {
        let text = "# generated\nPackage: a\n# inline\nVersion: 1\n";
        let stanzas = parse_stanzas(Path::new("p"), text).unwrap();

        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].raw(), "Package: a\nVersion: 1");
        assert_eq!(stanzas[0].get("Version"), Some("1"));
    }

    #[test]
    fn values_may_contain_colons() {
        let stanzas = parse_stanzas(Path::new("p"), "Package: a\nVersion: 1:2.0-1\n").unwrap();
        assert_eq!(stanzas[0].get("Version"), Some("1:2.0-1"));
    }

    #[test]
    fn rejects_lines_without_field_name() {
        assert!(parse_stanzas(Path::new("p"), "Package: a\nnonsense\n").is_err());
        match parse_stanzas(Path::new("p"), " leading continuation\n") {
            Err(AptlError::InvalidRecord { reason, .. }) => assert!(reason.starts_with("line 1")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
