use crate::{Error, Version};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Earlier,
    EarlierOrEqual,
    Exactly,
    LaterOrEqual,
    Later,
}

impl Relation {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "<<" => Some(Relation::Earlier),
            "<=" | "<" => Some(Relation::EarlierOrEqual),
            "=" => Some(Relation::Exactly),
            ">=" | ">" => Some(Relation::LaterOrEqual),
            ">>" => Some(Relation::Later),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Earlier => "<<",
            Relation::EarlierOrEqual => "<=",
            Relation::Exactly => "=",
            Relation::LaterOrEqual => ">=",
            Relation::Later => ">>",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub relation: Relation,
    pub version: Version,
}

impl Constraint {
    pub fn matches(&self, candidate: &Version) -> bool {
        match self.relation {
            Relation::Earlier => candidate < &self.version,
            Relation::EarlierOrEqual => candidate <= &self.version,
            Relation::Exactly => candidate == &self.version,
            Relation::LaterOrEqual => candidate >= &self.version,
            Relation::Later => candidate > &self.version,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.relation.symbol(), self.version)
    }
}

/// One package reference inside a dependency field, e.g. `libc6:any (>= 2.34)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub name: String,
    pub arch_qualifier: Option<String>,
    pub constraint: Option<Constraint>,
}

impl Alternative {
    pub fn accepts(&self, candidate: &Version) -> bool {
        self.constraint
            .as_ref()
            .map(|c| c.matches(candidate))
            .unwrap_or(true)
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(arch) = &self.arch_qualifier {
            write!(f, ":{}", arch)?;
        }
        if let Some(constraint) = &self.constraint {
            write!(f, " ({})", constraint)?;
        }
        Ok(())
    }
}

/// A comma-separated entry of a dependency field: any one alternative
/// satisfies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    pub alternatives: Vec<Alternative>,
}

impl fmt::Display for DependencyGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, alternative) in self.alternatives.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}", alternative)?;
        }
        Ok(())
    }
}

pub fn parse_dependencies(field: &str) -> Result<Vec<DependencyGroup>, Error> {
    let mut groups = Vec::new();

    for entry in field.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let mut alternatives = Vec::new();
        for part in entry.split('|') {
            let part = strip_restrictions(part.trim());
            if part.is_empty() {
                continue;
            }
            alternatives.push(parse_alternative(field, &part)?);
        }

        if !alternatives.is_empty() {
            groups.push(DependencyGroup { alternatives });
        }
    }

    Ok(groups)
}

fn parse_alternative(field: &str, part: &str) -> Result<Alternative, Error> {
    let (head, constraint) = match part.find('(') {
        Some(open) => {
            let close = part[open..].find(')').map(|c| open + c).ok_or_else(|| {
                Error::new(field.to_string(), "unterminated version constraint".into())
            })?;
            let inner = part[open + 1..close].trim();
            (part[..open].trim(), Some(parse_constraint(field, inner)?))
        }
        None => (part.trim(), None),
    };

    if head.is_empty() || head.chars().any(char::is_whitespace) {
        return Err(Error::new(
            field.to_string(),
            format!("invalid package reference '{}'", part),
        ));
    }

    let (name, arch_qualifier) = match head.split_once(':') {
        Some((name, arch)) => (name, Some(arch.to_string())),
        None => (head, None),
    };

    Ok(Alternative {
        name: name.to_string(),
        arch_qualifier,
        constraint,
    })
}

fn parse_constraint(field: &str, inner: &str) -> Result<Constraint, Error> {
    let split = inner
        .find(|c: char| !matches!(c, '<' | '>' | '='))
        .unwrap_or(inner.len());
    let (symbol, version) = inner.split_at(split);

    let relation = Relation::parse(symbol.trim()).ok_or_else(|| {
        Error::new(
            field.to_string(),
            format!("unknown relation '{}'", symbol.trim()),
        )
    })?;
    let version = Version::parse(version.trim())?;

    Ok(Constraint { relation, version })
}

// Drops `[arch ...]` and `<profile>` restrictions, which only appear in
// source stanzas.
fn strip_restrictions(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    let mut in_constraint = false;
    let mut closing: Option<char> = None;

    for c in part.chars() {
        if let Some(end) = closing {
            if c == end {
                closing = None;
            }
            continue;
        }

        match c {
            '(' => {
                in_constraint = true;
                out.push(c);
            }
            ')' => {
                in_constraint = false;
                out.push(c);
            }
            '[' if !in_constraint => closing = Some(']'),
            '<' if !in_constraint => closing = Some('>'),
            _ => out.push(c),
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups_and_alternatives() {
        let groups =
            parse_dependencies("libc6 (>= 2.34), libfoo1 | libbar1 (<< 2), python3:any").unwrap();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].alternatives[0].name, "libc6");
        assert_eq!(
            groups[0].alternatives[0].constraint.as_ref().unwrap().relation,
            Relation::LaterOrEqual
        );
        assert_eq!(groups[1].alternatives.len(), 2);
        assert_eq!(groups[1].to_string(), "libfoo1 | libbar1 (<< 2)");
        assert_eq!(groups[2].alternatives[0].name, "python3");
        assert_eq!(
            groups[2].alternatives[0].arch_qualifier.as_deref(),
            Some("any")
        );
    }

    #[test]
    fn tolerates_compact_constraints() {
        let groups = parse_dependencies("perl (>=5.10)").unwrap();
        let constraint = groups[0].alternatives[0].constraint.clone().unwrap();
        assert_eq!(constraint.relation, Relation::LaterOrEqual);
        assert_eq!(constraint.version.as_str(), "5.10");
    }

    #[test]
    fn constraint_matching_follows_debian_order() {
        let groups = parse_dependencies("foo (<< 1.0)").unwrap();
        let alternative = &groups[0].alternatives[0];
        assert!(alternative.accepts(&Version::parse("1.0~rc1").unwrap()));
        assert!(!alternative.accepts(&Version::parse("1.0").unwrap()));
    }

    #[test]
    fn strips_architecture_and_profile_restrictions() {
        let groups = parse_dependencies("debhelper (>= 13) [linux-any] <!nocheck>").unwrap();
        assert_eq!(groups[0].alternatives[0].name, "debhelper");
        assert!(groups[0].alternatives[0].constraint.is_some());
    }

    #[test]
    fn rejects_unknown_relation() {
        assert!(parse_dependencies("foo (~= 1)").is_err());
        assert!(parse_dependencies("foo (>= 1").is_err());
    }

    #[test]
    fn empty_field_has_no_groups() {
        assert!(parse_dependencies("  ").unwrap().is_empty());
    }
}
