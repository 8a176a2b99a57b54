use crate::index::{AptCache, PackageIndex, Stanza};
use crate::specifier::PackageSpecifier;
use crate::{AptlConfig, AptlError, Result};

pub fn show(
    config: &AptlConfig,
    specifiers: &[PackageSpecifier],
    template: Option<&str>,
) -> Result<Vec<String>> {
    let mut cache = AptCache::load(config)?;
    show_packages(&mut cache, specifiers, template)
}

/// The candidate record of every specifier, raw or rendered through
/// `template`.
pub fn show_packages<I: PackageIndex>(
    index: &mut I,
    specifiers: &[PackageSpecifier],
    template: Option<&str>,
) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(specifiers.len());

    for specifier in specifiers {
        specifier.apply(index)?;

        let package = index.lookup(&specifier.name)?;
        let Some(candidate) = package.candidate() else {
            continue;
        };

        let text = match template {
            Some(template) => render_template(template, &candidate.record)?,
            None => candidate.record.raw().to_string(),
        };
        out.push(text);
    }

    Ok(out)
}

/// Expands `%(Field)s` with the record's field, `%%` to `%` and the `\n`,
/// `\t` and `\\` escapes.
pub fn render_template(template: &str, record: &Stanza) -> Result<String> {
    let invalid = |reason: &str| AptlError::InvalidTemplate {
        reason: reason.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '%' => match chars.next() {
                Some('%') => out.push('%'),
                Some('(') => {
                    let mut field = String::new();
                    loop {
                        match chars.next() {
                            Some(')') => break,
                            Some(c) => field.push(c),
                            None => return Err(invalid("unterminated field name")),
                        }
                    }

                    if chars.next() != Some('s') {
                        return Err(invalid(&format!("expected 's' after %({})", field)));
                    }

                    let value = record
                        .get(&field)
                        .ok_or(AptlError::MissingField { field })?;
                    out.push_str(value);
                }
                Some(other) => {
                    return Err(invalid(&format!("unsupported conversion '%{}'", other)));
                }
                None => return Err(invalid("trailing '%'")),
            },
            '\\' => match chars.peek() {
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('t') => {
                    chars.next();
                    out.push('\t');
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                _ => out.push('\\'),
            },
            c => out.push(c),
        }
    }

    Ok(out)
}
