use cfgdiff_common::{CfgDiffError, ComparisonTarget, ConfigFormat, DiffReport, Result};
use indexmap::IndexMap;
use tracing::debug;

/// Keys that appear before the first section header live here.
pub const DEFAULT_SECTION: &str = "DEFAULT";

type Section = IndexMap<String, String>;

/// A parsed INI document: section name -> key -> value, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniDocument {
    sections: IndexMap<String, Section>,
}

impl IniDocument {
    /// Parse INI text.
    ///
    /// Accepts `key=value` and `key: value`, `#` and `;` comments, and
    /// merges repeated sections. A later duplicate key overwrites the value
    /// but keeps the position of the first occurrence.
    pub fn parse(content: &str) -> Result<Self> {
        let mut sections: IndexMap<String, Section> = IndexMap::new();
        sections.insert(DEFAULT_SECTION.to_string(), Section::new());
        let mut current = DEFAULT_SECTION.to_string();

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let name = rest.strip_suffix(']').ok_or_else(|| {
                    CfgDiffError::parse(
                        ConfigFormat::Ini,
                        format!("unclosed section header at line {}: {}", line_no, line),
                    )
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(CfgDiffError::parse(
                        ConfigFormat::Ini,
                        format!("empty section name at line {}", line_no),
                    ));
                }
                sections.entry(name.to_string()).or_default();
                current = name.to_string();
                continue;
            }

            let delimiter = line.find(|c: char| c == '=' || c == ':').ok_or_else(|| {
                CfgDiffError::parse(
                    ConfigFormat::Ini,
                    format!("key-value delimiter not found at line {}: {}", line_no, line),
                )
            })?;
            let key = line[..delimiter].trim();
            if key.is_empty() {
                return Err(CfgDiffError::parse(
                    ConfigFormat::Ini,
                    format!("empty key name at line {}", line_no),
                ));
            }
            let value = unquote(line[delimiter + 1..].trim());

            sections
                .entry(current.clone())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }

        debug!("Parsed INI document with {} sections", sections.len());
        Ok(Self { sections })
    }

    pub fn section(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&String, &IndexMap<String, String>)> {
        self.sections.iter()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Parse both sides and compare them. A malformed document on either side
/// is a `Parse` error; the file comparator falls back to the line differ.
pub fn compare_ini_str(
    target: &ComparisonTarget,
    origin: &str,
    destination: &str,
) -> Result<DiffReport> {
    let origin = IniDocument::parse(origin)?;
    let destination = IniDocument::parse(destination)?;
    Ok(compare_ini(target, &origin, &destination))
}

/// Section/key comparison, run with each side as primary in turn.
///
/// The two passes are concatenated with duplicates suppressed, so a key
/// missing from one side is reported once while a changed value shows up
/// from both points of view.
pub fn compare_ini(
    target: &ComparisonTarget,
    origin: &IniDocument,
    destination: &IniDocument,
) -> DiffReport {
    let forward = diff_pass(origin, destination);
    let backward = diff_pass(destination, origin);
    forward.merge(backward).with_header(target)
}

/// One direction of the comparison with `primary` as the authoritative side.
fn diff_pass(primary: &IniDocument, secondary: &IniDocument) -> DiffReport {
    let mut report = DiffReport::new();

    for (name, keys) in primary.sections() {
        let Some(counterpart) = secondary.section(name) else {
            report.push(format!("-[{}]\n", name));
            continue;
        };

        // The section header is printed once, in front of the first
        // difference found in that section.
        let mut header_emitted = false;
        let mut emit = |report: &mut DiffReport, body: String| {
            let entry = if header_emitted {
                body
            } else {
                format!("[{}]\n{}", name, body)
            };
            header_emitted = true;
            report.push(entry);
        };

        for (key, value) in keys {
            match counterpart.get(key) {
                None => emit(&mut report, format!("-{}={}\n", key, value)),
                Some(other) if other != value => emit(
                    &mut report,
                    format!("+{}={}\n-{}={}\n", key, value, key, other),
                ),
                Some(_) => {}
            }
        }

        for (key, value) in counterpart {
            if !keys.contains_key(key) {
                emit(&mut report, format!("-{}={}\n", key, value));
            }
        }
    }

    report
}
