use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

/// A pair of filesystem locations to compare
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonTarget {
    pub origin: PathBuf,
    pub destination: PathBuf,
}

impl ComparisonTarget {
    pub fn new(origin: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }

    /// The same pair with origin and destination swapped
    pub fn reversed(&self) -> Self {
        Self {
            origin: self.destination.clone(),
            destination: self.origin.clone(),
        }
    }

    /// Header entry that opens every non-empty report for this pair
    pub fn header(&self) -> String {
        format!(
            "Source file path: {}, difference with: {}\n",
            self.origin.display(),
            self.destination.display()
        )
    }
}

/// Detected (or forced) configuration format of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Ini,
    Yaml,
    Json,
    /// Plain text; only the line differ applies
    Unknown,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigFormat::Ini => "INI",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
            ConfigFormat::Unknown => "plain text",
        };
        f.write_str(name)
    }
}

impl FromStr for ConfigFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ini" => Ok(ConfigFormat::Ini),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "json" => Ok(ConfigFormat::Json),
            "text" | "plain" | "unknown" => Ok(ConfigFormat::Unknown),
            other => Err(format!(
                "unknown format '{}' (expected ini, yaml, json or text)",
                other
            )),
        }
    }
}

/// Ordered, append-only, duplicate-free list of report entries.
///
/// Each entry carries its own trailing newline; an INI section miss is a
/// single multi-line entry such as `"[db]\n-host=x\n"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    lines: Vec<String>,
}

impl DiffReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry unless an identical one is already present.
    /// Returns whether the entry was inserted.
    pub fn push(&mut self, line: impl Into<String>) -> bool {
        let line = line.into();
        if self.lines.contains(&line) {
            return false;
        }
        self.lines.push(line);
        true
    }

    pub fn extend<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for line in lines {
            self.push(line);
        }
    }

    /// Concatenate `other` after `self`, keeping the no-duplicate invariant
    pub fn merge(mut self, other: DiffReport) -> DiffReport {
        self.extend(other.lines);
        self
    }

    /// Prepend the pair header when the report is non-empty
    pub fn with_header(self, target: &ComparisonTarget) -> DiffReport {
        if self.lines.is_empty() {
            return self;
        }
        let mut lines = Vec::with_capacity(self.lines.len() + 1);
        lines.push(target.header());
        lines.extend(self.lines.into_iter().filter(|l| *l != target.header()));
        DiffReport { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Entries joined with no separator, as the report sink writes them
    pub fn render(&self) -> String {
        self.lines.concat()
    }
}

/// Which root of a comparison a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Origin,
    Destination,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Origin => Side::Destination,
            Side::Destination => Side::Origin,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Origin => f.write_str("origin"),
            Side::Destination => f.write_str("destination"),
        }
    }
}

/// Cache key for file hashing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub path: PathBuf,
    pub modified: SystemTime,
    pub size: u64,
}

/// BLAKE3 hash value (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<blake3::Hash> for Blake3Hash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ignore patterns (e.g., "*.pyc", "logs/")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Whether to follow symbolic links
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Also walk destination against origin to find destination-only files
    #[serde(default = "default_reverse")]
    pub reverse: bool,

    /// Where directory walks write per-file reports
    #[serde(default)]
    pub report_dir: Option<PathBuf>,

    /// Persist file hashes here between runs
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Skip sniffing and treat every file as this format
    #[serde(default)]
    pub format_override: Option<ConfigFormat>,
}

fn default_reverse() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
            reverse: default_reverse(),
            report_dir: None,
            cache_dir: None,
            format_override: None,
        }
    }
}

impl AppConfig {
    pub fn report_dir_or_default(&self) -> PathBuf {
        self.report_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("cfgdiff"))
    }
}

/// Where a directory walk writes the report of a content-different pair
pub fn report_path_for(report_dir: &Path, relative: &Path) -> PathBuf {
    let mut name = relative.as_os_str().to_os_string();
    name.push(".diff");
    report_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_suppresses_duplicates() {
        let mut report = DiffReport::new();
        assert!(report.push("-[db]\n"));
        assert!(!report.push("-[db]\n"));
        assert!(report.push("+a\n"));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_merge_keeps_order_and_dedups() {
        let mut first = DiffReport::new();
        first.extend(["+a\n", "-b\n"]);
        let mut second = DiffReport::new();
        second.extend(["-b\n", "+c\n"]);

        let merged = first.merge(second);
        assert_eq!(merged.lines(), ["+a\n", "-b\n", "+c\n"]);
    }

    #[test]
    fn test_header_only_when_non_empty() {
        let target = ComparisonTarget::new("a.conf", "b.conf");
        assert!(DiffReport::new().with_header(&target).is_empty());

        let mut report = DiffReport::new();
        report.push("+x\n");
        let report = report.with_header(&target);
        assert_eq!(
            report.lines()[0],
            "Source file path: a.conf, difference with: b.conf\n"
        );
        assert_eq!(report.render(), format!("{}+x\n", target.header()));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("INI".parse::<ConfigFormat>(), Ok(ConfigFormat::Ini));
        assert_eq!("yml".parse::<ConfigFormat>(), Ok(ConfigFormat::Yaml));
        assert_eq!("json".parse::<ConfigFormat>(), Ok(ConfigFormat::Json));
        assert_eq!("text".parse::<ConfigFormat>(), Ok(ConfigFormat::Unknown));
        assert!("toml".parse::<ConfigFormat>().is_err());
    }

    #[test]
    fn test_report_path_for() {
        let path = report_path_for(Path::new("/tmp/out"), Path::new("nova/nova.conf"));
        assert_eq!(path, PathBuf::from("/tmp/out/nova/nova.conf.diff"));
    }

    #[test]
    fn test_default_config_walks_both_directions() {
        assert!(AppConfig::default().reverse);
        let parsed: AppConfig = toml::from_str("follow_symlinks = true").unwrap();
        assert!(parsed.reverse);
        assert!(parsed.follow_symlinks);
    }
}
