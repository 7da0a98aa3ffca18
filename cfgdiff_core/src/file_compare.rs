use crate::ini_diff::compare_ini_str;
use crate::line_diff::compare_lines;
use crate::report::{DiffObserver, ReportSink};
use crate::sniffer::{format_from_extension, sniff};
use crate::structured_diff::{compare_json_str, compare_yaml_str};
use cfgdiff_common::{CfgDiffError, ComparisonTarget, ConfigFormat, DiffReport};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Which differ produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Differ {
    Ini,
    Json,
    Yaml,
    Lines,
}

/// A finished comparison of one file pair
#[derive(Debug, Clone, Serialize)]
pub struct FileComparison {
    pub report: DiffReport,
    pub differ: Differ,
    /// Set when a structured differ failed to parse and the line differ ran instead
    pub fell_back: bool,
}

/// Compares one file pair with the best differ for its format.
///
/// Both files are sniffed; when they agree on a structured format that
/// format's differ runs, otherwise the line differ does. A parse failure in
/// a structured differ degrades to the line differ instead of failing.
#[derive(Default)]
pub struct FileComparator {
    format_override: Option<ConfigFormat>,
    extension_hint: bool,
    observer: Option<Box<dyn DiffObserver>>,
}

impl FileComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip sniffing and parse both sides as `format`
    pub fn with_format(mut self, format: Option<ConfigFormat>) -> Self {
        self.format_override = format;
        self
    }

    /// When both file names imply the same format, use it instead of
    /// sniffing. An explicit format still wins.
    pub fn with_extension_hint(mut self, enabled: bool) -> Self {
        self.extension_hint = enabled;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn DiffObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Read and compare a pair. Fails only when either side cannot be read.
    pub fn compare(&self, target: &ComparisonTarget) -> Result<FileComparison, CfgDiffError> {
        let origin = read_target(&target.origin)?;
        let destination = read_target(&target.destination)?;
        Ok(self.compare_contents(target, &origin, &destination))
    }

    /// Compare a pair and hand a non-empty report to `sink` at `output`
    pub fn compare_and_write(
        &self,
        target: &ComparisonTarget,
        sink: &dyn ReportSink,
        output: &Path,
    ) -> Result<FileComparison, CfgDiffError> {
        let comparison = self.compare(target)?;
        if !comparison.report.is_empty() {
            sink.write(comparison.report.lines(), output)?;
        }
        Ok(comparison)
    }

    /// Compare already-loaded contents; `target` only labels the report.
    pub fn compare_contents(
        &self,
        target: &ComparisonTarget,
        origin: &[u8],
        destination: &[u8],
    ) -> FileComparison {
        let format = match self.format_override.or_else(|| self.format_from_names(target)) {
            Some(format) => format,
            None => {
                let origin_format = sniff(origin);
                let destination_format = sniff(destination);
                if origin_format == destination_format {
                    origin_format
                } else {
                    debug!(
                        "Formats disagree ({} vs {}) for {:?}",
                        origin_format, destination_format, target.origin
                    );
                    ConfigFormat::Unknown
                }
            }
        };

        let origin_text = String::from_utf8_lossy(origin);
        let destination_text = String::from_utf8_lossy(destination);

        let structured = match format {
            ConfigFormat::Ini => Some((Differ::Ini, compare_ini_str(target, &origin_text, &destination_text))),
            ConfigFormat::Json => Some((Differ::Json, compare_json_str(target, &origin_text, &destination_text))),
            ConfigFormat::Yaml => Some((Differ::Yaml, compare_yaml_str(target, &origin_text, &destination_text))),
            ConfigFormat::Unknown => None,
        };

        let comparison = match structured {
            Some((differ, Ok(report))) => FileComparison {
                report,
                differ,
                fell_back: false,
            },
            Some((differ, Err(e))) => {
                warn!(
                    "{:?} differ failed for {:?}, falling back to line comparison: {}",
                    differ, target.origin, e
                );
                FileComparison {
                    report: compare_lines(target, &origin_text, &destination_text),
                    differ: Differ::Lines,
                    fell_back: true,
                }
            }
            None => FileComparison {
                report: compare_lines(target, &origin_text, &destination_text),
                differ: Differ::Lines,
                fell_back: false,
            },
        };

        self.notify(target, &comparison.report);
        comparison
    }

    fn format_from_names(&self, target: &ComparisonTarget) -> Option<ConfigFormat> {
        if !self.extension_hint {
            return None;
        }
        match (
            format_from_extension(&target.origin),
            format_from_extension(&target.destination),
        ) {
            (Some(origin), Some(destination)) if origin == destination => Some(origin),
            _ => None,
        }
    }

    fn notify(&self, target: &ComparisonTarget, report: &DiffReport) {
        let Some(observer) = &self.observer else {
            return;
        };
        // The first entry is the header.
        for line in report.iter().skip(1) {
            observer.on_difference(target, line);
        }
    }
}

fn read_target(path: &Path) -> Result<Vec<u8>, CfgDiffError> {
    fs::read(path).map_err(|source| CfgDiffError::Read {
        path: path.to_path_buf(),
        source,
    })
}
