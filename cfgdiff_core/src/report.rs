use cfgdiff_common::{CfgDiffError, ComparisonTarget};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Destination for finished reports
pub trait ReportSink {
    /// Persist `lines` at `destination`, replacing any existing file.
    fn write(&self, lines: &[String], destination: &Path) -> Result<(), CfgDiffError>;
}

/// Writes reports to the local filesystem.
///
/// Parent directories are created as needed and entries are concatenated
/// as-is; every entry already ends with its own newline.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileReportSink;

impl ReportSink for FileReportSink {
    fn write(&self, lines: &[String], destination: &Path) -> Result<(), CfgDiffError> {
        let to_write_error = |source| CfgDiffError::Write {
            path: destination.to_path_buf(),
            source,
        };

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(to_write_error)?;
            }
        }
        fs::write(destination, lines.concat()).map_err(to_write_error)?;

        debug!("Wrote {} report entries to {:?}", lines.len(), destination);
        Ok(())
    }
}

/// Side channel notified of every difference as it is reported.
///
/// Observers never influence report content.
pub trait DiffObserver {
    fn on_difference(&self, target: &ComparisonTarget, line: &str);
}

/// Logs every difference through `tracing` at warn level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl DiffObserver for TracingObserver {
    fn on_difference(&self, target: &ComparisonTarget, line: &str) {
        warn!(
            origin = %target.origin.display(),
            destination = %target.destination.display(),
            "Difference detected: {}",
            line.trim_end()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parents_and_concatenates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/report.diff");
        let lines = vec!["header\n".to_string(), "[db]\n-x=1\n".to_string()];

        FileReportSink.write(&lines, &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "header\n[db]\n-x=1\n");
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("report.diff");
        fs::write(&path, "stale content that is longer\n").unwrap();

        FileReportSink.write(&["fresh\n".to_string()], &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_write_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let err = FileReportSink
            .write(&["x\n".to_string()], &blocker.join("report.diff"))
            .unwrap_err();
        assert!(matches!(err, CfgDiffError::Write { .. }));
    }
}
