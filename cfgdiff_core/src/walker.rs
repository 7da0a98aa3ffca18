use crate::file_compare::FileComparator;
use crate::hash_cache::HashCache;
use crate::report::{FileReportSink, ReportSink};
use cfgdiff_common::{report_path_for, AppConfig, CfgDiffError, ComparisonTarget, Side};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::{Parallelism, WalkDir};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Everything one directory comparison found, keyed by path relative to
/// the roots.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WalkState {
    /// Paths present on one side only, with the side they are missing from
    pub missing: BTreeMap<PathBuf, Side>,
    /// Paths that are a file on one side and a directory on the other
    pub wrong_type: BTreeSet<PathBuf>,
    /// Files present on both sides whose bytes differ
    pub content_different: BTreeSet<PathBuf>,
    /// Pairs that could not be compared, with the reason
    pub failures: BTreeMap<PathBuf, String>,
}

/// Counts reported at the end of a walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    pub missing: usize,
    pub wrong_type: usize,
    pub content_different: usize,
    pub failures: usize,
}

impl WalkState {
    pub fn summary(&self) -> WalkSummary {
        WalkSummary {
            missing: self.missing.len(),
            wrong_type: self.wrong_type.len(),
            content_different: self.content_different.len(),
            failures: self.failures.len(),
        }
    }

    /// No differences and no failures
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.wrong_type.is_empty()
            && self.content_different.is_empty()
            && self.failures.is_empty()
    }

    /// Paths missing from `side`
    pub fn missing_from(&self, side: Side) -> impl Iterator<Item = &PathBuf> {
        self.missing
            .iter()
            .filter(move |(_, s)| **s == side)
            .map(|(path, _)| path)
    }

    /// Whether an ancestor of `path` is already classified, which makes
    /// the classification of `path` itself redundant.
    fn covered_by_parent(&self, path: &Path) -> bool {
        path.ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.missing.contains_key(p) || self.wrong_type.contains(p))
    }
}

/// What a path resolves to. Both sides of a pair are classified with the
/// same rule: symlinks are followed, and a link whose target does not
/// exist is kept apart instead of being treated as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryKind {
    File,
    Dir,
    Dangling(PathBuf),
}

/// `Ok(None)` when nothing exists at `path`, not even a symlink.
fn entry_kind(path: &Path) -> std::io::Result<Option<EntryKind>> {
    let link_metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Dir)),
        Ok(_) => Ok(Some(EntryKind::File)),
        Err(e) if e.kind() == ErrorKind::NotFound && link_metadata.file_type().is_symlink() => {
            Ok(Some(EntryKind::Dangling(fs::read_link(path)?)))
        }
        Err(e) => Err(e),
    }
}

/// Pairs files across two roots by relative path and compares each pair.
pub struct DirectoryWalker {
    config: AppConfig,
    ignore: Option<Gitignore>,
    comparator: FileComparator,
    hashes: HashCache,
    sink: Box<dyn ReportSink>,
    report_dir: PathBuf,
}

impl DirectoryWalker {
    pub fn new(config: AppConfig) -> Self {
        let ignore = Self::build_custom_ignore(&config);
        let comparator = FileComparator::new().with_format(config.format_override);
        let report_dir = config.report_dir_or_default();
        Self {
            config,
            ignore,
            comparator,
            hashes: HashCache::in_memory(),
            sink: Box::new(FileReportSink),
            report_dir,
        }
    }

    pub fn with_comparator(mut self, comparator: FileComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_hash_cache(mut self, hashes: HashCache) -> Self {
        self.hashes = hashes;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_report_dir(mut self, report_dir: PathBuf) -> Self {
        self.report_dir = report_dir;
        self
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn persist_cache(&self) -> Result<(), CfgDiffError> {
        self.hashes.persist()
    }

    /// Build a Gitignore from custom ignore patterns in config
    fn build_custom_ignore(config: &AppConfig) -> Option<Gitignore> {
        if config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in &config.ignore_patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                warn!("Failed to add ignore pattern '{}': {}", pattern, err);
            }
        }

        match builder.build() {
            Ok(ignore) => Some(ignore),
            Err(e) => {
                warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Compare `origin` against `destination`, then (unless disabled in the
    /// config) `destination` against `origin`, into one state.
    pub fn process_directories(
        &self,
        origin: &Path,
        destination: &Path,
    ) -> Result<WalkState, CfgDiffError> {
        self.process_directories_with_cancel(origin, destination, None)
    }

    pub fn process_directories_with_cancel(
        &self,
        origin: &Path,
        destination: &Path,
        cancel: Option<&AtomicBool>,
    ) -> Result<WalkState, CfgDiffError> {
        for root in [origin, destination] {
            if !root.is_dir() {
                return Err(CfgDiffError::Path(format!(
                    "Not a directory: {}",
                    root.display()
                )));
            }
        }

        info!("Start processing {} and {}", origin.display(), destination.display());

        let mut state = WalkState::default();
        self.walk(origin, destination, Side::Origin, &mut state, cancel)?;
        if self.config.reverse {
            self.walk(destination, origin, Side::Destination, &mut state, cancel)?;
        }

        let summary = state.summary();
        info!(
            "Missing: {}, wrong type: {}, different: {}, failed: {}",
            summary.missing, summary.wrong_type, summary.content_different, summary.failures
        );
        Ok(state)
    }

    /// One direction: every entry under `primary` is looked up under
    /// `secondary`. `primary_side` says which root `primary` is.
    pub fn walk(
        &self,
        primary: &Path,
        secondary: &Path,
        primary_side: Side,
        state: &mut WalkState,
        cancel: Option<&AtomicBool>,
    ) -> Result<(), CfgDiffError> {
        let walker = WalkDir::new(primary)
            .parallelism(Parallelism::Serial)
            .sort(true)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(false);

        for entry in walker {
            if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                return Err(CfgDiffError::Walk("cancelled".to_string()));
            }

            let entry = entry.map_err(|e| CfgDiffError::Walk(e.to_string()))?;
            let path = entry.path();
            let relative = path
                .strip_prefix(primary)
                .map_err(|e| CfgDiffError::Path(e.to_string()))?
                .to_path_buf();

            // Skip the synthetic root entry (empty path)
            if relative.as_os_str().is_empty() {
                continue;
            }

            let kind = match entry_kind(&path) {
                Ok(Some(kind)) => kind,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Cannot stat {:?}: {}", path, e);
                    state.failures.insert(relative, e.to_string());
                    continue;
                }
            };

            let is_dir = kind == EntryKind::Dir;
            if self.should_ignore_with_parents(&relative, is_dir) || state.covered_by_parent(&relative) {
                continue;
            }

            let counterpart = secondary.join(&relative);
            let counterpart_kind = match entry_kind(&counterpart) {
                Ok(Some(kind)) => kind,
                Ok(None) => {
                    debug!("{:?} missing from {}", relative, primary_side.other());
                    state.missing.entry(relative).or_insert(primary_side.other());
                    continue;
                }
                Err(e) => {
                    warn!("Cannot stat {:?}: {}", counterpart, e);
                    state.failures.insert(relative, e.to_string());
                    continue;
                }
            };

            match (kind, counterpart_kind) {
                (EntryKind::File, EntryKind::File) => {}
                (EntryKind::Dir, EntryKind::Dir) => continue,
                (EntryKind::Dir, EntryKind::File) | (EntryKind::File, EntryKind::Dir) => {
                    state.wrong_type.insert(relative);
                    continue;
                }
                (EntryKind::Dangling(a), EntryKind::Dangling(b)) => {
                    if a != b {
                        state.failures.insert(
                            relative,
                            format!("dangling symlinks point to {:?} and {:?}", a, b),
                        );
                    }
                    continue;
                }
                (EntryKind::Dangling(_), _) | (_, EntryKind::Dangling(_)) => {
                    state
                        .failures
                        .insert(relative, "dangling symlink on one side".to_string());
                    continue;
                }
            }
            if state.content_different.contains(&relative) {
                continue;
            }

            let target = match primary_side {
                Side::Origin => ComparisonTarget::new(path, counterpart),
                Side::Destination => ComparisonTarget::new(counterpart, path),
            };
            self.compare_pair(&relative, &target, state);
        }

        Ok(())
    }

    fn compare_pair(&self, relative: &Path, target: &ComparisonTarget, state: &mut WalkState) {
        match self.hashes.files_equal(&target.origin, &target.destination) {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                warn!("Cannot read {:?}: {}", relative, e);
                state.failures.insert(relative.to_path_buf(), e.to_string());
                return;
            }
        }

        state.content_different.insert(relative.to_path_buf());

        let output = report_path_for(&self.report_dir, relative);
        match self.comparator.compare_and_write(target, self.sink.as_ref(), &output) {
            Ok(comparison) => debug!(
                "{:?}: {} report entries via {:?} differ",
                relative,
                comparison.report.len(),
                comparison.differ
            ),
            Err(e) => {
                warn!("Comparison of {:?} failed: {}", relative, e);
                state.failures.insert(relative.to_path_buf(), e.to_string());
            }
        }
    }

    /// Check if a path or any of its parent directories should be ignored
    fn should_ignore_with_parents(&self, path: &Path, is_dir: bool) -> bool {
        let Some(ref ignore) = self.ignore else {
            return false;
        };
        if ignore.matched(path, is_dir).is_ignore() {
            return true;
        }
        path.ancestors()
            .skip(1)
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| ignore.matched(p, true).is_ignore())
    }
}
