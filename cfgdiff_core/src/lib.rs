pub mod sniffer;
pub mod line_diff;
pub mod ini_diff;
pub mod structured_diff;
pub mod report;
pub mod hash_cache;
pub mod file_compare;
pub mod walker;

pub use sniffer::{format_from_extension, sniff};
pub use line_diff::compare_lines;
pub use ini_diff::{compare_ini, compare_ini_str, IniDocument, DEFAULT_SECTION};
pub use structured_diff::{compare_json, compare_json_str, compare_yaml, compare_yaml_str};
pub use report::{DiffObserver, FileReportSink, ReportSink, TracingObserver};
pub use hash_cache::HashCache;
pub use file_compare::{Differ, FileComparator, FileComparison};
pub use walker::{DirectoryWalker, WalkState, WalkSummary};
