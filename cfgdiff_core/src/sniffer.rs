//! Lightweight format detection.
//!
//! Detection is an ordered policy, not a guarantee:
//!
//! 1. first non-whitespace byte is `[` => INI
//! 2. the whole content parses as JSON => JSON
//! 3. the whole content parses as YAML => YAML
//! 4. otherwise => plain text
//!
//! JSON is tried before YAML because every JSON document is also valid
//! YAML. A JSON array or a YAML flow sequence at the top level is therefore
//! reported as INI, and an INI file that opens with a comment or a bare key
//! is not. Callers who know the real type should pass an explicit format to
//! the file comparator instead.

use cfgdiff_common::ConfigFormat;
use std::path::Path;

/// Classify raw file content. Never fails.
pub fn sniff(content: &[u8]) -> ConfigFormat {
    if looks_like_ini(content) {
        return ConfigFormat::Ini;
    }
    if serde_json::from_slice::<serde_json::Value>(content).is_ok() {
        return ConfigFormat::Json;
    }
    if serde_yml::from_slice::<serde_yml::Value>(content).is_ok() {
        return ConfigFormat::Yaml;
    }
    ConfigFormat::Unknown
}

fn looks_like_ini(content: &[u8]) -> bool {
    content
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .map_or(false, |b| *b == b'[')
}

/// Check if a file path appears to be JSON based on extension
pub fn is_json_file(path: &Path) -> bool {
    extension_matches(path, &["json"])
}

/// Check if a file path appears to be YAML based on extension
pub fn is_yaml_file(path: &Path) -> bool {
    extension_matches(path, &["yaml", "yml"])
}

/// Check if a file path appears to be INI based on extension
pub fn is_ini_file(path: &Path) -> bool {
    extension_matches(path, &["ini", "conf", "cfg", "cnf"])
}

/// Format implied by the file extension, if any
pub fn format_from_extension(path: &Path) -> Option<ConfigFormat> {
    if is_json_file(path) {
        Some(ConfigFormat::Json)
    } else if is_yaml_file(path) {
        Some(ConfigFormat::Yaml)
    } else if is_ini_file(path) {
        Some(ConfigFormat::Ini)
    } else {
        None
    }
}

fn extension_matches(path: &Path, candidates: &[&str]) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        candidates.contains(&ext.as_str())
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_ini() {
        assert_eq!(sniff(b"[DEFAULT]\ndebug=true\n"), ConfigFormat::Ini);
        assert_eq!(sniff(b"\n\n  [database]\nconnection=x\n"), ConfigFormat::Ini);
    }

    #[test]
    fn test_sniff_json_before_yaml() {
        assert_eq!(sniff(br#"{"a": 1, "b": [1, 2]}"#), ConfigFormat::Json);
    }

    #[test]
    fn test_sniff_yaml() {
        assert_eq!(sniff(b"apiVersion: v1\nkind: ConfigMap\n"), ConfigFormat::Yaml);
    }

    #[test]
    fn test_sniff_unknown() {
        assert_eq!(sniff(b"@include base.conf\nlisten 80\n"), ConfigFormat::Unknown);
    }

    #[test]
    fn test_json_array_is_reported_as_ini() {
        // Documented consequence of the bracket heuristic running first.
        assert_eq!(sniff(b"[1, 2, 3]"), ConfigFormat::Ini);
    }

    #[test]
    fn test_ini_with_leading_comment_is_not_ini() {
        assert_ne!(sniff(b"# comment\n[DEFAULT]\nx=1\n"), ConfigFormat::Ini);
    }

    #[test]
    fn test_extension_helpers() {
        assert!(is_json_file(Path::new("data.JSON")));
        assert!(is_yaml_file(Path::new("config.yml")));
        assert!(is_ini_file(Path::new("nova.conf")));
        assert!(!is_ini_file(Path::new("nova")));
        assert_eq!(format_from_extension(Path::new("x.yaml")), Some(ConfigFormat::Yaml));
        assert_eq!(format_from_extension(Path::new("x.txt")), None);
    }
}
