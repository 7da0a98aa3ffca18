use cfgdiff_common::{CfgDiffError, ComparisonTarget, ConfigFormat, DiffReport, Result};
use serde_json::Value as JsonValue;
use serde_yml::Value as YamlValue;

/// Compare two JSON documents by the keys of their root objects
pub fn compare_json_str(
    target: &ComparisonTarget,
    origin: &str,
    destination: &str,
) -> Result<DiffReport> {
    let origin = parse_json(origin)?;
    let destination = parse_json(destination)?;
    Ok(compare_json(target, &origin, &destination))
}

/// Compare two YAML documents by the keys of their root mappings
pub fn compare_yaml_str(
    target: &ComparisonTarget,
    origin: &str,
    destination: &str,
) -> Result<DiffReport> {
    let origin = parse_yaml(origin)?;
    let destination = parse_yaml(destination)?;
    Ok(compare_yaml(target, &origin, &destination))
}

pub fn compare_json(
    target: &ComparisonTarget,
    origin: &serde_json::Map<String, JsonValue>,
    destination: &serde_json::Map<String, JsonValue>,
) -> DiffReport {
    let origin: Vec<(String, &JsonValue)> = origin.iter().map(|(k, v)| (k.clone(), v)).collect();
    let destination: Vec<(String, &JsonValue)> =
        destination.iter().map(|(k, v)| (k.clone(), v)).collect();
    diff_root_entries(&origin, &destination, render_json).with_header(target)
}

pub fn compare_yaml(
    target: &ComparisonTarget,
    origin: &serde_yml::Mapping,
    destination: &serde_yml::Mapping,
) -> DiffReport {
    let origin: Vec<(String, &YamlValue)> =
        origin.iter().map(|(k, v)| (render_yaml(k), v)).collect();
    let destination: Vec<(String, &YamlValue)> =
        destination.iter().map(|(k, v)| (render_yaml(k), v)).collect();
    diff_root_entries(&origin, &destination, render_yaml).with_header(target)
}

/// Key presence and deep value equality, one level deep.
///
/// Keys only in `origin` are `+key: value`, keys only in `destination` are
/// `-key: value`, and a changed key is a single `+`/`-` pair.
fn diff_root_entries<V, F>(origin: &[(String, &V)], destination: &[(String, &V)], render: F) -> DiffReport
where
    V: PartialEq,
    F: Fn(&V) -> String,
{
    let mut report = DiffReport::new();
    for (key, value) in origin {
        match lookup(destination, key.as_str()) {
            None => {
                report.push(format!("+{}: {}\n", key, render(*value)));
            }
            Some(other) if other != *value => {
                report.push(format!(
                    "+{}: {}\n-{}: {}\n",
                    key,
                    render(*value),
                    key,
                    render(other)
                ));
            }
            Some(_) => {}
        }
    }
    for (key, value) in destination {
        if lookup(origin, key.as_str()).is_none() {
            report.push(format!("-{}: {}\n", key, render(*value)));
        }
    }
    report
}

fn lookup<'a, V>(entries: &[(String, &'a V)], key: &str) -> Option<&'a V> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
}

fn parse_json(content: &str) -> Result<serde_json::Map<String, JsonValue>> {
    let value: JsonValue = serde_json::from_str(content)
        .map_err(|e| CfgDiffError::parse(ConfigFormat::Json, e.to_string()))?;
    match value {
        JsonValue::Object(map) => Ok(map),
        JsonValue::Null => Ok(serde_json::Map::new()),
        other => Err(CfgDiffError::parse(
            ConfigFormat::Json,
            format!("root is not a mapping (found {})", json_kind(&other)),
        )),
    }
}

fn parse_yaml(content: &str) -> Result<serde_yml::Mapping> {
    let value: YamlValue = serde_yml::from_str(content)
        .map_err(|e| CfgDiffError::parse(ConfigFormat::Yaml, e.to_string()))?;
    match untag(value) {
        YamlValue::Mapping(map) => Ok(map),
        // An empty document decodes to null; treat it as an empty mapping.
        YamlValue::Null => Ok(serde_yml::Mapping::new()),
        _ => Err(CfgDiffError::parse(
            ConfigFormat::Yaml,
            "root is not a mapping",
        )),
    }
}

fn untag(value: YamlValue) -> YamlValue {
    match value {
        YamlValue::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Scalars as written, strings unquoted, containers as compact JSON
fn render_json(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::from("null"),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => value.to_string(),
    }
}

fn render_yaml(value: &YamlValue) -> String {
    render_json(&yaml_to_json(value.clone()))
}

/// Convert YAML value to JSON value
fn yaml_to_json(yaml: YamlValue) -> JsonValue {
    match yaml {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(serde_json::Number::from(i))
            } else if let Some(u) = n.as_u64() {
                JsonValue::Number(serde_json::Number::from(u))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .unwrap_or_else(|| JsonValue::String(f.to_string()))
            } else {
                JsonValue::Null
            }
        }
        YamlValue::String(s) => JsonValue::String(s),
        YamlValue::Sequence(seq) => JsonValue::Array(seq.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    YamlValue::String(key) => key,
                    other => render_json(&yaml_to_json(other)),
                };
                obj.insert(key, yaml_to_json(v));
            }
            JsonValue::Object(obj)
        }
        YamlValue::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ComparisonTarget {
        ComparisonTarget::new("podman/config.json", "ocp/config.json")
    }

    #[test]
    fn test_identical_json() {
        let content = r#"{"name": "test", "count": 42, "nested": {"a": [1, 2]}}"#;
        assert!(compare_json_str(&target(), content, content).unwrap().is_empty());
    }

    #[test]
    fn test_json_keys_on_one_side_only() {
        let report =
            compare_json_str(&target(), r#"{"a":1,"b":2}"#, r#"{"a":1,"c":3}"#).unwrap();

        assert_eq!(
            report.lines(),
            [target().header(), "+b: 2\n".to_string(), "-c: 3\n".to_string()]
        );
    }

    #[test]
    fn test_json_changed_value() {
        let report =
            compare_json_str(&target(), r#"{"mode":"fast"}"#, r#"{"mode":"safe"}"#).unwrap();
        assert!(report.contains("+mode: fast\n-mode: safe\n"));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn test_json_nested_change_reported_at_root_key() {
        let report = compare_json_str(
            &target(),
            r#"{"db": {"host": "a", "port": 1}}"#,
            r#"{"db": {"port": 1, "host": "b"}}"#,
        )
        .unwrap();
        assert!(report.contains("+db: {\"host\":\"a\",\"port\":1}\n-db: {\"host\":\"b\",\"port\":1}\n"));
    }

    #[test]
    fn test_json_non_object_root_is_parse_error() {
        let err = compare_json_str(&target(), "[1, 2]", "{}").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_identical_yaml_with_reordered_keys() {
        let report = compare_yaml_str(
            &target(),
            "a: 1\nb:\n  c: [1, 2]\n",
            "b:\n  c: [1, 2]\na: 1\n",
        )
        .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_yaml_differences() {
        let report = compare_yaml_str(
            &target(),
            "replicas: 3\nimage: nova:1\nonly_here: true\n",
            "replicas: 5\nimage: nova:1\nnew_key: x\n",
        )
        .unwrap();

        assert_eq!(report.lines()[0], target().header());
        assert!(report.contains("+replicas: 3\n-replicas: 5\n"));
        assert!(report.contains("+only_here: true\n"));
        assert!(report.contains("-new_key: x\n"));
        assert_eq!(report.len(), 4);
    }

    #[test]
    fn test_yaml_non_string_keys() {
        let report = compare_yaml_str(&target(), "1: one\n", "2: two\n").unwrap();
        assert!(report.contains("+1: one\n"));
        assert!(report.contains("-2: two\n"));
    }

    #[test]
    fn test_yaml_scalar_root_is_parse_error() {
        let err = compare_yaml_str(&target(), "just a string", "a: 1").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_null_yaml_is_empty_mapping() {
        let report = compare_yaml_str(&target(), "~\n", "a: 1\n").unwrap();
        assert_eq!(report.lines(), [target().header(), "-a: 1\n".to_string()]);
    }

    /// Key names flagged with `sign`, one per line of every entry
    fn flagged(report: &DiffReport, sign: char) -> Vec<String> {
        let mut keys: Vec<String> = report
            .iter()
            .skip(1)
            .flat_map(|entry| entry.lines())
            .filter_map(|line| line.strip_prefix(sign))
            .filter_map(|line| line.split(':').next())
            .map(str::to_string)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    #[test]
    fn test_json_swapping_sides_swaps_signs() {
        let a = r#"{"a":1,"b":2,"mode":"fast"}"#;
        let b = r#"{"a":1,"c":3,"mode":"safe"}"#;
        let forward = compare_json_str(&target(), a, b).unwrap();
        let backward = compare_json_str(&target().reversed(), b, a).unwrap();

        assert!(forward.contains("+b: 2\n"));
        assert!(backward.contains("-b: 2\n"));
        assert!(forward.contains("-c: 3\n"));
        assert!(backward.contains("+c: 3\n"));
        assert_eq!(flagged(&forward, '+'), flagged(&backward, '-'));
        assert_eq!(flagged(&forward, '-'), flagged(&backward, '+'));
        assert_eq!(flagged(&forward, '+'), ["b", "mode"]);
    }

    #[test]
    fn test_yaml_swapping_sides_swaps_signs() {
        let a = "replicas: 3\nonly_here: true\n";
        let b = "replicas: 5\nnew_key: x\n";
        let forward = compare_yaml_str(&target(), a, b).unwrap();
        let backward = compare_yaml_str(&target().reversed(), b, a).unwrap();

        assert!(forward.contains("+only_here: true\n"));
        assert!(backward.contains("-only_here: true\n"));
        assert!(backward.contains("+replicas: 5\n-replicas: 3\n"));
        assert_eq!(flagged(&forward, '+'), flagged(&backward, '-'));
        assert_eq!(flagged(&forward, '-'), flagged(&backward, '+'));
        assert_eq!(forward.len(), backward.len());
    }
}
