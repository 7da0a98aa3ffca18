use cfgdiff_common::{ComparisonTarget, DiffReport};

/// Fallback comparison by line presence.
///
/// Blank lines and `#` comments are skipped. A line of `origin` that does
/// not occur anywhere in `destination` is reported as `+line`, and the
/// reverse as `-line`. Order and position are ignored.
pub fn compare_lines(target: &ComparisonTarget, origin: &str, destination: &str) -> DiffReport {
    let origin_lines = significant_lines(origin);
    let destination_lines = significant_lines(destination);

    let mut report = DiffReport::new();
    for line in &origin_lines {
        if !destination_lines.contains(line) {
            report.push(format!("+{}\n", line));
        }
    }
    for line in &destination_lines {
        if !origin_lines.contains(line) {
            report.push(format!("-{}\n", line));
        }
    }

    report.with_header(target)
}

fn significant_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}
