use std::fmt::Write as _;

use renderlens_types::{Report, ReportEntry};

/// Human-readable summary of `report` for the named components, or for
/// every component when `names` is empty.
pub fn format_report(report: &Report, names: &[&str]) -> String {
    let mut out = String::new();
    if report.is_empty() {
        out.push_str("No performance report available\n");
        return out;
    }

    out.push_str("Performance Report\n");
    if names.is_empty() {
        for entry in &report.entries {
            write_entry(&mut out, entry);
        }
        return out;
    }
    for name in names {
        match report.get(name) {
            Some(entry) => write_entry(&mut out, entry),
            None => {
                let _ = writeln!(out, "No data found for {name}");
            }
        }
    }
    out
}

fn write_entry(out: &mut String, entry: &ReportEntry) {
    let _ = writeln!(out, "{}", entry.component_name);
    let _ = writeln!(out, "   Renders: {}", entry.render_count);
    let _ = writeln!(
        out,
        "   Total render time: {:.3}ms",
        entry.cumulative_self_time_ms
    );
    let _ = writeln!(
        out,
        "   Avg render time: {:.3}ms",
        entry.average_self_time_ms()
    );
    if entry.sampled_renders > 0 {
        let percent = entry.unnecessary_renders as f64 / entry.sampled_renders as f64 * 100.0;
        let _ = writeln!(
            out,
            "   Unnecessary renders: {} of {} sampled ({percent:.0}%)",
            entry.unnecessary_renders, entry.sampled_renders
        );
    }
    if !entry.last_changes.is_empty() {
        let _ = writeln!(out, "   Last changes:");
        for change in &entry.last_changes {
            let _ = writeln!(
                out,
                "     {} {}: {} -> {}{}",
                change.kind,
                change.name,
                change.previous,
                change.next,
                if change.unstable { " (unstable)" } else { "" }
            );
        }
    }
}

pub fn to_json(report: &Report) -> Result<String, String> {
    facet_json::to_string_pretty(report).map_err(|e| format!("encode report: {e}"))
}

pub fn from_json(json: &str) -> Result<Report, String> {
    facet_json::from_str(json).map_err(|e| format!("decode report: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderlens_types::{ChangeKind, ChangeSummary};

    fn entry(name: &str) -> ReportEntry {
        ReportEntry {
            component_name: name.to_owned(),
            render_count: 4,
            cumulative_self_time_ms: 10.0,
            sampled_renders: 2,
            unnecessary_renders: 1,
            last_changes: vec![ChangeSummary {
                kind: ChangeKind::State,
                name: "count".to_owned(),
                previous: "0".to_owned(),
                next: "1".to_owned(),
                unstable: false,
            }],
        }
    }

    #[test]
    fn formats_requested_components() {
        let report = Report {
            entries: vec![entry("Counter"), entry("List")],
        };
        let text = format_report(&report, &["Counter", "Missing"]);
        assert!(text.starts_with("Performance Report\n"));
        assert!(text.contains("Counter\n   Renders: 4\n"));
        assert!(text.contains("   Avg render time: 2.500ms\n"));
        assert!(text.contains("   Unnecessary renders: 1 of 2 sampled (50%)\n"));
        assert!(text.contains("     state count: 0 -> 1\n"));
        assert!(text.contains("No data found for Missing\n"));
        assert!(!text.contains("List\n"));
    }

    #[test]
    fn empty_report_says_so() {
        assert_eq!(
            format_report(&Report::default(), &[]),
            "No performance report available\n"
        );
    }

    #[test]
    fn json_export_reads_back() {
        let report = Report {
            entries: vec![entry("Counter")],
        };
        let json = to_json(&report).expect("encode");
        assert!(json.contains("\"component_name\""));
        assert_eq!(from_json(&json).expect("decode"), report);
    }
}
