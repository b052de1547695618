use facet::Facet;

use crate::ChangeKind;

/// One change from a component's most recent render, rendered to text.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct ChangeSummary {
    pub kind: ChangeKind,
    pub name: String,
    pub previous: String,
    pub next: String,
    pub unstable: bool,
}

/// Accumulated statistics for one component display name.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub component_name: String,
    pub render_count: u64,
    pub cumulative_self_time_ms: f64,
    /// Renders the necessity classifier actually evaluated.
    pub sampled_renders: u64,
    /// Sampled renders classified as unnecessary.
    pub unnecessary_renders: u64,
    pub last_changes: Vec<ChangeSummary>,
}

impl ReportEntry {
    pub fn average_self_time_ms(&self) -> f64 {
        if self.render_count == 0 {
            return 0.0;
        }
        self.cumulative_self_time_ms / self.render_count as f64
    }
}

/// Exportable snapshot of the per-name report table, sorted by name.
#[derive(Facet, Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn get(&self, component_name: &str) -> Option<&ReportEntry> {
        self.entries
            .iter()
            .find(|entry| entry.component_name == component_name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
