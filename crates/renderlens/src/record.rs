use renderlens_types::{ChangeKind, ChangeSummary, RenderPhase};

use crate::fingerprint::format_value;
use crate::value::Value;

/// Depth used when previewing change values in summaries.
const SUMMARY_DEPTH: usize = 0;

#[derive(Debug, Clone)]
pub struct ChangeDetail {
    pub name: String,
    pub previous: Value,
    pub next: Value,
    /// Structurally different but with the same shape signature, i.e. a
    /// value rebuilt every render.
    pub unstable: bool,
}

/// One input that differs between two commits of a component.
#[derive(Debug, Clone)]
pub enum Change {
    Props(ChangeDetail),
    State(ChangeDetail),
    Context(ChangeDetail),
}

impl Change {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Props(_) => ChangeKind::Props,
            Self::State(_) => ChangeKind::State,
            Self::Context(_) => ChangeKind::Context,
        }
    }

    pub fn detail(&self) -> &ChangeDetail {
        match self {
            Self::Props(detail) | Self::State(detail) | Self::Context(detail) => detail,
        }
    }

    pub fn name(&self) -> &str {
        &self.detail().name
    }

    pub fn is_unstable(&self) -> bool {
        self.detail().unstable
    }

    pub fn summary(&self) -> ChangeSummary {
        let detail = self.detail();
        ChangeSummary {
            kind: self.kind(),
            name: detail.name.clone(),
            previous: format_value(&detail.previous, SUMMARY_DEPTH),
            next: format_value(&detail.next, SUMMARY_DEPTH),
            unstable: detail.unstable,
        }
    }
}

/// Everything observed about one render of one composite node.
#[derive(Debug, Clone)]
pub struct RenderRecord {
    pub component_name: Option<String>,
    pub phase: RenderPhase,
    pub self_time_ms: f64,
    pub changes: Vec<Change>,
    /// Compiled by the auto-memoizing compiler.
    pub is_forget_compiled: bool,
    /// `None` when this render was not sampled.
    pub is_unnecessary: Option<bool>,
    pub did_commit_host_mutation: bool,
    pub frame_rate: f64,
    /// In `[0, 1]`; higher is worse.
    pub severity_score: f64,
}

impl RenderRecord {
    pub fn changes_of(&self, kind: ChangeKind) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |change| change.kind() == kind)
    }
}
