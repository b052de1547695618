//! Listener that writes each render to the log.

use tracing::{debug, info};

use crate::error::InstrumentationError;
use crate::fingerprint::format_value;
use crate::hub::{RenderEvent, RenderListener};

/// Nesting budget for logged values.
const LOG_DEPTH: usize = 1;

/// Logs renders through `tracing` while `Options::log` is on and the
/// listener is not paused. Renders of instances below
/// `render_count_threshold` are skipped.
#[derive(Debug, Default)]
pub struct ConsoleLogger;

impl ConsoleLogger {
    fn wants(&self, event: &RenderEvent<'_>) -> bool {
        !event.paused
            && event.options.log
            && event.render_count >= event.options.render_count_threshold
    }
}

impl RenderListener for ConsoleLogger {
    fn on_render(&self, event: &RenderEvent<'_>) {
        if !self.wants(event) {
            return;
        }
        let record = event.record;
        let component = record.component_name.as_deref().unwrap_or("<anonymous>");
        info!(
            component,
            instance = %event.node.id,
            phase = %record.phase,
            self_time_ms = record.self_time_ms,
            renders = event.render_count,
            unnecessary = ?record.is_unnecessary,
            score = record.severity_score,
            "render"
        );
        for change in &record.changes {
            let detail = change.detail();
            debug!(
                component,
                kind = %change.kind(),
                name = %detail.name,
                previous = %format_value(&detail.previous, LOG_DEPTH),
                next = %format_value(&detail.next, LOG_DEPTH),
                unstable = detail.unstable,
                "changed"
            );
        }
    }

    fn on_error(&self, error: &InstrumentationError) {
        debug!(%error, "render not logged");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::{FiberNode, NodeKind};
    use crate::record::RenderRecord;
    use crate::value::Value;
    use renderlens_types::{InstanceId, Options, RenderPhase};

    #[test]
    fn threshold_is_inclusive() {
        let node = FiberNode::new(
            InstanceId::new(1).expect("valid id"),
            NodeKind::Other,
            Value::Null,
        );
        let record = RenderRecord {
            component_name: None,
            phase: RenderPhase::Update,
            self_time_ms: 0.0,
            changes: Vec::new(),
            is_forget_compiled: false,
            is_unnecessary: None,
            did_commit_host_mutation: false,
            frame_rate: 60.0,
            severity_score: 0.0,
        };
        let options = Options {
            log: true,
            render_count_threshold: 3,
            ..Options::default()
        };
        let event = |render_count, paused| RenderEvent {
            node: &node,
            record: &record,
            render_count,
            paused,
            options: &options,
        };
        assert!(!ConsoleLogger.wants(&event(2, false)));
        assert!(ConsoleLogger.wants(&event(3, false)));
        assert!(!ConsoleLogger.wants(&event(3, true)));
    }
}
