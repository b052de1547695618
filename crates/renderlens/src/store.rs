//! Render history: per live instance, and per display name for reporting.

use std::collections::{BTreeMap, HashMap};

use renderlens_types::{InstanceId, Report, ReportEntry};

use crate::record::RenderRecord;

/// Slot in the per-instance arena. A released slot bumps its generation so
/// stale handles resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatsHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Default)]
pub struct AggregatedStats {
    pub render_count: u64,
    pub cumulative_self_time_ms: f64,
    /// Records from the most recent commit that touched the instance.
    pub last_renders: Vec<RenderRecord>,
    pub sampled_renders: u64,
    pub unnecessary_renders: u64,
}

impl AggregatedStats {
    fn absorb(&mut self, renders: &[RenderRecord], self_time_ms: f64) {
        self.render_count += renders.len() as u64;
        self.cumulative_self_time_ms += self_time_ms;
        for render in renders {
            if let Some(unnecessary) = render.is_unnecessary {
                self.sampled_renders += 1;
                if unnecessary {
                    self.unnecessary_renders += 1;
                }
            }
        }
        self.last_renders = renders.to_vec();
    }
}

#[derive(Debug, Default)]
pub struct AggregationStore {
    // -- Per-instance arena --
    stats: Vec<AggregatedStats>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    handles: HashMap<InstanceId, StatsHandle>,

    // -- Per-name table, outlives instances --
    by_name: BTreeMap<String, ReportEntry>,
}

impl AggregationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> StatsHandle {
        if let Some(index) = self.free_list.pop() {
            self.stats[index as usize] = AggregatedStats::default();
            return StatsHandle {
                index,
                generation: self.generation[index as usize],
            };
        }
        let index = self.stats.len() as u32;
        self.stats.push(AggregatedStats::default());
        self.generation.push(0);
        StatsHandle {
            index,
            generation: 0,
        }
    }

    /// Fold one commit's renders of `instance` into its stats, and into the
    /// per-name table when `report` is on and the component has a name.
    pub fn record_render(
        &mut self,
        instance: InstanceId,
        component_name: Option<&str>,
        renders: &[RenderRecord],
        self_time_ms: f64,
        report: bool,
    ) -> StatsHandle {
        let handle = match self.handles.get(&instance) {
            Some(handle) => *handle,
            None => {
                let handle = self.allocate();
                self.handles.insert(instance, handle);
                handle
            }
        };
        self.stats[handle.index as usize].absorb(renders, self_time_ms);

        if report && let Some(name) = component_name {
            let entry = self
                .by_name
                .entry(name.to_owned())
                .or_insert_with(|| ReportEntry {
                    component_name: name.to_owned(),
                    render_count: 0,
                    cumulative_self_time_ms: 0.0,
                    sampled_renders: 0,
                    unnecessary_renders: 0,
                    last_changes: Vec::new(),
                });
            entry.render_count += renders.len() as u64;
            entry.cumulative_self_time_ms += self_time_ms;
            for render in renders {
                if let Some(unnecessary) = render.is_unnecessary {
                    entry.sampled_renders += 1;
                    entry.unnecessary_renders += u64::from(unnecessary);
                }
            }
            if let Some(last) = renders.last() {
                entry.last_changes = last.changes.iter().map(|change| change.summary()).collect();
            }
        }
        handle
    }

    pub fn get(&self, handle: StatsHandle) -> Option<&AggregatedStats> {
        let generation = self.generation.get(handle.index as usize)?;
        if *generation != handle.generation {
            return None;
        }
        self.stats.get(handle.index as usize)
    }

    pub fn handle_of(&self, instance: InstanceId) -> Option<StatsHandle> {
        self.handles.get(&instance).copied()
    }

    pub fn stats_for(&self, instance: InstanceId) -> Option<&AggregatedStats> {
        self.get(self.handle_of(instance)?)
    }

    /// Forget an unmounted instance. Its per-name contribution stays.
    pub fn release(&mut self, instance: InstanceId) -> bool {
        let Some(handle) = self.handles.remove(&instance) else {
            return false;
        };
        let index = handle.index as usize;
        self.generation[index] = self.generation[index].wrapping_add(1);
        self.stats[index] = AggregatedStats::default();
        self.free_list.push(handle.index);
        true
    }

    pub fn live_instances(&self) -> usize {
        self.handles.len()
    }

    /// One named entry, or the whole table sorted by name.
    pub fn get_report(&self, component_name: Option<&str>) -> Report {
        let entries = match component_name {
            Some(name) => self.by_name.get(name).cloned().into_iter().collect(),
            None => self.by_name.values().cloned().collect(),
        };
        Report { entries }
    }

    /// Empty the per-name table.
    pub fn clear(&mut self) {
        self.by_name.clear();
    }

    /// Drop everything, live instances included.
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderlens_types::RenderPhase;

    fn id(raw: u64) -> InstanceId {
        InstanceId::new(raw).expect("valid id")
    }

    fn render(is_unnecessary: Option<bool>) -> RenderRecord {
        RenderRecord {
            component_name: Some("Counter".to_owned()),
            phase: RenderPhase::Update,
            self_time_ms: 2.0,
            changes: Vec::new(),
            is_forget_compiled: false,
            is_unnecessary,
            did_commit_host_mutation: true,
            frame_rate: 60.0,
            severity_score: 0.0,
        }
    }

    #[test]
    fn accumulates_per_instance() {
        let mut store = AggregationStore::new();
        store.record_render(id(1), Some("Counter"), &[render(None)], 2.0, false);
        store.record_render(id(1), Some("Counter"), &[render(Some(true))], 3.0, false);
        let stats = store.stats_for(id(1)).expect("stats");
        assert_eq!(stats.render_count, 2);
        assert_eq!(stats.cumulative_self_time_ms, 5.0);
        assert_eq!(stats.sampled_renders, 1);
        assert_eq!(stats.unnecessary_renders, 1);
        assert_eq!(stats.last_renders.len(), 1);
        assert!(store.get_report(None).is_empty());
    }

    #[test]
    fn released_handles_go_stale() {
        let mut store = AggregationStore::new();
        let stale = store.record_render(id(1), None, &[render(None)], 1.0, false);
        assert_eq!(store.live_instances(), 1);
        assert!(store.release(id(1)));
        assert_eq!(store.live_instances(), 0);
        assert!(store.get(stale).is_none());
        let fresh = store.record_render(id(2), None, &[render(None)], 1.0, false);
        assert_eq!(fresh.index, stale.index);
        assert_eq!(store.get(fresh).map(|stats| stats.render_count), Some(1));
        assert!(!store.release(id(1)));
    }

    #[test]
    fn per_name_table_survives_unmount_until_cleared() {
        let mut store = AggregationStore::new();
        store.record_render(id(1), Some("Row"), &[render(None)], 1.0, true);
        store.record_render(id(2), Some("Row"), &[render(Some(false))], 3.0, true);
        store.release(id(1));
        store.release(id(2));
        let report = store.get_report(Some("Row"));
        let entry = report.get("Row").expect("entry");
        assert_eq!(entry.render_count, 2);
        assert_eq!(entry.average_self_time_ms(), 2.0);
        assert_eq!(entry.sampled_renders, 1);
        assert!(store.get_report(Some("Missing")).is_empty());
        store.clear();
        assert!(store.get_report(None).is_empty());
    }
}
