//! Did a render plausibly change what is on screen?

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::changes::props_changes;
use crate::fiber::FiberNode;
use crate::snapshot::{Props, SnapshotTable};

/// Decides which renders pay for the subtree walk.
#[derive(Debug)]
pub struct Sampler {
    mode: SamplerMode,
}

#[derive(Debug)]
enum SamplerMode {
    Always,
    Never,
    OneIn { rate: u32, rng: SmallRng },
}

impl Sampler {
    /// Sample one render in `rate`. `1` samples everything, `0` nothing.
    pub fn new(rate: u32) -> Self {
        Self::with_rng(rate, SmallRng::from_entropy())
    }

    pub fn seeded(rate: u32, seed: u64) -> Self {
        Self::with_rng(rate, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(rate: u32, rng: SmallRng) -> Self {
        let mode = match rate {
            0 => SamplerMode::Never,
            1 => SamplerMode::Always,
            rate => SamplerMode::OneIn { rate, rng },
        };
        Self { mode }
    }

    pub fn always() -> Self {
        Self {
            mode: SamplerMode::Always,
        }
    }

    pub fn never() -> Self {
        Self {
            mode: SamplerMode::Never,
        }
    }

    pub fn sample(&mut self) -> bool {
        match &mut self.mode {
            SamplerMode::Always => true,
            SamplerMode::Never => false,
            SamplerMode::OneIn { rate, rng } => rng.gen_range(0..*rate) == 0,
        }
    }
}

/// True unless some host node under `node` was mutated by this commit with
/// at least one substantive (not merely recreated) prop change.
///
/// `snapshots` must still hold the descendants' previous captures.
pub fn is_render_unnecessary(node: &FiberNode, snapshots: &SnapshotTable) -> bool {
    let mut necessary = false;
    for child in &node.children {
        child.walk(&mut |descendant| {
            if necessary || !descendant.is_host() || !descendant.did_commit {
                return;
            }
            necessary = host_changed(descendant, snapshots);
        });
        if necessary {
            break;
        }
    }
    !necessary
}

fn host_changed(host: &FiberNode, snapshots: &SnapshotTable) -> bool {
    let Some(previous) = snapshots.get(host.id) else {
        // Newly placed host output.
        return true;
    };
    let Ok(next) = Props::capture(host) else {
        return true;
    };
    props_changes(&[], &previous.props, &next)
        .iter()
        .any(|change| !change.is_unstable())
}

/// Run the check on sampled renders only; `None` means not evaluated.
pub fn classify(
    node: &FiberNode,
    snapshots: &SnapshotTable,
    sampler: &mut Sampler,
) -> Option<bool> {
    sampler
        .sample()
        .then(|| is_render_unnecessary(node, snapshots))
}
