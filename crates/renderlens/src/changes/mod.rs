//! Per-kind change extraction between two snapshots of one instance.

mod context;
mod names;
mod props;
mod state;
mod tally;

pub use context::{ProviderFrame, ProviderStack, context_changes, context_name};
pub use names::{NumericSlotNames, SlotNames, SourceSlotNames, destructured_props, state_pairs};
pub use props::{is_unstable, props_changes};
pub use state::state_changes;
pub use tally::ChangeTally;
