//! Render observability for component-tree UI runtimes.
//!
//! The host runtime reports every commit to a [`DevtoolsHook`]. A [`Hub`]
//! subscribed to that hook walks the committed tree, diffs each rendered
//! component against its previous [`Snapshot`](snapshot::Snapshot), decides
//! (on a sample of renders) whether the render changed anything on screen,
//! scores it, aggregates it, and hands a [`RenderRecord`] to every
//! registered [`RenderListener`].

pub mod changes;
pub mod equal;
pub mod error;
pub mod fiber;
pub mod filter;
pub mod fingerprint;
pub mod hook;
pub mod hub;
pub mod logger;
pub mod necessity;
pub mod record;
pub mod report;
pub mod score;
pub mod snapshot;
pub mod store;
pub mod value;

pub use equal::is_equal;
pub use error::{ExtractionError, HubError, InstrumentationError};
pub use fiber::{ComponentRef, ContextRef, FiberNode, FiberRoot, NodeKind, StateSlot};
pub use filter::{ForComponent, RenderFn, ScanFilter};
pub use fingerprint::{fingerprint, format_value};
pub use hook::{BundleType, CommitHandler, DevtoolsHook};
pub use hub::{Hub, HubBuilder, Instrumentation, RenderEvent, RenderListener};
pub use logger::ConsoleLogger;
pub use necessity::{Sampler, is_render_unnecessary};
pub use record::{Change, ChangeDetail, RenderRecord};
pub use report::format_report;
pub use score::{FixedFrameRate, FrameRate, SharedFrameRate};
pub use store::{AggregatedStats, AggregationStore, StatsHandle};
pub use value::{ObjectData, Value};

pub use renderlens_types as types;
