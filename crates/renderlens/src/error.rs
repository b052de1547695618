use std::error::Error;
use std::fmt;

use renderlens_types::InstanceId;

/// Reading a node's snapshot failed. The node is skipped for this commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// Props were neither an object nor absent.
    MalformedProps { found: &'static str },
    /// A container was locked by a host-side mutation while being read.
    ValueBusy { what: &'static str },
    /// The slot-name strategy panicked for this component.
    SlotNamesPanicked { message: String },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedProps { found } => {
                write!(f, "props must be an object, found {found}")
            }
            Self::ValueBusy { what } => write!(f, "{what} is being mutated and cannot be read"),
            Self::SlotNamesPanicked { message } => {
                write!(f, "slot name recovery panicked: {message}")
            }
        }
    }
}

impl Error for ExtractionError {}

/// Forwarded to a listener's `on_error`; never raised into the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentationError {
    Extraction {
        instance: InstanceId,
        component: Option<String>,
        source: ExtractionError,
    },
    ListenerPanicked {
        listener: String,
        message: String,
    },
}

impl fmt::Display for InstrumentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction {
                instance,
                component,
                source,
            } => write!(
                f,
                "failed to extract changes for {} ({instance}): {source}",
                component.as_deref().unwrap_or("<anonymous>")
            ),
            Self::ListenerPanicked { listener, message } => {
                write!(f, "listener {listener} panicked: {message}")
            }
        }
    }
}

impl Error for InstrumentationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Extraction { source, .. } => Some(source),
            Self::ListenerPanicked { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// A production renderer is attached and the override flag is off.
    ProductionBuild,
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProductionBuild => write!(
                f,
                "refusing to instrument a production renderer; set dangerously_force_run_in_production to override"
            ),
        }
    }
}

impl Error for HubError {}
