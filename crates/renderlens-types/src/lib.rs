//! Runtime-independent vocabulary for renderlens.
//!
//! Nothing in here touches live component values: identifiers, the flat
//! options record, change/phase tags, and the serializable report shapes
//! handed to report consumers.

use facet::Facet;
use std::error::Error;
use std::fmt;

mod options;
mod report;

pub use options::{AnimationSpeed, Options, OptionsPatch};
pub use report::{ChangeSummary, Report, ReportEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    ZeroId(&'static str),
    IdOutOfRange {
        field: &'static str,
        max: u64,
        got: u64,
    },
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroId(field) => write!(f, "{field} must be non-zero"),
            Self::IdOutOfRange { field, max, got } => {
                write!(f, "{field} must be <= {max}, got {got}")
            }
        }
    }
}

impl Error for InvariantError {}

pub const JS_SAFE_INT_MAX_U64: u64 = (1u64 << 53) - 1;

macro_rules! define_u64_id {
    (
        $(#[$meta:meta])*
        $name:ident,
        field = $field:literal
        , max = $max:expr
    ) => {
        #[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[facet(transparent)]
        $(#[$meta])*
        pub struct $name(u64);

        impl $name {
            pub fn new(value: u64) -> Result<Self, InvariantError> {
                if value == 0 {
                    return Err(InvariantError::ZeroId($field));
                }
                if value > $max {
                    return Err(InvariantError::IdOutOfRange {
                        field: $field,
                        max: $max,
                        got: value,
                    });
                }
                Ok(Self(value))
            }

            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $field, self.0)
            }
        }
    };
}

define_u64_id!(
    /// Stable identity of one mounted component occurrence.
    ///
    /// The host keeps the same id for both alternates of a node, so it is
    /// the key for "what did this instance look like last commit".
    InstanceId,
    field = "instance_id",
    max = JS_SAFE_INT_MAX_U64
);
define_u64_id!(RendererId, field = "renderer_id", max = JS_SAFE_INT_MAX_U64);

/// Which part of a component's inputs a change was observed in.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum ChangeKind {
    Props,
    State,
    Context,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Props => "props",
            Self::State => "state",
            Self::Context => "context",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase a render was observed in.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[facet(rename_all = "snake_case")]
pub enum RenderPhase {
    Mount,
    Update,
}

impl RenderPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_rejects_zero() {
        let err = InstanceId::new(0).expect_err("zero id must fail");
        assert!(matches!(err, InvariantError::ZeroId("instance_id")));
    }

    #[test]
    fn instance_id_rejects_values_above_js_safe_max() {
        let err = InstanceId::new(JS_SAFE_INT_MAX_U64 + 1).expect_err("id must be JS-safe");
        assert!(matches!(
            err,
            InvariantError::IdOutOfRange {
                field: "instance_id",
                max: JS_SAFE_INT_MAX_U64,
                got
            } if got == JS_SAFE_INT_MAX_U64 + 1
        ));
    }

    #[test]
    fn renderer_id_displays_with_field_name() {
        let id = RendererId::new(3).expect("valid id");
        assert_eq!(id.to_string(), "renderer_id#3");
        assert_eq!(id.get(), 3);
    }
}
