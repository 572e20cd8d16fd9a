//! Capability flags that generic algorithms query to pick a strategy.
//!
//! Every image source advertises a constant [`Capabilities`] set (see
//! [`ImageSource::CAPABILITIES`](crate::raster::protocol::ImageSource::CAPABILITIES)).
//! Because the set is an associated constant, branches on it are resolved at
//! compile time. [`capabilities_of`] is the value-level lookup for call sites
//! that only hold a reference.

use crate::core::error::ViewResult;
use crate::raster::protocol::ImageSource;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Type-level markers describing what a source or sink permits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Capabilities: u8 {
        /// Supports `set_size`.
        const RESIZABLE = 1 << 0;
        /// Has stable backing storage, so element addresses may be retained.
        const REFERENCEABLE = 1 << 1;
        /// Evaluating the same coordinate twice yields the same value with no side effect.
        const MULTIPLY_ACCESSIBLE = 1 << 2;
    }
}

impl Capabilities {
    /// Capabilities of a materialized, buffer-backed view.
    pub const MATERIALIZED: Capabilities = Capabilities::RESIZABLE
        .union(Capabilities::REFERENCEABLE)
        .union(Capabilities::MULTIPLY_ACCESSIBLE);

    /// Capabilities of a pure computed expression.
    pub const PURE: Capabilities = Capabilities::MULTIPLY_ACCESSIBLE;

    /// Whether the type supports `set_size`.
    pub const fn is_resizable(self) -> bool {
        self.contains(Capabilities::RESIZABLE)
    }

    /// Whether element addresses are stable.
    pub const fn is_referenceable(self) -> bool {
        self.contains(Capabilities::REFERENCEABLE)
    }

    /// Whether repeated random access is side-effect free.
    pub const fn is_multiply_accessible(self) -> bool {
        self.contains(Capabilities::MULTIPLY_ACCESSIBLE)
    }
}

/// Look up the capability set of a source through a reference.
pub fn capabilities_of<S: ImageSource + ?Sized>(_source: &S) -> Capabilities {
    S::CAPABILITIES
}

/// Types whose extent can be changed in place.
pub trait Resizable {
    /// Resize to `cols x rows x planes`.
    ///
    /// A no-op when the extent is unchanged; otherwise the old storage is
    /// released and fresh, default-initialized storage is allocated.
    fn set_size(&mut self, cols: usize, rows: usize, planes: usize) -> ViewResult<()>;
}
