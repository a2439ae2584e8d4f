//! `wss-core`
//!
//! Data model and state management for driving a wavelength selective
//! switch (WSS): a declarative description of a WDM spectral grid —
//! channel center frequencies, bandwidths, ports, attenuations — plus
//! the bookkeeping needed to push only the minimum necessary changes to
//! hardware.
//!
//! ## Key Types
//!
//! - [`Channel`]: immutable spectral identity with mutable routing
//!   attributes; freezable once committed
//! - [`Grid`]: ordered channel collection with range filtering and
//!   batch attribute access; [`FixedGridSpec`] generates equally spaced
//!   grids
//! - [`Wss`]: owns the current grid and the last committed snapshot,
//!   exposes transactional commit and structural diffs
//! - [`Adapter`]: lifecycle hooks a device driver implements to
//!   validate and apply a grid
//!
//! Vendor-specific drivers (wire protocol, serial transport) live in
//! sibling driver crates and plug in through the [`Adapter`] trait.

pub mod channel;
pub mod delta;
pub mod error;
pub mod grid;
pub mod units;
pub mod wss;

// Re-export commonly used types
pub use anyhow::{anyhow, Result};

pub use channel::{Channel, ChannelState};
pub use delta::{Delta, DeltaEntry};
pub use error::{WssError, WssResult};
pub use grid::{Axis, Field, FieldValue, FixedGridSpec, Grid, GridSliceMut};
pub use wss::{Adapter, Rescue, Wss, WssView};
