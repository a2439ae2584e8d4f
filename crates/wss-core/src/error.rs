//! Error types for the grid data model and device validation.
//!
//! Validation errors (`UnsupportedResolution`, `OverlappedChannels`,
//! `OutOfRange`) are raised by device adapters against a grid; the
//! remaining variants guard the data model itself. Adapter hooks and
//! driver code propagate these through `anyhow::Result`, which keeps the
//! typed variants downcastable at the boundary.

use thiserror::Error;

/// Convenience alias for results using the core error type.
pub type WssResult<T> = std::result::Result<T, WssError>;

/// Primary error type for the WSS data model.
#[derive(Error, Debug)]
pub enum WssError {
    /// Mutation was attempted on a channel that has been sealed.
    ///
    /// Committed grid snapshots are frozen; obtain a fresh mutable
    /// channel with `Channel::clone` before editing.
    #[error("Cannot set attributes on a frozen channel")]
    FrozenChannel,

    /// Write was attempted through a derived, read-only grid field.
    #[error("Field '{0}' is read-only")]
    ReadonlyAttribute(&'static str),

    /// A batch write supplied a value of the wrong type for the field.
    #[error("Field '{field}' expects a {expected} value")]
    FieldTypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    /// Channel geometry does not fit the device slice resolution.
    #[error("Unsupported resolution: {0}")]
    UnsupportedResolution(String),

    /// Channels in the grid occupy overlapping spectral ranges.
    #[error("Overlapped channels: {0}")]
    OverlappedChannels(String),

    /// Attenuation or frequency outside the device limits.
    #[error("Out of range: {0}")]
    OutOfRange(String),
}
