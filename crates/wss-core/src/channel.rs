//! WDM channel data structure.
//!
//! A [`Channel`] pairs an immutable spectral identity (central frequency
//! and bandwidth) with mutable routing attributes (attenuation, blocked
//! flag, destination port). Channels can be sealed with [`Channel::freeze`]
//! once they become part of a committed snapshot; cloning always produces
//! a fresh mutable channel regardless of the source's state.

use serde::{Deserialize, Serialize};

use crate::error::{WssError, WssResult};
use crate::units::frequency_to_wavelength;

/// Routing attributes that may change between commits.
pub const MUTABLE_PROPERTIES: &[&str] = &["attenuation", "blocked", "port"];

/// Spectral identity; changing these means redefining the channel.
pub const IMMUTABLE_PROPERTIES: &[&str] = &["central_frequency", "bandwidth"];

/// A single spectral slot on a WDM grid.
#[derive(Debug)]
pub struct Channel {
    central_frequency: f64,
    bandwidth: f64,
    attenuation: f64,
    blocked: bool,
    port: u32,
    frozen: bool,
}

impl Channel {
    /// Create a channel at `central_frequency` (THz) spanning `bandwidth`
    /// (GHz). Attenuation starts at 0 dB, unblocked, on port 1.
    pub fn new(central_frequency: f64, bandwidth: f64) -> Self {
        Self {
            central_frequency,
            bandwidth,
            attenuation: 0.0,
            blocked: false,
            port: 1,
            frozen: false,
        }
    }

    /// Central frequency in THz.
    pub fn central_frequency(&self) -> f64 {
        self.central_frequency
    }

    /// Bandwidth in GHz.
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Start frequency in THz.
    pub fn start_frequency(&self) -> f64 {
        self.central_frequency - self.bandwidth / 2e3
    }

    /// Stop frequency in THz.
    pub fn stop_frequency(&self) -> f64 {
        self.central_frequency + self.bandwidth / 2e3
    }

    /// Central wavelength in nm.
    pub fn central_wavelength(&self) -> f64 {
        frequency_to_wavelength(self.central_frequency)
    }

    /// Start wavelength in nm. Wavelength decreases with frequency, so
    /// this maps from the stop frequency.
    pub fn start_wavelength(&self) -> f64 {
        frequency_to_wavelength(self.stop_frequency())
    }

    /// Stop wavelength in nm.
    pub fn stop_wavelength(&self) -> f64 {
        frequency_to_wavelength(self.start_frequency())
    }

    /// Attenuation in dB.
    pub fn attenuation(&self) -> f64 {
        self.attenuation
    }

    /// Whether the channel is blocked.
    pub fn blocked(&self) -> bool {
        self.blocked
    }

    /// Destination / origin port.
    pub fn port(&self) -> u32 {
        self.port
    }

    /// Set the attenuation in dB.
    pub fn set_attenuation(&mut self, attenuation: f64) -> WssResult<()> {
        self.check_mutable()?;
        self.attenuation = attenuation;
        Ok(())
    }

    /// Block or unblock the channel.
    pub fn set_blocked(&mut self, blocked: bool) -> WssResult<()> {
        self.check_mutable()?;
        self.blocked = blocked;
        Ok(())
    }

    /// Set the destination / origin port.
    pub fn set_port(&mut self, port: u32) -> WssResult<()> {
        self.check_mutable()?;
        self.port = port;
        Ok(())
    }

    fn check_mutable(&self) -> WssResult<()> {
        if self.frozen {
            Err(WssError::FrozenChannel)
        } else {
            Ok(())
        }
    }

    /// Seal the channel, denying all future attribute changes.
    pub fn freeze(&mut self) -> &mut Self {
        self.frozen = true;
        self
    }

    /// Whether the channel has been sealed.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Plain key-value snapshot of the full attribute set, used for
    /// structural diffs between grid generations.
    pub fn state(&self) -> ChannelState {
        ChannelState {
            central_frequency: self.central_frequency,
            bandwidth: self.bandwidth,
            attenuation: self.attenuation,
            blocked: self.blocked,
            port: self.port,
        }
    }
}

impl Clone for Channel {
    /// Clones are always fresh and mutable, even when the source is
    /// frozen.
    fn clone(&self) -> Self {
        Self {
            central_frequency: self.central_frequency,
            bandwidth: self.bandwidth,
            attenuation: self.attenuation,
            blocked: self.blocked,
            port: self.port,
            frozen: false,
        }
    }
}

impl PartialEq for Channel {
    /// Equality is derived from the attribute set; the frozen flag does
    /// not take part.
    fn eq(&self, other: &Self) -> bool {
        self.state() == other.state()
    }
}

/// Serializable attribute snapshot of a [`Channel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    pub central_frequency: f64,
    pub bandwidth: f64,
    pub attenuation: f64,
    pub blocked: bool,
    pub port: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_edges() {
        let ch = Channel::new(192.1, 50.0);
        assert!((ch.start_frequency() - 192.075).abs() < 1e-12);
        assert!((ch.stop_frequency() - 192.125).abs() < 1e-12);
        // start wavelength corresponds to the higher frequency edge
        assert!(ch.start_wavelength() < ch.stop_wavelength());
    }

    #[test]
    fn defaults() {
        let ch = Channel::new(193.0, 25.0);
        assert_eq!(ch.attenuation(), 0.0);
        assert!(!ch.blocked());
        assert_eq!(ch.port(), 1);
        assert!(!ch.is_frozen());
    }

    #[test]
    fn frozen_channel_rejects_writes() {
        let mut ch = Channel::new(192.1, 50.0);
        ch.set_port(3).unwrap();
        ch.freeze();
        assert!(matches!(
            ch.set_attenuation(2.0),
            Err(WssError::FrozenChannel)
        ));
        assert!(matches!(ch.set_blocked(true), Err(WssError::FrozenChannel)));
        assert!(matches!(ch.set_port(1), Err(WssError::FrozenChannel)));
        // the earlier write survived
        assert_eq!(ch.port(), 3);
    }

    #[test]
    fn clone_of_frozen_channel_is_mutable() {
        let mut ch = Channel::new(192.1, 50.0);
        ch.freeze();
        let mut copy = ch.clone();
        assert!(!copy.is_frozen());
        copy.set_blocked(true).unwrap();
        assert!(copy.blocked());
    }

    #[test]
    fn equality_ignores_frozen_flag() {
        let mut a = Channel::new(192.1, 50.0);
        let b = a.clone();
        a.freeze();
        assert_eq!(a, b);
    }

    #[test]
    fn state_snapshot_round_trips_through_json() {
        let mut ch = Channel::new(192.1, 50.0);
        ch.set_attenuation(3.5).unwrap();
        let value = serde_json::to_value(ch.state()).unwrap();
        assert_eq!(value["central_frequency"], 192.1);
        assert_eq!(value["attenuation"], 3.5);
        assert_eq!(value["port"], 1);
    }
}
