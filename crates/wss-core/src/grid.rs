//! Ordered collections of channels forming a flexible WDM grid.
//!
//! A [`Grid`] owns its channels. Sub-grids produced by [`Grid::select`],
//! [`Grid::subgrid`] and [`Grid::filter`] are independent copies; in-place
//! mutation of a contiguous run of the parent goes through
//! [`Grid::slice_mut`], which exposes the same batch setters over borrowed
//! channels.
//!
//! Batch access is spelled with an explicit [`Field`] enum rather than
//! reflection: reading yields one [`FieldValue`] per channel in grid
//! order, writing either broadcasts a scalar or zips a sequence of values
//! across the selection.

use std::ops::{Index, Range};

use serde::Deserialize;

use crate::channel::Channel;
use crate::error::{WssError, WssResult};
use crate::units::wavelength_to_frequency;

/// Relative tolerance applied to the minimum-spacing rule in
/// [`Grid::filter`].
pub const TOLERANCE: f64 = 1e-6;

/// Spectral axis used by range filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Frequency,
    Wavelength,
}

impl Axis {
    /// Resolve an axis name: any text containing `freq` means frequency,
    /// everything else wavelength.
    pub fn parse(name: &str) -> Self {
        if name.contains("freq") {
            Axis::Frequency
        } else {
            Axis::Wavelength
        }
    }
}

/// Channel attribute addressed by the batch get/set interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CentralFrequency,
    Bandwidth,
    StartFrequency,
    StopFrequency,
    CentralWavelength,
    StartWavelength,
    StopWavelength,
    Attenuation,
    Blocked,
    Port,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::CentralFrequency => "central_frequency",
            Field::Bandwidth => "bandwidth",
            Field::StartFrequency => "start_frequency",
            Field::StopFrequency => "stop_frequency",
            Field::CentralWavelength => "central_wavelength",
            Field::StartWavelength => "start_wavelength",
            Field::StopWavelength => "stop_wavelength",
            Field::Attenuation => "attenuation",
            Field::Blocked => "blocked",
            Field::Port => "port",
        }
    }

    /// Only the routing attributes accept writes; the spectral identity
    /// and every derived value are read-only.
    pub fn is_writable(self) -> bool {
        matches!(self, Field::Attenuation | Field::Blocked | Field::Port)
    }
}

/// Value of a single channel attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Bool(bool),
    Int(u32),
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v)
    }
}

fn get_field(channel: &Channel, field: Field) -> FieldValue {
    match field {
        Field::CentralFrequency => FieldValue::Float(channel.central_frequency()),
        Field::Bandwidth => FieldValue::Float(channel.bandwidth()),
        Field::StartFrequency => FieldValue::Float(channel.start_frequency()),
        Field::StopFrequency => FieldValue::Float(channel.stop_frequency()),
        Field::CentralWavelength => FieldValue::Float(channel.central_wavelength()),
        Field::StartWavelength => FieldValue::Float(channel.start_wavelength()),
        Field::StopWavelength => FieldValue::Float(channel.stop_wavelength()),
        Field::Attenuation => FieldValue::Float(channel.attenuation()),
        Field::Blocked => FieldValue::Bool(channel.blocked()),
        Field::Port => FieldValue::Int(channel.port()),
    }
}

fn set_field(channel: &mut Channel, field: Field, value: FieldValue) -> WssResult<()> {
    if !field.is_writable() {
        return Err(WssError::ReadonlyAttribute(field.name()));
    }
    match (field, value) {
        (Field::Attenuation, FieldValue::Float(v)) => channel.set_attenuation(v),
        (Field::Blocked, FieldValue::Bool(v)) => channel.set_blocked(v),
        (Field::Port, FieldValue::Int(v)) => channel.set_port(v),
        (Field::Attenuation, _) => Err(WssError::FieldTypeMismatch {
            field: field.name(),
            expected: "float",
        }),
        (Field::Blocked, _) => Err(WssError::FieldTypeMismatch {
            field: field.name(),
            expected: "bool",
        }),
        (Field::Port, _) => Err(WssError::FieldTypeMismatch {
            field: field.name(),
            expected: "int",
        }),
        _ => unreachable!("writable fields are covered above"),
    }
}

fn batch_values(channels: &[Channel], field: Field) -> Vec<FieldValue> {
    channels.iter().map(|ch| get_field(ch, field)).collect()
}

fn batch_set_all(channels: &mut [Channel], field: Field, value: FieldValue) -> WssResult<()> {
    for channel in channels.iter_mut() {
        set_field(channel, field, value)?;
    }
    Ok(())
}

fn batch_set_each(channels: &mut [Channel], field: Field, values: &[FieldValue]) -> WssResult<()> {
    // Pairs values with channels and stops at the shorter side.
    for (channel, value) in channels.iter_mut().zip(values.iter()) {
        set_field(channel, field, *value)?;
    }
    Ok(())
}

/// Collection of channels that define a flexible WDM grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    channels: Vec<Channel>,
}

impl Grid {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn get(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Channel> {
        self.channels.get_mut(index)
    }

    /// New grid holding copies of the channels at `indices`, in the
    /// given order.
    pub fn select(&self, indices: &[usize]) -> Grid {
        Grid::new(
            indices
                .iter()
                .filter_map(|&i| self.channels.get(i).cloned())
                .collect(),
        )
    }

    /// New grid holding copies of a contiguous range of channels.
    pub fn subgrid(&self, range: Range<usize>) -> Grid {
        let end = range.end.min(self.channels.len());
        let start = range.start.min(end);
        Grid::new(self.channels[start..end].to_vec())
    }

    /// Mutable view over a contiguous range of this grid's channels,
    /// exposing the batch setters in place.
    pub fn slice_mut(&mut self, range: Range<usize>) -> GridSliceMut<'_> {
        let end = range.end.min(self.channels.len());
        let start = range.start.min(end);
        GridSliceMut {
            channels: &mut self.channels[start..end],
        }
    }

    /// Filter channels by a frequency or wavelength window.
    ///
    /// A channel is kept iff its start edge is at or above `start` (when
    /// given) and its stop edge is strictly below `stop` (when given) —
    /// the asymmetric bounds are part of the contract. `step` imposes a
    /// minimum spacing between the central values of consecutive kept
    /// channels, letting a caller down-sample a dense grid; a dropped
    /// channel does not become the comparison point.
    pub fn filter(
        &self,
        axis: Axis,
        start: Option<f64>,
        stop: Option<f64>,
        step: Option<f64>,
    ) -> Grid {
        let mut kept = Vec::new();
        let mut last_central: Option<f64> = None;

        for channel in &self.channels {
            let (start_edge, stop_edge, central) = match axis {
                Axis::Frequency => (
                    channel.start_frequency(),
                    channel.stop_frequency(),
                    channel.central_frequency(),
                ),
                Axis::Wavelength => (
                    channel.start_wavelength(),
                    channel.stop_wavelength(),
                    channel.central_wavelength(),
                ),
            };

            if let Some(lo) = start {
                if start_edge < lo {
                    continue;
                }
            }
            if let Some(hi) = stop {
                if stop_edge >= hi {
                    continue;
                }
            }

            let spaced = match (last_central, step) {
                (Some(last), Some(step)) => (central - last).abs() >= (1.0 - TOLERANCE) * step,
                _ => true,
            };
            if spaced {
                kept.push(channel.clone());
                last_central = Some(central);
            }
        }

        Grid::new(kept)
    }

    /// Batch read: the value of `field` for every channel, in grid order.
    pub fn values(&self, field: Field) -> Vec<FieldValue> {
        batch_values(&self.channels, field)
    }

    /// Batch write: broadcast one value to every channel.
    pub fn set_all(&mut self, field: Field, value: FieldValue) -> WssResult<()> {
        batch_set_all(&mut self.channels, field, value)
    }

    /// Batch write: one value per channel, zipped in grid order.
    pub fn set_each(&mut self, field: Field, values: &[FieldValue]) -> WssResult<()> {
        batch_set_each(&mut self.channels, field, values)
    }

    /// Deep copy; every channel in the result is fresh and mutable.
    pub fn copy(&self) -> Grid {
        self.clone()
    }

    /// Seal every channel in place.
    pub fn freeze(&mut self) -> &mut Self {
        for channel in &mut self.channels {
            channel.freeze();
        }
        self
    }

    /// Consuming variant of [`Grid::freeze`], convenient when building a
    /// committed snapshot.
    pub fn frozen(mut self) -> Self {
        self.freeze();
        self
    }

    /// Channels reordered by ascending central frequency.
    pub fn sorted_by_frequency(mut self) -> Self {
        self.channels.sort_by(|a, b| {
            a.central_frequency()
                .total_cmp(&b.central_frequency())
        });
        self
    }

    /// Attribute snapshots of every channel, for structural diffs.
    pub fn states(&self) -> Vec<crate::channel::ChannelState> {
        self.channels.iter().map(Channel::state).collect()
    }
}

impl Index<usize> for Grid {
    type Output = Channel;

    fn index(&self, index: usize) -> &Channel {
        &self.channels[index]
    }
}

impl FromIterator<Channel> for Grid {
    fn from_iter<T: IntoIterator<Item = Channel>>(iter: T) -> Self {
        Grid::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Grid {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}

/// Mutable batch view over a contiguous run of a grid's channels.
pub struct GridSliceMut<'a> {
    channels: &'a mut [Channel],
}

impl GridSliceMut<'_> {
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn values(&self, field: Field) -> Vec<FieldValue> {
        batch_values(self.channels, field)
    }

    pub fn set_all(&mut self, field: Field, value: FieldValue) -> WssResult<()> {
        batch_set_all(self.channels, field, value)
    }

    pub fn set_each(&mut self, field: Field, values: &[FieldValue]) -> WssResult<()> {
        batch_set_each(self.channels, field, values)
    }
}

/// Generator for a homogeneous, equally spaced grid.
///
/// Deserializable from configuration; every field has a default so a
/// plain `{}` yields the 80-channel 50 GHz C-band grid starting at the
/// ITU C21 channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FixedGridSpec {
    /// Number of channels in the grid.
    pub number: usize,
    /// Central frequency of the first channel, in THz.
    pub first_frequency: f64,
    /// Central wavelength of the first channel, in nm; overrides
    /// `first_frequency` when present.
    pub first_wavelength: Option<f64>,
    /// Channel width in GHz.
    pub bandwidth: f64,
    /// Frequency leap between consecutive channels in GHz.
    pub spacing: f64,
}

impl FixedGridSpec {
    /// ITU C21 channel, in THz.
    pub const DEFAULT_FIRST_FREQUENCY: f64 = 192.1;
    pub const DEFAULT_BANDWIDTH: f64 = 50.0;
    pub const DEFAULT_SPACING: f64 = 0.0;

    /// Materialize the grid described by this spec.
    pub fn build(&self) -> Grid {
        let first = match self.first_wavelength {
            Some(nm) => wavelength_to_frequency(nm),
            None => self.first_frequency,
        };
        (0..self.number)
            .map(|j| {
                let offset = j as f64 * (self.spacing + self.bandwidth) * 1e-3;
                Channel::new(first + offset, self.bandwidth)
            })
            .collect()
    }
}

impl Default for FixedGridSpec {
    fn default() -> Self {
        Self {
            number: 80,
            first_frequency: Self::DEFAULT_FIRST_FREQUENCY,
            first_wavelength: None,
            bandwidth: Self::DEFAULT_BANDWIDTH,
            spacing: Self::DEFAULT_SPACING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c_band_grid() -> Grid {
        FixedGridSpec::default().build()
    }

    #[test]
    fn fixed_grid_spacing_arithmetic() {
        let spec = FixedGridSpec {
            number: 10,
            spacing: 12.5,
            ..FixedGridSpec::default()
        };
        let grid = spec.build();
        let f0 = grid[0].central_frequency();
        for k in 0..10 {
            let expected = f0 + k as f64 * (12.5 + 50.0) * 1e-3;
            assert!(
                (grid[k].central_frequency() - expected).abs() < 1e-9,
                "channel {k}"
            );
        }
    }

    #[test]
    fn fixed_grid_from_wavelength() {
        let spec = FixedGridSpec {
            number: 1,
            first_wavelength: Some(1550.0),
            ..FixedGridSpec::default()
        };
        let grid = spec.build();
        assert!((grid[0].central_frequency() - 193.414_489).abs() < 1e-3);
    }

    #[test]
    fn fixed_grid_spec_from_toml() {
        let spec: FixedGridSpec = toml::from_str(
            r#"
            number = 4
            first_frequency = 193.0
            bandwidth = 25.0
            "#,
        )
        .unwrap();
        let grid = spec.build();
        assert_eq!(grid.len(), 4);
        assert!((grid[1].central_frequency() - 193.025).abs() < 1e-9);
    }

    #[test]
    fn axis_name_resolution() {
        assert_eq!(Axis::parse("frequency"), Axis::Frequency);
        assert_eq!(Axis::parse("freq"), Axis::Frequency);
        assert_eq!(Axis::parse("wavelength"), Axis::Wavelength);
        assert_eq!(Axis::parse("lambda"), Axis::Wavelength);
    }

    #[test]
    fn frequency_filter_window() {
        // 50 GHz grid starting at 192.1: channels kept iff start >= 192.0
        // and stop < 193.0.
        let grid = c_band_grid();
        let filtered = grid.filter(Axis::Frequency, Some(192.0), Some(193.0), None);
        assert!(!filtered.is_empty());
        for ch in &filtered {
            assert!(ch.start_frequency() >= 192.0);
            assert!(ch.stop_frequency() < 193.0);
        }
        // channel at 192.975 has stop exactly 193.0 and must be excluded
        let max_stop = filtered
            .iter()
            .map(|c| c.stop_frequency())
            .fold(f64::MIN, f64::max);
        assert!(max_stop < 193.0);
        // count: centrals 192.1, 192.15, ... 192.95 => 18 channels
        assert_eq!(filtered.len(), 18);
    }

    #[test]
    fn filter_step_downsamples() {
        let grid = c_band_grid();
        let sparse = grid.filter(Axis::Frequency, None, Some(193.0), Some(0.1));
        // 50 GHz centers, 100 GHz minimum spacing: every other channel
        let centers: Vec<f64> = sparse.iter().map(|c| c.central_frequency()).collect();
        for pair in centers.windows(2) {
            assert!(pair[1] - pair[0] >= 0.1 * (1.0 - TOLERANCE));
        }
        assert_eq!(sparse.len(), 9);
    }

    #[test]
    fn wavelength_filter_uses_wavelength_edges() {
        let grid = c_band_grid();
        let all = grid.filter(Axis::Wavelength, Some(1540.0), Some(1560.0), None);
        for ch in &all {
            assert!(ch.start_wavelength() >= 1540.0);
            assert!(ch.stop_wavelength() < 1560.0);
        }
    }

    #[test]
    fn batch_read_returns_grid_order() {
        let mut grid = c_band_grid();
        grid.get_mut(2).unwrap().set_port(7).unwrap();
        let ports = grid.values(Field::Port);
        assert_eq!(ports[0], FieldValue::Int(1));
        assert_eq!(ports[2], FieldValue::Int(7));
        assert_eq!(ports.len(), grid.len());
    }

    #[test]
    fn batch_broadcast_and_zip() {
        let mut grid = FixedGridSpec {
            number: 4,
            ..FixedGridSpec::default()
        }
        .build();

        grid.set_all(Field::Attenuation, 2.5.into()).unwrap();
        assert!(grid.iter().all(|c| c.attenuation() == 2.5));

        grid.set_each(
            Field::Port,
            &[1u32.into(), 2u32.into(), 3u32.into()],
        )
        .unwrap();
        // zip stops at the shorter side; channel 3 keeps its old port
        assert_eq!(grid[2].port(), 3);
        assert_eq!(grid[3].port(), 1);
    }

    #[test]
    fn derived_fields_reject_writes() {
        let mut grid = c_band_grid();
        let err = grid
            .set_all(Field::StartFrequency, 1.0.into())
            .unwrap_err();
        assert!(matches!(err, WssError::ReadonlyAttribute("start_frequency")));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let mut grid = c_band_grid();
        let err = grid.set_all(Field::Port, true.into()).unwrap_err();
        assert!(matches!(err, WssError::FieldTypeMismatch { .. }));
    }

    #[test]
    fn slice_mut_edits_parent_in_place() {
        let mut grid = c_band_grid();
        grid.slice_mut(0..7).set_all(Field::Port, 2u32.into()).unwrap();
        assert_eq!(grid[0].port(), 2);
        assert_eq!(grid[6].port(), 2);
        assert_eq!(grid[7].port(), 1);
    }

    #[test]
    fn subgrid_and_select_are_copies() {
        let grid = c_band_grid();
        let mut sub = grid.subgrid(0..3);
        sub.set_all(Field::Blocked, true.into()).unwrap();
        assert!(!grid[0].blocked());

        let picked = grid.select(&[5, 1, 3]);
        assert_eq!(picked.len(), 3);
        assert_eq!(
            picked[0].central_frequency(),
            grid[5].central_frequency()
        );
    }

    #[test]
    fn freeze_seals_every_channel_and_copy_thaws() {
        let mut grid = FixedGridSpec {
            number: 3,
            ..FixedGridSpec::default()
        }
        .build();
        grid.freeze();
        assert!(grid.iter().all(Channel::is_frozen));
        assert!(grid.set_all(Field::Port, 2u32.into()).is_err());

        let mut thawed = grid.copy();
        assert!(thawed.iter().all(|c| !c.is_frozen()));
        thawed.set_all(Field::Port, 2u32.into()).unwrap();
    }

    #[test]
    fn sorted_by_frequency_orders_ascending() {
        let grid = Grid::new(vec![
            Channel::new(193.5, 50.0),
            Channel::new(191.8, 50.0),
            Channel::new(192.4, 50.0),
        ])
        .sorted_by_frequency();
        let centers: Vec<f64> = grid.iter().map(|c| c.central_frequency()).collect();
        assert!(centers.windows(2).all(|w| w[0] <= w[1]));
    }
}
