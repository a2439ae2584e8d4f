//! Switch state management: the current grid, the last committed
//! snapshot, and the adapter lifecycle around commits.

use anyhow::Result;
use async_trait::async_trait;

use crate::delta::Delta;
use crate::grid::Grid;

/// Read-only view of a switch handed to adapter hooks.
#[derive(Clone, Copy)]
pub struct WssView<'a> {
    /// Current (possibly uncommitted) grid, sorted by central frequency.
    pub grid: &'a Grid,
    /// Last successfully committed grid, frozen; `None` before the first
    /// commit.
    pub previous_state: Option<&'a Grid>,
}

impl WssView<'_> {
    /// Structural difference between the previous snapshot (or an empty
    /// grid) and the current grid.
    pub fn changes(&self) -> Delta {
        let previous = self
            .previous_state
            .map(Grid::states)
            .unwrap_or_default();
        Delta::between(&previous, &self.grid.states())
    }
}

/// Outcome of a [`Adapter::rescue_transaction`] hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rescue {
    /// The adapter recovered; the error is suppressed and the
    /// transaction ends without committing.
    Handled,
    /// The error propagates to the caller.
    Propagate,
}

/// Device adapter lifecycle hooks.
///
/// Every hook has a default no-op body, so adapters implement only the
/// capabilities they have. The switch calls all of them unconditionally
/// at the defined lifecycle points.
#[async_trait]
pub trait Adapter: Send {
    /// Called once when the adapter is attached to a switch.
    async fn init(&mut self, _wss: WssView<'_>) -> Result<()> {
        Ok(())
    }

    /// Check the grid against device constraints before a commit.
    async fn validate(&mut self, _wss: WssView<'_>) -> Result<()> {
        Ok(())
    }

    /// Push the grid to the device.
    async fn commit(&mut self, _wss: WssView<'_>) -> Result<()> {
        Ok(())
    }

    /// Bracket hook invoked when a transaction block opens.
    async fn begin_transaction(&mut self, _wss: WssView<'_>) -> Result<()> {
        Ok(())
    }

    /// Offered the error when a transaction block or its commit fails.
    /// Only an explicit [`Rescue::Handled`] suppresses propagation.
    async fn rescue_transaction(
        &mut self,
        _wss: WssView<'_>,
        _err: &anyhow::Error,
    ) -> Rescue {
        Rescue::Propagate
    }

    /// Bracket hook invoked after a transaction commits successfully.
    async fn finish_transaction(&mut self, _wss: WssView<'_>) -> Result<()> {
        Ok(())
    }
}

/// A wavelength selective switch: one mutable grid, one frozen snapshot
/// of the last committed state, and an optional device adapter.
pub struct Wss {
    grid: Grid,
    previous_state: Option<Grid>,
    adapter: Option<Box<dyn Adapter>>,
}

impl Wss {
    /// Build a switch around `grid`, re-sorting its channels by
    /// ascending central frequency. Runs the adapter `init` hook.
    pub async fn new(grid: Grid, adapter: Option<Box<dyn Adapter>>) -> Result<Self> {
        if adapter.is_none() {
            tracing::warn!("no adapter specified for WSS; commits will only update local state");
        }
        let mut wss = Self {
            grid: grid.sorted_by_frequency(),
            previous_state: None,
            adapter,
        };
        if let Some(adapter) = wss.adapter.as_mut() {
            let view = WssView {
                grid: &wss.grid,
                previous_state: wss.previous_state.as_ref(),
            };
            adapter.init(view).await?;
        }
        Ok(wss)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    /// Replace the grid; channels are re-sorted by central frequency.
    pub fn set_grid(&mut self, grid: Grid) {
        self.grid = grid.sorted_by_frequency();
    }

    pub fn previous_state(&self) -> Option<&Grid> {
        self.previous_state.as_ref()
    }

    /// Send pending changes to the equipment via the adapter.
    ///
    /// On success the previous state becomes a frozen copy of the
    /// current grid; on any error it is left untouched and the error
    /// propagates.
    pub async fn commit(&mut self) -> Result<()> {
        if let Some(adapter) = self.adapter.as_mut() {
            let view = WssView {
                grid: &self.grid,
                previous_state: self.previous_state.as_ref(),
            };
            adapter.validate(view).await?;
            adapter.commit(view).await?;
        }
        self.previous_state = Some(self.grid.copy().frozen());
        Ok(())
    }

    /// Run `f` against the grid and commit the result as one unit.
    ///
    /// The adapter's `begin_transaction`/`finish_transaction` hooks
    /// bracket a successful run. If `f` or the commit fails, the
    /// adapter's `rescue_transaction` hook is offered the error first;
    /// unless it reports [`Rescue::Handled`], the error propagates.
    pub async fn transaction<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Grid) -> Result<()>,
    {
        if let Some(adapter) = self.adapter.as_mut() {
            let view = WssView {
                grid: &self.grid,
                previous_state: self.previous_state.as_ref(),
            };
            adapter.begin_transaction(view).await?;
        }

        let result = match f(&mut self.grid) {
            Ok(()) => self.commit().await,
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => {
                if let Some(adapter) = self.adapter.as_mut() {
                    let view = WssView {
                        grid: &self.grid,
                        previous_state: self.previous_state.as_ref(),
                    };
                    adapter.finish_transaction(view).await?;
                }
                Ok(())
            }
            Err(err) => {
                if let Some(adapter) = self.adapter.as_mut() {
                    let view = WssView {
                        grid: &self.grid,
                        previous_state: self.previous_state.as_ref(),
                    };
                    if adapter.rescue_transaction(view, &err).await == Rescue::Handled {
                        tracing::debug!(error = %err, "transaction error handled by adapter");
                        return Ok(());
                    }
                }
                Err(err)
            }
        }
    }

    /// Structural difference between the last committed snapshot and the
    /// current grid.
    pub fn changes(&self) -> Delta {
        WssView {
            grid: &self.grid,
            previous_state: self.previous_state.as_ref(),
        }
        .changes()
    }

    /// True if any channel changed since the last commit.
    pub fn dirty(&self) -> bool {
        !self.changes().is_empty()
    }
}
