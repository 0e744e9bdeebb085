//! Consumer-facing capability shared by every random source.

use rng_core::RestorePoint;

use crate::error::SourceResult;

/// A stream of random values that can be started, resumed and replayed.
///
/// A source is initialised by exactly one of
/// [`initialize_non_repeatable`](Self::initialize_non_repeatable),
/// [`initialize_repeatable`](Self::initialize_repeatable) or
/// [`load_state`](Self::load_state), then driven by
/// [`next_value`](Self::next_value). Sources are single-consumer: share one
/// across threads by moving it, not by reference.
pub trait RandomSource: Send {
    /// Starts at an unpredictable point of the already available data.
    fn initialize_non_repeatable(&mut self) -> SourceResult<()>;

    /// Starts the stream identified by `sequence_id` from its beginning.
    fn initialize_repeatable(&mut self, sequence_id: u32) -> SourceResult<()>;

    /// Resumes from a restore point produced by [`state`](Self::state).
    ///
    /// Restore points of another source kind are ignored.
    fn load_state(&mut self, restore_point: &RestorePoint) -> SourceResult<()>;

    /// Snapshot of the current position.
    fn state(&self) -> RestorePoint;

    /// Returns the next value of the stream.
    ///
    /// A NaN marks a value that no backend could supply.
    fn next_value(&mut self) -> SourceResult<f64>;

    /// Fills `out` with consecutive values.
    fn fill(&mut self, out: &mut [f64]) -> SourceResult<()> {
        for value in out.iter_mut() {
            *value = self.next_value()?;
        }
        Ok(())
    }

    /// Releases any backend connection held by the source.
    fn disconnect(&mut self) -> SourceResult<()> {
        Ok(())
    }

    /// Human readable name of the source.
    fn description(&self) -> &str;
}
