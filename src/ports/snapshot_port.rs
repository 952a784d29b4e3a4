//! Market snapshot provider port.

use crate::domain::error::AutotraderError;
use crate::domain::snapshot::Snapshot;

pub trait SnapshotPort {
    /// Fails with `NotFound`, `NetworkFailure`, `RateLimited` or
    /// `InsufficientData`; the caller skips the symbol for this pass.
    fn get_snapshot(&self, symbol: &str) -> Result<Snapshot, AutotraderError>;
}
