//! Uncommitted local capacity tracking
//!
//! The ledger is single-owner state of the engine; callers serialise access
//! through the engine's mutex. Reserve and release are the only mutators and
//! are paired per task: reserve at local placement, release in the local
//! execution path's cleanup step.

use tracing::warn;

use crate::error::{DimmaError, DimmaResult};
use crate::types::ResourceEstimate;

pub struct ResourceLedger {
    initial: ResourceEstimate,
    available: ResourceEstimate,
}

impl ResourceLedger {
    pub fn new(capacity: ResourceEstimate) -> Self {
        Self {
            initial: capacity,
            available: capacity,
        }
    }

    /// Current uncommitted capacity.
    pub fn available(&self) -> ResourceEstimate {
        self.available
    }

    /// True when the uncommitted capacity covers `request`.
    pub fn fits(&self, request: &ResourceEstimate) -> bool {
        self.available.covers(request)
    }

    /// Subtract `request` from the uncommitted counters. The placement
    /// engine verifies fit first; a failure here aborts the task.
    pub fn reserve(&mut self, request: &ResourceEstimate) -> DimmaResult<()> {
        if !self.fits(request) {
            return Err(DimmaError::InsufficientResources {
                requested: format!(
                    "cpu {}, ram {}GB, gpu {}",
                    request.cpu_cores, request.ram_gb, request.gpu_units
                ),
                available: format!(
                    "cpu {}, ram {}GB, gpu {}",
                    self.available.cpu_cores, self.available.ram_gb, self.available.gpu_units
                ),
            });
        }
        self.available.cpu_cores -= request.cpu_cores;
        self.available.ram_gb -= request.ram_gb;
        self.available.gpu_units -= request.gpu_units;
        Ok(())
    }

    /// Add `request` back. Each counter is capped at its initial value so a
    /// mismatched release cannot inflate capacity.
    pub fn release(&mut self, request: &ResourceEstimate) {
        let restored = ResourceEstimate::new(
            self.available.cpu_cores + request.cpu_cores,
            self.available.ram_gb + request.ram_gb,
            self.available.gpu_units + request.gpu_units,
        );
        if restored.cpu_cores > self.initial.cpu_cores
            || restored.ram_gb > self.initial.ram_gb
            || restored.gpu_units > self.initial.gpu_units
        {
            warn!("release exceeds ledger capacity; counters clamped to initial values");
        }
        self.available = ResourceEstimate::new(
            restored.cpu_cores.min(self.initial.cpu_cores),
            restored.ram_gb.min(self.initial.ram_gb),
            restored.gpu_units.min(self.initial.gpu_units),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_release_round_trip() {
        let mut ledger = ResourceLedger::new(ResourceEstimate::new(4.0, 8.0, 1.0));
        let request = ResourceEstimate::new(1.0, 2.0, 0.0);

        ledger.reserve(&request).unwrap();
        assert_eq!(ledger.available(), ResourceEstimate::new(3.0, 6.0, 1.0));

        ledger.release(&request);
        assert_eq!(ledger.available(), ResourceEstimate::new(4.0, 8.0, 1.0));
    }

    #[test]
    fn test_reserve_rejects_overdraw() {
        let mut ledger = ResourceLedger::new(ResourceEstimate::new(1.0, 1.0, 0.0));
        let result = ledger.reserve(&ResourceEstimate::new(2.0, 0.5, 0.0));
        assert!(matches!(
            result,
            Err(DimmaError::InsufficientResources { .. })
        ));
        // A rejected reserve must not move the counters.
        assert_eq!(ledger.available(), ResourceEstimate::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_release_clamps_at_initial() {
        let mut ledger = ResourceLedger::new(ResourceEstimate::new(2.0, 2.0, 0.0));
        ledger.release(&ResourceEstimate::new(5.0, 5.0, 1.0));
        assert_eq!(ledger.available(), ResourceEstimate::new(2.0, 2.0, 0.0));
    }
}
