//! Cost Ledger: per-session spend tracking against a hard ceiling.
//!
//! Amounts are held as integer micro-dollars in a single `AtomicU64` so the
//! check-and-add is one compare-and-swap. Nothing here blocks.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

const MICROS_PER_DOLLAR: f64 = 1_000_000.0;

/// Outcome of a [`CostLedger::reserve`] call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reservation {
    pub granted: bool,
    /// Budget left after this call, in dollars.
    pub remaining: f64,
}

#[derive(Debug)]
pub struct CostLedger {
    spent: AtomicU64,
    ceiling: u64,
}

impl CostLedger {
    pub fn new(ceiling: f64) -> Self {
        Self {
            spent: AtomicU64::new(0),
            ceiling: to_micros(ceiling),
        }
    }

    /// Adds `amount` to the spend unless that would take it past the ceiling.
    /// Spend may land exactly on the ceiling.
    pub fn reserve(&self, amount: f64) -> Reservation {
        let micros = to_micros(amount);
        let result = self
            .spent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current
                    .checked_add(micros)
                    .filter(|next| *next <= self.ceiling)
            });

        match result {
            Ok(previous) => Reservation {
                granted: true,
                remaining: from_micros(self.ceiling.saturating_sub(previous + micros)),
            },
            Err(current) => Reservation {
                granted: false,
                remaining: from_micros(self.ceiling.saturating_sub(current)),
            },
        }
    }

    /// Gives back a granted reservation. Never drops spend below zero.
    pub fn release(&self, amount: f64) {
        let micros = to_micros(amount);
        if micros == 0 {
            return;
        }
        // the closure always returns Some, so this cannot fail
        let _ = self
            .spent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(micros))
            });
    }

    pub fn spent(&self) -> f64 {
        from_micros(self.spent.load(Ordering::Acquire))
    }

    pub fn remaining(&self) -> f64 {
        from_micros(self.ceiling.saturating_sub(self.spent.load(Ordering::Acquire)))
    }

    pub fn ceiling(&self) -> f64 {
        from_micros(self.ceiling)
    }
}

/// Negative, NaN and infinite amounts count as zero.
fn to_micros(amount: f64) -> u64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    (amount * MICROS_PER_DOLLAR).round() as u64
}

fn from_micros(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_DOLLAR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_second_reservation_rejected_at_ceiling() {
        let ledger = CostLedger::new(0.20);
        let first = ledger.reserve(0.15);
        assert!(first.granted);
        assert!((first.remaining - 0.05).abs() < 1e-9);

        let second = ledger.reserve(0.15);
        assert!(!second.granted);
        assert!((ledger.spent() - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_spend_may_reach_ceiling_exactly() {
        let ledger = CostLedger::new(0.01);
        assert!(ledger.reserve(0.005).granted);
        assert!(ledger.reserve(0.005).granted);
        assert_eq!(ledger.remaining(), 0.0);
        assert!(!ledger.reserve(0.000001).granted);
        // free calls always pass
        assert!(ledger.reserve(0.0).granted);
    }

    #[test]
    fn test_release_restores_budget() {
        let ledger = CostLedger::new(0.20);
        assert!(ledger.reserve(0.15).granted);
        ledger.release(0.15);
        assert_eq!(ledger.spent(), 0.0);
        assert!(ledger.reserve(0.15).granted);
    }

    #[test]
    fn test_release_never_goes_negative() {
        let ledger = CostLedger::new(0.20);
        ledger.release(1.0);
        assert_eq!(ledger.spent(), 0.0);
    }

    #[test]
    fn test_invalid_amounts_are_zero() {
        let ledger = CostLedger::new(0.10);
        assert!(ledger.reserve(-5.0).granted);
        assert!(ledger.reserve(f64::NAN).granted);
        assert!(ledger.reserve(f64::INFINITY).granted);
        assert_eq!(ledger.spent(), 0.0);
    }

    #[test]
    fn test_concurrent_reservations_never_exceed_ceiling() {
        let ledger = Arc::new(CostLedger::new(0.50));
        let granted = Arc::new(AtomicUsize::new(0));

        std::thread::scope(|scope| {
            for _ in 0..16 {
                let ledger = Arc::clone(&ledger);
                let granted = Arc::clone(&granted);
                scope.spawn(move || {
                    for _ in 0..25 {
                        if ledger.reserve(0.005).granted {
                            granted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        assert_eq!(granted.load(Ordering::Relaxed), 100);
        assert!((ledger.spent() - 0.50).abs() < 1e-9);
        assert!(ledger.spent() <= ledger.ceiling());
    }
}
