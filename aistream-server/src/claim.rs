//! Non-blocking single-holder claims
//!
//! A [`ClaimFlag`] is either free or held by exactly one [`Claim`]. Claiming
//! never waits: a second claimant gets `None`. Dropping the claim frees the
//! flag, which covers normal return, early return, panic unwinding and a
//! detached task finishing after its caller stopped waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag; clones refer to the same flag
#[derive(Debug, Clone, Default)]
pub struct ClaimFlag {
    held: Arc<AtomicBool>,
}

/// Proof of holding a [`ClaimFlag`], released on drop
#[derive(Debug)]
pub struct Claim {
    held: Arc<AtomicBool>,
}

impl ClaimFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag if it is free
    pub fn try_claim(&self) -> Option<Claim> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Claim {
                held: Arc::clone(&self.held),
            })
    }

    pub fn is_claimed(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_and_released_on_drop() {
        let flag = ClaimFlag::new();

        let claim = flag.try_claim().unwrap();
        assert!(flag.is_claimed());
        assert!(flag.try_claim().is_none());
        assert!(flag.clone().try_claim().is_none());

        drop(claim);
        assert!(!flag.is_claimed());
        assert!(flag.try_claim().is_some());
    }

    #[test]
    fn test_claim_released_on_panic() {
        let flag = ClaimFlag::new();
        let inner = flag.clone();

        let result = std::panic::catch_unwind(move || {
            let _claim = inner.try_claim().unwrap();
            panic!("cycle blew up");
        });

        assert!(result.is_err());
        assert!(!flag.is_claimed());
    }

    #[test]
    fn test_concurrent_claims_admit_one() {
        let flag = ClaimFlag::new();
        let barrier = Arc::new(std::sync::Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flag = flag.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    // Hold the claim past the join so losers cannot retry into a free flag
                    flag.try_claim()
                })
            })
            .collect();

        let claims: Vec<Claim> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(claims.len(), 1);
    }
}
