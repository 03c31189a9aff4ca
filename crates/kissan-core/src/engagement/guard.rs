use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-lifetime "already rewarded" flag.
///
/// Shared by every engine a provider creates, so a sign-out/sign-in cycle
/// cannot earn a second reward. Once claimed it is never released.
#[derive(Debug, Clone, Default)]
pub struct RewardGuard {
    claimed: Arc<AtomicBool>,
}

impl RewardGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// Claim the reward. Returns `true` only for the first caller.
    pub fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_claim_succeeds_across_clones() {
        let guard = RewardGuard::new();
        let other = guard.clone();
        assert!(!other.is_claimed());
        assert!(guard.try_claim());
        assert!(!other.try_claim());
        assert!(other.is_claimed());
    }
}
