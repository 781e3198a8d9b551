//! Pluggable nonce sourcing for replay guards.

use rand::Rng;

/// Supplies replay-guard nonces. The contract's consumed-nonce set is not
/// observable from the client, so production sources rely on uniform
/// randomness over a space wide enough to make collision negligible.
pub trait NonceSource: Send + Sync {
    fn next_nonce(&self) -> u64;
}

/// Uniform draw over the full u64 space. Never a counter: a counter restarts
/// from a known point and would collide with nonces the vault has already
/// consumed.
pub struct RandomNonceSource;

impl NonceSource for RandomNonceSource {
    fn next_nonce(&self) -> u64 {
        rand::thread_rng().gen()
    }
}

/// Deterministic source for tests.
pub struct FixedNonceSource {
    value: u64,
}

impl FixedNonceSource {
    pub fn new(value: u64) -> Self {
        Self { value }
    }
}

impl NonceSource for FixedNonceSource {
    fn next_nonce(&self) -> u64 {
        self.value
    }
}
