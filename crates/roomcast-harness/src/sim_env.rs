//! Simulated environment.
//!
//! Randomness comes from a seeded ChaCha RNG, so session ids repeat across
//! runs. The wall clock only moves when a test moves it, which pins record
//! timestamps. Monotonic time and sleeping go through tokio so that
//! `start_paused` tests control keepalive and deadline timing.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use roomcast_core::Environment;

/// Wall clock a fresh [`SimEnv`] starts at: 09:15 UTC on the epoch day.
pub const DEFAULT_WALL_CLOCK_SECS: u64 = 9 * 3600 + 15 * 60;

/// Deterministic environment for tests.
#[derive(Clone, Debug)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha8Rng>>,
    wall_clock: Arc<AtomicU64>,
}

impl SimEnv {
    /// Environment whose RNG is seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            wall_clock: Arc::new(AtomicU64::new(DEFAULT_WALL_CLOCK_SECS)),
        }
    }

    /// Set the wall clock to `secs` since the Unix epoch.
    pub fn set_wall_clock(&self, secs: u64) {
        self.wall_clock.store(secs, Ordering::Relaxed);
    }

    /// Move the wall clock forward.
    pub fn advance_wall_clock(&self, by: Duration) {
        self.wall_clock.fetch_add(by.as_secs(), Ordering::Relaxed);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Environment for SimEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().fill_bytes(buffer);
    }

    fn wall_clock_secs(&self) -> u64 {
        self.wall_clock.load(Ordering::Relaxed)
    }
}
