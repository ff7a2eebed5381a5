//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` backs the broker with real time and OS randomness:
//!
//! - Monotonic time (`std::time::Instant`) for connection bookkeeping
//! - Wall-clock time (`SystemTime`) for record timestamps
//! - OS cryptographic RNG (getrandom) for session ids
//! - Tokio async sleep for the quit grace period

use std::time::Duration;

use roomcast_core::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. Session ids must be unpredictable; a server
/// without working randomness cannot hand them out.
#[derive(Clone, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_secs(&self) -> u64 {
        // A clock set before 1970 stamps records 00:00 rather than failing.
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}
