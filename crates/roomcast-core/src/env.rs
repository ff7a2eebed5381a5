//! Environment abstraction for deterministic testing.
//!
//! Decouples broker logic from system resources (wall clock, randomness,
//! sleeping) so tests can pin timestamps and production can use real ones.

use std::time::Duration;

use roomcast_proto::format_timestamp;

/// Abstract environment providing time, randomness, and async sleep.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant. Simulations substitute a pausable clock.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Wait for `duration`. Only the quit grace period sleeps.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Seconds since the Unix epoch, used for record timestamps.
    fn wall_clock_secs(&self) -> u64;

    /// Generates a random `u64`, used for session ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Record timestamp (`HH:MM`) for the current wall clock.
    fn timestamp(&self) -> String {
        format_timestamp(self.wall_clock_secs())
    }
}
