//! Deterministic test harness for the roomcast broker.
//!
//! - [`SimEnv`]: seeded RNG, settable wall clock, tokio time (so paused-clock
//!   tests drive every deadline)
//! - [`SimClient`]: a session served over the in-memory transport, with
//!   helpers for reading back wire records and control frames
//! - [`MembershipModel`]: reference model of room membership for
//!   model-based property tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod model;
pub mod sim_env;

pub use client::{Received, SimClient};
pub use model::{MembershipModel, MembershipOp};
pub use sim_env::SimEnv;
