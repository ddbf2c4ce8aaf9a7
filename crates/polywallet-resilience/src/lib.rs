//! # Polywallet Resilience
//!
//! Timing primitives for talking to wallet providers that acknowledge
//! requests before their effect is visible.
//!
//! [`await_condition`] re-checks a predicate on a fixed tick and reports
//! [`PollOutcome::Confirmed`] or [`PollOutcome::TimedOut`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polywallet_resilience::{await_condition, PollConfig};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let switched = Arc::new(AtomicBool::new(false));
//! let flag = switched.clone();
//!
//! // 300 ms ticks, give up after 5 s
//! let outcome = await_condition(PollConfig::chain_switch(), move || {
//!     let flag = flag.clone();
//!     async move { flag.load(Ordering::SeqCst) }
//! })
//! .await;
//!
//! if !outcome.is_confirmed() {
//!     println!("user never switched");
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod poll;

pub use poll::{await_condition, PollConfig, PollLimit, PollOutcome};
