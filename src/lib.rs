#![forbid(unsafe_code)]

//! fixpulse: client-side data synchronization for a CI/CD failure and
//! AI-fix monitoring service.
//!
//! Every view keeps a local snapshot of server-owned state current under
//! periodic polling, manual refresh, and filter/pagination changes:
//! 1. **Gateway**: typed, timeout-bounded HTTP client, one method per operation
//! 2. **Query sync**: filter/pagination state round-tripped through a shareable query string
//! 3. **Controller**: per-view poll-and-refresh state machine with stale-response rejection
//! 4. **Health monitor**: two concurrent probes folded into online/offline/unknown
//!
//! # Library usage
//!
//! ```rust,no_run
//! use fixpulse::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use fixpulse::core::config::Config;
//! use fixpulse::pagination::compute_window;
//! ```

pub mod prelude;

pub mod core;
pub mod gateway;
pub mod health;
pub mod logger;
pub mod pagination;
pub mod query;
pub mod sync;
pub mod views;
