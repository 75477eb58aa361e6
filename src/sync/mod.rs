//! Poll-and-refresh machinery shared by every view.
//!
//! - [`model`]: phases, state, messages, and commands
//! - [`controller`]: the pure state machine (no I/O)
//! - [`runtime`]: the tokio task that executes its commands

pub mod controller;
pub mod model;
pub mod runtime;

pub use controller::Controller;
pub use model::{FetchPhase, FetchState, FetchTrigger};
pub use runtime::{MountOptions, QueryDriven, ViewHandle, ViewSource, mount, mount_with_query};
