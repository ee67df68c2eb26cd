//! # Nitro Types Crate
//!
//! Primitives shared across the collaborator crates.
//!
//! ## Contents
//!
//! - [`Context`]: cancellable execution scope handed to client calls and
//!   awaited by `Application::run`
//! - [`Metadata`]: string header map carried on frames, messages and
//!   registry records
//! - [`BoxError`]: the error type returned by user-supplied callbacks

pub mod context;

pub use context::{CancelHandle, Context};

use std::collections::HashMap;

/// Header/metadata map attached to frames, broker messages and services.
pub type Metadata = HashMap<String, String>;

/// Boxed error returned by user-supplied callbacks (hooks, handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
