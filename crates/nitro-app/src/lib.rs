//! # Nitro Application
//!
//! The runtime composition root for a distributed service.
//!
//! An [`Application`] holds one [`Client`](nitro_rpc::Client) and one
//! [`Server`](nitro_rpc::Server), both wired to the same Broker, Registry and
//! Transport. It drives the process lifecycle through four ordered hook
//! phases and forwards `execute`/`broadcast`/`register`/`subscribe` to its
//! collaborators.
//!
//! ## Lifecycle
//!
//! ```text
//!   Created ──init()──→ Initialized ──start()──→ Started ──stop()──→ Stopped
//!
//!   start():  before_start* ─→ server.start() ─→ after_start*     (fail-fast)
//!   stop():   before_stop*  ─→ server.stop()  ─→ after_stop*      (best-effort hooks)
//!   run():    start() ─→ context.done() ─→ stop()
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nitro_app::{options, Application};
//!
//! let (ctx, cancel) = nitro_types::Context::with_cancel();
//! let app = Application::new(vec![
//!     options::name("greeter"),
//!     options::context(ctx),
//!     options::after_start(|| { tracing::info!("up"); Ok(()) }),
//! ]);
//! app.register(greeter_routes()).await?;
//! app.run().await?;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod application;
pub mod error;
pub mod options;

pub use application::{Application, LifecycleState};
pub use error::{AppError, HookPhase};
pub use options::{Hook, OptionFn, Options};
