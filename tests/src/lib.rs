//! # Nitro Test Suite
//!
//! Cross-crate scenarios that need more than one collaborator.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── mocks.rs          # Scripted Server/Client doubles recording call order
//! └── integration/
//!     ├── lifecycle.rs  # start/stop/run hook and failure ordering
//!     ├── options.rs    # init composition and collaborator wiring
//!     └── facade.rs     # execute/broadcast/register/subscribe end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p nitro-tests
//! cargo test -p nitro-tests integration::lifecycle::
//!
//! # Benchmarks
//! cargo bench -p nitro-tests
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod mocks;
