// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Connector core: orchestrates middleware, validation, and dispatch around
//! an abstract backend.

mod core;
mod handle;
mod outcome;

#[cfg(test)]
mod integration_tests;

pub use core::Connector;
pub use handle::RunHandle;
pub use outcome::Outcome;
