// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod backend;
mod runner;

pub use backend::{Backend, Registration, ServeHandle};
pub use runner::ProcessRunner;
