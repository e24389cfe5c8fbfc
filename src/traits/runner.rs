// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::connector::RunHandle;
use crate::task::Process;

/// Re-entry seam into the connector.
///
/// Held by contexts and environments so that `Context::run` and
/// `Environment::run_child` can enter `Connector::run` without depending on
/// the concrete connector type.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, process: Process) -> RunHandle;
}
