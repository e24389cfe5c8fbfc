// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Default values and bounds for distributed backend configuration.

pub const DEFAULT_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_GROUP: &str = "taskwire";
pub const DEFAULT_POOL_SIZE: usize = 8;
pub const MIN_POOL_SIZE: usize = 1;
pub const MAX_POOL_SIZE: usize = 128;
pub const DEFAULT_BLOCK_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_BATCH_SIZE: usize = 8;
