// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Connector backend implementations.
//!
//! Each backend implements the [`Backend`](crate::traits::Backend) seam and
//! decides how a dispatched process is executed:
//!
//! * `local`: in-memory spec-to-implementation table, trivial dispatch.
//! * `distributed`: cross-process dispatch over a broker offering
//!   append-only streams, consumer groups, blocking pops, and keyed queues.

pub mod distributed;
pub mod local;
