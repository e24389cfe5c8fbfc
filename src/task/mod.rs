// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The task model: specs, definitions, processes, contexts, implementations.
//!
//! A [`Spec`] names a task and carries its validators; a [`Definition`] mints
//! immutable [`Process`] records for it; an [`Implementation`] pairs the
//! definition with executable behavior; a [`Context`] scopes related
//! invocations; an [`Environment`] is handed to behaviors per dispatch.

mod context;
mod environment;
mod implementation;
mod process;
mod spec;

pub use context::{Context, ContextSnapshot, ContextValue, Scalar};
pub use environment::Environment;
pub use implementation::{encase, Behavior, Implementation, Invocation};
pub use process::{Definition, Process};
pub use spec::Spec;
