// ABOUTME: Chat orchestration for the journaling assistant
// ABOUTME: Builds completion contexts and resolves chat targets to containers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! # Chat Orchestration
//!
//! Two pieces sit between the HTTP routes and the storage layer:
//!
//! - the context builder assembles the ordered message sequence sent to the
//!   completion provider (system prompt, bounded window of prior turns, new
//!   user turn);
//! - the resolver maps a chat request's optional target (conversation id,
//!   date, or thread id) to the concrete conversation the turn lands in.

mod context;
mod resolver;

pub use context::build_context;
pub use resolver::{auto_thread_label, canonical_day, resolve_target, ChatTarget, ResolvedTarget};
