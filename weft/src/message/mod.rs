//! Defines the causal message graph and the messages the runtime itself publishes.
//!
//! # Key Components
//!
//! *   [`Message`]: a handle to a node of the append-only causal DAG. Nodes are
//!     stored per decorator chain in arena tables, so decorating and replacing
//!     are id swaps under one lock.
//! *   [`Typed`]: a node found by kind, dereferencing to its payload.
//! *   [`DisposeGuard`]: holds off a node's disposal.
//! *   [`MessageContext`]: what every agent callback receives.
//! *   [`TraceRecord`]: the structured record emitted per top-level publish.
//! *   [`Initialize`], [`Exception`], [`NewDomains`], [`TerminatedDomains`]: the
//!     built-in message kinds.

/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

// --- Public Re-exports ---
pub use builtin::{Exception, Initialize, NewDomains, TerminatedDomains};
pub use definition::{MessageDefinition, MessageId};
pub use graph::{Message, Typed};
pub use graph_error::GraphError;
pub use lifetime::DisposeGuard;
pub use message_context::MessageContext;
pub use trace_record::TraceRecord;

// --- Crate-Internal Re-exports ---
pub(crate) use graph::ChainPosition;

// --- Submodules ---

/// Defines the built-in message kinds.
mod builtin;
/// Defines [`MessageId`] and [`MessageDefinition`].
mod definition;
/// Arena storage for decorator chains.
mod family;
/// Defines [`Message`] and [`Typed`].
mod graph;
/// Defines [`GraphError`].
mod graph_error;
/// Use counting and [`DisposeGuard`].
mod lifetime;
/// Defines [`MessageContext`] passed to agent callbacks.
mod message_context;
/// Defines [`TraceRecord`].
mod trace_record;
