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

#![forbid(unsafe_code)]
#![forbid(missing_docs)]

//! # Weft
//!
//! An in-process message board. Agents never call each other; they publish
//! immutable messages that name their causal predecessors, and the board
//! delivers each message to every agent registered for its kind on the tokio
//! worker pool.
//!
//! ## Key Concepts
//!
//! - **Messages (`Message`)**: nodes of an append-only causal DAG. A message may
//!   be wrapped by decorators that add further typed facets at the same causal
//!   position.
//! - **Domains (`MessageDomain`, `DomainTree`)**: a tree grouping the messages
//!   produced by one fan-out, used to scope joins.
//! - **Board (`Board<Idle>`, `BoardHandle`)**: registration tables plus the
//!   publish, interception and delivery pipeline.
//! - **Joins (`Collector`, `Aggregator`)**: synchronization helpers that combine
//!   concurrently arriving messages per domain.
//! - **Disposal**: every node carries a use count set by the board; the node is
//!   disposed exactly when its last consumer (and last `DisposeGuard`) is done.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weft::prelude::*;
//!
//! #[weft_message]
//! struct Greeting {
//!     text: String,
//! }
//!
//! let mut board = WeftApp::launch();
//! board
//!     .agent("greeter")?
//!     .act_on::<Initialize>(|ctx| {
//!         let greeting = ctx.follow_up(Greeting { text: "hello".into() });
//!         Reply::pending(async move {
//!             ctx.publish(&greeting?);
//!             Ok(())
//!         })
//!     });
//! let handle = board.start();
//! handle.wait_idle().await;
//! ```

// Lets `#[weft_message]` expand to `::weft::...` paths inside this crate too.
extern crate self as weft;

/// Entry point, configuration, callback types and reply helpers.
pub(crate) mod common;

/// The causal message graph: nodes, decorators, disposal and trace records.
pub(crate) mod message;

/// The domain tree and domain resolution.
pub(crate) mod domain;

/// The board: registration and the publish/interception/delivery pipeline.
pub(crate) mod board;

/// Collector and Aggregator join primitives.
pub(crate) mod join;

/// Core traits every message kind implements.
pub(crate) mod traits;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `weft-macro`)
/// *   [`weft_macro::weft_message`]: Attribute macro for declaring message kinds.
///
/// ## External Crates
/// *   [`acton_ern::Ern`](https://docs.rs/acton-ern): Agent identities.
///
/// ## Core Types
/// *   [`crate::message::Message`], [`crate::message::Typed`]: Graph nodes and typed facets.
/// *   [`crate::message::MessageContext`]: What every agent callback receives.
/// *   [`crate::domain::MessageDomain`], [`crate::domain::DomainTree`]: Fan-out bookkeeping.
/// *   [`crate::board::Board`], [`crate::board::BoardHandle`]: Registration and dispatch.
/// *   [`crate::join::Collector`], [`crate::join::Aggregator`]: Join primitives.
/// *   [`crate::common::WeftApp`], [`crate::common::Reply`]: Entry point and reply helpers.
pub mod prelude {
    pub use weft_macro::weft_message;

    pub use acton_ern::Ern;

    pub use crate::board::{AgentRegistration, Board, BoardHandle, Idle, InterceptionAction};
    pub use crate::common::config::{
        DefaultsConfig, DispatchConfig, JoinsConfig, TimeoutConfig, WeftConfig, CONFIG,
    };
    pub use crate::common::{FutureBox, Reply, VoteBox, WeftApp};
    pub use crate::domain::{DomainId, DomainTree, MessageDomain, SiblingSet};
    pub use crate::join::{Aggregated, Aggregator, CollectedSet, Collector, CollectorSlots, JoinError};
    pub use crate::message::{
        DisposeGuard, Exception, GraphError, Initialize, Message, MessageContext,
        MessageDefinition, MessageId, NewDomains, TerminatedDomains, TraceRecord, Typed,
    };
    pub use crate::traits::{MessageKind, WeftMessage};
}
