//! Defines the board: agent registration and the publish pipeline.
//!
//! *   [`Board<Idle>`](Board): registration of consumers and interceptors by kind.
//! *   [`BoardHandle`]: the started board. `publish` runs the interceptors of a
//!     chain, tallies their [`InterceptionAction`] votes and delivers each node
//!     to the consumers of its kind, tracking use counts for disposal.
//!
//! Failures inside callbacks never escape the board: they are re-published as
//! [`Exception`](crate::message::Exception) messages.

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

pub use board_handle::BoardHandle;
pub use idle::{AgentRegistration, Board, Idle};
pub use tally::InterceptionAction;

pub(crate) use tally::VoteTally;

/// Defines [`BoardHandle`] and the publish pipeline.
mod board_handle;
/// Defines [`Board`] in its [`Idle`] state.
mod idle;
/// Defines [`InterceptionAction`] and vote tallying.
mod tally;
