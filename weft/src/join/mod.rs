//! Defines the join primitives agents use to combine concurrently arriving messages.
//!
//! *   [`Collector`]: the latest message of each of several kinds per domain,
//!     firing whenever a domain has all of them.
//! *   [`Aggregator`]: every message of one kind from one fan-out, firing once
//!     all branches have reported.
//!
//! Each instance guards its state with one lock that is never held while the
//! user callback runs.

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

pub use aggregator::{Aggregated, Aggregator};
pub use collector::{CollectedSet, Collector, CollectorSlots};
pub use join_error::JoinError;

/// Defines [`Aggregator`].
mod aggregator;
/// Defines [`Collector`] and [`CollectorSlots`].
mod collector;
/// Defines [`JoinError`].
mod join_error;
