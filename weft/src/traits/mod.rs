//! Defines the traits every message payload implements.
//!
//! *   [`WeftMessage`]: the object-safe view the board and the graph work with.
//! *   [`MessageKind`]: the static side of a kind, used to register agents and to
//!     look facets up by type.
//!
//! Both are normally implemented by the `#[weft_message]` attribute.

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

pub use weft_message::{MessageKind, WeftMessage};

/// Defines [`WeftMessage`] and [`MessageKind`].
mod weft_message;
