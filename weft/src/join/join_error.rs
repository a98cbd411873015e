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
use thiserror::Error;

use crate::message::{GraphError, MessageDefinition, MessageId};

/// Misuse of a [`Collector`](crate::join::Collector) or an
/// [`Aggregator`](crate::join::Aggregator), reported synchronously to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The message carries none of the tracked kinds.
    #[error("message {message} of kind {definition} matches no tracked kind")]
    UnexpectedKind {
        /// The rejected message.
        message: MessageId,
        /// The kind of its head.
        definition: MessageDefinition,
    },
    /// Building the termination notice failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
