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

use crate::domain::DomainId;
use crate::message::MessageId;

/// Misuse of the message graph or the domain tree.
///
/// These are programming errors surfaced synchronously to the caller that
/// constructed or restructured the message; they are never re-published.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The predecessors span parallel domains that do not reduce to one.
    #[error("predecessors span {} parallel domains that cannot be reduced to one", candidates.len())]
    DomainConflict {
        /// The surviving candidate domains.
        candidates: Vec<DomainId>,
    },
    /// No node reachable from the head carries the requested kind.
    #[error("no {kind} reachable from message {head}")]
    KindNotFound {
        /// Type name of the requested payload.
        kind: &'static str,
        /// Head of the searched chain.
        head: MessageId,
    },
    /// A follow-up message was built without any predecessor.
    #[error("a follow-up message needs at least one predecessor")]
    NoPredecessors,
    /// A fan-out was requested for an empty set of messages.
    #[error("cannot create domains for an empty set of messages")]
    EmptyFanOut,
    /// A child passed to a new message is wrapped by a decorator.
    #[error("message {0} is not the head of its chain")]
    NotHead(MessageId),
    /// The same child was passed twice.
    #[error("message {0} was given as a child more than once")]
    DuplicateChild(MessageId),
    /// A replacement already has a structural position of its own.
    #[error("message {0} is already part of a decorator chain")]
    NotStandalone(MessageId),
}
