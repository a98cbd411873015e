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

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::common::config::CONFIG;
use crate::join::JoinError;
use crate::message::{Message, TerminatedDomains, Typed};
use crate::traits::MessageKind;

type AggregatorCallback<T, X> = dyn Fn(&X, Aggregated<T>) + Send + Sync + 'static;

/// Joins the messages of kind `T` produced by every branch of one fan-out.
///
/// Messages are accumulated per [`SiblingSet`](crate::domain::SiblingSet).
/// When as many have arrived as the fan-out had branches, the accumulation is
/// handed to the callback and, unless [`keep_domains_open`](Self::keep_domains_open)
/// was called, every sibling domain is terminated first, so the callback can
/// build a message from all of them that resolves to the parent domain.
///
/// A message in the default domain is a fan-out of one and completes on its own.
pub struct Aggregator<T: MessageKind, X = ()> {
    pending: Mutex<HashMap<Uuid, Vec<Typed<T>>>>,
    terminate: bool,
    callback: Box<AggregatorCallback<T, X>>,
}

impl<T: MessageKind, X> fmt::Debug for Aggregator<T, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("kind", &T::KIND)
            .field("pending", &self.pending.lock().len())
            .field("terminate", &self.terminate)
            .finish_non_exhaustive()
    }
}

impl<T: MessageKind, X> Aggregator<T, X> {
    /// Creates an aggregator invoking `callback` for every completed fan-out.
    ///
    /// Whether completed fan-outs are terminated defaults to
    /// `joins.terminate_fanout_on_aggregate` in [`CONFIG`].
    pub fn new(callback: impl Fn(&X, Aggregated<T>) + Send + Sync + 'static) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            terminate: CONFIG.joins.terminate_fanout_on_aggregate,
            callback: Box::new(callback),
        }
    }

    /// Leaves the sibling domains of completed fan-outs open.
    #[must_use]
    pub fn keep_domains_open(mut self) -> Self {
        self.terminate = false;
        self
    }

    /// Adds `message` to its fan-out's accumulation, running the callback if
    /// that completes it. Returns whether the callback ran.
    ///
    /// Messages whose domain is already terminated are ignored. The check is
    /// made under the accumulation lock, so an arrival racing the one that
    /// completes its fan-out is dropped rather than starting a new accumulation.
    ///
    /// # Errors
    ///
    /// [`JoinError::UnexpectedKind`] when the message carries no `T`.
    pub fn aggregate_with(&self, message: &Message, extra: &X) -> Result<bool, JoinError> {
        let typed = message
            .try_get::<T>()
            .ok_or_else(|| JoinError::UnexpectedKind {
                message: message.id(),
                definition: message.head().definition(),
            })?;
        let domain = message.domain();
        // Only fan-out domains carry a sibling set; the default domain has none.
        let Some(siblings) = domain.siblings().cloned() else {
            trace!(message = %message.id(), "Singleton aggregation in the default domain");
            (self.callback)(
                extra,
                Aggregated {
                    messages: vec![typed],
                    termination: None,
                },
            );
            return Ok(true);
        };

        let completed = {
            let mut pending = self.pending.lock();
            if domain.is_terminated() {
                debug!(message = %message.id(), "Ignoring message from a terminated domain");
                return Ok(false);
            }
            let accumulated = pending.entry(siblings.id()).or_default();
            if accumulated.iter().any(|known| known.message().id() == typed.message().id()) {
                return Ok(false);
            }
            accumulated.push(typed);
            trace!(
                siblings = %siblings.id(),
                arrived = accumulated.len(),
                expected = siblings.len(),
                "Aggregating"
            );
            if accumulated.len() < siblings.len() {
                return Ok(false);
            }
            let completed = pending.remove(&siblings.id()).unwrap_or_default();
            if self.terminate {
                siblings.terminate();
            }
            completed
        };

        let termination = if self.terminate {
            let predecessors: Vec<Message> =
                completed.iter().map(|typed| typed.message().clone()).collect();
            Some(Message::following(
                &predecessors,
                TerminatedDomains {
                    domains: siblings.domains(),
                },
            )?)
        } else {
            None
        };
        debug!(siblings = %siblings.id(), count = completed.len(), "Fan-out complete");
        (self.callback)(
            extra,
            Aggregated {
                messages: completed,
                termination,
            },
        );
        Ok(true)
    }
}

impl<T: MessageKind> Aggregator<T, ()> {
    /// Adds `message`; see [`aggregate_with`](Aggregator::aggregate_with).
    ///
    /// # Errors
    ///
    /// As [`aggregate_with`](Aggregator::aggregate_with).
    pub fn aggregate(&self, message: &Message) -> Result<bool, JoinError> {
        self.aggregate_with(message, &())
    }
}

/// A completed fan-out handed to an [`Aggregator`] callback.
pub struct Aggregated<T> {
    messages: Vec<Typed<T>>,
    termination: Option<Message>,
}

impl<T> Aggregated<T> {
    /// The accumulated `T`s, in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[Typed<T>] {
        &self.messages
    }

    /// Iterates the accumulated payloads.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.messages.iter().map(|typed| &**typed)
    }

    /// Number of accumulated messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing was accumulated; never true for a delivered aggregation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The nodes carrying the accumulated payloads, for use as predecessors.
    #[must_use]
    pub fn predecessors(&self) -> Vec<Message> {
        self.messages.iter().map(|typed| typed.message().clone()).collect()
    }

    /// The [`TerminatedDomains`] notice for the fan-out, when its domains were terminated.
    #[must_use]
    pub fn termination(&self) -> Option<&Message> {
        self.termination.as_ref()
    }
}

impl<T: fmt::Debug> fmt::Debug for Aggregated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregated")
            .field("messages", &self.messages)
            .field("termination", &self.termination)
            .finish()
    }
}
