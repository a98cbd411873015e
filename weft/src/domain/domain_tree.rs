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
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::{resolution, MessageDomain, SiblingSet};
use crate::message::{GraphError, Message, NewDomains, TerminatedDomains};

/// The domain tree of one board.
///
/// Owns the default domain every predecessor-less message belongs to, and
/// performs fan-outs and terminations. Cloning shares the tree.
#[derive(Clone, Debug)]
pub struct DomainTree {
    default_domain: MessageDomain,
}

impl Default for DomainTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainTree {
    /// Creates a tree with a fresh default domain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_domain: MessageDomain::default_root(),
        }
    }

    /// The root of the tree.
    #[must_use]
    pub fn default_domain(&self) -> MessageDomain {
        self.default_domain.clone()
    }

    /// Moves each message into a new child of its current domain.
    ///
    /// All new domains share one [`SiblingSet`]. Returns a [`NewDomains`]
    /// notice whose predecessors are `messages`, placed in the domain those
    /// messages resolved to before the split.
    ///
    /// # Errors
    ///
    /// [`GraphError::EmptyFanOut`] for an empty slice, and
    /// [`GraphError::DomainConflict`] when the messages do not share a domain
    /// the notice could live in.
    #[instrument(skip(self, messages), fields(count = messages.len()))]
    pub fn create_new_domains_for(&self, messages: &[Message]) -> Result<Message, GraphError> {
        if messages.is_empty() {
            return Err(GraphError::EmptyFanOut);
        }
        let mut seen = HashSet::new();
        let messages: Vec<Message> = messages
            .iter()
            .filter(|message| seen.insert(message.id()))
            .cloned()
            .collect();
        let notice_domain = resolution::resolve(&messages)?.unwrap_or_else(|| self.default_domain());

        let siblings = SiblingSet::new(messages.iter().map(Message::id).collect());
        let domains: Vec<MessageDomain> = messages
            .iter()
            .map(|message| {
                let current = message.domain();
                let created = current.split(message.id(), Arc::clone(&siblings));
                message.move_domain(&current, &created);
                created
            })
            .collect();
        siblings.bind(&domains);
        debug!(siblings = %siblings.id(), domains = domains.len(), "created fan-out domains");

        Ok(Message::with_domain(
            messages,
            Arc::new(NewDomains {
                roots: siblings.roots().to_vec(),
                domains,
            }),
            notice_domain,
        ))
    }

    /// Terminates the domain of each message, and all their descendants.
    ///
    /// Returns a [`TerminatedDomains`] notice whose predecessors are `messages`.
    ///
    /// # Errors
    ///
    /// [`GraphError::NoPredecessors`] for an empty slice, and
    /// [`GraphError::DomainConflict`] when the notice cannot be placed.
    #[instrument(skip(self, messages), fields(count = messages.len()))]
    pub fn terminate_domains_of(&self, messages: &[Message]) -> Result<Message, GraphError> {
        let mut domains: Vec<MessageDomain> = Vec::new();
        for domain in messages.iter().map(Message::domain) {
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
        for domain in &domains {
            domain.terminate();
        }
        debug!(domains = domains.len(), "terminated domains");
        Message::following(messages, TerminatedDomains { domains })
    }
}
