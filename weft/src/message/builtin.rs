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
use std::sync::Arc;

use acton_ern::Ern;
use weft_macro::weft_message;

use crate::domain::MessageDomain;
use crate::message::{Message, MessageId};

/// Published by [`Board::start`](crate::board::Board::start) with no
/// predecessors; the conventional root of a run.
#[weft_message]
#[derive(Default)]
pub struct Initialize;

/// A callback failure, re-published through the board.
///
/// Its single predecessor is the message the failing callback was handling,
/// so it lives in that message's domain.
#[weft_message]
pub struct Exception {
    agent: Ern,
    failed: Message,
    error: Option<Arc<anyhow::Error>>,
    description: String,
}

impl Exception {
    pub(crate) fn caught(agent: Ern, failed: Message, error: anyhow::Error) -> Self {
        Self {
            agent,
            failed,
            description: format!("{error:#}"),
            error: Some(Arc::new(error)),
        }
    }

    /// An exception carrying a description instead of a captured error.
    ///
    /// Lets an agent report a failure it detected itself without returning an error.
    pub fn custom(agent: Ern, failed: Message, description: impl Into<String>) -> Self {
        Self {
            agent,
            failed,
            error: None,
            description: description.into(),
        }
    }

    /// The agent whose callback failed.
    #[must_use]
    pub fn agent(&self) -> &Ern {
        &self.agent
    }

    /// The message being handled when the failure happened.
    #[must_use]
    pub fn failed(&self) -> &Message {
        &self.failed
    }

    /// The captured error, absent for [`Exception::custom`].
    #[must_use]
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_deref()
    }

    /// A human-readable description of the failure.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Notice of a fan-out created by
/// [`DomainTree::create_new_domains_for`](crate::domain::DomainTree::create_new_domains_for).
#[weft_message]
pub struct NewDomains {
    /// One new domain per fanned-out message, in input order.
    pub domains: Vec<MessageDomain>,
    /// The root of each new domain, in input order.
    pub roots: Vec<MessageId>,
}

/// Notice that domains were terminated by
/// [`DomainTree::terminate_domains_of`](crate::domain::DomainTree::terminate_domains_of).
#[weft_message]
pub struct TerminatedDomains {
    /// The domains that were terminated, descendants not listed.
    pub domains: Vec<MessageDomain>,
}
