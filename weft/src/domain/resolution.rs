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

//! Domain resolution for a new message.
//!
//! 1. No predecessors: `None`, the caller supplies the tree's default domain.
//! 2. One predecessor: its domain as is, terminated or not.
//! 3. All predecessors in one non-terminated domain: that domain.
//! 4. Otherwise each predecessor's domain is replaced by its nearest active
//!    domain and every candidate that is an ancestor of another candidate is
//!    dropped. A single survivor is the result; several are a conflict.

use tracing::warn;

use crate::domain::MessageDomain;
use crate::message::{GraphError, Message};

pub(crate) fn resolve(predecessors: &[Message]) -> Result<Option<MessageDomain>, GraphError> {
    let Some((first, rest)) = predecessors.split_first() else {
        return Ok(None);
    };
    let first_domain = first.domain();
    if rest.is_empty() {
        return Ok(Some(first_domain));
    }

    let domains: Vec<MessageDomain> = predecessors.iter().map(Message::domain).collect();
    if !first_domain.is_terminated() && domains.iter().all(|domain| *domain == first_domain) {
        return Ok(Some(first_domain));
    }

    let mut candidates: Vec<MessageDomain> = Vec::new();
    for domain in domains.iter().map(MessageDomain::nearest_active) {
        if !candidates.contains(&domain) {
            candidates.push(domain);
        }
    }
    let survivors: Vec<MessageDomain> = candidates
        .iter()
        .filter(|candidate| !candidates.iter().any(|other| candidate.is_ancestor_of(other)))
        .cloned()
        .collect();

    match survivors.as_slice() {
        [single] => Ok(Some(single.clone())),
        _ => {
            warn!(candidates = survivors.len(), "predecessors span parallel domains");
            Err(GraphError::DomainConflict {
                candidates: survivors.iter().map(MessageDomain::id).collect(),
            })
        }
    }
}
