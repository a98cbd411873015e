//! Defines the domain tree that scopes joins.
//!
//! Every message belongs to exactly one [`MessageDomain`]. Domains are split by
//! [`DomainTree::create_new_domains_for`] (one child per fanned-out message,
//! all sharing a [`SiblingSet`]) and closed again by
//! [`DomainTree::terminate_domains_of`] once a join has reconciled the fan-out.

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

pub use domain_tree::DomainTree;
pub use message_domain::{DomainId, MessageDomain, SiblingSet};

/// Defines [`DomainTree`].
mod domain_tree;
/// Defines [`MessageDomain`], [`DomainId`] and [`SiblingSet`].
mod message_domain;
pub(crate) mod resolution;
