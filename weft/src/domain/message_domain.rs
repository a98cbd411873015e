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
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::message::MessageId;

/// Identity of a [`MessageDomain`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainId(Uuid);

impl DomainId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct DomainNode {
    id: DomainId,
    root: Option<MessageId>,
    parent: Option<MessageDomain>,
    siblings: Option<Arc<SiblingSet>>,
    /// Guards both the child list and this domain's termination flag changes.
    children: Mutex<Vec<Weak<DomainNode>>>,
    terminated: AtomicBool,
}

/// A node of the domain tree: the messages produced by one branch of a fan-out.
///
/// Cheap to clone; equality and hashing are by [`DomainId`]. Termination is
/// monotonic and reaches every descendant.
#[derive(Clone)]
pub struct MessageDomain(Arc<DomainNode>);

impl MessageDomain {
    pub(crate) fn default_root() -> Self {
        Self(Arc::new(DomainNode {
            id: DomainId::generate(),
            root: None,
            parent: None,
            siblings: None,
            children: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(false),
        }))
    }

    /// Creates a child domain rooted at `root`, member of `siblings`.
    ///
    /// A child split from an already terminated domain starts terminated.
    pub(crate) fn split(&self, root: MessageId, siblings: Arc<SiblingSet>) -> MessageDomain {
        let mut children = self.0.children.lock();
        let child = MessageDomain(Arc::new(DomainNode {
            id: DomainId::generate(),
            root: Some(root),
            parent: Some(self.clone()),
            siblings: Some(siblings),
            children: Mutex::new(Vec::new()),
            terminated: AtomicBool::new(self.is_terminated()),
        }));
        children.retain(|weak| weak.strong_count() > 0);
        children.push(Arc::downgrade(&child.0));
        trace!(parent = %self.id(), child = %child.id(), root = %root, "split domain");
        child
    }

    /// The identity of this domain.
    #[inline]
    #[must_use]
    pub fn id(&self) -> DomainId {
        self.0.id
    }

    /// The message that defined this domain; `None` for the default domain.
    #[must_use]
    pub fn root(&self) -> Option<MessageId> {
        self.0.root
    }

    /// The domain this one was split from; `None` for the default domain.
    #[must_use]
    pub fn parent(&self) -> Option<&MessageDomain> {
        self.0.parent.as_ref()
    }

    /// The fan-out this domain was created by; `None` for the default domain.
    #[must_use]
    pub fn siblings(&self) -> Option<&Arc<SiblingSet>> {
        self.0.siblings.as_ref()
    }

    /// Whether this is the tree's default (never split) domain.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0.parent.is_none()
    }

    /// Whether this domain has been terminated.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.0.terminated.load(Ordering::Acquire)
    }

    /// The live child domains split from this one.
    #[must_use]
    pub fn children(&self) -> Vec<MessageDomain> {
        self.0
            .children
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .map(MessageDomain)
            .collect()
    }

    /// This domain's parent, grandparent and so on up to the default domain.
    pub fn ancestors(&self) -> impl Iterator<Item = MessageDomain> {
        std::iter::successors(self.parent().cloned(), |domain| domain.parent().cloned())
    }

    /// Whether `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &MessageDomain) -> bool {
        other.ancestors().any(|ancestor| ancestor == *self)
    }

    /// This domain if active, otherwise its closest non-terminated ancestor.
    #[must_use]
    pub fn nearest_active(&self) -> MessageDomain {
        if !self.is_terminated() {
            return self.clone();
        }
        self.ancestors()
            .find(|ancestor| !ancestor.is_terminated())
            .unwrap_or_else(|| self.clone())
    }

    /// Every non-terminated descendant, depth first.
    #[must_use]
    pub fn active_descendants(&self) -> Vec<MessageDomain> {
        let mut found = Vec::new();
        let mut pending = self.children();
        while let Some(domain) = pending.pop() {
            if domain.is_terminated() {
                continue;
            }
            pending.extend(domain.children());
            found.push(domain);
        }
        found
    }

    /// Terminates this domain and every descendant.
    ///
    /// The default domain is never terminated; the call is ignored for it.
    pub fn terminate(&self) {
        if self.is_default() {
            debug!(domain = %self.id(), "ignoring termination of the default domain");
            return;
        }
        let children = {
            let children = self.0.children.lock();
            self.0.terminated.store(true, Ordering::Release);
            children.iter().filter_map(Weak::upgrade).collect::<Vec<_>>()
        };
        trace!(domain = %self.id(), children = children.len(), "terminated domain");
        for child in children {
            MessageDomain(child).terminate();
        }
    }
}

impl PartialEq for MessageDomain {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for MessageDomain {}

impl Hash for MessageDomain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for MessageDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDomain")
            .field("id", &self.id())
            .field("root", &self.root())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// The fixed set of domains created together by one fan-out.
///
/// This is the key an [`Aggregator`](crate::join::Aggregator) accumulates under.
pub struct SiblingSet {
    id: Uuid,
    roots: Vec<MessageId>,
    domains: OnceLock<Vec<Weak<DomainNode>>>,
}

impl SiblingSet {
    pub(crate) fn new(roots: Vec<MessageId>) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            roots,
            domains: OnceLock::new(),
        })
    }

    pub(crate) fn bind(&self, domains: &[MessageDomain]) {
        let weak = domains.iter().map(|domain| Arc::downgrade(&domain.0)).collect();
        if self.domains.set(weak).is_err() {
            debug!(siblings = %self.id, "sibling set already bound");
        }
    }

    /// Identity of the fan-out.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The root message of every sibling domain.
    #[must_use]
    pub fn roots(&self) -> &[MessageId] {
        &self.roots
    }

    /// Number of sibling domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Whether the fan-out was empty; never true for sets built by the tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The sibling domains that are still referenced.
    #[must_use]
    pub fn domains(&self) -> Vec<MessageDomain> {
        self.domains
            .get()
            .map(|domains| domains.iter().filter_map(Weak::upgrade).map(MessageDomain).collect())
            .unwrap_or_default()
    }

    /// Terminates every sibling domain.
    pub fn terminate(&self) {
        for domain in self.domains() {
            domain.terminate();
        }
    }
}

impl fmt::Debug for SiblingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiblingSet")
            .field("id", &self.id)
            .field("roots", &self.roots)
            .finish()
    }
}

assert_impl_all!(MessageDomain: Send, Sync, Clone);
assert_impl_all!(SiblingSet: Send, Sync);
