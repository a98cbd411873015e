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
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use static_assertions::assert_impl_all;
use tracing::trace;

use crate::domain::{resolution, DomainTree, MessageDomain};
use crate::message::family::{Family, NodeCore, Slot};
use crate::message::lifetime::{DisposeGuard, Lifetime};
use crate::message::{GraphError, MessageDefinition, MessageId};
use crate::traits::WeftMessage;

/// A handle to one node of the causal message graph.
///
/// Cloning a `Message` clones the handle, not the node: equality and hashing
/// are by [`MessageId`]. Payloads are immutable; the only structural mutations
/// are [`decorate`](Message::decorate) and [`replace_with`](Message::replace_with).
#[derive(Clone)]
pub struct Message {
    core: Arc<NodeCore>,
    family: Arc<Family>,
}

impl Message {
    /// Builds a message from its causal predecessors.
    ///
    /// The domain is resolved from the predecessors: none gives the tree's
    /// default domain, a single predecessor is inherited as is, and several
    /// predecessors must reduce to one domain.
    ///
    /// # Errors
    ///
    /// [`GraphError::DomainConflict`] when the predecessors come from parallel
    /// branches that were not joined.
    pub fn new<M: WeftMessage>(
        tree: &DomainTree,
        predecessors: &[Message],
        payload: M,
    ) -> Result<Self, GraphError> {
        let domain = resolution::resolve(predecessors)?.unwrap_or_else(|| tree.default_domain());
        Ok(Self::with_domain(predecessors.to_vec(), Arc::new(payload), domain))
    }

    /// Builds a message that follows at least one predecessor, which is all
    /// domain resolution needs.
    ///
    /// # Errors
    ///
    /// [`GraphError::NoPredecessors`] for an empty slice, otherwise as [`Message::new`].
    pub fn following<M: WeftMessage>(predecessors: &[Message], payload: M) -> Result<Self, GraphError> {
        let domain = resolution::resolve(predecessors)?.ok_or(GraphError::NoPredecessors)?;
        Ok(Self::with_domain(predecessors.to_vec(), Arc::new(payload), domain))
    }

    /// Builds a message that heads a chain over existing standalone chains.
    ///
    /// Each child must be the head of its own chain; the child chains are
    /// absorbed and the new message becomes their parent.
    ///
    /// # Errors
    ///
    /// [`GraphError::NotHead`] or [`GraphError::DuplicateChild`] for invalid
    /// children, otherwise as [`Message::new`].
    pub fn with_children<M: WeftMessage>(
        tree: &DomainTree,
        predecessors: &[Message],
        payload: M,
        children: &[Message],
    ) -> Result<Self, GraphError> {
        let mut seen = HashSet::new();
        for child in children {
            if !seen.insert(child.id()) {
                return Err(GraphError::DuplicateChild(child.id()));
            }
            if !child.is_head() {
                return Err(GraphError::NotHead(child.id()));
            }
        }
        let domain = resolution::resolve(predecessors)?.unwrap_or_else(|| tree.default_domain());
        let core = NodeCore::new(Arc::new(payload), predecessors.to_vec());
        let id = core.id;
        let family = Family::standalone(Arc::clone(&core), domain);
        {
            let mut guard = family.state.write();
            if let Some(table) = guard.live_mut() {
                for child in children {
                    let absorbed = child
                        .family
                        .write(child.id(), |state, _| state.forward_to(Arc::clone(&family)));
                    let Some(absorbed) = absorbed else { continue };
                    let child_head = absorbed.head;
                    table.absorb(absorbed);
                    let flattened = {
                        let head_slot = table.slot_mut(child_head);
                        head_slot.parent = Some(id);
                        head_slot.children.clone()
                    };
                    let own = &mut table.slot_mut(id).children;
                    own.push(child_head);
                    own.extend(flattened);
                }
            }
        }
        trace!(message = %id, children = children.len(), "built message with children");
        Ok(Self { core, family })
    }

    /// A message with no predecessors, in the tree's default domain.
    pub(crate) fn rooted<M: WeftMessage>(tree: &DomainTree, payload: M) -> Self {
        Self::with_domain(Vec::new(), Arc::new(payload), tree.default_domain())
    }

    pub(crate) fn with_domain(
        predecessors: Vec<Message>,
        payload: Arc<dyn WeftMessage>,
        domain: MessageDomain,
    ) -> Self {
        let core = NodeCore::new(payload, predecessors);
        let family = Family::standalone(Arc::clone(&core), domain);
        Self { core, family }
    }

    /// Wraps the head of this message's chain in a decorator carrying `payload`.
    ///
    /// The decorator inherits this message's predecessors (plus
    /// `extra_predecessors`) and its domain, and becomes the new head. Every
    /// node formerly in the chain becomes one of its flattened children.
    #[must_use]
    pub fn decorate<M: WeftMessage>(&self, payload: M, extra_predecessors: &[Message]) -> Message {
        let mut predecessors = self.core.predecessors.clone();
        predecessors.extend_from_slice(extra_predecessors);
        let core = NodeCore::new(Arc::new(payload), predecessors);
        let family = self.family.write(self.id(), |state, family| {
            if let Some(table) = state.live_mut() {
                let domain = table.slot(self.id()).domain.clone();
                let old_head = table.head;
                let mut children = vec![old_head];
                children.extend(table.slot(old_head).children.iter().copied());
                table.slot_mut(old_head).parent = Some(core.id);
                table.head = core.id;
                table.insert(Slot {
                    core: Arc::clone(&core),
                    parent: None,
                    children,
                    domain,
                });
            }
            Arc::clone(family)
        });
        trace!(decorator = %core.id, inner = %self.id(), "decorated message");
        Message { core, family }
    }

    /// Puts `replacement` in this node's exact structural position.
    ///
    /// The replacement takes over the parent, the children and the domain of
    /// this node; this node is detached into a chain of its own. The
    /// replacement keeps its own identity and predecessors. A detached node
    /// that was not yet delivered is disposed once no guard holds it.
    ///
    /// # Errors
    ///
    /// [`GraphError::NotStandalone`] when the replacement is already part of a
    /// decorator chain (including this node's own chain).
    pub fn replace_with(&self, replacement: &Message) -> Result<(), GraphError> {
        let old_id = self.id();
        let new_id = replacement.id();
        loop {
            let old_family = self.family.locate(old_id);
            let new_family = replacement.family.locate(new_id);
            if Arc::ptr_eq(&old_family, &new_family) {
                return Err(GraphError::NotStandalone(new_id));
            }
            let mut old_state;
            let mut new_state;
            if Arc::as_ptr(&old_family) < Arc::as_ptr(&new_family) {
                old_state = old_family.state.write();
                new_state = new_family.state.write();
            } else {
                new_state = new_family.state.write();
                old_state = old_family.state.write();
            }

            let Some(table) = old_state.live_mut() else { continue };
            if !table.contains(old_id) {
                continue;
            }
            let Some(replacement_table) = new_state.live_mut() else { continue };
            if !replacement_table.contains(new_id) {
                continue;
            }
            if replacement_table.len() != 1 {
                return Err(GraphError::NotStandalone(new_id));
            }

            let Some(mut absorbed) = new_state.forward_to(Arc::clone(&old_family)) else {
                continue;
            };
            let Some(mut slot) = absorbed.remove(new_id) else { continue };
            let Some(old_slot) = table.remove(old_id) else { continue };

            slot.parent = old_slot.parent;
            slot.children = old_slot.children.clone();
            slot.domain = old_slot.domain.clone();
            for other in table.slots_mut() {
                if other.parent == Some(old_id) {
                    other.parent = Some(new_id);
                }
                for child in &mut other.children {
                    if *child == old_id {
                        *child = new_id;
                    }
                }
            }
            if table.head == old_id {
                table.head = new_id;
            }
            table.absorb(absorbed);
            table.insert(slot);
            table.detach(Slot {
                parent: None,
                children: Vec::new(),
                ..old_slot
            });
            trace!(replaced = %old_id, replacement = %new_id, "replaced message");
            break;
        }
        self.core.lifetime.retire();
        Ok(())
    }

    /// The process-unique id of this node.
    #[inline]
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.core.id
    }

    /// The kind tag of this node's payload.
    #[inline]
    #[must_use]
    pub fn definition(&self) -> MessageDefinition {
        self.core.definition
    }

    /// This node's own payload, if it is a `T`. Decorators are not searched;
    /// see [`Message::get`].
    #[must_use]
    pub fn payload<T: WeftMessage>(&self) -> Option<&T> {
        self.core.payload.as_any().downcast_ref::<T>()
    }

    /// The type-specific string written into trace records.
    #[must_use]
    pub fn data(&self) -> String {
        self.core.payload.data()
    }

    /// The causal predecessors, fixed at construction.
    #[must_use]
    pub fn predecessors(&self) -> &[Message] {
        &self.core.predecessors
    }

    /// The domain this node currently belongs to.
    #[must_use]
    pub fn domain(&self) -> MessageDomain {
        self.family
            .read(self.id(), |table, _| table.slot(self.id()).domain.clone())
    }

    /// The outermost node of this node's chain.
    #[must_use]
    pub fn head(&self) -> Message {
        self.family.read(self.id(), |table, family| {
            Message::from_slot(table.slot(table.head), family)
        })
    }

    /// Whether this node is the head of its chain.
    #[must_use]
    pub fn is_head(&self) -> bool {
        self.family.read(self.id(), |table, _| table.head == self.id())
    }

    /// The decorator wrapping this node, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Message> {
        self.family.read(self.id(), |table, family| {
            table
                .slot(self.id())
                .parent
                .map(|parent| Message::from_slot(table.slot(parent), family))
        })
    }

    /// Every node below this one, flattened in attachment order.
    #[must_use]
    pub fn children(&self) -> Vec<Message> {
        self.family.read(self.id(), |table, family| {
            table
                .slot(self.id())
                .children
                .iter()
                .map(|child| Message::from_slot(table.slot(*child), family))
                .collect()
        })
    }

    /// The nodes whose parent is this node.
    #[must_use]
    pub fn direct_children(&self) -> Vec<Message> {
        self.family.read(self.id(), |table, family| {
            table
                .direct_children(self.id())
                .into_iter()
                .map(|child| Message::from_slot(table.slot(child), family))
                .collect()
        })
    }

    /// The head followed by its flattened children.
    #[must_use]
    pub fn chain(&self) -> Vec<Message> {
        self.family.read(self.id(), |table, family| {
            let head = table.slot(table.head);
            std::iter::once(head)
                .chain(head.children.iter().map(|child| table.slot(*child)))
                .map(|slot| Message::from_slot(slot, family))
                .collect()
        })
    }

    /// Finds the first `T` reachable from the head of this node's chain.
    ///
    /// # Errors
    ///
    /// [`GraphError::KindNotFound`] when no node in the chain carries a `T`.
    pub fn get<T: WeftMessage>(&self) -> Result<Typed<T>, GraphError> {
        self.try_get::<T>().ok_or_else(|| GraphError::KindNotFound {
            kind: std::any::type_name::<T>(),
            head: self.head().id(),
        })
    }

    /// Finds the first `T` reachable from the head of this node's chain.
    #[must_use]
    pub fn try_get<T: WeftMessage>(&self) -> Option<Typed<T>> {
        self.chain().into_iter().find_map(|message| {
            message
                .core
                .downcast::<T>()
                .map(|payload| Typed { message, payload })
        })
    }

    /// Finds the first `T` reachable from any direct predecessor, in order.
    #[must_use]
    pub fn try_get_predecessor<T: WeftMessage>(&self) -> Option<Typed<T>> {
        self.core
            .predecessors
            .iter()
            .find_map(|predecessor| predecessor.try_get::<T>())
    }

    /// Holds off disposal until the returned guard is dropped.
    pub fn delay_dispose(&self) -> DisposeGuard {
        DisposeGuard::new(Arc::clone(&self.core))
    }

    /// Registers `hook` to run once, when this node is disposed.
    ///
    /// Runs immediately if the node already is.
    pub fn on_dispose(&self, hook: impl FnOnce() + Send + 'static) {
        self.core.lifetime.on_dispose(Box::new(hook));
    }

    /// Whether this node has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.core.lifetime.is_disposed()
    }

    /// Consumers still running on this node, once the board has delivered it.
    #[must_use]
    pub fn remaining_uses(&self) -> Option<usize> {
        self.core.lifetime.remaining_uses()
    }

    pub(crate) fn lifetime(&self) -> &Lifetime {
        &self.core.lifetime
    }

    /// A handle on this node's chain position that survives replacement of the head.
    pub(crate) fn position(&self) -> ChainPosition {
        ChainPosition(self.family.locate(self.id()))
    }

    /// Moves every node of this chain that lives in `from` into `to`.
    pub(crate) fn move_domain(&self, from: &MessageDomain, to: &MessageDomain) {
        self.family.write(self.id(), |state, _| {
            if let Some(table) = state.live_mut() {
                for slot in table.slots_mut() {
                    if slot.domain == *from {
                        slot.domain = to.clone();
                    }
                }
            }
        });
    }

    fn from_slot(slot: &Slot, family: &Arc<Family>) -> Message {
        Message {
            core: Arc::clone(&slot.core),
            family: Arc::clone(family),
        }
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Message {}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.core.id)
            .field("definition", &self.core.definition)
            .finish()
    }
}

/// The position a published chain occupies, independent of which node heads it.
#[derive(Clone, Debug)]
pub(crate) struct ChainPosition(Arc<Family>);

impl ChainPosition {
    /// The current head followed by its flattened children.
    pub(crate) fn chain(&self) -> Vec<Message> {
        self.0.read_position(|table, family| {
            let head = table.slot(table.head);
            std::iter::once(head)
                .chain(head.children.iter().map(|child| table.slot(*child)))
                .map(|slot| Message::from_slot(slot, family))
                .collect()
        })
    }
}

/// A node found by kind, with its payload downcast to `T`.
///
/// Dereferences to the payload.
pub struct Typed<T> {
    message: Message,
    payload: Arc<T>,
}

impl<T> Typed<T> {
    /// The node carrying the payload.
    #[must_use]
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The shared payload.
    #[must_use]
    pub fn payload(&self) -> &Arc<T> {
        &self.payload
    }
}

impl<T> Deref for Typed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.payload
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            payload: Arc::clone(&self.payload),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typed")
            .field("message", &self.message.id())
            .field("payload", &self.payload)
            .finish()
    }
}

assert_impl_all!(Message: Send, Sync, Clone);
