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

//! Arena storage for decorator chains.
//!
//! A *family* is one decorator chain: a table of node slots keyed by id plus the
//! id of the current head. Structural links (`parent`, flattened `children`)
//! are ids into the table, so splicing a decorator or a replacement is a few
//! id swaps under the family's write lock.
//!
//! When a family is absorbed into another (a message built with children, or a
//! replacement taking over a position) it is left behind as a forwarding entry,
//! so handles created earlier keep resolving. A replaced node moves into a
//! one-slot family recorded in `detached`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::MessageDomain;
use crate::message::lifetime::Lifetime;
use crate::message::{Message, MessageDefinition, MessageId};
use crate::traits::WeftMessage;

/// The immutable part of a node, shared by every handle to it.
pub(crate) struct NodeCore {
    pub(crate) id: MessageId,
    pub(crate) definition: MessageDefinition,
    pub(crate) payload: Arc<dyn WeftMessage>,
    pub(crate) predecessors: Vec<Message>,
    pub(crate) lifetime: Lifetime,
}

impl NodeCore {
    pub(crate) fn new(payload: Arc<dyn WeftMessage>, predecessors: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            id: MessageId::generate(),
            definition: payload.definition(),
            payload,
            predecessors,
            lifetime: Lifetime::default(),
        })
    }

    pub(crate) fn downcast<T: WeftMessage>(&self) -> Option<Arc<T>> {
        if self.payload.as_any().is::<T>() {
            Arc::clone(&self.payload).into_any().downcast::<T>().ok()
        } else {
            None
        }
    }
}

impl fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCore")
            .field("id", &self.id)
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Slot {
    pub(crate) core: Arc<NodeCore>,
    pub(crate) parent: Option<MessageId>,
    /// Every node below this one, flattened, in attachment order.
    pub(crate) children: Vec<MessageId>,
    pub(crate) domain: MessageDomain,
}

#[derive(Debug)]
pub(crate) struct FamilyTable {
    pub(crate) head: MessageId,
    slots: HashMap<MessageId, Slot>,
    detached: HashMap<MessageId, Arc<Family>>,
}

impl FamilyTable {
    fn standalone(core: Arc<NodeCore>, domain: MessageDomain) -> Self {
        let head = core.id;
        let mut slots = HashMap::new();
        slots.insert(
            head,
            Slot {
                core,
                parent: None,
                children: Vec::new(),
                domain,
            },
        );
        Self {
            head,
            slots,
            detached: HashMap::new(),
        }
    }

    /// Every handle resolves to the live table holding its slot, so a missing
    /// slot is a broken arena invariant.
    pub(crate) fn slot(&self, id: MessageId) -> &Slot {
        self.slots
            .get(&id)
            .expect("message handle resolved to a family without its slot")
    }

    pub(crate) fn slot_mut(&mut self, id: MessageId) -> &mut Slot {
        self.slots
            .get_mut(&id)
            .expect("message handle resolved to a family without its slot")
    }

    pub(crate) fn contains(&self, id: MessageId) -> bool {
        self.slots.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn insert(&mut self, slot: Slot) {
        self.slots.insert(slot.core.id, slot);
    }

    pub(crate) fn remove(&mut self, id: MessageId) -> Option<Slot> {
        self.slots.remove(&id)
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.slots.values_mut()
    }

    /// Moves every slot and detachment record of `other` into this table.
    pub(crate) fn absorb(&mut self, other: FamilyTable) {
        self.slots.extend(other.slots);
        self.detached.extend(other.detached);
    }

    pub(crate) fn detach(&mut self, slot: Slot) {
        let id = slot.core.id;
        let family = Family::standalone(slot.core, slot.domain);
        self.detached.insert(id, family);
    }

    /// The nodes whose parent is `id`, in flattened order.
    pub(crate) fn direct_children(&self, id: MessageId) -> Vec<MessageId> {
        self.slot(id)
            .children
            .iter()
            .copied()
            .filter(|child| self.slot(*child).parent == Some(id))
            .collect()
    }
}

pub(crate) enum FamilyState {
    Live(FamilyTable),
    Forwarded(Arc<Family>),
}

impl FamilyState {
    pub(crate) fn live_mut(&mut self) -> Option<&mut FamilyTable> {
        match self {
            FamilyState::Live(table) => Some(table),
            FamilyState::Forwarded(_) => None,
        }
    }

    /// Turns this family into a forwarding entry, returning its former table.
    pub(crate) fn forward_to(&mut self, target: Arc<Family>) -> Option<FamilyTable> {
        match std::mem::replace(self, FamilyState::Forwarded(target)) {
            FamilyState::Live(table) => Some(table),
            FamilyState::Forwarded(_) => None,
        }
    }
}

/// One decorator chain. See the module documentation.
pub(crate) struct Family {
    pub(crate) state: RwLock<FamilyState>,
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state.read() {
            FamilyState::Live(table) => f
                .debug_struct("Family")
                .field("head", &table.head)
                .field("slots", &table.slots.len())
                .finish(),
            FamilyState::Forwarded(_) => f.write_str("Family(forwarded)"),
        }
    }
}

impl Family {
    pub(crate) fn standalone(core: Arc<NodeCore>, domain: MessageDomain) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(FamilyState::Live(FamilyTable::standalone(core, domain))),
        })
    }

    /// Follows forwarding and detachment entries to the family that currently
    /// holds the slot for `id`.
    pub(crate) fn locate(self: &Arc<Self>, id: MessageId) -> Arc<Family> {
        let mut current = Arc::clone(self);
        loop {
            let next = match &*current.state.read() {
                FamilyState::Forwarded(next) => Some(Arc::clone(next)),
                FamilyState::Live(table) if !table.contains(id) => table.detached.get(&id).cloned(),
                FamilyState::Live(_) => None,
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// Follows forwarding entries only: the family now occupying this chain's position.
    pub(crate) fn successor(self: &Arc<Self>) -> Arc<Family> {
        let mut current = Arc::clone(self);
        loop {
            let next = match &*current.state.read() {
                FamilyState::Forwarded(next) => Some(Arc::clone(next)),
                FamilyState::Live(_) => None,
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// Runs `f` against the live table holding `id`, under its read lock.
    pub(crate) fn read<R>(
        self: &Arc<Self>,
        id: MessageId,
        f: impl FnOnce(&FamilyTable, &Arc<Family>) -> R,
    ) -> R {
        loop {
            let family = self.locate(id);
            let state = family.state.read();
            if let FamilyState::Live(table) = &*state {
                if table.contains(id) || !table.detached.contains_key(&id) {
                    return f(table, &family);
                }
            }
            // Restructured between locate and lock; resolve again.
        }
    }

    /// Runs `f` against the state of the live family holding `id`, under its
    /// write lock. `f` may forward the family elsewhere.
    pub(crate) fn write<R>(
        self: &Arc<Self>,
        id: MessageId,
        f: impl FnOnce(&mut FamilyState, &Arc<Family>) -> R,
    ) -> R {
        loop {
            let family = self.locate(id);
            let mut state = family.state.write();
            let settled = match &*state {
                FamilyState::Live(table) => {
                    table.contains(id) || !table.detached.contains_key(&id)
                }
                FamilyState::Forwarded(_) => false,
            };
            if settled {
                return f(&mut state, &family);
            }
        }
    }

    /// Runs `f` against the live table at this chain's current position.
    pub(crate) fn read_position<R>(
        self: &Arc<Self>,
        f: impl FnOnce(&FamilyTable, &Arc<Family>) -> R,
    ) -> R {
        loop {
            let family = self.successor();
            let state = family.state.read();
            if let FamilyState::Live(table) = &*state {
                return f(table, &family);
            }
        }
    }
}
