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

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::{DomainId, MessageDomain};
use crate::join::JoinError;
use crate::message::{Message, MessageDefinition, MessageId, Typed};
use crate::traits::MessageKind;

/// The tuple of kinds a [`Collector`] tracks, one slot per kind.
///
/// Implemented for tuples of one to seven [`MessageKind`]s.
pub trait CollectorSlots: Send + Sync + 'static {
    /// Number of slots.
    const COUNT: usize;

    /// The kind of each slot, in declaration order.
    fn definitions() -> Vec<MessageDefinition>;

    /// The first slot, in declaration order, whose kind is reachable from `message`.
    fn slot_of(message: &Message) -> Option<usize>;
}

macro_rules! impl_collector_slots {
    ($count:expr; $($index:tt => $kind:ident),+) => {
        impl<$($kind: MessageKind),+> CollectorSlots for ($($kind,)+) {
            const COUNT: usize = $count;

            fn definitions() -> Vec<MessageDefinition> {
                vec![$(<$kind as MessageKind>::kind()),+]
            }

            fn slot_of(message: &Message) -> Option<usize> {
                $(
                    if message.try_get::<$kind>().is_some() {
                        return Some($index);
                    }
                )+
                None
            }
        }
    };
}

impl_collector_slots!(1; 0 => A);
impl_collector_slots!(2; 0 => A, 1 => B);
impl_collector_slots!(3; 0 => A, 1 => B, 2 => C);
impl_collector_slots!(4; 0 => A, 1 => B, 2 => C, 3 => D);
impl_collector_slots!(5; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_collector_slots!(6; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);
impl_collector_slots!(7; 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F, 6 => G);

type SlotMap = HashMap<DomainId, (MessageDomain, Message)>;
type CollectorCallback<S, X> = dyn Fn(&X, &mut CollectedSet<S>) + Send + Sync + 'static;

/// Joins messages of different kinds that belong to the same domain.
///
/// Keeps, per slot, the latest message of that kind per domain. Each
/// [`push`](Collector::push) recomputes completeness for the pushed message's
/// domain and its active descendants; a domain is complete when every slot has
/// an entry in it or in one of its active ancestors. Every distinct complete
/// set runs the callback once.
///
/// A later message for a filled slot replaces the earlier one and can complete
/// the set again. Slots marked consumed in the callback are cleared.
///
/// `X` is passed through from [`push_with`](Collector::push_with) to the
/// callback, typically the [`MessageContext`](crate::message::MessageContext)
/// of the delivery that fed the collector.
pub struct Collector<S: CollectorSlots, X = ()> {
    slots: Mutex<Vec<SlotMap>>,
    callback: Box<CollectorCallback<S, X>>,
}

impl<S: CollectorSlots, X> fmt::Debug for Collector<S, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("kinds", &S::definitions())
            .finish_non_exhaustive()
    }
}

impl<S: CollectorSlots, X> Collector<S, X> {
    /// Creates a collector invoking `callback` for every complete set.
    pub fn new(callback: impl Fn(&X, &mut CollectedSet<S>) + Send + Sync + 'static) -> Self {
        Self {
            slots: Mutex::new((0..S::COUNT).map(|_| SlotMap::new()).collect()),
            callback: Box::new(callback),
        }
    }

    /// Records `message` and runs the callback for every set it completes.
    ///
    /// Returns the number of sets executed.
    ///
    /// # Errors
    ///
    /// [`JoinError::UnexpectedKind`] when the message carries none of the tracked kinds.
    pub fn push_with(&self, message: &Message, extra: &X) -> Result<usize, JoinError> {
        let slot = S::slot_of(message).ok_or_else(|| JoinError::UnexpectedKind {
            message: message.id(),
            definition: message.head().definition(),
        })?;
        let domain = message.domain();

        let sets = {
            let mut slots = self.slots.lock();
            slots[slot].insert(domain.id(), (domain.clone(), message.clone()));

            let mut candidates = Vec::new();
            if !domain.is_terminated() {
                candidates.push(domain.clone());
            }
            candidates.extend(domain.active_descendants());

            let mut seen: HashSet<Vec<MessageId>> = HashSet::new();
            let mut sets = Vec::new();
            for candidate in candidates {
                let Some(members) = complete_set(&slots, &candidate) else {
                    continue;
                };
                let mut key: Vec<MessageId> = members.iter().map(Message::id).collect();
                key.sort_unstable();
                if seen.insert(key) {
                    sets.push(CollectedSet::new(candidate, members));
                }
            }
            sets
        };

        trace!(slot, domain = %domain.id(), sets = sets.len(), "Collector push");
        let executed = sets.len();
        let mut consumed: Vec<(usize, MessageId)> = Vec::new();
        for mut set in sets {
            (self.callback)(extra, &mut set);
            consumed.extend(set.consumed_members());
        }

        if !consumed.is_empty() {
            let mut slots = self.slots.lock();
            for (slot, id) in consumed {
                slots[slot].retain(|_, (_, stored)| stored.id() != id);
            }
            debug!("Cleared consumed collector slots");
        }
        Ok(executed)
    }
}

impl<S: CollectorSlots> Collector<S, ()> {
    /// Records `message`; see [`push_with`](Collector::push_with).
    ///
    /// # Errors
    ///
    /// [`JoinError::UnexpectedKind`] when the message carries none of the tracked kinds.
    pub fn push(&self, message: &Message) -> Result<usize, JoinError> {
        self.push_with(message, &())
    }
}

/// The member of each slot visible from `domain`: its own entry, else the
/// nearest active ancestor's.
fn complete_set(slots: &[SlotMap], domain: &MessageDomain) -> Option<Vec<Message>> {
    slots
        .iter()
        .map(|map| {
            std::iter::once(domain.clone())
                .chain(domain.ancestors())
                .take_while(|scope| !scope.is_terminated())
                .find_map(|scope| map.get(&scope.id()).map(|(_, message)| message.clone()))
        })
        .collect()
}

/// One complete set handed to a [`Collector`] callback.
pub struct CollectedSet<S> {
    domain: MessageDomain,
    members: Vec<Message>,
    consumed: Vec<bool>,
    _slots: PhantomData<fn() -> S>,
}

impl<S: CollectorSlots> CollectedSet<S> {
    fn new(domain: MessageDomain, members: Vec<Message>) -> Self {
        let consumed = vec![false; members.len()];
        Self {
            domain,
            members,
            consumed,
            _slots: PhantomData,
        }
    }

    /// The domain the set was completed in.
    #[must_use]
    pub fn domain(&self) -> &MessageDomain {
        &self.domain
    }

    /// The member of each slot, in declaration order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.members
    }

    /// The member of `slot`.
    #[must_use]
    pub fn message(&self, slot: usize) -> Option<&Message> {
        self.members.get(slot)
    }

    /// The `T` held by the slot tracking kind `T`.
    #[must_use]
    pub fn get<T: MessageKind>(&self) -> Option<Typed<T>> {
        let slot = Self::slot_for::<T>()?;
        self.members.get(slot)?.try_get::<T>()
    }

    /// Like [`get`](Self::get), and marks that slot consumed.
    pub fn consume<T: MessageKind>(&mut self) -> Option<Typed<T>> {
        let slot = Self::slot_for::<T>()?;
        let found = self.members.get(slot)?.try_get::<T>();
        self.consume_slot(slot);
        found
    }

    /// Marks `slot` consumed: its member is cleared from the collector once
    /// the callback returns, so it cannot complete another set.
    pub fn consume_slot(&mut self, slot: usize) {
        if let Some(flag) = self.consumed.get_mut(slot) {
            *flag = true;
        }
    }

    fn slot_for<T: MessageKind>() -> Option<usize> {
        S::definitions()
            .iter()
            .position(|definition| *definition == T::kind())
    }

    fn consumed_members(&self) -> impl Iterator<Item = (usize, MessageId)> + '_ {
        self.members
            .iter()
            .enumerate()
            .filter(|(slot, _)| self.consumed[*slot])
            .map(|(slot, message)| (slot, message.id()))
    }
}

impl<S: CollectorSlots> fmt::Debug for CollectedSet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectedSet")
            .field("domain", &self.domain.id())
            .field("members", &self.members)
            .field("consumed", &self.consumed)
            .finish()
    }
}
