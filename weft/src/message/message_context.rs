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

use acton_ern::Ern;
use derive_new::new;
use static_assertions::assert_impl_all;

use crate::board::BoardHandle;
use crate::domain::DomainTree;
use crate::message::{GraphError, Message, Typed};
use crate::traits::WeftMessage;

/// What a consumer or interceptor receives for each delivery.
///
/// Carries the delivered node, the board it came from and the identity of the
/// agent being invoked.
#[derive(new, Clone, Debug)]
pub struct MessageContext {
    /// The node being delivered
    pub(crate) message: Message,
    /// The board that delivered it
    pub(crate) board: BoardHandle,
    /// The agent being invoked
    pub(crate) agent: Ern,
}

impl MessageContext {
    /// Returns a reference to the delivered node
    pub const fn message(&self) -> &Message {
        &self.message
    }

    /// The delivered node's own payload as a `T`.
    pub fn payload<T: WeftMessage>(&self) -> Option<&T> {
        self.message.payload::<T>()
    }

    /// Looks up a `T` anywhere in the delivered node's chain.
    ///
    /// # Errors
    ///
    /// [`GraphError::KindNotFound`] when the chain carries no `T`.
    pub fn get<T: WeftMessage>(&self) -> Result<Typed<T>, GraphError> {
        self.message.get::<T>()
    }

    /// Returns the board that delivered the message
    pub const fn board(&self) -> &BoardHandle {
        &self.board
    }

    /// The board's domain tree.
    pub fn tree(&self) -> &DomainTree {
        self.board.tree()
    }

    /// Returns the id of the agent being invoked
    pub const fn agent(&self) -> &Ern {
        &self.agent
    }

    /// Publishes `message` on the delivering board.
    pub fn publish(&self, message: &Message) {
        self.board.publish(message);
    }

    /// Builds a message whose single predecessor is the delivered node.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature follows [`Message::following`].
    pub fn follow_up<M: WeftMessage>(&self, payload: M) -> Result<Message, GraphError> {
        Message::following(std::slice::from_ref(&self.message), payload)
    }
}

assert_impl_all!(MessageContext: Send, Sync);
