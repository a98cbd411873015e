//! Defines the callback and future types the board stores and invokes.

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
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use acton_ern::Ern;

use crate::board::InterceptionAction;
use crate::message::{MessageContext, MessageDefinition};

/// A pinned, boxed future returned by consumers.
///
/// An `Err` is caught by the board and re-published as an
/// [`Exception`](crate::message::Exception).
pub type FutureBox = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// A pinned, boxed future returned by interceptors, resolving to their vote.
pub type VoteBox = Pin<Box<dyn Future<Output = anyhow::Result<InterceptionAction>> + Send + 'static>>;

/// Crate-internal: the stored form of a consumer callback.
pub(crate) type ConsumerFn = dyn Fn(MessageContext) -> FutureBox + Send + Sync + 'static;

/// Crate-internal: the stored form of an interceptor callback.
pub(crate) type InterceptorFn = dyn Fn(MessageContext) -> VoteBox + Send + Sync + 'static;

/// Crate-internal: one agent's callback for one kind.
pub(crate) struct Registration<F: ?Sized> {
    pub(crate) agent: Ern,
    pub(crate) callback: Arc<F>,
}

impl<F: ?Sized> Clone for Registration<F> {
    fn clone(&self) -> Self {
        Self {
            agent: self.agent.clone(),
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Crate-internal: registration table keyed by kind, in registration order.
///
/// Populated while the board is idle and read-only once it starts, so plain
/// `HashMap`s are read without locking.
pub(crate) type RegistrationTable<F> = HashMap<MessageDefinition, Vec<Registration<F>>>;
