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
//! Convenient boxed future replies for consumers and interceptors

use std::future::Future;

use crate::board::InterceptionAction;
use crate::common::{FutureBox, VoteBox};

/// A utility namespace for creating the return types of agent callbacks.
///
/// Consumers return a [`FutureBox`] and interceptors a [`VoteBox`]; these
/// helpers box and pin the common cases.
///
/// It acts purely as a namespace and is not intended to be instantiated.
pub struct Reply;

impl Reply {
    /// A consumer reply that completes immediately and successfully.
    ///
    /// Useful for callbacks that do all their work synchronously.
    #[inline]
    #[must_use]
    pub fn ready() -> FutureBox {
        Box::pin(async { Ok(()) })
    }

    /// Boxes and pins an asynchronous consumer body.
    #[inline]
    pub fn pending<F>(future: F) -> FutureBox
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Box::pin(future)
    }

    /// An interceptor reply that votes `action` immediately.
    #[inline]
    #[must_use]
    pub fn vote(action: InterceptionAction) -> VoteBox {
        Box::pin(async move { Ok(action) })
    }

    /// Boxes and pins an asynchronous interceptor body.
    #[inline]
    pub fn pending_vote<F>(future: F) -> VoteBox
    where
        F: Future<Output = anyhow::Result<InterceptionAction>> + Send + 'static,
    {
        Box::pin(future)
    }
}
