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
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::message::MessageDefinition;

/// The payload of a message node.
///
/// Payloads are immutable once wrapped in a [`Message`](crate::message::Message):
/// the graph only hands out shared references or `Arc`s to them. The trait is
/// object safe so that heterogeneous payloads can live in one decorator chain.
///
/// Implemented by `#[weft_message]`; implement it by hand only for types that
/// need a custom trace `data` string.
pub trait WeftMessage: Any + Send + Sync + Debug {
    /// The kind tag used for dispatch-table lookup.
    fn definition(&self) -> MessageDefinition;

    /// The type-specific data string written into trace records.
    ///
    /// Defaults to the `Debug` rendering of the payload.
    fn data(&self) -> String {
        format!("{self:?}")
    }

    /// Returns the payload as [`Any`] for downcasting by reference.
    fn as_any(&self) -> &dyn Any;

    /// Converts a shared payload into a shared [`Any`] for downcasting to `Arc<T>`.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// The static description of a message kind.
///
/// `KIND` is the category name; two payload types with the same `KIND` are the
/// same kind as far as dispatch is concerned.
pub trait MessageKind: WeftMessage + Clone + Sized {
    /// Category name of this kind.
    const KIND: &'static str;

    /// The [`MessageDefinition`] of this kind.
    #[inline]
    #[must_use]
    fn kind() -> MessageDefinition {
        MessageDefinition::new(Self::KIND)
    }
}
