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
use serde::{Deserialize, Serialize};

use crate::message::{Message, MessageId};

/// The structured record emitted for every top-level publish.
///
/// Serialized as a JSON object with the keys `Id`, `Definition`,
/// `Predecessors`, `MessageDomain`, `Data` and `Children`, where `Children`
/// holds the records of the nodes directly attached below this one.
/// Execution-order tooling depends on these names and this nesting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceRecord {
    /// Id of the node.
    pub id: MessageId,
    /// Kind name of the node.
    pub definition: String,
    /// Ids of the causal predecessors.
    pub predecessors: Vec<MessageId>,
    /// Root id of the node's domain; `null` for the default domain.
    pub message_domain: Option<MessageId>,
    /// The payload's data string.
    pub data: String,
    /// Records of the directly attached children.
    pub children: Vec<TraceRecord>,
}

impl TraceRecord {
    /// Builds the record for `message` and everything attached below it.
    #[must_use]
    pub fn of(message: &Message) -> Self {
        Self {
            id: message.id(),
            definition: message.definition().name().to_string(),
            predecessors: message.predecessors().iter().map(Message::id).collect(),
            message_domain: message.domain().root(),
            data: message.data(),
            children: message.direct_children().iter().map(Self::of).collect(),
        }
    }

    /// The record as a single JSON line.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
