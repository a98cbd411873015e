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
#![allow(unused)]

use weft::prelude::*;

#[weft_message]
pub struct Ping;

#[weft_message]
pub struct Pong;

/// One unit of fanned-out work.
#[weft_message]
pub struct Work {
    pub index: usize,
}

/// The result of one unit of work.
#[weft_message]
pub struct Done {
    pub value: i64,
}

#[weft_message]
pub struct Summary {
    pub total: i64,
}

/// A decorator facet.
#[weft_message]
pub struct Audit {
    pub note: String,
}

#[weft_message(kind = "Tagged")]
pub struct Tag {
    pub label: &'static str,
}
