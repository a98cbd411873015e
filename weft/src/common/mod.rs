//! Provides the entry point, configuration and the types shared by agent callbacks.
//!
//! # Key Re-exported Components:
//!
//! *   [`WeftApp`]: The entry point that creates an idle board.
//! *   [`WeftConfig`](config::WeftConfig): Runtime configuration loaded from XDG locations.
//! *   [`Reply`]: Helpers for building callback futures.
//! *   [`FutureBox`], [`VoteBox`]: The futures consumers and interceptors return.

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

// --- Public Re-exports ---
pub use reply::Reply;
pub use types::{FutureBox, VoteBox};
pub use weft_app::WeftApp;

// --- Crate-Internal Re-exports ---
pub(crate) use types::{ConsumerFn, InterceptorFn, Registration, RegistrationTable};

// --- Submodules ---

/// Defines the configuration system for Weft.
pub mod config;
/// Defines the [`Reply`] helpers.
mod reply;
/// Defines callback and future types.
mod types;
/// Defines the [`WeftApp`] entry point.
mod weft_app;
