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

use tracing::trace;

use crate::board::{Board, Idle};
use crate::common::config::{WeftConfig, CONFIG};

/// Represents the entry point for setting up a Weft board.
///
/// This struct serves as a marker type; use [`WeftApp::launch`] or
/// [`WeftApp::launch_with_config`] to obtain an idle [`Board`], register the
/// agents on it and then [`start`](Board::start) it.
#[derive(Default, Debug, Clone)]
pub struct WeftApp;

impl WeftApp {
    /// Creates an idle board configured from the global [`CONFIG`].
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use weft::prelude::*;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let mut board = WeftApp::launch();
    ///     board.agent("logger")?.act_on::<Initialize>(|_| Reply::ready());
    ///     let handle = board.start();
    ///     handle.wait_idle().await;
    ///     handle.shutdown().await
    /// }
    /// ```
    #[must_use]
    pub fn launch() -> Board<Idle> {
        Self::launch_with_config(CONFIG.clone())
    }

    /// Creates an idle board with an explicit configuration.
    #[must_use]
    pub fn launch_with_config(config: WeftConfig) -> Board<Idle> {
        trace!("Configuration: {:?}", config);
        Board::new(config)
    }
}
