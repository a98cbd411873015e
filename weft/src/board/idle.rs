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

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use acton_ern::Ern;
use tracing::{debug, instrument, trace, warn};

use crate::board::BoardHandle;
use crate::common::config::WeftConfig;
use crate::common::{ConsumerFn, FutureBox, InterceptorFn, Registration, RegistrationTable, VoteBox};
use crate::domain::DomainTree;
use crate::message::{Initialize, Message, MessageContext};
use crate::traits::MessageKind;

/// Type-state marker for a [`Board`] whose agents are still being registered.
///
/// Registration tables can only change in this state. [`Board::start`] (or
/// [`Board::build`]) freezes them and hands back a [`BoardHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Idle;

/// The dispatcher during setup.
///
/// Holds the consumer and interceptor tables keyed by message kind, each an
/// ordered list of `(agent id, callback)`.
pub struct Board<State> {
    pub(crate) id: Ern,
    pub(crate) tree: DomainTree,
    pub(crate) config: WeftConfig,
    pub(crate) consumers: RegistrationTable<ConsumerFn>,
    pub(crate) interceptors: RegistrationTable<InterceptorFn>,
    _state: PhantomData<State>,
}

impl<State> fmt::Debug for Board<State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("id", &self.id)
            .field("consumer_kinds", &self.consumers.len())
            .field("interceptor_kinds", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

impl Board<Idle> {
    pub(crate) fn new(config: WeftConfig) -> Self {
        let id = Ern::with_root(config.defaults.board_name.as_str()).unwrap_or_else(|e| {
            warn!("Invalid board name {:?}: {}", config.defaults.board_name, e);
            Ern::default()
        });
        Self {
            id,
            tree: DomainTree::new(),
            config,
            consumers: RegistrationTable::default(),
            interceptors: RegistrationTable::default(),
            _state: PhantomData,
        }
    }

    /// The board's own id; agent ids are its children.
    pub const fn id(&self) -> &Ern {
        &self.id
    }

    /// The domain tree messages published on this board should be built in.
    pub const fn tree(&self) -> &DomainTree {
        &self.tree
    }

    /// The configuration this board was created with.
    pub const fn config(&self) -> &WeftConfig {
        &self.config
    }

    /// Registers `consumer` to be invoked for every delivered node of kind `M`.
    ///
    /// Consumers for one kind are invoked concurrently, one task each.
    #[instrument(skip(self, consumer), fields(kind = M::KIND), level = "debug")]
    pub fn register<M: MessageKind>(
        &mut self,
        agent: &Ern,
        consumer: impl Fn(MessageContext) -> FutureBox + Send + Sync + 'static,
    ) -> &mut Self {
        trace!(agent = %agent, "Adding consumer");
        let callback: Arc<ConsumerFn> = Arc::new(consumer);
        self.consumers.entry(M::kind()).or_default().push(Registration {
            agent: agent.clone(),
            callback,
        });
        self
    }

    /// Registers `interceptor` to vote on every published chain containing a node of kind `M`.
    ///
    /// The interceptor receives the head of the chain.
    #[instrument(skip(self, interceptor), fields(kind = M::KIND), level = "debug")]
    pub fn register_interceptor<M: MessageKind>(
        &mut self,
        agent: &Ern,
        interceptor: impl Fn(MessageContext) -> VoteBox + Send + Sync + 'static,
    ) -> &mut Self {
        trace!(agent = %agent, "Adding interceptor");
        let callback: Arc<InterceptorFn> = Arc::new(interceptor);
        self.interceptors
            .entry(M::kind())
            .or_default()
            .push(Registration {
                agent: agent.clone(),
                callback,
            });
        self
    }

    /// Starts a fluent registration for the agent `name`, a child of the board's id.
    ///
    /// # Errors
    ///
    /// Fails when `name` is not a valid id segment.
    pub fn agent(&mut self, name: &str) -> anyhow::Result<AgentRegistration<'_>> {
        let agent = self.id.clone() + Ern::with_root(name)?;
        debug!(agent = %agent, "Registering agent");
        Ok(AgentRegistration { board: self, agent })
    }

    /// Freezes the registration tables without publishing anything.
    #[must_use]
    pub fn build(self) -> BoardHandle {
        BoardHandle::from_board(self)
    }

    /// Freezes the registration tables and publishes [`Initialize`].
    ///
    /// Must be called within a tokio runtime.
    #[instrument(skip(self), fields(board = %self.id))]
    pub fn start(self) -> BoardHandle {
        let handle = self.build();
        let initialize = Message::rooted(handle.tree(), Initialize);
        trace!(message = %initialize.id(), "Publishing Initialize");
        handle.publish(&initialize);
        handle
    }
}

/// Fluent registration of one agent's callbacks.
///
/// Returned by [`Board::agent`].
#[derive(Debug)]
pub struct AgentRegistration<'a> {
    board: &'a mut Board<Idle>,
    agent: Ern,
}

impl AgentRegistration<'_> {
    /// The agent's id.
    pub const fn id(&self) -> &Ern {
        &self.agent
    }

    /// Registers a consumer for kind `M`. See [`Board::register`].
    pub fn act_on<M: MessageKind>(
        &mut self,
        consumer: impl Fn(MessageContext) -> FutureBox + Send + Sync + 'static,
    ) -> &mut Self {
        self.board.register::<M>(&self.agent, consumer);
        self
    }

    /// Registers an interceptor for kind `M`. See [`Board::register_interceptor`].
    pub fn intercept<M: MessageKind>(
        &mut self,
        interceptor: impl Fn(MessageContext) -> VoteBox + Send + Sync + 'static,
    ) -> &mut Self {
        self.board.register_interceptor::<M>(&self.agent, interceptor);
        self
    }
}
