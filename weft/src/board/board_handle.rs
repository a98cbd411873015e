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
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use acton_ern::Ern;
use anyhow::anyhow;
use futures::FutureExt;
use static_assertions::assert_impl_all;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::board::{Board, Idle, InterceptionAction, VoteTally};
use crate::common::config::WeftConfig;
use crate::common::{ConsumerFn, InterceptorFn, Registration, RegistrationTable};
use crate::domain::DomainTree;
use crate::message::{ChainPosition, Exception, Message, MessageContext, TraceRecord};

struct BoardInner {
    id: Ern,
    tree: DomainTree,
    config: WeftConfig,
    consumers: RegistrationTable<ConsumerFn>,
    interceptors: RegistrationTable<InterceptorFn>,
    tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

/// A started board: frozen registration tables plus the publish pipeline.
///
/// Cheap to clone; every clone refers to the same board. Every interceptor and
/// consumer invocation runs as its own task on the tokio runtime.
#[derive(Clone)]
pub struct BoardHandle(Arc<BoardInner>);

impl fmt::Debug for BoardHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoardHandle")
            .field("id", &self.0.id)
            .field("in_flight", &self.0.tracker.len())
            .finish_non_exhaustive()
    }
}

impl BoardHandle {
    pub(crate) fn from_board(board: Board<Idle>) -> Self {
        trace!(board = %board.id, "Freezing registration tables");
        Self(Arc::new(BoardInner {
            id: board.id,
            tree: board.tree,
            config: board.config,
            consumers: board.consumers,
            interceptors: board.interceptors,
            tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        }))
    }

    /// The board's own id.
    #[must_use]
    pub fn id(&self) -> &Ern {
        &self.0.id
    }

    /// The domain tree messages published on this board should be built in.
    #[must_use]
    pub fn tree(&self) -> &DomainTree {
        &self.0.tree
    }

    /// The configuration this board runs with.
    #[must_use]
    pub fn config(&self) -> &WeftConfig {
        &self.0.config
    }

    /// Publishes the whole chain `message` belongs to.
    ///
    /// Interceptors registered for the kind of any node in the chain vote
    /// first, each in its own task; if any votes [`InterceptionAction::DoNotPublish`]
    /// every node is disposed undelivered. Otherwise each node is delivered to
    /// the consumers of its kind.
    ///
    /// Must be called within a tokio runtime.
    #[instrument(skip(self, message), fields(message = %message.id()), level = "trace")]
    pub fn publish(&self, message: &Message) {
        let head = message.head();
        let position = head.position();
        if self.0.cancellation_token.is_cancelled() {
            debug!("Board is shut down, dropping publish");
            Self::finalize(&position);
            return;
        }
        if self.0.config.dispatch.emit_trace_records {
            Self::emit_trace(&head);
        }

        let interceptors = self.interceptors_for(&position.chain());
        if interceptors.is_empty() {
            self.deliver(&position);
            return;
        }

        trace!(interceptors = interceptors.len(), "Running interceptors");
        let tally = Arc::new(VoteTally::new(interceptors.len()));
        for registration in interceptors {
            let board = self.clone();
            let tally = Arc::clone(&tally);
            let position = position.clone();
            let head = head.clone();
            self.0.tracker.spawn(async move {
                let context = MessageContext::new(head.clone(), board.clone(), registration.agent.clone());
                let callback = Arc::clone(&registration.callback);
                let vote = match guarded(move || callback(context)).await {
                    Ok(vote) => vote,
                    Err(e) => {
                        board.report_failure(&registration.agent, &head, e);
                        if board.0.config.dispatch.failed_interceptor_vetoes {
                            InterceptionAction::DoNotPublish
                        } else {
                            InterceptionAction::Continue
                        }
                    }
                };
                trace!(agent = %registration.agent, ?vote, "Interceptor voted");
                match tally.record(vote) {
                    Some(InterceptionAction::Continue) => board.deliver(&position),
                    Some(InterceptionAction::DoNotPublish) => {
                        debug!(message = %head.id(), "Message vetoed");
                        Self::finalize(&position);
                    }
                    None => {}
                }
            });
        }
    }

    /// Waits until no interceptor or consumer task is in flight.
    ///
    /// Tasks spawned while waiting are waited for too, so this returns once a
    /// whole cascade of publishes has settled. A board that was shut down in
    /// the meantime stays closed.
    pub async fn wait_idle(&self) {
        self.0.tracker.close();
        self.0.tracker.wait().await;
        if self.0.cancellation_token.is_cancelled() {
            return;
        }
        self.0.tracker.reopen();
        // A shutdown that closed the tracker between the check and the reopen.
        if self.0.cancellation_token.is_cancelled() {
            self.0.tracker.close();
        }
    }

    /// Stops the board: later publishes are disposed undelivered, and in-flight
    /// tasks are waited for up to the configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// Fails when in-flight tasks outlast the timeout.
    #[instrument(skip(self), fields(board = %self.0.id))]
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.0.cancellation_token.cancel();
        self.0.tracker.close();
        let timeout = self.0.config.shutdown_timeout();
        match tokio::time::timeout(timeout, self.0.tracker.wait()).await {
            Ok(()) => {
                debug!("Board shut down");
                Ok(())
            }
            Err(_) => {
                error!(in_flight = self.0.tracker.len(), "Shutdown timed out");
                Err(anyhow!(
                    "board {} still had {} tasks in flight after {:?}",
                    self.0.id,
                    self.0.tracker.len(),
                    timeout
                ))
            }
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.0.cancellation_token.is_cancelled()
    }

    fn interceptors_for(&self, chain: &[Message]) -> Vec<Registration<InterceptorFn>> {
        let mut matched: Vec<Registration<InterceptorFn>> = Vec::new();
        for node in chain {
            let Some(registered) = self.0.interceptors.get(&node.definition()) else {
                continue;
            };
            for registration in registered {
                if !matched
                    .iter()
                    .any(|known| Arc::ptr_eq(&known.callback, &registration.callback))
                {
                    matched.push(registration.clone());
                }
            }
        }
        matched
    }

    fn deliver(&self, position: &ChainPosition) {
        if self.0.cancellation_token.is_cancelled() {
            Self::finalize(position);
            return;
        }
        for node in position.chain() {
            let consumers = self
                .0
                .consumers
                .get(&node.definition())
                .map(Vec::as_slice)
                .unwrap_or_default();
            trace!(message = %node.id(), kind = %node.definition(), consumers = consumers.len(), "Delivering");
            node.lifetime().set_remaining_uses(consumers.len());
            for registration in consumers {
                let board = self.clone();
                let node = node.clone();
                let registration = registration.clone();
                self.0.tracker.spawn(async move {
                    let context = MessageContext::new(node.clone(), board.clone(), registration.agent.clone());
                    let callback = Arc::clone(&registration.callback);
                    if let Err(e) = guarded(move || callback(context)).await {
                        board.report_failure(&registration.agent, &node, e);
                    }
                    node.lifetime().release_use();
                });
            }
        }
    }

    fn finalize(position: &ChainPosition) {
        for node in position.chain() {
            node.lifetime().set_remaining_uses(0);
        }
    }

    fn report_failure(&self, agent: &Ern, failed: &Message, e: anyhow::Error) {
        warn!(agent = %agent, message = %failed.id(), "Callback failed: {:#}", e);
        let exception = Exception::caught(agent.clone(), failed.clone(), e);
        match Message::following(std::slice::from_ref(failed), exception) {
            Ok(message) => self.publish(&message),
            Err(e) => error!(message = %failed.id(), "Could not build exception message: {}", e),
        }
    }

    fn emit_trace(head: &Message) {
        match TraceRecord::of(head).to_json() {
            Ok(record) => info!(target: "weft::trace", record = %record, "published"),
            Err(e) => warn!(message = %head.id(), "Could not serialize trace record: {}", e),
        }
    }
}

/// Invokes a callback, turning both returned errors and panics (while building
/// or while polling the future) into an `Err`.
async fn guarded<T, C>(call: C) -> anyhow::Result<T>
where
    C: FnOnce() -> Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>,
{
    let future = match std::panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(future) => future,
        Err(panic) => return Err(panic_error(panic)),
    };
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(panic_error(panic)),
    }
}

fn panic_error(panic: Box<dyn Any + Send>) -> anyhow::Error {
    let text = panic
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow!("callback panicked: {text}")
}

assert_impl_all!(BoardHandle: Send, Sync, Clone);
