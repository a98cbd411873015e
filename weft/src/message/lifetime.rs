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

//! Reference-counted disposal, attached once to every message node.
//!
//! A node starts *unarmed*: nothing can dispose it until the board sets its
//! remaining use count during delivery (or finalizes it on a veto). From then
//! on the node is disposed exactly once, at the moment the count is zero and no
//! [`DisposeGuard`] is outstanding.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::message::family::NodeCore;

type DisposeHook = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct LifetimeState {
    /// `None` until the board arms the node.
    remaining_uses: Option<usize>,
    delays: usize,
    disposed: bool,
}

impl LifetimeState {
    fn should_dispose(&mut self) -> bool {
        if !self.disposed && self.remaining_uses == Some(0) && self.delays == 0 {
            self.disposed = true;
            true
        } else {
            false
        }
    }
}

#[derive(Default)]
pub(crate) struct Lifetime {
    state: Mutex<LifetimeState>,
    hooks: Mutex<Vec<DisposeHook>>,
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Lifetime {
    /// Arms the node with `uses` remaining consumers. Zero disposes at once
    /// unless a guard is outstanding.
    pub(crate) fn set_remaining_uses(&self, uses: usize) {
        let fire = {
            let mut state = self.state.lock();
            if state.disposed {
                warn!("remaining uses set on an already disposed message");
                return;
            }
            state.remaining_uses = Some(uses);
            state.should_dispose()
        };
        if fire {
            self.dispose();
        }
    }

    /// Finalizes a node that was never armed, such as one replaced before
    /// delivery. Armed nodes keep their count.
    pub(crate) fn retire(&self) {
        let fire = {
            let mut state = self.state.lock();
            if state.remaining_uses.is_some() {
                return;
            }
            state.remaining_uses = Some(0);
            state.should_dispose()
        };
        if fire {
            self.dispose();
        }
    }

    /// Called once per consumer after it returns.
    pub(crate) fn release_use(&self) {
        let fire = {
            let mut state = self.state.lock();
            match state.remaining_uses {
                Some(n) if n > 0 => state.remaining_uses = Some(n - 1),
                _ => {
                    warn!("use released on a message with no remaining uses");
                    return;
                }
            }
            state.should_dispose()
        };
        if fire {
            self.dispose();
        }
    }

    pub(crate) fn delay(&self) {
        self.state.lock().delays += 1;
    }

    pub(crate) fn release_delay(&self) {
        let fire = {
            let mut state = self.state.lock();
            state.delays = state.delays.saturating_sub(1);
            state.should_dispose()
        };
        if fire {
            self.dispose();
        }
    }

    pub(crate) fn remaining_uses(&self) -> Option<usize> {
        self.state.lock().remaining_uses
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    /// Registers `hook`; runs it immediately if the node is already disposed.
    pub(crate) fn on_dispose(&self, hook: DisposeHook) {
        // Checked under the hooks lock so a concurrent dispose cannot miss the hook.
        let mut hooks = self.hooks.lock();
        if self.is_disposed() {
            drop(hooks);
            hook();
        } else {
            hooks.push(hook);
        }
    }

    fn dispose(&self) {
        let hooks = std::mem::take(&mut *self.hooks.lock());
        trace!(hooks = hooks.len(), "disposing message");
        for hook in hooks {
            hook();
        }
    }
}

/// Keeps a message from being disposed while held.
///
/// Obtained from [`Message::delay_dispose`](crate::message::Message::delay_dispose).
/// Dropping the guard (or calling [`DisposeGuard::release`]) lets disposal
/// proceed; if every consumer has already finished, disposal happens right then.
#[must_use = "dropping the guard releases it immediately"]
pub struct DisposeGuard {
    node: Arc<NodeCore>,
}

impl DisposeGuard {
    pub(crate) fn new(node: Arc<NodeCore>) -> Self {
        node.lifetime.delay();
        Self { node }
    }

    /// Releases the guard explicitly.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        self.node.lifetime.release_delay();
    }
}

impl fmt::Debug for DisposeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeGuard")
            .field("message", &self.node.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting(lifetime: &Lifetime) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let hook_count = count.clone();
        lifetime.on_dispose(Box::new(move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        }));
        count
    }

    #[test]
    fn unarmed_node_is_never_disposed() {
        let lifetime = Lifetime::default();
        let count = counting(&lifetime);
        lifetime.delay();
        lifetime.release_delay();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!lifetime.is_disposed());
    }

    #[test]
    fn disposes_after_last_use() {
        let lifetime = Lifetime::default();
        let count = counting(&lifetime);
        lifetime.set_remaining_uses(3);
        lifetime.release_use();
        lifetime.release_use();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        lifetime.release_use();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(lifetime.is_disposed());
    }

    #[test]
    fn zero_uses_dispose_immediately() {
        let lifetime = Lifetime::default();
        let count = counting(&lifetime);
        lifetime.set_remaining_uses(0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_outlives_consumers() {
        let lifetime = Lifetime::default();
        let count = counting(&lifetime);
        lifetime.delay();
        lifetime.set_remaining_uses(1);
        lifetime.release_use();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        lifetime.release_delay();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retiring_finalizes_only_unarmed_nodes() {
        let unarmed = Lifetime::default();
        let unarmed_count = counting(&unarmed);
        unarmed.delay();
        unarmed.retire();
        assert_eq!(unarmed_count.load(Ordering::SeqCst), 0);
        unarmed.release_delay();
        assert_eq!(unarmed_count.load(Ordering::SeqCst), 1);

        let armed = Lifetime::default();
        let armed_count = counting(&armed);
        armed.set_remaining_uses(1);
        armed.retire();
        assert_eq!(armed.remaining_uses(), Some(1));
        armed.release_use();
        assert_eq!(armed_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hooks_run_once_and_late_hooks_run_immediately() {
        let lifetime = Lifetime::default();
        let count = counting(&lifetime);
        lifetime.set_remaining_uses(0);
        lifetime.set_remaining_uses(0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        let late = counting(&lifetime);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }
}
