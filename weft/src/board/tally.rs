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
use parking_lot::Mutex;

/// An interceptor's vote on a message about to be delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterceptionAction {
    /// Let the message through.
    Continue,
    /// Discard the message; it is disposed without reaching any consumer.
    DoNotPublish,
}

#[derive(Debug)]
struct TallyState {
    outstanding: usize,
    vetoed: bool,
}

/// Collects the votes of every interceptor matched by one publish.
#[derive(Debug)]
pub(crate) struct VoteTally {
    state: Mutex<TallyState>,
}

impl VoteTally {
    pub(crate) fn new(expected: usize) -> Self {
        Self {
            state: Mutex::new(TallyState {
                outstanding: expected,
                vetoed: false,
            }),
        }
    }

    /// Records one vote. The last vote in returns the decision.
    pub(crate) fn record(&self, vote: InterceptionAction) -> Option<InterceptionAction> {
        let mut state = self.state.lock();
        state.vetoed |= vote == InterceptionAction::DoNotPublish;
        state.outstanding = state.outstanding.saturating_sub(1);
        if state.outstanding > 0 {
            return None;
        }
        Some(if state.vetoed {
            InterceptionAction::DoNotPublish
        } else {
            InterceptionAction::Continue
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unanimous_continue_delivers() {
        let tally = VoteTally::new(3);
        assert_eq!(tally.record(InterceptionAction::Continue), None);
        assert_eq!(tally.record(InterceptionAction::Continue), None);
        assert_eq!(
            tally.record(InterceptionAction::Continue),
            Some(InterceptionAction::Continue)
        );
    }

    #[test]
    fn any_veto_wins_regardless_of_order() {
        let tally = VoteTally::new(2);
        assert_eq!(tally.record(InterceptionAction::DoNotPublish), None);
        assert_eq!(
            tally.record(InterceptionAction::Continue),
            Some(InterceptionAction::DoNotPublish)
        );
    }
}
