// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::queue::BoundedInputQueue;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thermion_core::config::InputThrottleConfig;
use thermion_core::{
    ConfigResult, InputBudget, InputEvent, InputTag, InputThermalState, ProcessedInput,
    QualityTier, Submission, Transition,
};

/// Maps an input thermal state onto its budget.
///
/// | state     | multiplier | events per tick          |
/// |-----------|------------|--------------------------|
/// | Cool      | 1.0        | base                     |
/// | Warm      | 0.75       | 80% of base              |
/// | Hot       | 0.5        | 60% of base              |
/// | Critical  | 0.25       | 40% of base              |
/// | Emergency | 0.125      | `emergency_max`          |
///
/// Fractions round down but never below one event; everything is clamped
/// to `[0, base]`.
pub fn budget_for(config: &InputThrottleConfig, state: InputThermalState) -> InputBudget {
    let base = config.base_max_events_per_tick;
    let percent_of_base = |percent: u64| ((u64::from(base) * percent / 100) as u32).max(1);
    let (value_multiplier, max_events_per_tick) = match state {
        InputThermalState::Cool => (1.0, base),
        InputThermalState::Warm => (0.75, percent_of_base(80)),
        InputThermalState::Hot => (0.5, percent_of_base(60)),
        InputThermalState::Critical => (0.25, percent_of_base(40)),
        InputThermalState::Emergency => (0.125, config.emergency_max_events_per_tick),
    };
    InputBudget {
        max_events_per_tick: max_events_per_tick.min(base),
        value_multiplier,
    }
}

/// Counters exposed by the throttle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleStats {
    /// Events handed to the dispatch channel.
    pub dispatched: u64,
    /// Events that went through the overflow queue.
    pub queued: u64,
    /// Queued events evicted by overflow.
    pub dropped: u64,
    /// Events that had out-of-range values corrected.
    pub sanitized: u64,
    /// Events currently waiting in the queue.
    pub queue_len: usize,
}

struct Gate {
    state: InputThermalState,
    budget: InputBudget,
    processed: u32,
    tag: InputTag,
}

impl Gate {
    fn has_room(&self) -> bool {
        self.processed < self.budget.max_events_per_tick
    }
}

// Admission and drain both run under `gate`, so a submission can never
// overtake an event already waiting in the queue.
struct Admission {
    gate: Mutex<Gate>,
    queue: BoundedInputQueue,
    dispatch: Sender<ProcessedInput>,
    dispatched: AtomicU64,
    queued: AtomicU64,
    sanitized: AtomicU64,
}

impl Admission {
    fn lock(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn submit(&self, mut event: InputEvent) -> Submission {
        if event.sanitize() {
            self.sanitized.fetch_add(1, Ordering::Relaxed);
            log::trace!("InputThrottle: sanitized action {}", event.action_id);
        }

        let mut gate = self.lock();
        if gate.has_room() && self.queue.is_empty() {
            self.dispatch(&mut gate, event, false);
            Submission::Accepted
        } else {
            self.queued.fetch_add(1, Ordering::Relaxed);
            self.queue.enqueue(event);
            Submission::Queued
        }
    }

    fn can_process_now(&self) -> bool {
        let gate = self.lock();
        gate.has_room() && self.queue.is_empty()
    }

    fn start_tick(&self, tick: u64) -> usize {
        let mut gate = self.lock();
        gate.processed = 0;
        gate.tag.tick = tick;
        let backlog = self.queue.drain(gate.budget.max_events_per_tick as usize);
        let drained = backlog.len();
        for event in backlog {
            self.dispatch(&mut gate, event, true);
        }
        drained
    }

    fn dispatch(&self, gate: &mut Gate, mut event: InputEvent, was_queued: bool) {
        event.scale(gate.budget.value_multiplier);
        gate.processed += 1;
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let processed = ProcessedInput {
            event,
            tag: gate.tag,
            was_queued,
        };
        if self.dispatch.send(processed).is_err() {
            log::trace!("InputThrottle: dispatch receiver dropped, event discarded.");
        }
    }

    fn stats(&self) -> ThrottleStats {
        ThrottleStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.queue.dropped_count(),
            sanitized: self.sanitized.load(Ordering::Relaxed),
            queue_len: self.queue.len(),
        }
    }
}

/// Cloneable handle for submitting input from any thread.
#[derive(Clone)]
pub struct InputSubmitter {
    shared: Arc<Admission>,
}

impl InputSubmitter {
    /// Dispatches `event` within this tick's budget, or queues it.
    pub fn submit(&self, event: InputEvent) -> Submission {
        self.shared.submit(event)
    }

    /// Returns `true` if a submission right now would be dispatched
    /// immediately: budget is left and nothing is waiting in the queue.
    pub fn can_process_now(&self) -> bool {
        self.shared.can_process_now()
    }

    /// Current counters.
    pub fn stats(&self) -> ThrottleStats {
        self.shared.stats()
    }
}

impl std::fmt::Debug for InputSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSubmitter")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Per-tick input admission driven by the input thermal state.
///
/// Admitted events are scaled by the budget's multiplier, tagged with the
/// state and tier in force, and sent to the receiver returned by
/// [`new`](Self::new).
pub struct InputThrottleController {
    config: InputThrottleConfig,
    shared: Arc<Admission>,
    tick: u64,
}

impl InputThrottleController {
    /// Creates a throttle in the `Cool` state.
    pub fn new(config: InputThrottleConfig) -> ConfigResult<(Self, Receiver<ProcessedInput>)> {
        config.validate()?;
        let (sender, receiver) = crossbeam_channel::unbounded();
        let state = InputThermalState::Cool;
        let shared = Arc::new(Admission {
            gate: Mutex::new(Gate {
                state,
                budget: budget_for(&config, state),
                processed: 0,
                tag: InputTag::default(),
            }),
            queue: BoundedInputQueue::new(config.queue_capacity),
            dispatch: sender,
            dispatched: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            sanitized: AtomicU64::new(0),
        });
        Ok((
            Self {
                config,
                shared,
                tick: 0,
            },
            receiver,
        ))
    }

    /// Returns a handle sharing this throttle's budget and queue.
    pub fn submitter(&self) -> InputSubmitter {
        InputSubmitter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// See [`InputSubmitter::submit`].
    pub fn submit(&self, event: InputEvent) -> Submission {
        self.shared.submit(event)
    }

    /// See [`InputSubmitter::can_process_now`].
    pub fn can_process_now(&self) -> bool {
        self.shared.can_process_now()
    }

    /// The budget this throttle would apply in `state`.
    pub fn budget_for(&self, state: InputThermalState) -> InputBudget {
        budget_for(&self.config, state)
    }

    /// Switches to `state`, recomputing the budget.
    ///
    /// `tier` is stamped onto events processed from now on. Returns the
    /// transition if the state changed.
    pub fn apply_state(
        &mut self,
        state: InputThermalState,
        tier: QualityTier,
    ) -> Option<Transition<InputThermalState>> {
        let budget = budget_for(&self.config, state);
        let mut gate = self.shared.lock();
        gate.tag.tier = tier;
        let transition = Transition::between(gate.state, state)?;
        gate.state = state;
        gate.budget = budget;
        gate.tag.thermal = state;
        log::info!(
            "InputThrottle: {} -> {} ({} events/tick, x{})",
            transition.from,
            transition.to,
            budget.max_events_per_tick,
            budget.value_multiplier
        );
        Some(transition)
    }

    /// Starts a new tick: resets the per-tick count and drains queued
    /// events up to the budget, before any new submission is admitted.
    pub fn on_tick(&mut self) -> InputBudget {
        self.tick += 1;
        let drained = self.shared.start_tick(self.tick);
        if drained > 0 {
            log::trace!("InputThrottle: tick {} drained {} queued events", self.tick, drained);
        }
        self.budget()
    }

    /// The budget in force.
    pub fn budget(&self) -> InputBudget {
        self.shared.lock().budget
    }

    /// The input thermal state in force.
    pub fn state(&self) -> InputThermalState {
        self.shared.lock().state
    }

    /// Events processed in the current tick.
    pub fn processed_this_tick(&self) -> u32 {
        self.shared.lock().processed
    }

    /// Number of ticks started.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Current counters.
    pub fn stats(&self) -> ThrottleStats {
        self.shared.stats()
    }
}

impl std::fmt::Debug for InputThrottleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputThrottleController")
            .field("state", &self.state())
            .field("budget", &self.budget())
            .field("tick", &self.tick)
            .finish()
    }
}
