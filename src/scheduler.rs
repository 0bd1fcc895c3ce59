//! Serialized deferred-task queue.
//!
//! Each [`Task`] kind has at most one pending occurrence; scheduling a kind
//! that is already pending replaces it. Tasks are popped in deadline order,
//! ties broken by scheduling order, and run one at a time by the owner.

/// Milliseconds on the caller's monotonic clock.
pub type Millis = u64;

/// Deferred work items of the control core.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Task {
    /// Re-read status after an interrupt and classify the source.
    Classify,
    AdapterIn,
    AdapterOut,
    /// Input current optimizer step.
    Ico,
    /// Decide whether a DCP source is worth tuning up.
    TuneCheck,
    /// Pump-express tuning step.
    Tune,
    /// Decide whether the secondary charger may leave high impedance.
    SecondaryEnable,
    /// Periodic watchdog kick and telemetry pass.
    Monitor,
}

impl Task {
    pub const COUNT: usize = 8;

    pub const ALL: [Task; Task::COUNT] = [
        Task::Classify,
        Task::AdapterIn,
        Task::AdapterOut,
        Task::Ico,
        Task::TuneCheck,
        Task::Tune,
        Task::SecondaryEnable,
        Task::Monitor,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug)]
struct Pending {
    due: Millis,
    seq: u64,
}

/// Delay queue with one slot per task kind.
#[derive(Debug)]
pub struct Scheduler {
    now: Millis,
    seq: u64,
    slots: [Option<Pending>; Task::COUNT],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            now: 0,
            seq: 0,
            slots: [None; Task::COUNT],
        }
    }

    /// Current time as last seen by [`advance`](Self::advance).
    pub fn now(&self) -> Millis {
        self.now
    }

    /// Move the clock forward. Earlier timestamps are ignored.
    pub fn advance(&mut self, now: Millis) {
        self.now = self.now.max(now);
    }

    /// Run `task` after `delay_ms`, replacing any pending occurrence.
    pub fn schedule(&mut self, task: Task, delay_ms: Millis) {
        self.seq += 1;
        self.slots[task.index()] = Some(Pending {
            due: self.now.saturating_add(delay_ms),
            seq: self.seq,
        });
        trace!("schedule {:?} in {} ms", task, delay_ms);
    }

    /// Drop the pending occurrence of `task`. Returns whether one was pending.
    pub fn cancel(&mut self, task: Task) -> bool {
        self.slots[task.index()].take().is_some()
    }

    pub fn cancel_all(&mut self) {
        self.slots = [None; Task::COUNT];
    }

    pub fn is_pending(&self, task: Task) -> bool {
        self.slots[task.index()].is_some()
    }

    /// Deadline of the pending occurrence of `task`.
    pub fn due_at(&self, task: Task) -> Option<Millis> {
        self.slots[task.index()].map(|p| p.due)
    }

    /// Earliest deadline over all pending tasks.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.slots.iter().flatten().map(|p| p.due).min()
    }

    /// Remove and return the next task whose deadline has passed.
    pub fn pop_due(&mut self) -> Option<Task> {
        let now = self.now;
        let task = Task::ALL
            .iter()
            .copied()
            .filter_map(|t| self.slots[t.index()].map(|p| (t, p)))
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(t, _)| t)?;
        self.slots[task.index()] = None;
        Some(task)
    }
}
