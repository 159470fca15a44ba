//! Scheduled continuations
//!
//! One-shot delayed work (wind-ups, landing impacts, reaction delays, corpse
//! removal) is stored as plain data keyed by the combatant that owns it.
//! Removing or killing a combatant cancels everything it owns, so no
//! continuation can fire against a combatant that is gone.

use super::combatant::CombatantId;

/// Handle returned by `Scheduler::schedule`. Ids increase monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask<A> {
    pub id: TaskId,
    pub owner: CombatantId,
    /// Simulation time at which the task fires
    pub due: f32,
    pub action: A,
}

/// Arena of pending tasks.
#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    next_id: u64,
    pending: Vec<ScheduledTask<A>>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `action` to fire at simulation time `due`.
    pub fn schedule(&mut self, owner: CombatantId, due: f32, action: A) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.pending.push(ScheduledTask {
            id,
            owner,
            due,
            action,
        });
        id
    }

    /// Cancel one task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|task| task.id != id);
        self.pending.len() != before
    }

    /// Cancel every task owned by `owner`. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: CombatantId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|task| task.owner != owner);
        before - self.pending.len()
    }

    /// Cancel the owner's tasks matching `predicate`.
    pub fn cancel_where(&mut self, owner: CombatantId, mut predicate: impl FnMut(&A) -> bool) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|task| task.owner != owner || !predicate(&task.action));
        before - self.pending.len()
    }

    /// Remove and return every task due at or before `now`, oldest first.
    /// Ties on `due` fire in scheduling order.
    pub fn drain_due(&mut self, now: f32) -> Vec<ScheduledTask<A>> {
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|task| task.due <= now);
        self.pending = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)));
        due
    }

    pub fn pending_for(&self, owner: CombatantId) -> usize {
        self.pending.iter().filter(|task| task.owner == owner).count()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.pending.iter().any(|task| task.id == id)
    }

    pub fn next_due(&self) -> Option<f32> {
        self.pending.iter().map(|task| task.due).min_by(|a, b| a.total_cmp(b))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledTask<A>> {
        self.pending.iter()
    }
}
