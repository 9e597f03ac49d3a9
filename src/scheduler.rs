use core::fmt::Debug;

/// Scheduler time unit
pub type Tick = u64;

/// A task planned at this tick never runs
pub const TICK_INFINITY: Tick = Tick::MAX;

/// Cooperative, run-to-completion task scheduler
///
/// Tasks are plain identifiers here: the scheduler only keeps their planned
/// ticks, and whoever runs the scheduler hands each due id back to the
/// component that registered it. A due task is expected to be planned at
/// [`TICK_INFINITY`] before it runs, so it fires once unless re-armed.
pub trait Scheduler {
    type TaskId: Copy + Debug + PartialEq;

    /// Registers a new task planned at the absolute `tick`
    ///
    /// Returns `None` when the task table is full.
    fn register(&mut self, tick: Tick) -> Option<Self::TaskId>;

    /// Plans `task` at the absolute `tick`
    fn arm_absolute(&mut self, task: Self::TaskId, tick: Tick);

    /// Plans `task` `delay` ticks after the current scheduler pass
    fn arm_relative(&mut self, task: Self::TaskId, delay: Tick);

    /// Plans `task` for the next scheduler pass
    fn arm_now(&mut self, task: Self::TaskId);

    /// Plans `task` `delay` ticks after the present time
    fn arm_from_now(&mut self, task: Self::TaskId, delay: Tick);

    /// Re-plans the running task `delay` ticks after the tick it was planned at
    ///
    /// Only meaningful from inside a task.
    fn arm_current_relative(&mut self, delay: Tick);
}
