//! Work schedulers for the per-query prediction loop.
//!
//! Purpose
//! -------
//! Parameterize the driver over how the independent per-query tasks run:
//! in place on the calling thread ([`Scheduler::Sequential`]), on a bounded
//! worker pool ([`Scheduler::Threaded`]), or on a pool whose budget has
//! been divided by the width of an enclosing parallel region
//! ([`Scheduler::Distributed`]) so nested runs don't oversubscribe the
//! machine.
//!
//! Key behaviors
//! -------------
//! - The thread budget resolves as `min(requested, logical_cores)` with the
//!   physical core count as the default; the distributed variant divides
//!   the result by the enclosing pool width, never below one.
//! - Results come back in task order regardless of scheduling, so the
//!   reduction order downstream is fixed.
//! - A pool that cannot be built degrades to sequential execution instead
//!   of failing the run.
use rayon::prelude::*;

/// How the driver runs its per-query tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduler {
    /// Everything on the calling thread, in index order.
    Sequential,
    /// A bounded worker pool of the given size.
    Threaded { num_threads: usize },
    /// A bounded pool sized after dividing the budget by the enclosing
    /// parallel region's width.
    Distributed { num_threads: usize },
}

impl Scheduler {
    /// Resolve the scheduler for a run from the host's thread request.
    ///
    /// `requested == 0` reads as "default", which is the physical core
    /// count; the result never exceeds the logical core count. With
    /// `distribute` set the budget is divided by the width of the rayon
    /// pool this call happens to run inside, so a host iterating over many
    /// runs in parallel gets non-overlapping inner pools.
    pub fn resolve(requested: usize, distribute: bool) -> Scheduler {
        let physical = num_cpus::get_physical();
        let logical = num_cpus::get();
        let mut budget = if requested == 0 { physical } else { requested };
        budget = budget.min(logical).max(1);

        if distribute {
            let outer = rayon::current_num_threads().max(1);
            let share = (budget / outer).max(1);
            if share <= 1 {
                return Scheduler::Sequential;
            }
            return Scheduler::Distributed { num_threads: share };
        }
        if budget <= 1 {
            return Scheduler::Sequential;
        }
        Scheduler::Threaded { num_threads: budget }
    }

    /// Worker count this scheduler runs with.
    pub fn num_threads(&self) -> usize {
        match self {
            Scheduler::Sequential => 1,
            Scheduler::Threaded { num_threads } | Scheduler::Distributed { num_threads } => {
                *num_threads
            }
        }
    }

    /// Run `body` for every index in `0..count` and collect the results in
    /// index order.
    pub fn map_indexed<T, F>(&self, count: usize, body: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Send + Sync,
    {
        match self {
            Scheduler::Sequential => (0..count).map(body).collect(),
            Scheduler::Threaded { num_threads } | Scheduler::Distributed { num_threads } => {
                match rayon::ThreadPoolBuilder::new().num_threads(*num_threads).build() {
                    Ok(pool) => {
                        pool.install(|| (0..count).into_par_iter().map(body).collect())
                    }
                    Err(_) => (0..count).map(body).collect(),
                }
            }
        }
    }
}
