use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::EngineError;
use crate::gate::AdmissionGate;
use crate::grid::PixelGrid;
use crate::transform::{FalliblePixelTransform, PixelTransform};

/// Maximum number of transform tasks allowed in flight at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcurrencyBudget(NonZeroUsize);

impl ConcurrencyBudget {
    pub fn new(limit: usize) -> Result<Self, EngineError> {
        NonZeroUsize::new(limit)
            .map(Self)
            .ok_or(EngineError::InvalidBudget)
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineOptions {
    /// Upper bound on worker threads; the pool never has more threads than
    /// the budget either.
    pub max_workers: NonZeroUsize,
    /// Pixels handed to one task. Each task owns a contiguous, disjoint run.
    pub pixels_per_task: NonZeroUsize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_workers: NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN),
            pixels_per_task: NonZeroUsize::MIN,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    pub pixels: usize,
    pub tasks: usize,
    pub workers: usize,
    pub peak_in_flight: usize,
    pub elapsed: Duration,
}

struct PixelFailure {
    idx: usize,
    message: String,
}

/// Applies a transform to every pixel of a grid on a dedicated worker pool,
/// never running more tasks at once than the budget allows, and returns only
/// once every task has finished.
pub struct BoundedParallelMap {
    budget: ConcurrencyBudget,
    options: EngineOptions,
    pool: ThreadPool,
}

impl BoundedParallelMap {
    pub fn new(budget: ConcurrencyBudget) -> Result<Self, EngineError> {
        Self::with_options(budget, EngineOptions::default())
    }

    pub fn with_options(
        budget: ConcurrencyBudget,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let workers = budget.get().min(options.max_workers.get());
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pixbright-worker-{i}"))
            .build()?;
        debug!(
            "engine ready: budget {}, {} workers, {} pixels per task",
            budget.get(),
            workers,
            options.pixels_per_task
        );
        Ok(Self {
            budget,
            options,
            pool,
        })
    }

    pub fn budget(&self) -> ConcurrencyBudget {
        self.budget
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs a total transform over the whole grid.
    pub fn apply<T: PixelTransform>(&self, grid: &mut PixelGrid, transform: &T) -> PassReport {
        // infallible transforms never record a failure
        let (report, _) = self.run(grid, transform);
        report
    }

    /// Runs a transform that may reject pixels. A rejected pixel keeps its
    /// input value and does not stop the pass; once every task is done the
    /// failures are reported together.
    pub fn try_apply<T: FalliblePixelTransform>(
        &self,
        grid: &mut PixelGrid,
        transform: &T,
    ) -> Result<PassReport, EngineError> {
        let total = grid.len();
        let (report, mut failures) = self.run(grid, transform);
        if failures.is_empty() {
            return Ok(report);
        }
        failures.sort_unstable_by_key(|failure| failure.idx);
        let first = &failures[0];
        let (row, col) = grid.coordinates(first.idx);
        Err(EngineError::PixelFailures {
            failed: failures.len(),
            total,
            row,
            col,
            message: first.message.clone(),
        })
    }

    fn run<T: FalliblePixelTransform>(
        &self,
        grid: &mut PixelGrid,
        transform: &T,
    ) -> (PassReport, Vec<PixelFailure>) {
        let now = Instant::now();
        let pixels = grid.len();
        if pixels == 0 {
            return (
                PassReport {
                    workers: self.workers(),
                    ..PassReport::default()
                },
                vec![],
            );
        }

        let gate = AdmissionGate::new(self.budget.get());
        let failures = Mutex::new(Vec::new());
        let chunk = self.options.pixels_per_task.get();
        let units = grid.pixels_mut().chunks_mut(chunk).enumerate();
        let mut tasks = 0;

        // The caller thread dispatches and is not a pool worker, so blocking
        // on the gate never starves the pool. The scope joins every task
        // before returning.
        self.pool.in_place_scope(|scope| {
            for (task_idx, cells) in units {
                let permit = gate.acquire();
                let failures = &failures;
                tasks += 1;
                scope.spawn(move |_| {
                    let _permit = permit;
                    let offset = task_idx * chunk;
                    for (i, pixel) in cells.iter_mut().enumerate() {
                        match transform.try_apply(*pixel) {
                            Ok(result) => *pixel = result,
                            Err(err) => failures
                                .lock()
                                .unwrap_or_else(std::sync::PoisonError::into_inner)
                                .push(PixelFailure {
                                    idx: offset + i,
                                    message: err.to_string(),
                                }),
                        }
                    }
                });
            }
        });

        // every permit is back once the scope has joined its tasks
        debug_assert_eq!(gate.in_flight(), 0);
        let report = PassReport {
            pixels,
            tasks,
            workers: self.workers(),
            peak_in_flight: gate.peak(),
            elapsed: now.elapsed(),
        };
        debug!(
            "{} pass: {} pixels in {} tasks, peak {}/{} in flight, {:.2?}",
            FalliblePixelTransform::name(transform),
            report.pixels,
            report.tasks,
            report.peak_in_flight,
            gate.capacity(),
            report.elapsed
        );
        let failures = failures
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        (report, failures)
    }
}
