//! Bounded worker pool driving simulator jobs

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use crate::error::JobError;
use crate::job::{Job, RunParams};
use crate::stats::CacheStats;

pub const N_JOBS: usize = 6;

/// Number of worker threads for `n_jobs` requested
pub fn worker_count(n_jobs: usize) -> usize {
    num_cpus::get().min(n_jobs).max(1)
}

/// Composite ids must be unique, otherwise two jobs share a result file
pub fn check_unique(jobs: &[Job]) -> Result<(), JobError> {
    let mut seen = HashSet::new();
    for job in jobs {
        let id = job.total_id();
        if !seen.insert(id.clone()) {
            return Err(JobError::DuplicateId(id));
        }
    }
    Ok(())
}

/// Get every job's results, running the missing ones on a bounded pool
///
/// Jobs finish in any order; the returned results follow `jobs`. A failing
/// job does not stop the others, the first failure is reported once the
/// pool has drained.
pub fn run_jobs<'a>(
    jobs: &'a [Job],
    params: &RunParams,
    n_jobs: usize,
) -> Result<Vec<(&'a Job, &'a [CacheStats])>, JobError> {
    check_unique(jobs)?;

    let total = jobs.len();
    let cached = jobs.iter().filter(|j| j.is_cached()).count();
    let workers = worker_count(n_jobs).min(total.max(1));
    tracing::info!(
        "{} jobs ({} cached) on {} workers",
        total,
        cached,
        workers
    );

    let next = AtomicUsize::new(0);
    let done = AtomicUsize::new(0);
    let failures: Mutex<Vec<(usize, JobError)>> = Mutex::new(Vec::new());

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            handles.push(s.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::SeqCst);
                let Some(job) = jobs.get(i) else {
                    break;
                };
                if let Err(e) = job.results(params) {
                    tracing::error!("Job {}: {}", job.total_id(), e);
                    if let Ok(mut failures) = failures.lock() {
                        failures.push((i, e));
                    }
                }
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!("[{}/{}] {}", finished, total, job.total_id());
            }));
        }
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| JobError::WorkerPanic))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut failures = failures.into_inner().map_err(|_| JobError::WorkerPanic)?;
    failures.sort_by_key(|(i, _)| *i);
    if let Some((_, e)) = failures.into_iter().next() {
        return Err(e);
    }

    jobs.iter()
        .map(|job| {
            job.cached_results()
                .map(|r| (job, r))
                .ok_or_else(|| JobError::MissingResult(job.total_id(), job.result_path()))
        })
        .collect()
}
