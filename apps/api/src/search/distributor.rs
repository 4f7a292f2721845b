//! Job Distributor: post-hoc quota allocation over the executor's results.
//!
//! Pure functions only: no I/O, no shared state.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::job::StandardizedJob;
use crate::search::executor::PathResult;

#[derive(Debug, Clone, Serialize)]
pub struct AllocationResult {
    pub career_path_id: String,
    pub title: String,
    /// Initial even share of the session total.
    pub requested: usize,
    /// Unique jobs the path returned before truncation.
    pub available: usize,
    /// Jobs kept after redistribution.
    pub found: usize,
    pub jobs: Vec<StandardizedJob>,
}

/// Even split of `total` over `paths`; the first `total % paths` get one extra.
pub fn initial_distribution(total: usize, paths: usize) -> Vec<usize> {
    if paths == 0 {
        return Vec::new();
    }
    let base = total / paths;
    let remainder = total % paths;
    (0..paths)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

/// Drops later duplicates by composite key; first-seen order is kept.
pub fn dedup_jobs(jobs: Vec<StandardizedJob>) -> Vec<StandardizedJob> {
    let mut seen = HashSet::with_capacity(jobs.len());
    jobs.into_iter()
        .filter(|job| seen.insert(job.dedup_key()))
        .collect()
}

/// Final per-path quotas given how many unique jobs each path has.
///
/// Pass 1 keeps `min(available, total / n)` per path. Pass 2 hands the
/// leftover (remainder plus every shortfall) to paths with surplus in rounds
/// of equal shares, at least one per path per round, in path order.
pub fn allocate(total: usize, available: &[usize]) -> Vec<usize> {
    if available.is_empty() {
        return Vec::new();
    }
    let base = total / available.len();
    let mut quotas: Vec<usize> = available.iter().map(|a| (*a).min(base)).collect();
    let mut leftover = total - quotas.iter().sum::<usize>();

    while leftover > 0 {
        let spare: Vec<usize> = (0..available.len())
            .filter(|i| quotas[*i] < available[*i])
            .collect();
        if spare.is_empty() {
            break;
        }

        let share = (leftover / spare.len()).max(1);
        for i in spare {
            if leftover == 0 {
                break;
            }
            let grant = share.min(available[i] - quotas[i]).min(leftover);
            quotas[i] += grant;
            leftover -= grant;
        }
    }
    quotas
}

pub fn distribute(total_requested: usize, results: Vec<PathResult>) -> Vec<AllocationResult> {
    let requested = initial_distribution(total_requested, results.len());
    let unique: Vec<(PathResult, Vec<StandardizedJob>)> = results
        .into_iter()
        .map(|mut r| {
            let jobs = dedup_jobs(std::mem::take(&mut r.jobs));
            (r, jobs)
        })
        .collect();

    let available: Vec<usize> = unique.iter().map(|(_, jobs)| jobs.len()).collect();
    let quotas = allocate(total_requested, &available);

    unique
        .into_iter()
        .zip(requested)
        .zip(quotas)
        .map(|(((result, mut jobs), requested), quota)| {
            let available = jobs.len();
            jobs.truncate(quota);
            AllocationResult {
                career_path_id: result.career_path_id,
                title: result.title,
                requested,
                available,
                found: jobs.len(),
                jobs,
            }
        })
        .collect()
}
