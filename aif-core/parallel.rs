use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::CoreResult;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Degree of parallelism for index-addressed task lists.
///
/// Never affects results: tasks are collected back by index.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParallelOptions {
    /// Worker count; `0` runs on the current rayon pool
    pub n_threads: usize,
    /// Split the task range into this many stripes of consecutive tasks
    pub nstripes: Option<usize>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pool: PoolCache,
}

/// Dedicated worker pool, built on first use and shared by all clones
#[derive(Clone, Default)]
struct PoolCache(Arc<Mutex<Option<Arc<ThreadPool>>>>);

impl std::fmt::Debug for PoolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PoolCache")
    }
}

// Equality of options is about configuration only
impl PartialEq for PoolCache {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for PoolCache {}

impl PoolCache {
    fn get_or_build(&self, n_threads: usize) -> CoreResult<Arc<ThreadPool>> {
        let mut slot = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(pool) = slot.as_ref() {
            if pool.current_num_threads() == n_threads {
                return Ok(Arc::clone(pool));
            }
        }
        let pool = Arc::new(rayon::ThreadPoolBuilder::new().num_threads(n_threads).build()?);
        *slot = Some(Arc::clone(&pool));
        Ok(pool)
    }
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get().max(1),
            nstripes: None,
            pool: PoolCache::default(),
        }
    }
}

impl ParallelOptions {
    pub fn new(n_threads: usize, nstripes: Option<usize>) -> Self {
        Self { n_threads, nstripes, pool: PoolCache::default() }
    }

    pub fn single_threaded() -> Self {
        Self::new(1, None)
    }

    pub fn threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads;
        self.pool = PoolCache::default();
        self
    }

    pub fn stripes(mut self, nstripes: usize) -> Self {
        self.nstripes = Some(nstripes);
        self
    }

    fn min_stripe_len(&self, ntasks: usize) -> usize {
        match self.nstripes {
            Some(stripes) if stripes > 0 => ntasks.div_ceil(stripes).max(1),
            _ => 1,
        }
    }
}

/// Run `task(0..ntasks)` in parallel and return the outputs in task order.
///
/// Each task only sees its own index and writes only its own slot, so the
/// returned vector is identical whatever order the tasks complete in.
pub fn run_indexed<T, F>(ntasks: usize, options: &ParallelOptions, task: F) -> CoreResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    if ntasks == 0 {
        return Ok(Vec::new());
    }

    let min_len = options.min_stripe_len(ntasks);
    let run = || {
        (0..ntasks)
            .into_par_iter()
            .with_min_len(min_len)
            .map(&task)
            .collect::<Vec<T>>()
    };

    if options.n_threads == 0 || options.n_threads == rayon::current_num_threads() {
        Ok(run())
    } else {
        let pool = options.pool.get_or_build(options.n_threads)?;
        Ok(pool.install(run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_task_list() {
        let out: Vec<usize> = run_indexed(0, &ParallelOptions::default(), |i| i).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_dedicated_pool() {
        let options = ParallelOptions::default().threads(3);
        let sizes = run_indexed(4, &options, |_| rayon::current_num_threads()).unwrap();
        assert_eq!(sizes, vec![3; 4]);
    }

    #[test]
    fn test_dedicated_pool_is_built_once() {
        let options = ParallelOptions::default().threads(3);
        let first = options.pool.get_or_build(3).unwrap();
        run_indexed(8, &options, |i| i).unwrap();
        let shared = options.clone();
        run_indexed(8, &shared, |i| i).unwrap();
        assert!(Arc::ptr_eq(&first, &shared.pool.get_or_build(3).unwrap()));

        let resized = shared.threads(2);
        let sizes = run_indexed(2, &resized, |_| rayon::current_num_threads()).unwrap();
        assert_eq!(sizes, vec![2; 2]);
        assert!(!Arc::ptr_eq(&first, &resized.pool.get_or_build(2).unwrap()));
    }

    #[test]
    fn test_stripe_length() {
        assert_eq!(ParallelOptions::default().stripes(4).min_stripe_len(10), 3);
        assert_eq!(ParallelOptions::default().min_stripe_len(10), 1);
        assert_eq!(ParallelOptions::default().stripes(0).min_stripe_len(10), 1);
    }

    proptest! {
        #[test]
        fn prop_outputs_keep_task_order(
            ntasks in 0usize..200,
            threads in 0usize..6,
            stripes in proptest::option::of(0usize..16),
        ) {
            let options = ParallelOptions::new(threads, stripes);
            let out = run_indexed(ntasks, &options, |i| i * 3).unwrap();
            prop_assert_eq!(out, (0..ntasks).map(|i| i * 3).collect::<Vec<_>>());
        }
    }
}
