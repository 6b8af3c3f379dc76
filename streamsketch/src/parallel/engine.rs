use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use tracing::debug;
use tracing::info;

use crate::countmin::CmsConfig;
use crate::countmin::CountMinSketch;
use crate::error::Error;
use crate::error::Result;
use crate::heavyhitters::HeavyHitters;
use crate::heavyhitters::HhConfig;
use crate::hll::HllConfig;
use crate::hll::HyperLogLog;

/// One record's keys with their multiplicities.
pub type Batch = Vec<(Vec<u8>, u64)>;

/// The sketches of one parallel session, fields in alphabetical order.
///
/// [`parallel_add`] returns the requested subset populated; the others stay
/// `None`.
#[derive(Debug, Default)]
pub struct SketchSet {
    /// Count-Min frequency sketch.
    pub cms: Option<CountMinSketch>,
    /// Topkapi heavy-hitters sketch.
    pub hh: Option<HeavyHitters>,
    /// HyperLogLog cardinality sketch.
    pub hll: Option<HyperLogLog>,
}

impl SketchSet {
    fn build(options: &ParallelOptions, worker_id: u64) -> Result<Self> {
        let cms = match &options.cms {
            Some(config) => {
                let mut sketch = CountMinSketch::new(config.clone())?;
                sketch.reseed_stream(worker_id);
                Some(sketch)
            }
            None => None,
        };
        let hh = match &options.hh {
            Some(config) => Some(HeavyHitters::new(config.clone())?),
            None => None,
        };
        let hll = match options.hll {
            Some(config) => Some(HyperLogLog::new(config)?),
            None => None,
        };
        Ok(Self { cms, hh, hll })
    }

    /// Adds `count` occurrences of `key` to every sketch in the set (the
    /// HyperLogLog ignores the multiplicity).
    pub fn add_count(&mut self, key: &[u8], count: u64) {
        if let Some(cms) = &mut self.cms {
            cms.add_count(key, count);
        }
        if let Some(hh) = &mut self.hh {
            hh.add_count(key, count);
        }
        if let Some(hll) = &mut self.hll {
            hll.add(key);
        }
    }

    /// Credits `n` processed records to every sketch in the set.
    pub fn update_records(&mut self, n: u64) {
        if let Some(cms) = &mut self.cms {
            cms.update_records(n);
        }
        if let Some(hh) = &mut self.hh {
            hh.update_records(n);
        }
        if let Some(hll) = &mut self.hll {
            hll.update_records(n);
        }
    }

    /// Ingests one record's batch, shingling keys when `ngram` is set.
    fn ingest(&mut self, batch: &Batch, ngram: Option<usize>) {
        for (key, count) in batch {
            match ngram {
                Some(n) if n > 0 && key.len() > n => {
                    for window in key.windows(n) {
                        self.add_count(window, *count);
                    }
                }
                _ => self.add_count(key, *count),
            }
        }
        self.update_records(1);
    }

    fn merge(&mut self, other: &SketchSet) -> Result<()> {
        if let (Some(a), Some(b)) = (&mut self.cms, &other.cms) {
            a.merge(b)?;
        }
        if let (Some(a), Some(b)) = (&mut self.hh, &other.hh) {
            a.merge(b)?;
        }
        if let (Some(a), Some(b)) = (&mut self.hll, &other.hll) {
            a.merge(b)?;
        }
        Ok(())
    }
}

/// User callback of a parallel session, in one of two explicit shapes.
///
/// The shape is chosen at construction; there is no runtime inspection of
/// what the callback returned.
pub enum ProcessFn<'a, T> {
    /// Mutates the worker's sketches directly and returns the number of
    /// records it processed.
    ReturnsCount(Box<dyn Fn(T, &mut SketchSet) -> Result<u64> + Send + Sync + 'a>),
    /// Yields one [`Batch`] of `(key, count)` pairs per record; the engine
    /// feeds every sketch and credits one record per batch.
    YieldsBatches(Box<dyn Fn(T) -> Result<Vec<Batch>> + Send + Sync + 'a>),
}

impl<'a, T> ProcessFn<'a, T> {
    /// Wraps a callback that mutates the sketches and returns its record
    /// count.
    pub fn returns_count(
        f: impl Fn(T, &mut SketchSet) -> Result<u64> + Send + Sync + 'a,
    ) -> Self {
        ProcessFn::ReturnsCount(Box::new(f))
    }

    /// Wraps a callback that yields batches of keys for the engine to
    /// ingest.
    pub fn yields_batches(f: impl Fn(T) -> Result<Vec<Batch>> + Send + Sync + 'a) -> Self {
        ProcessFn::YieldsBatches(Box::new(f))
    }
}

/// Options of a [`parallel_add`] session.
#[derive(Debug, Default, Clone)]
pub struct ParallelOptions {
    /// Number of worker threads; defaults to the machine's available
    /// parallelism.
    pub n_workers: Option<usize>,
    /// Shingle size applied to yielded keys before they reach the sketches.
    pub ngram: Option<usize>,
    /// Build a Count-Min sketch with this configuration.
    pub cms: Option<CmsConfig>,
    /// Build a heavy-hitters sketch with this configuration.
    pub hh: Option<HhConfig>,
    /// Build a HyperLogLog sketch with this configuration.
    pub hll: Option<HllConfig>,
}

impl ParallelOptions {
    /// Empty options; request at least one sketch before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker count.
    pub fn with_workers(mut self, n_workers: usize) -> Self {
        self.n_workers = Some(n_workers);
        self
    }

    /// Shingles every yielded key into windows of `ngram` bytes.
    pub fn with_ngram(mut self, ngram: usize) -> Self {
        self.ngram = Some(ngram);
        self
    }

    /// Requests a Count-Min sketch.
    pub fn with_cms(mut self, config: CmsConfig) -> Self {
        self.cms = Some(config);
        self
    }

    /// Requests a heavy-hitters sketch.
    pub fn with_hh(mut self, config: HhConfig) -> Self {
        self.hh = Some(config);
        self
    }

    /// Requests a HyperLogLog sketch.
    pub fn with_hll(mut self, config: HllConfig) -> Self {
        self.hll = Some(config);
        self
    }
}

/// Builds the requested sketches from `items` in one parallel pass.
///
/// Spawns workers draining a bounded queue, each ingesting into private
/// sketches via `process_fn`, then reduces the worker sketches with a
/// pairwise tournament merge and returns the final [`SketchSet`].
///
/// # Errors
///
/// Returns [`ErrorKind::InvalidConfig`] if no sketch was requested or a
/// sketch configuration is invalid, the first callback error if a worker
/// fails (the session aborts and drains, no partial result), and
/// [`ErrorKind::WorkerFailed`] if a callback panics.
///
/// [`ErrorKind::InvalidConfig`]: crate::error::ErrorKind::InvalidConfig
/// [`ErrorKind::WorkerFailed`]: crate::error::ErrorKind::WorkerFailed
pub fn parallel_add<I, T>(
    items: I,
    process_fn: ProcessFn<'_, T>,
    options: ParallelOptions,
) -> Result<SketchSet>
where
    I: IntoIterator<Item = T>,
    I::IntoIter: Send,
    T: Send,
{
    if options.cms.is_none() && options.hh.is_none() && options.hll.is_none() {
        return Err(Error::invalid_config(
            "at least one of cms, hh, or hll must be requested",
        ));
    }
    if let Some(0) = options.ngram {
        return Err(Error::invalid_config("ngram must be greater than 0"));
    }

    let n_workers = options
        .n_workers
        .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
        .max(1);

    // Configs are validated here, before any thread spawns.
    let worker_sets = (0..n_workers)
        .map(|id| SketchSet::build(&options, id as u64))
        .collect::<Result<Vec<_>>>()?;

    info!(n_workers, "parallel_add: starting workers");

    let (tx, rx) = mpsc::sync_channel::<T>(3 * n_workers);
    let rx = Arc::new(Mutex::new(rx));
    let abort = AtomicBool::new(false);
    let first_error: Mutex<Option<Error>> = Mutex::new(None);
    let ngram = options.ngram;
    let process_fn = &process_fn;

    let mut finished = thread::scope(|scope| -> Result<Vec<SketchSet>> {
        // Producer owns the sender; dropping it is the drain signal.
        let items = items.into_iter();
        let producer = {
            let abort = &abort;
            scope.spawn(move || {
                let mut queued = 0u64;
                for item in items {
                    if abort.load(Ordering::Relaxed) || tx.send(item).is_err() {
                        break;
                    }
                    queued += 1;
                }
                info!(queued, "parallel_add: all items placed on the queue");
            })
        };

        let handles: Vec<_> = worker_sets
            .into_iter()
            .enumerate()
            .map(|(worker_id, mut set)| {
                let rx = Arc::clone(&rx);
                let abort = &abort;
                let first_error = &first_error;
                scope.spawn(move || {
                    debug!(worker_id, "worker starting");
                    let mut records = 0u64;
                    loop {
                        let item = match rx.lock().expect("queue lock poisoned").recv() {
                            Ok(item) => item,
                            Err(_) => break,
                        };
                        if abort.load(Ordering::Relaxed) {
                            break;
                        }
                        let processed = match process_fn {
                            ProcessFn::ReturnsCount(f) => f(item, &mut set).map(|n| {
                                set.update_records(n);
                                n
                            }),
                            ProcessFn::YieldsBatches(f) => f(item).map(|batches| {
                                let n = batches.len() as u64;
                                for batch in &batches {
                                    set.ingest(batch, ngram);
                                }
                                n
                            }),
                        };
                        match processed {
                            Ok(n) => records += n,
                            Err(e) => {
                                let mut slot = first_error.lock().expect("error lock poisoned");
                                if slot.is_none() {
                                    *slot = Some(e);
                                }
                                abort.store(true, Ordering::Relaxed);
                                break;
                            }
                        }
                    }
                    debug!(worker_id, records, "worker finished");
                    set
                })
            })
            .collect();

        // The workers hold the only live receiver clones, so once they exit
        // a blocked producer unblocks with a send error.
        drop(rx);

        let mut sets = Vec::with_capacity(handles.len());
        let mut panicked = false;
        for handle in handles {
            match handle.join() {
                Ok(set) => sets.push(set),
                Err(_) => panicked = true,
            }
        }
        producer
            .join()
            .map_err(|_| Error::worker("producer thread panicked"))?;

        if let Some(e) = first_error.lock().expect("error lock poisoned").take() {
            return Err(e);
        }
        if panicked {
            return Err(Error::worker("a worker thread panicked in process_fn"));
        }
        Ok(sets)
    })?;

    tournament_merge(&mut finished)?;
    Ok(finished.pop().expect("at least one worker set"))
}

/// Reduces the worker sets in ceil(log2(W)) rounds of pairwise merging.
///
/// Round pairing is deterministic (index `i` merges with `i + ceil(len/2)`)
/// so a fixed partition of the input reproduces byte-identical results.
fn tournament_merge(sets: &mut Vec<SketchSet>) -> Result<()> {
    while sets.len() > 1 {
        let half = sets.len().div_ceil(2);
        let tail = sets.split_off(half);
        let outcomes: Vec<Result<()>> = thread::scope(|scope| {
            let handles: Vec<_> = sets
                .iter_mut()
                .zip(tail.iter())
                .map(|(keep, fold)| scope.spawn(move || keep.merge(fold)))
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(Error::worker("merge thread panicked")))
                })
                .collect()
        });
        for outcome in outcomes {
            outcome?;
        }
        debug!(remaining = sets.len(), "finished round of merging");
    }
    Ok(())
}
