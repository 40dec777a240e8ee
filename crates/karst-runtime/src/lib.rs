//! Generation worker pool.
//!
//! Workers run one kind of task: populate a chunk's block grid. The
//! chunk itself travels through the channels, and its atomic lifecycle
//! state is the only cross-thread signal: `Generating` while a worker
//! owns the grid, `Completed` (stored with release ordering) before the
//! chunk is sent back, so a main thread that observes `Completed` also
//! observes every block write.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use karst_blocks::BlockRegistry;
use karst_chunk::{Chunk, ChunkState};
use karst_structures::TemplateLibrary;
use karst_world::World;
use rayon::{ThreadPool, ThreadPoolBuilder};

struct GenJob {
    chunk: Chunk,
}

pub struct Runtime {
    job_tx: Sender<GenJob>,
    res_rx: Receiver<GenJob>,
    workers: usize,
    _pool: Arc<ThreadPool>,
}

impl Runtime {
    /// Spin up `available_parallelism - 1` workers (at least one).
    /// Dropping the runtime disconnects the job channel and the
    /// workers drain out; results from jobs still in flight are
    /// discarded with the result channel.
    pub fn new(
        world: Arc<World>,
        reg: Arc<BlockRegistry>,
        templates: Arc<TemplateLibrary>,
    ) -> Self {
        let (job_tx, job_rx) = unbounded::<GenJob>();
        let (res_tx, res_rx) = unbounded::<GenJob>();

        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .saturating_sub(1)
            .max(1);
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("karst-gen-{i}"))
                .build()
                .expect("generation pool"),
        );
        log::info!("generation pool: {workers} workers");

        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let world = world.clone();
            let reg = reg.clone();
            let templates = templates.clone();
            pool.spawn(move || {
                let mut ctx = world.make_gen_ctx();
                while let Ok(GenJob { mut chunk }) = rx.recv() {
                    chunk.set_state(ChunkState::Generating);
                    chunk.blocks = world.populate_chunk(&mut ctx, chunk.coord, &reg, &templates);
                    chunk.set_state(ChunkState::Completed);
                    if tx.send(GenJob { chunk }).is_err() {
                        break;
                    }
                }
            });
        }

        Self {
            job_tx,
            res_rx,
            workers,
            _pool: pool,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Hand a queued chunk to the pool.
    pub fn submit(&self, chunk: Chunk) {
        debug_assert_eq!(chunk.state(), ChunkState::Queued);
        let _ = self.job_tx.send(GenJob { chunk });
    }

    /// Non-blocking harvest of every finished chunk.
    pub fn drain_completed(&self) -> Vec<Chunk> {
        self.res_rx.try_iter().map(|job| job.chunk).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karst_world::ChunkCoord;
    use std::time::{Duration, Instant};

    fn harvest_n(runtime: &Runtime, n: usize) -> Vec<Chunk> {
        let deadline = Instant::now() + Duration::from_secs(60);
        let mut out = Vec::new();
        while out.len() < n {
            out.extend(runtime.drain_completed());
            if Instant::now() > deadline {
                panic!("workers did not finish in time ({}/{n})", out.len());
            }
            thread::sleep(Duration::from_millis(5));
        }
        out
    }

    #[test]
    fn workers_generate_and_complete_chunks() {
        let world = Arc::new(World::new(77));
        let reg = Arc::new(BlockRegistry::builtin());
        let templates = Arc::new(TemplateLibrary::builtin());
        let runtime = Runtime::new(world.clone(), reg.clone(), templates.clone());
        assert!(runtime.worker_count() >= 1);

        runtime.submit(Chunk::new(ChunkCoord::new(0, 0)));
        runtime.submit(Chunk::new(ChunkCoord::new(1, 0)));
        let chunks = harvest_n(&runtime, 2);
        assert_eq!(chunks.len(), 2);

        for chunk in &chunks {
            assert_eq!(chunk.state(), ChunkState::Completed);
            // A populated chunk is never all air.
            assert!(chunk.blocks.iter().any(|b| b.id != 0));
        }

        // Worker output matches a main-thread generation of the same
        // coordinate: the pool adds no nondeterminism.
        let mut ctx = world.make_gen_ctx();
        for chunk in &chunks {
            let expect = world.populate_chunk(&mut ctx, chunk.coord, &reg, &templates);
            assert_eq!(chunk.blocks, expect);
        }
    }

    #[test]
    fn dropping_the_runtime_discards_in_flight_work() {
        let world = Arc::new(World::new(5));
        let reg = Arc::new(BlockRegistry::builtin());
        let templates = Arc::new(TemplateLibrary::builtin());
        let runtime = Runtime::new(world, reg, templates);
        for cx in 0..4 {
            runtime.submit(Chunk::new(ChunkCoord::new(cx, 0)));
        }
        drop(runtime);
        // Nothing to assert beyond "this returns": workers observe the
        // closed channels and exit instead of hanging the process.
    }
}
