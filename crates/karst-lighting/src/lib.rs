//! Dirty-flag flood-fill lighting across the active chunk set.
//!
//! Two scalar fields live on every block: outdoor (sky) light and
//! indoor (emissive) light, each 0..15, attenuating by one per step
//! through non-opaque blocks. A global FIFO holds blocks whose stored
//! values may be stale; draining it to empty restores the fixed point.
#![forbid(unsafe_code)]

use std::collections::VecDeque;

use karst_blocks::BlockRegistry;
use karst_chunk::{BlockIter, ChunkMap, Dir};
use karst_world::{CHUNK_MAX_X, CHUNK_MAX_Y, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, ChunkCoord};

pub const MAX_LIGHT: u8 = 15;

/// FIFO of dirty blocks. Queue membership and the per-block dirty bit
/// agree at all times: `mark_dirty` is the only enqueue path and it
/// only fires on the bit's false-to-true edge.
#[derive(Default)]
pub struct LightQueue {
    queue: VecDeque<BlockIter>,
}

impl LightQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Idempotent: a block already queued is left alone.
    pub fn mark_dirty(&mut self, chunks: &mut ChunkMap, iter: BlockIter) {
        let Some(block) = chunks.block(iter) else {
            return;
        };
        if block.is_light_dirty() {
            return;
        }
        chunks.update_block(iter, |b| b.set_light_dirty(true));
        self.queue.push_back(iter);
    }

    /// Forget queued entries belonging to a chunk about to be dropped.
    pub fn drop_chunk(&mut self, coord: ChunkCoord) {
        self.queue.retain(|it| it.coord != coord);
    }

    /// Drain the queue to empty. Returns the number of relaxation
    /// steps taken. Terminates: each re-enqueue requires a value
    /// change and values are bounded integers.
    pub fn process(&mut self, chunks: &mut ChunkMap, reg: &BlockRegistry) -> usize {
        let mut steps = 0usize;
        while let Some(iter) = self.queue.pop_front() {
            self.relax(chunks, reg, iter);
            steps += 1;
        }
        steps
    }

    fn relax(&mut self, chunks: &mut ChunkMap, reg: &BlockRegistry, iter: BlockIter) {
        let Some(block) = chunks.block(iter) else {
            return;
        };
        chunks.update_block(iter, |b| b.set_light_dirty(false));

        let mut correct_outdoor = if block.is_sky() { MAX_LIGHT } else { 0 };
        let mut correct_indoor = reg.emission(block.id);

        let opaque = reg.is_opaque(block.id);
        let mut neighbors = [None; 6];
        for (slot, dir) in neighbors.iter_mut().zip(Dir::ALL) {
            *slot = iter.neighbor(dir, chunks);
        }

        if !opaque {
            for n in neighbors.iter().flatten() {
                if let Some(nb) = chunks.block(*n) {
                    correct_outdoor = correct_outdoor.max(nb.outdoor_light().saturating_sub(1));
                    correct_indoor = correct_indoor.max(nb.indoor_light().saturating_sub(1));
                }
            }
        }

        if correct_outdoor == block.outdoor_light() && correct_indoor == block.indoor_light() {
            return;
        }

        chunks.update_block(iter, |b| {
            b.set_outdoor_light(correct_outdoor);
            b.set_indoor_light(correct_indoor);
        });

        // The owning chunk re-meshes, and so do the horizontal
        // neighbors in case the changed block sits on a seam.
        chunks.mark_mesh_dirty(iter.coord);
        for dir in Dir::HORIZONTAL {
            if let Some(n) = iter.neighbor(dir, chunks) {
                chunks.mark_mesh_dirty(n.coord);
            }
        }

        for n in neighbors.into_iter().flatten() {
            if let Some(nb) = chunks.block(n) {
                if !reg.is_opaque(nb.id) {
                    self.mark_dirty(chunks, n);
                }
            }
        }
    }

    /// Lighting bootstrap for a chunk that just entered the active
    /// set: flag sky columns, light them, and queue everything whose
    /// correct value cannot be known locally.
    pub fn seed_chunk(&mut self, chunks: &mut ChunkMap, reg: &BlockRegistry, coord: ChunkCoord) {
        // Sky flags: the maximal non-opaque suffix of every column.
        let mut sky_blocks: Vec<BlockIter> = Vec::new();
        {
            let Some(chunk) = chunks.get_mut(coord) else {
                return;
            };
            for y in 0..CHUNK_SIZE_Y {
                for x in 0..CHUNK_SIZE_X {
                    for z in (0..CHUNK_SIZE_Z).rev() {
                        let iter = BlockIter::from_local(coord, x, y, z);
                        if reg.is_opaque(chunk.get(iter.index).id) {
                            break;
                        }
                        chunk.blocks[iter.index].set_sky(true);
                        sky_blocks.push(iter);
                    }
                }
            }
        }

        // Sky columns radiate full outdoor light; lateral neighbors
        // that are open but not themselves sky pick it up via the queue.
        for iter in &sky_blocks {
            chunks.update_block(*iter, |b| b.set_outdoor_light(MAX_LIGHT));
        }
        for iter in &sky_blocks {
            for dir in Dir::HORIZONTAL {
                if let Some(n) = iter.neighbor(dir, chunks) {
                    if let Some(nb) = chunks.block(n) {
                        if !reg.is_opaque(nb.id) && !nb.is_sky() {
                            self.mark_dirty(chunks, n);
                        }
                    }
                }
            }
        }

        // Open blocks on the four vertical walls may receive light from
        // the neighboring chunk.
        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                for y in [0, CHUNK_MAX_Y] {
                    self.mark_dirty_if_open(chunks, reg, BlockIter::from_local(coord, x, y, z));
                }
            }
            for y in 0..CHUNK_SIZE_Y {
                for x in [0, CHUNK_MAX_X] {
                    self.mark_dirty_if_open(chunks, reg, BlockIter::from_local(coord, x, y, z));
                }
            }
        }

        // Emissive blocks seed the indoor field.
        let emitters: Vec<BlockIter> = match chunks.get(coord) {
            Some(chunk) => (0..chunk.blocks.len())
                .filter(|&i| reg.emission(chunk.blocks[i].id) > 0)
                .map(|i| BlockIter::new(coord, i))
                .collect(),
            None => Vec::new(),
        };
        for iter in emitters {
            self.mark_dirty(chunks, iter);
        }
    }

    fn mark_dirty_if_open(&mut self, chunks: &mut ChunkMap, reg: &BlockRegistry, iter: BlockIter) {
        if let Some(b) = chunks.block(iter) {
            if !reg.is_opaque(b.id) {
                self.mark_dirty(chunks, iter);
            }
        }
    }

    /// Sky bookkeeping after a block was dug out (the cell is already
    /// air). If the cell above was sky, sky now pours down the column.
    pub fn on_block_dug(&mut self, chunks: &mut ChunkMap, reg: &BlockRegistry, iter: BlockIter) {
        self.mark_dirty(chunks, iter);

        let above_is_sky = match iter.up(chunks) {
            Some(above) => chunks.block(above).is_some_and(|b| b.is_sky()),
            // Digging the top of the world opens the column to the sky.
            None => true,
        };
        if !above_is_sky {
            return;
        }

        chunks.update_block(iter, |b| b.set_sky(true));
        let mut below = iter.down(chunks);
        while let Some(cursor) = below {
            let Some(block) = chunks.block(cursor) else {
                break;
            };
            if reg.is_opaque(block.id) {
                break;
            }
            chunks.update_block(cursor, |b| b.set_sky(true));
            self.mark_dirty(chunks, cursor);
            below = cursor.down(chunks);
        }
    }

    /// Sky bookkeeping after a block was placed. An opaque block in a
    /// sky cell shadows the whole column beneath it.
    pub fn on_block_placed(&mut self, chunks: &mut ChunkMap, reg: &BlockRegistry, iter: BlockIter) {
        self.mark_dirty(chunks, iter);

        let Some(block) = chunks.block(iter) else {
            return;
        };
        if !(block.is_sky() && reg.is_opaque(block.id)) {
            return;
        }

        chunks.update_block(iter, |b| b.set_sky(false));
        let mut below = iter.down(chunks);
        while let Some(cursor) = below {
            let Some(b) = chunks.block(cursor) else {
                break;
            };
            if reg.is_opaque(b.id) {
                break;
            }
            chunks.update_block(cursor, |b| b.set_sky(false));
            self.mark_dirty(chunks, cursor);
            below = cursor.down(chunks);
        }
    }
}
