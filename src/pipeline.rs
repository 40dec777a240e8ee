//! The world pipeline: chunk streaming, edits, lighting, and meshing,
//! advanced once per frame from the main thread.

use std::path::PathBuf;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use karst_blocks::{BlockId, BlockRegistry};
use karst_chunk::{Chunk, ChunkMap, ChunkState};
use karst_geom::{Aabb2, Vec2, Vec3};
use karst_io::LoadOutcome;
use karst_lighting::LightQueue;
use karst_mesh_cpu::{ChunkMeshCPU, build_chunk_mesh};
use karst_runtime::Runtime;
use karst_structures::TemplateLibrary;
use karst_world::{CHUNK_SIZE_X, CHUNK_SIZE_Y, ChunkCoord, World};

use crate::config::EngineConfig;
use crate::raycast::{RayHit, dir_from_normal, raycast_blocks};

pub const DIG_PLACE_DISTANCE: f32 = 8.0;

/// Viewer position and facing, fed in by the embedding app each frame.
#[derive(Clone, Copy, Debug)]
pub struct ViewerPose {
    pub position: Vec3,
    pub forward: Vec3,
}

/// User intents delivered by the input layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Dig,
    Place,
    /// Hotbar slot 1..=9; slots map onto block ids.
    SelectBlock(u8),
    ToggleRaycastLock,
    ToggleWorldShader,
    ToggleChunkBounds,
    DeactivateAll,
    BumpSeed,
}

/// Per-frame bookkeeping, mostly for logging and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    pub harvested: usize,
    pub submitted: usize,
    pub loaded: usize,
    pub deactivated: usize,
    pub light_steps: usize,
    pub meshes_rebuilt: usize,
}

/// Receives finished chunk meshes; the GPU uploader implements this.
pub trait MeshSink {
    fn upload(&mut self, coord: ChunkCoord, mesh: &ChunkMeshCPU);
    fn discard(&mut self, coord: ChunkCoord);
}

/// Headless default: meshes stay CPU-side only.
pub struct NullMeshSink;

impl MeshSink for NullMeshSink {
    fn upload(&mut self, _coord: ChunkCoord, _mesh: &ChunkMeshCPU) {}
    fn discard(&mut self, _coord: ChunkCoord) {}
}

pub struct WorldPipeline {
    world: Arc<World>,
    reg: Arc<BlockRegistry>,
    templates: Arc<TemplateLibrary>,
    runtime: Runtime,

    chunks: ChunkMap,
    queued: HashSet<ChunkCoord>,
    light_queue: LightQueue,
    meshes: HashMap<ChunkCoord, ChunkMeshCPU>,
    mesh_sink: Box<dyn MeshSink>,

    saves_root: PathBuf,
    activation_distance: f32,
    deactivation_distance: f32,
    max_chunks: usize,
    hidden_surface_removal: bool,

    selected_block: BlockId,
    raycast_locked: bool,
    ray_origin: Vec3,
    ray_direction: Vec3,
    pub world_shader_enabled: bool,
    pub draw_chunk_bounds: bool,
}

impl WorldPipeline {
    pub fn new(config: &EngineConfig, saves_root: PathBuf) -> Self {
        let world = Arc::new(World::new(config.world_seed));
        let reg = Arc::new(BlockRegistry::builtin());
        let templates = Arc::new(TemplateLibrary::builtin());
        let runtime = Runtime::new(world.clone(), reg.clone(), templates.clone());

        let activation_distance = config.chunk_activation_distance;
        let radius_x = 1 + activation_distance as usize / CHUNK_SIZE_X;
        let radius_y = 1 + activation_distance as usize / CHUNK_SIZE_Y;

        Self {
            world,
            reg,
            templates,
            runtime,
            chunks: ChunkMap::new(),
            queued: HashSet::new(),
            light_queue: LightQueue::new(),
            meshes: HashMap::new(),
            mesh_sink: Box::new(NullMeshSink),
            saves_root,
            activation_distance,
            deactivation_distance: activation_distance + (CHUNK_SIZE_X + CHUNK_SIZE_Y) as f32,
            max_chunks: 4 * radius_x * radius_y,
            hidden_surface_removal: config.enable_hidden_surface_removal,
            selected_block: 1,
            raycast_locked: false,
            ray_origin: Vec3::ZERO,
            ray_direction: Vec3::new(1.0, 0.0, 0.0),
            world_shader_enabled: true,
            draw_chunk_bounds: false,
        }
    }

    pub fn set_mesh_sink(&mut self, sink: Box<dyn MeshSink>) {
        self.mesh_sink = sink;
    }

    pub fn seed(&self) -> u32 {
        self.world.seed
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.reg
    }

    pub fn chunks(&self) -> &ChunkMap {
        &self.chunks
    }

    pub fn active_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queued.len()
    }

    pub fn selected_block(&self) -> BlockId {
        self.selected_block
    }

    pub fn mesh(&self, coord: ChunkCoord) -> Option<&ChunkMeshCPU> {
        self.meshes.get(&coord)
    }

    /// One frame: harvest finished generation, stream chunks in and
    /// out around the viewer, apply edits, relax lighting, and rebuild
    /// dirty meshes whose seams are fully resolvable.
    pub fn update(&mut self, pose: &ViewerPose, actions: &[Action]) -> FrameStats {
        let mut stats = FrameStats::default();
        let player_xy = pose.position.xy();

        stats.harvested = self.harvest_completed();

        while self.queued.len() + self.chunks.len() < self.max_chunks {
            let Some(coord) = self.find_nearest_missing(player_xy) else {
                break;
            };
            if karst_io::chunk_file_exists(&self.saves_root, self.world.seed, coord) {
                self.load_and_activate(coord);
                stats.loaded += 1;
            } else {
                let chunk = Chunk::new(coord);
                self.queued.insert(coord);
                self.runtime.submit(chunk);
                stats.submitted += 1;
            }
        }

        while let Some(coord) = self.find_farthest_outside(player_xy) {
            self.deactivate_chunk(coord);
            stats.deactivated += 1;
        }

        if !self.raycast_locked {
            self.ray_origin = pose.position;
            self.ray_direction = pose.forward;
        }
        for action in actions {
            self.apply_action(*action, pose);
        }

        stats.light_steps = self.light_queue.process(&mut self.chunks, &self.reg);
        stats.meshes_rebuilt = self.rebuild_meshes();
        stats
    }

    /// The current dig/place ray (frozen while the lock is on).
    pub fn raycast(&self) -> Option<RayHit> {
        raycast_blocks(
            &self.chunks,
            &self.reg,
            self.ray_origin,
            self.ray_direction,
            DIG_PLACE_DISTANCE,
        )
    }

    fn apply_action(&mut self, action: Action, pose: &ViewerPose) {
        match action {
            Action::Dig => self.dig(),
            Action::Place => self.place(),
            Action::SelectBlock(slot) => {
                if (1..=9).contains(&slot) && (slot as usize) < self.reg.defs.len() {
                    self.selected_block = slot;
                }
            }
            Action::ToggleRaycastLock => {
                self.raycast_locked = !self.raycast_locked;
                if self.raycast_locked {
                    self.ray_origin = pose.position;
                    self.ray_direction = pose.forward;
                }
            }
            Action::ToggleWorldShader => self.world_shader_enabled = !self.world_shader_enabled,
            Action::ToggleChunkBounds => self.draw_chunk_bounds = !self.draw_chunk_bounds,
            Action::DeactivateAll => self.deactivate_all(),
            Action::BumpSeed => self.bump_seed(),
        }
    }

    fn dig(&mut self) {
        let Some(hit) = self.raycast() else {
            return;
        };
        self.chunks.set_block_id(hit.block, 0);
        self.light_queue
            .on_block_dug(&mut self.chunks, &self.reg, hit.block);
    }

    fn place(&mut self) {
        let Some(hit) = self.raycast() else {
            return;
        };
        // Zero normal means the viewer is inside a solid block; there
        // is no face to build against.
        let Some(dir) = dir_from_normal(hit.normal) else {
            return;
        };
        let Some(target) = hit.block.neighbor(dir, &self.chunks) else {
            return;
        };
        self.chunks.set_block_id(target, self.selected_block);
        self.light_queue
            .on_block_placed(&mut self.chunks, &self.reg, target);
    }

    fn harvest_completed(&mut self) -> usize {
        let mut harvested = 0;
        for chunk in self.runtime.drain_completed() {
            debug_assert_eq!(chunk.state(), ChunkState::Completed);
            self.activate_chunk(chunk);
            harvested += 1;
        }
        harvested
    }

    fn activate_chunk(&mut self, chunk: Chunk) {
        let coord = chunk.coord;
        self.queued.remove(&coord);
        chunk.set_state(ChunkState::Activated);
        self.chunks.insert(chunk);
        self.light_queue
            .seed_chunk(&mut self.chunks, &self.reg, coord);
    }

    fn load_and_activate(&mut self, coord: ChunkCoord) {
        match karst_io::load_chunk(&self.saves_root, self.world.seed, coord) {
            Ok(LoadOutcome::Blocks(blocks)) => {
                self.activate_chunk(Chunk::from_blocks(coord, blocks));
            }
            Ok(LoadOutcome::SeedMismatch) => {
                // Stale world file: regenerate from scratch instead.
                log::warn!(
                    "chunk ({},{}) saved under another seed; regenerating",
                    coord.cx,
                    coord.cy
                );
                let mut ctx = self.world.make_gen_ctx();
                let blocks =
                    self.world
                        .populate_chunk(&mut ctx, coord, &self.reg, &self.templates);
                self.activate_chunk(Chunk::from_blocks(coord, blocks));
            }
            Err(e) => {
                // The file came from this engine; a bad one is a bug.
                panic!("corrupt chunk file for ({},{}): {e}", coord.cx, coord.cy);
            }
        }
    }

    /// Nearest not-yet-present chunk whose footprint intersects the
    /// activation disc, by squared distance to its min corner.
    fn find_nearest_missing(&self, player: Vec2) -> Option<ChunkCoord> {
        let r = self.activation_distance;
        let min_cx = ((player.x - r) / CHUNK_SIZE_X as f32).floor() as i32;
        let max_cx = ((player.x + r) / CHUNK_SIZE_X as f32).floor() as i32;
        let min_cy = ((player.y - r) / CHUNK_SIZE_Y as f32).floor() as i32;
        let max_cy = ((player.y + r) / CHUNK_SIZE_Y as f32).floor() as i32;

        let mut best: Option<(f32, ChunkCoord)> = None;
        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                let coord = ChunkCoord::new(cx, cy);
                if self.chunks.contains(coord) || self.queued.contains(&coord) {
                    continue;
                }
                let origin = Vec2::new(
                    (cx * CHUNK_SIZE_X as i32) as f32,
                    (cy * CHUNK_SIZE_Y as i32) as f32,
                );
                let bounds = Aabb2::new(
                    origin,
                    origin + Vec2::new(CHUNK_SIZE_X as f32, CHUNK_SIZE_Y as f32),
                );
                if bounds.nearest_point(player).distance_squared(player) > r * r {
                    continue;
                }
                let d = origin.distance_squared(player);
                if best.is_none_or(|(bd, _)| d < bd) {
                    best = Some((d, coord));
                }
            }
        }
        best.map(|(_, coord)| coord)
    }

    /// Farthest active chunk whose center left the deactivation disc.
    fn find_farthest_outside(&self, player: Vec2) -> Option<ChunkCoord> {
        let r2 = self.deactivation_distance * self.deactivation_distance;
        let mut worst: Option<(f32, ChunkCoord)> = None;
        for (&coord, chunk) in self.chunks.iter() {
            let d = chunk.center_xy().distance_squared(player);
            if d <= r2 {
                continue;
            }
            if worst.is_none_or(|(wd, _)| d > wd) {
                worst = Some((d, coord));
            }
        }
        worst.map(|(_, coord)| coord)
    }

    fn deactivate_chunk(&mut self, coord: ChunkCoord) {
        self.light_queue.drop_chunk(coord);
        if let Some(chunk) = self.chunks.remove(coord) {
            self.save_if_modified(&chunk);
        }
        self.meshes.remove(&coord);
        self.mesh_sink.discard(coord);
    }

    fn save_if_modified(&self, chunk: &Chunk) {
        if !chunk.needs_saving {
            return;
        }
        // A failed save is logged and dropped; it never blocks
        // deactivation.
        if let Err(e) =
            karst_io::save_chunk(&self.saves_root, self.world.seed, chunk.coord, &chunk.blocks)
        {
            log::warn!(
                "failed to save chunk ({},{}): {e}",
                chunk.coord.cx,
                chunk.coord.cy
            );
        }
    }

    /// Save every modified chunk and drop the whole active set, then
    /// restart the worker pool so in-flight generation is discarded.
    pub fn deactivate_all(&mut self) {
        let coords: Vec<ChunkCoord> = self.chunks.coords().collect();
        for coord in coords {
            if let Some(chunk) = self.chunks.remove(coord) {
                self.save_if_modified(&chunk);
            }
            self.meshes.remove(&coord);
            self.mesh_sink.discard(coord);
        }
        self.queued.clear();
        self.light_queue = LightQueue::new();
        self.runtime = Runtime::new(
            self.world.clone(),
            self.reg.clone(),
            self.templates.clone(),
        );
    }

    fn bump_seed(&mut self) {
        self.deactivate_all();
        let seed = self.world.seed.wrapping_add(1);
        log::info!("world seed is now {seed}");
        self.world = Arc::new(World::new(seed));
        self.runtime = Runtime::new(
            self.world.clone(),
            self.reg.clone(),
            self.templates.clone(),
        );
    }

    /// Rebuild dirty meshes; a chunk only re-meshes when all four
    /// horizontal neighbors are active, otherwise seam culling would
    /// guess wrong.
    fn rebuild_meshes(&mut self) -> usize {
        let ready: Vec<ChunkCoord> = self
            .chunks
            .iter()
            .filter(|&(&coord, ref chunk)| {
                chunk.mesh_dirty && self.chunks.has_all_horizontal_neighbors(coord)
            })
            .map(|(&coord, _)| coord)
            .collect();
        for coord in &ready {
            let mesh =
                build_chunk_mesh(&self.chunks, *coord, &self.reg, self.hidden_surface_removal);
            self.mesh_sink.upload(*coord, &mesh);
            self.meshes.insert(*coord, mesh);
            if let Some(chunk) = self.chunks.get_mut(*coord) {
                chunk.mesh_dirty = false;
            }
        }
        ready.len()
    }
}

impl Drop for WorldPipeline {
    fn drop(&mut self) {
        // Teardown persists whatever the session touched.
        let coords: Vec<ChunkCoord> = self.chunks.coords().collect();
        for coord in coords {
            if let Some(chunk) = self.chunks.remove(coord) {
                self.save_if_modified(&chunk);
            }
        }
    }
}
