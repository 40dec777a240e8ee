use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};
use karst_blocks::{Block, BlockRegistry};
use karst_structures::TemplateLibrary;

use crate::{ChunkCoord, generation};

// Seed offsets for the independent noise fields. The terrain height
// field uses the raw world seed.
const SEED_HUMIDITY: u32 = 1;
const SEED_TEMPERATURE: u32 = 2;
pub(crate) const SEED_TEMPERATURE_JITTER: u32 = 3;
const SEED_HILLINESS: u32 = 4;
const SEED_OCEANNESS: u32 = 5;
const SEED_TREE_DENSITY: u32 = 6;
const SEED_TREE_GRID: u32 = 7;
const SEED_MUSHROOM_GRID: u32 = 8;
pub(crate) const SEED_DIRT_DEPTH: u32 = 9;
pub(crate) const SEED_ORES: u32 = 10;
pub(crate) const SEED_CAVE_LAYOUT: u32 = 11;
const SEED_CAVE_YAW: u32 = 12;
const SEED_CAVE_PITCH: u32 = 13;
const SEED_CAVE_RADIUS: u32 = 14;
const SEED_VOLCANIC: u32 = 15;

pub struct World {
    pub seed: u32,
}

impl World {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    /// Build the per-chunk noise context. One context serves one
    /// `populate_chunk` call; workers keep their own.
    pub fn make_gen_ctx(&self) -> GenCtx {
        let seed = self.seed;
        GenCtx {
            humidity: perlin_2d(seed.wrapping_add(SEED_HUMIDITY), 400.0, 5, 0.5),
            temperature: perlin_2d(seed.wrapping_add(SEED_TEMPERATURE), 400.0, 5, 0.5),
            hilliness: perlin_2d(seed.wrapping_add(SEED_HILLINESS), 400.0, 2, 0.5),
            oceanness: perlin_2d(seed.wrapping_add(SEED_OCEANNESS), 1200.0, 3, 0.5),
            tree_density: perlin_2d(seed.wrapping_add(SEED_TREE_DENSITY), 500.0, 4, 0.5),
            tree_grid: perlin_2d(seed.wrapping_add(SEED_TREE_GRID), 400.0, 8, 0.5),
            mushroom_grid: perlin_2d(seed.wrapping_add(SEED_MUSHROOM_GRID), 300.0, 8, 0.5),
            terrain: perlin_2d(seed, 200.0, 5, 0.5),
            cave_yaw: perlin_3d(seed.wrapping_add(SEED_CAVE_YAW), 1.0, 3, 0.5, 0.2),
            cave_pitch: perlin_3d(seed.wrapping_add(SEED_CAVE_PITCH), 1.0, 3, 0.5, 2.0),
            cave_radius: perlin_3d(seed.wrapping_add(SEED_CAVE_RADIUS), 0.75, 1, 0.5, 2.0),
            volcanic: perlin_3d(seed.wrapping_add(SEED_VOLCANIC), 1.0, 5, 0.5, 2.0),
        }
    }

    /// Generate the chunk's block grid. Pure in `(seed, coord)`: two
    /// calls with the same inputs yield byte-identical grids.
    pub fn populate_chunk(
        &self,
        ctx: &mut GenCtx,
        coord: ChunkCoord,
        reg: &BlockRegistry,
        templates: &TemplateLibrary,
    ) -> Vec<Block> {
        generation::populate_chunk(self, ctx, coord, reg, templates)
    }
}

/// Per-chunk worldgen noise sources. Mutable because the tree grid's
/// fractal gain is retuned per column.
pub struct GenCtx {
    pub(crate) humidity: FastNoiseLite,
    pub(crate) temperature: FastNoiseLite,
    pub(crate) hilliness: FastNoiseLite,
    pub(crate) oceanness: FastNoiseLite,
    pub(crate) tree_density: FastNoiseLite,
    pub(crate) tree_grid: FastNoiseLite,
    pub(crate) mushroom_grid: FastNoiseLite,
    pub(crate) terrain: FastNoiseLite,
    pub(crate) cave_yaw: FastNoiseLite,
    pub(crate) cave_pitch: FastNoiseLite,
    pub(crate) cave_radius: FastNoiseLite,
    pub(crate) volcanic: FastNoiseLite,
}

fn perlin_2d(seed: u32, scale: f32, octaves: i32, gain: f32) -> FastNoiseLite {
    let mut n = FastNoiseLite::with_seed(seed as i32);
    n.set_noise_type(Some(NoiseType::Perlin));
    n.set_fractal_type(Some(FractalType::FBm));
    n.set_fractal_octaves(Some(octaves));
    n.set_fractal_gain(Some(gain));
    n.set_frequency(Some(1.0 / scale));
    n
}

fn perlin_3d(seed: u32, scale: f32, octaves: i32, gain: f32, lacunarity: f32) -> FastNoiseLite {
    let mut n = perlin_2d(seed, scale, octaves, gain);
    n.set_fractal_lacunarity(Some(lacunarity));
    n
}
