//! Column-by-column terrain synthesis and template stamping.

use karst_blocks::{Block, BlockId, BlockRegistry};
use karst_geom::IVec3;
use karst_structures::TemplateLibrary;

use crate::noise::{range_map_clamped, smooth_start5, smooth_step3, white_2d_01, white_2d_pm1, white_3d_01};
use crate::world::{GenCtx, SEED_DIRT_DEPTH, SEED_ORES, SEED_TEMPERATURE_JITTER};
use crate::{
    BASE_TERRAIN_HEIGHT, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, CHUNK_TOTAL_BLOCKS, ChunkCoord,
    SEA_LEVEL, World, block_index, caves,
};

pub const MAX_HILLINESS: f32 = 60.0;
pub const OCEAN_FLOOR_DEPTH: i32 = 30;
pub const MAX_OCEANNESS_THRESHOLD: f32 = 0.5;

pub const HUMIDITY_SAND_THRESHOLD: f32 = 0.45;
pub const HUMIDITY_BEACH_THRESHOLD: f32 = 0.6;
pub const HUMIDITY_MUSHROOM_THRESHOLD: f32 = 0.6;
pub const TEMPERATURE_ICE_THRESHOLD: f32 = 0.5;
pub const MUSHROOM_BASE_THRESHOLD: f32 = 0.5;

pub const MAX_SAND_THICKNESS: f32 = 8.0;
pub const MAX_ICE_THICKNESS: f32 = 10.0;

// Cumulative ore thresholds over a single white-noise roll per stone cell.
pub const DIAMOND_RANGE_MAX: f32 = 0.001;
pub const GOLD_RANGE_MAX: f32 = 0.006;
pub const IRON_RANGE_MAX: f32 = 0.026;
pub const COAL_RANGE_MAX: f32 = 0.076;

/// Columns outside the chunk still seed structures whose crowns reach in.
const TEMPLATE_RING: i32 = 5;

/// A structure stamp queued during generation: template name plus the
/// chunk-local origin (possibly out of bounds; clipped at stamp time).
pub(crate) struct QueuedStamp {
    pub template: &'static str,
    pub origin: IVec3,
}

struct Palette {
    stone: BlockId,
    dirt: BlockId,
    grass: BlockId,
    sand: BlockId,
    water: BlockId,
    ice: BlockId,
    coal: BlockId,
    iron: BlockId,
    gold: BlockId,
    diamond: BlockId,
}

impl Palette {
    fn resolve(reg: &BlockRegistry) -> Self {
        Palette {
            stone: reg.id_or_air("stone"),
            dirt: reg.id_or_air("dirt"),
            grass: reg.id_or_air("grass"),
            sand: reg.id_or_air("sand"),
            water: reg.id_or_air("water"),
            ice: reg.id_or_air("ice"),
            coal: reg.id_or_air("coal_ore"),
            iron: reg.id_or_air("iron_ore"),
            gold: reg.id_or_air("gold_ore"),
            diamond: reg.id_or_air("diamond_ore"),
        }
    }
}

struct ColumnPlan {
    humidity: f32,
    temperature: f32,
    terrain_height: i32,
    stone_height: i32,
    sand_thickness: i32,
    ice_thickness: i32,
    tree_seed: bool,
    mushroom_seed: bool,
}

pub fn populate_chunk(
    world: &World,
    ctx: &mut GenCtx,
    coord: ChunkCoord,
    reg: &BlockRegistry,
    templates: &TemplateLibrary,
) -> Vec<Block> {
    let mut blocks = vec![Block::AIR; CHUNK_TOTAL_BLOCKS];
    let palette = Palette::resolve(reg);
    let mut stamps: Vec<QueuedStamp> = Vec::new();

    let (base_x, base_y) = coord.origin();
    for ly in -TEMPLATE_RING..CHUNK_SIZE_Y as i32 + TEMPLATE_RING {
        for lx in -TEMPLATE_RING..CHUNK_SIZE_X as i32 + TEMPLATE_RING {
            let gx = base_x + lx;
            let gy = base_y + ly;
            let plan = sample_column(world, ctx, gx, gy);

            if (0..CHUNK_SIZE_X as i32).contains(&lx) && (0..CHUNK_SIZE_Y as i32).contains(&ly) {
                fill_column(world, &mut blocks, &palette, &plan, lx as usize, ly as usize, gx, gy);
            }

            if plan.tree_seed && plan.terrain_height > SEA_LEVEL {
                let template = if plan.humidity < HUMIDITY_SAND_THRESHOLD {
                    "cactus"
                } else if plan.temperature < TEMPERATURE_ICE_THRESHOLD {
                    "spruce_tree"
                } else {
                    "oak_tree"
                };
                stamps.push(QueuedStamp {
                    template,
                    origin: IVec3::new(lx, ly, plan.terrain_height + 1),
                });
            }

            if plan.mushroom_seed
                && plan.terrain_height > SEA_LEVEL
                && plan.humidity > HUMIDITY_MUSHROOM_THRESHOLD
            {
                stamps.push(QueuedStamp {
                    template: "giant_mushroom",
                    origin: IVec3::new(lx, ly, plan.terrain_height),
                });
            }
        }
    }

    caves::carve_caves(world, ctx, coord, reg, &mut blocks, &mut stamps);

    for stamp in &stamps {
        if let Some(template) = templates.get(stamp.template) {
            for (offset, block) in template.resolved_blueprint(reg) {
                let x = stamp.origin.x + offset.x;
                let y = stamp.origin.y + offset.y;
                let z = stamp.origin.z + offset.z;
                if (0..CHUNK_SIZE_X as i32).contains(&x)
                    && (0..CHUNK_SIZE_Y as i32).contains(&y)
                    && (0..CHUNK_SIZE_Z as i32).contains(&z)
                {
                    blocks[block_index(x as usize, y as usize, z as usize)] = block;
                }
            }
        }
    }

    blocks
}

fn sample_column(world: &World, ctx: &mut GenCtx, gx: i32, gy: i32) -> ColumnPlan {
    let seed = world.seed;
    let xf = gx as f32;
    let yf = gy as f32;

    let humidity = 0.5 + 0.5 * ctx.humidity.get_noise_2d(xf, yf);
    let mut temperature = 0.5 + 0.5 * ctx.temperature.get_noise_2d(xf, yf);
    temperature += 0.007 * white_2d_pm1(gx, gy, seed.wrapping_add(SEED_TEMPERATURE_JITTER));
    let hilliness = MAX_HILLINESS * smooth_step3(0.5 + 0.5 * ctx.hilliness.get_noise_2d(xf, yf));
    let oceanness = smooth_step3(ctx.oceanness.get_noise_2d(xf, yf));
    let tree_density = 0.5 + 0.5 * ctx.tree_density.get_noise_2d(xf, yf);

    let mut terrain_height =
        BASE_TERRAIN_HEIGHT + (hilliness * ctx.terrain.get_noise_2d(xf, yf).abs()) as i32;
    if oceanness > MAX_OCEANNESS_THRESHOLD {
        terrain_height -= OCEAN_FLOOR_DEPTH;
    } else if oceanness > 0.0 {
        let depth_fraction = smooth_start5(oceanness / MAX_OCEANNESS_THRESHOLD);
        terrain_height -= (OCEAN_FLOOR_DEPTH as f32 * depth_fraction) as i32;
    }

    let dirt_depth = if white_2d_01(gx, gy, seed.wrapping_add(SEED_DIRT_DEPTH)) > 0.5 {
        4
    } else {
        3
    };

    ctx.tree_grid.set_fractal_gain(Some(tree_density));
    let tree_seed = strict_center_max(|dx, dy| {
        0.5 + 0.5
            * ctx
                .tree_grid
                .get_noise_2d((gx + dx) as f32, (gy + dy) as f32)
    }, 2, None);

    let mushroom_seed = strict_center_max(
        |dx, dy| {
            0.5 + 0.5
                * ctx
                    .mushroom_grid
                    .get_noise_2d((gx + dx) as f32, (gy + dy) as f32)
        },
        7,
        Some(MUSHROOM_BASE_THRESHOLD),
    );

    ColumnPlan {
        humidity,
        temperature,
        terrain_height,
        stone_height: terrain_height - dirt_depth,
        sand_thickness: range_map_clamped(humidity, 0.0, HUMIDITY_SAND_THRESHOLD, MAX_SAND_THICKNESS, 0.0)
            .round() as i32,
        ice_thickness: range_map_clamped(
            temperature,
            0.0,
            TEMPERATURE_ICE_THRESHOLD,
            MAX_ICE_THICKNESS,
            0.0,
        )
        .round() as i32,
        tree_seed,
        mushroom_seed,
    }
}

/// True when the sample at (0,0) is the strict maximum of the
/// (2r+1)×(2r+1) grid around it, and above `floor` if one is given.
fn strict_center_max(mut sample: impl FnMut(i32, i32) -> f32, radius: i32, floor: Option<f32>) -> bool {
    let center = sample(0, 0);
    if let Some(floor) = floor {
        if center < floor {
            return false;
        }
    }
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx == 0 && dy == 0 {
                continue;
            }
            if sample(dx, dy) > center {
                return false;
            }
        }
    }
    true
}

fn fill_column(
    world: &World,
    blocks: &mut [Block],
    palette: &Palette,
    plan: &ColumnPlan,
    lx: usize,
    ly: usize,
    gx: i32,
    gy: i32,
) {
    let ore_seed = world.seed.wrapping_add(SEED_ORES);
    for z in 0..CHUNK_SIZE_Z as i32 {
        let id = if z == plan.terrain_height {
            if plan.humidity < HUMIDITY_SAND_THRESHOLD {
                palette.sand
            } else if plan.humidity < HUMIDITY_BEACH_THRESHOLD && z == SEA_LEVEL {
                palette.sand
            } else {
                palette.grass
            }
        } else if z < plan.terrain_height && z >= plan.stone_height {
            if plan.humidity < HUMIDITY_SAND_THRESHOLD
                && z >= plan.terrain_height - plan.sand_thickness
            {
                palette.sand
            } else {
                palette.dirt
            }
        } else if z < plan.stone_height {
            let roll = white_3d_01(gx, gy, z, ore_seed);
            if roll <= DIAMOND_RANGE_MAX {
                palette.diamond
            } else if roll <= GOLD_RANGE_MAX {
                palette.gold
            } else if roll <= IRON_RANGE_MAX {
                palette.iron
            } else if roll <= COAL_RANGE_MAX {
                palette.coal
            } else {
                palette.stone
            }
        } else if z <= SEA_LEVEL {
            // Above terrain but at or below sea level.
            if plan.temperature < TEMPERATURE_ICE_THRESHOLD
                && z >= SEA_LEVEL - plan.ice_thickness
            {
                palette.ice
            } else {
                palette.water
            }
        } else {
            continue;
        };
        blocks[block_index(lx, ly, z as usize)] = Block::new(id);
    }
}
