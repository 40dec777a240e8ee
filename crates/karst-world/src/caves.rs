//! Wandering-capsule cave carver.
//!
//! Every chunk within `CAVE_MAX_CHUNK_RADIUS` of the target may host a
//! cave origin; each origin's walk consumes its RNG in a fixed order so
//! any two chunks replaying the same cave observe identical streams.

use karst_blocks::{Block, BlockId, BlockRegistry};
use karst_geom::{
    Aabb2, Aabb3, IVec3, Vec2, Vec3, nearest_point_on_capsule_2d, nearest_point_on_capsule_3d,
};

use crate::generation::QueuedStamp;
use crate::noise::{GenRng, range_map, range_map_clamped, smooth_step3, white_2d_01};
use crate::world::{GenCtx, SEED_CAVE_LAYOUT};
use crate::{
    BASE_TERRAIN_HEIGHT, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_TOTAL_BLOCKS, ChunkCoord, World,
    block_xyz,
};

pub const CAVE_MIN_SEGMENTS: i32 = 10;
pub const CAVE_MAX_SEGMENTS: i32 = 20;
pub const CAVE_SEGMENT_MIN_LENGTH: i32 = 5;
pub const CAVE_SEGMENT_MAX_LENGTH: i32 = 10;
pub const CAVE_MIN_RADIUS: f32 = 2.0;
pub const CAVE_MAX_RADIUS: f32 = 6.0;
pub const CAVE_MAX_BLOCK_RADIUS: i32 =
    CAVE_MAX_SEGMENTS * CAVE_SEGMENT_MAX_LENGTH + CAVE_MAX_RADIUS as i32;
pub const CAVE_MAX_CHUNK_RADIUS: i32 = CAVE_MAX_BLOCK_RADIUS / CHUNK_SIZE_X as i32;
pub const CAVE_ORIGIN_MIN_Z: i32 = 20;
pub const CAVE_ORIGIN_MAX_Z: i32 = BASE_TERRAIN_HEIGHT - 10;
pub const CAVE_MAX_ANGLE_CHANGE: f32 = 90.0;
pub const CAVE_MAX_HEIGHT_CHANGE: f32 = 12.0;
pub const CAVE_GENERATION_CHANCE: f32 = 0.025;
pub const LAVA_PIT_THRESHOLD: f32 = 0.75;

/// Per-origin seed mix; the large prime spreads rows apart.
#[inline]
fn cave_seed(coord: ChunkCoord) -> u32 {
    coord.cx.wrapping_add(coord.cy.wrapping_mul(357_239)) as u32
}

pub(crate) fn carve_caves(
    world: &World,
    ctx: &mut GenCtx,
    coord: ChunkCoord,
    reg: &BlockRegistry,
    blocks: &mut [Block],
    stamps: &mut Vec<QueuedStamp>,
) {
    let layout_seed = world.seed.wrapping_add(SEED_CAVE_LAYOUT);
    let water = reg.id_or_air("water");
    let ice = reg.id_or_air("ice");

    let (base_x, base_y) = coord.origin();
    let chunk_bounds = Aabb2::new(
        Vec2::new(base_x as f32, base_y as f32),
        Vec2::new(
            (base_x + CHUNK_SIZE_X as i32) as f32,
            (base_y + CHUNK_SIZE_Y as i32) as f32,
        ),
    );
    let chunk_center = chunk_bounds.center();

    // Fixed row-major order over the neighborhood keeps the walk
    // deterministic regardless of how callers enumerate chunks.
    for oy in (coord.cy - CAVE_MAX_CHUNK_RADIUS)..=(coord.cy + CAVE_MAX_CHUNK_RADIUS) {
        for ox in (coord.cx - CAVE_MAX_CHUNK_RADIUS)..=(coord.cx + CAVE_MAX_CHUNK_RADIUS) {
            if white_2d_01(ox, oy, layout_seed) >= CAVE_GENERATION_CHANCE {
                continue;
            }
            walk_cave(
                ctx,
                ChunkCoord::new(ox, oy),
                coord,
                chunk_bounds,
                chunk_center,
                water,
                ice,
                blocks,
                stamps,
            );
        }
    }
}

fn walk_cave(
    ctx: &mut GenCtx,
    origin_chunk: ChunkCoord,
    target: ChunkCoord,
    chunk_bounds: Aabb2,
    chunk_center: Vec2,
    water: BlockId,
    ice: BlockId,
    blocks: &mut [Block],
    stamps: &mut Vec<QueuedStamp>,
) {
    let mut rng = GenRng::new(cave_seed(origin_chunk));
    let segments = rng.roll_range(CAVE_MIN_SEGMENTS, CAVE_MAX_SEGMENTS);

    let local_x = rng.roll_below(CHUNK_SIZE_X as i32);
    let local_y = rng.roll_below(CHUNK_SIZE_Y as i32);
    let origin_z = rng.roll_range(CAVE_ORIGIN_MIN_Z, CAVE_ORIGIN_MAX_Z);
    let (origin_x, origin_y) = origin_chunk.origin();

    let mut start = Vec3::new(
        (origin_x + local_x) as f32,
        (origin_y + local_y) as f32,
        origin_z as f32,
    );
    let mut yaw_degrees = 0.0f32;
    let (target_x, target_y) = target.origin();

    for _ in 0..segments {
        let turn = range_map(
            ctx.cave_yaw.get_noise_3d(start.x, start.y, start.z),
            -1.0,
            1.0,
            -CAVE_MAX_ANGLE_CHANGE,
            CAVE_MAX_ANGLE_CHANGE,
        );
        yaw_degrees += turn;

        let length = rng.roll_range(CAVE_SEGMENT_MIN_LENGTH, CAVE_SEGMENT_MAX_LENGTH) as f32;
        let heading = Vec2::from_polar_degrees(yaw_degrees, length);
        let climb = CAVE_MAX_HEIGHT_CHANGE * ctx.cave_pitch.get_noise_3d(start.x, start.y, start.z);
        let end = start + Vec3::new(heading.x, heading.y, climb);

        // Only carve when the segment's capsule reaches the target chunk.
        let closest_xy =
            nearest_point_on_capsule_2d(chunk_center, start.xy(), end.xy(), CAVE_MAX_RADIUS);
        if chunk_bounds.contains(closest_xy) {
            let radius = range_map_clamped(
                smooth_step3(ctx.cave_radius.get_noise_3d(start.x, start.y, start.z)),
                -0.8,
                0.8,
                CAVE_MIN_RADIUS,
                CAVE_MAX_RADIUS,
            );
            for index in 0..CHUNK_TOTAL_BLOCKS {
                let (lx, ly, lz) = block_xyz(index);
                let min = Vec3::new(
                    (target_x + lx as i32) as f32,
                    (target_y + ly as i32) as f32,
                    lz as f32,
                );
                let bounds = Aabb3::new(min, min + Vec3::new(1.0, 1.0, 1.0));
                let center = min + Vec3::new(0.5, 0.5, 0.5);
                let nearest = nearest_point_on_capsule_3d(center, start, end, radius);
                if bounds.contains(nearest) {
                    let id = blocks[index].id;
                    // Caves never breach the ocean floor.
                    if id != water && id != ice {
                        blocks[index] = Block::AIR;
                    }
                }
            }
        }

        let volcanic = 0.5 + 0.5 * ctx.volcanic.get_noise_3d(start.x, start.y, start.z);
        if volcanic >= LAVA_PIT_THRESHOLD {
            stamps.push(QueuedStamp {
                template: "lava_pit",
                origin: IVec3::new(
                    start.x as i32 - target_x,
                    start.y as i32 - target_y,
                    start.z as i32 - CAVE_MAX_RADIUS as i32,
                ),
            });
        }

        start = end;
    }
}
