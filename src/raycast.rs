//! Voxel raycast across the active chunk set.

use karst_blocks::BlockRegistry;
use karst_chunk::{BlockIter, ChunkMap, Dir};
use karst_geom::Vec3;
use karst_world::{CHUNK_SIZE_Z, ChunkCoord};

#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub dist: f32,
    pub pos: Vec3,
    /// Axis-aligned face normal; zero when the ray started inside a
    /// solid block.
    pub normal: (i32, i32, i32),
    pub block: BlockIter,
}

/// Step one voxel at a time along whichever axis crossing is nearest,
/// following block-iterator traversal so chunk seams resolve through
/// the active map. Stepping into a non-active chunk aborts the cast.
/// "Solid" comes from the block definition, so water and ice stop the
/// ray (digging can scoop them).
pub fn raycast_blocks(
    chunks: &ChunkMap,
    reg: &BlockRegistry,
    origin: Vec3,
    direction: Vec3,
    max_dist: f32,
) -> Option<RayHit> {
    let wx = origin.x.floor() as i32;
    let wy = origin.y.floor() as i32;
    let wz = origin.z.floor() as i32;
    if wz < 0 || wz >= CHUNK_SIZE_Z as i32 {
        return None;
    }

    let coord = ChunkCoord::containing(wx, wy);
    if !chunks.contains(coord) {
        return None;
    }
    let (x0, y0) = coord.origin();
    let mut iter = BlockIter::from_local(
        coord,
        (wx - x0) as usize,
        (wy - y0) as usize,
        wz as usize,
    );

    let solid = |it: BlockIter| {
        chunks
            .block(it)
            .is_some_and(|b| reg.is_solid(b.id))
    };

    if solid(iter) {
        return Some(RayHit {
            dist: 0.0,
            pos: origin,
            normal: (0, 0, 0),
            block: iter,
        });
    }

    // Amanatides-Woo setup. A zero direction component yields an
    // infinite crossing distance and that axis is simply never taken.
    let step_x: i32 = if direction.x < 0.0 { -1 } else { 1 };
    let step_y: i32 = if direction.y < 0.0 { -1 } else { 1 };
    let step_z: i32 = if direction.z < 0.0 { -1 } else { 1 };
    let per_x = 1.0 / direction.x.abs();
    let per_y = 1.0 / direction.y.abs();
    let per_z = 1.0 / direction.z.abs();
    let mut next_x = ((wx + (step_x + 1) / 2) as f32 - origin.x).abs() * per_x;
    let mut next_y = ((wy + (step_y + 1) / 2) as f32 - origin.y).abs() * per_y;
    let mut next_z = ((wz + (step_z + 1) / 2) as f32 - origin.z).abs() * per_z;

    while next_x < max_dist || next_y < max_dist || next_z < max_dist {
        let (dist, dir, normal) = if next_x <= next_y && next_x <= next_z {
            let d = next_x;
            next_x += per_x;
            if step_x > 0 {
                (d, Dir::East, (-1, 0, 0))
            } else {
                (d, Dir::West, (1, 0, 0))
            }
        } else if next_y <= next_x && next_y <= next_z {
            let d = next_y;
            next_y += per_y;
            if step_y > 0 {
                (d, Dir::North, (0, -1, 0))
            } else {
                (d, Dir::South, (0, 1, 0))
            }
        } else {
            let d = next_z;
            next_z += per_z;
            if step_z > 0 {
                (d, Dir::Up, (0, 0, -1))
            } else {
                (d, Dir::Down, (0, 0, 1))
            }
        };

        iter = iter.neighbor(dir, chunks)?;
        if solid(iter) {
            return Some(RayHit {
                dist,
                pos: origin + direction * dist,
                normal,
                block: iter,
            });
        }
    }

    None
}

/// Direction from a hit normal, for placing against the struck face.
pub fn dir_from_normal(normal: (i32, i32, i32)) -> Option<Dir> {
    match normal {
        (1, 0, 0) => Some(Dir::East),
        (-1, 0, 0) => Some(Dir::West),
        (0, 1, 0) => Some(Dir::North),
        (0, -1, 0) => Some(Dir::South),
        (0, 0, 1) => Some(Dir::Up),
        (0, 0, -1) => Some(Dir::Down),
        _ => None,
    }
}
