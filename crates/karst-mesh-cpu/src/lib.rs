//! CPU-side chunk meshing: face culling and vertex emission.
//!
//! Output is a flat triangle list; handing it to the GPU is the
//! embedder's job. Face colors carry the neighbor block's light levels
//! in the red (outdoor) and green (indoor) channels.
#![forbid(unsafe_code)]

use karst_blocks::{BlockRegistry, registry::ATLAS_WIDTH};
use karst_chunk::{BlockIter, ChunkMap, Dir};
use karst_geom::Vec3;
use karst_world::{CHUNK_TOTAL_BLOCKS, ChunkCoord};

pub const VERTS_PER_FACE: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: [f32; 2],
    pub color: [u8; 4],
}

#[derive(Clone, Debug, Default)]
pub struct ChunkMeshCPU {
    pub vertices: Vec<Vertex>,
}

impl ChunkMeshCPU {
    pub fn face_count(&self) -> usize {
        self.vertices.len() / VERTS_PER_FACE
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

#[derive(Clone, Copy, Debug)]
struct UvRect {
    u0: f32,
    v0: f32,
    u1: f32,
    v1: f32,
}

fn sprite_uvs(index: u16) -> UvRect {
    let w = ATLAS_WIDTH as f32;
    let x = (index % ATLAS_WIDTH) as f32;
    let y = (index / ATLAS_WIDTH) as f32;
    UvRect {
        u0: x / w,
        v0: y / w,
        u1: (x + 1.0) / w,
        v1: (y + 1.0) / w,
    }
}

/// Build the mesh for one chunk. The caller gates rebuilds on all four
/// horizontal neighbors being active so seam culling sees real blocks;
/// a face against a missing neighbor (world floor/ceiling) is emitted
/// unlit.
pub fn build_chunk_mesh(
    chunks: &ChunkMap,
    coord: ChunkCoord,
    reg: &BlockRegistry,
    hidden_surface_removal: bool,
) -> ChunkMeshCPU {
    let mut mesh = ChunkMeshCPU::default();
    let Some(chunk) = chunks.get(coord) else {
        return mesh;
    };

    for index in 0..CHUNK_TOTAL_BLOCKS {
        let block = chunk.get(index);
        let Some(def) = reg.get(block.id) else {
            continue;
        };
        if !def.visible {
            continue;
        }
        let iter = BlockIter::new(coord, index);
        let (wx, wy, wz) = iter.world_pos();
        let min = Vec3::new(wx as f32, wy as f32, wz as f32);

        for dir in Dir::ALL {
            let neighbor = iter.neighbor(dir, chunks).and_then(|n| chunks.block(n));
            if hidden_surface_removal {
                if let Some(nb) = neighbor {
                    if reg.is_opaque(nb.id) {
                        continue;
                    }
                }
            }
            let color = match neighbor {
                Some(nb) => face_color(nb.outdoor_light(), nb.indoor_light()),
                None => face_color(0, 0),
            };
            let sprite = match dir {
                Dir::Up => def.sprite_top,
                Dir::Down => def.sprite_bottom,
                _ => def.sprite_side,
            };
            emit_face(&mut mesh.vertices, min, dir, color, sprite_uvs(sprite));
        }
    }

    log::trace!(
        "meshed chunk ({},{}): {} faces",
        coord.cx,
        coord.cy,
        mesh.face_count()
    );
    mesh
}

/// Raw 0..15 level to a color byte: 15 maps to 255 exactly.
#[inline]
fn face_color(outdoor: u8, indoor: u8) -> [u8; 4] {
    [outdoor * 17, indoor * 17, 255, 255]
}

fn emit_face(out: &mut Vec<Vertex>, min: Vec3, dir: Dir, color: [u8; 4], uv: UvRect) {
    let p = |dx: f32, dy: f32, dz: f32| min + Vec3::new(dx, dy, dz);
    // Corners ordered bottom-left, bottom-right, top-right, top-left as
    // seen from outside the block.
    let [bl, br, tr, tl] = match dir {
        Dir::East => [
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(1.0, 1.0, 1.0),
            p(1.0, 0.0, 1.0),
        ],
        Dir::West => [
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(0.0, 1.0, 1.0),
        ],
        Dir::North => [
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 1.0, 1.0),
            p(1.0, 1.0, 1.0),
        ],
        Dir::South => [
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 0.0, 1.0),
            p(0.0, 0.0, 1.0),
        ],
        Dir::Up => [
            p(0.0, 1.0, 1.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
        ],
        Dir::Down => [
            p(0.0, 0.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(1.0, 0.0, 0.0),
        ],
    };
    let v = |position: Vec3, u: f32, vv: f32| Vertex {
        position,
        uv: [u, vv],
        color,
    };
    let (bl, br, tr, tl) = (
        v(bl, uv.u0, uv.v1),
        v(br, uv.u1, uv.v1),
        v(tr, uv.u1, uv.v0),
        v(tl, uv.u0, uv.v0),
    );
    out.extend_from_slice(&[bl, br, tr, bl, tr, tl]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use karst_blocks::Block;
    use karst_chunk::Chunk;
    use karst_world::{CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z, block_index};

    fn chunk_with(coord: ChunkCoord, fill: &dyn Fn(usize, usize, usize) -> Block) -> Chunk {
        let mut blocks = vec![Block::AIR; CHUNK_TOTAL_BLOCKS];
        for z in 0..CHUNK_SIZE_Z {
            for y in 0..CHUNK_SIZE_Y {
                for x in 0..CHUNK_SIZE_X {
                    blocks[block_index(x, y, z)] = fill(x, y, z);
                }
            }
        }
        Chunk::from_blocks(coord, blocks)
    }

    fn neighborhood(fill: &dyn Fn(usize, usize, usize) -> Block) -> ChunkMap {
        let mut map = ChunkMap::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                map.insert(chunk_with(ChunkCoord::new(dx, dy), fill));
            }
        }
        map
    }

    #[test]
    fn empty_chunk_builds_empty_mesh() {
        let reg = BlockRegistry::builtin();
        let map = neighborhood(&|_, _, _| Block::AIR);
        let mesh = build_chunk_mesh(&map, ChunkCoord::new(0, 0), &reg, true);
        assert!(mesh.is_empty());
    }

    #[test]
    fn lone_block_emits_six_faces() {
        let reg = BlockRegistry::builtin();
        let stone = Block::new(reg.id_or_air("stone"));
        let map = neighborhood(&|x, y, z| {
            if (x, y, z) == (8, 8, 50) { stone } else { Block::AIR }
        });
        let mesh = build_chunk_mesh(&map, ChunkCoord::new(0, 0), &reg, true);
        assert_eq!(mesh.face_count(), 6);
        assert_eq!(mesh.vertices.len(), 6 * VERTS_PER_FACE);
    }

    #[test]
    fn touching_blocks_cull_their_shared_faces() {
        let reg = BlockRegistry::builtin();
        let stone = Block::new(reg.id_or_air("stone"));
        let pair = |x: usize, y: usize, z: usize| {
            if (y, z) == (8, 50) && (x == 8 || x == 9) {
                stone
            } else {
                Block::AIR
            }
        };
        let map = neighborhood(&pair);
        let culled = build_chunk_mesh(&map, ChunkCoord::new(0, 0), &reg, true);
        assert_eq!(culled.face_count(), 10);
        let unculled = build_chunk_mesh(&map, ChunkCoord::new(0, 0), &reg, false);
        assert_eq!(unculled.face_count(), 12);
    }

    #[test]
    fn flat_slab_world_shows_only_tops_and_bottoms() {
        let reg = BlockRegistry::builtin();
        let stone = Block::new(reg.id_or_air("stone"));
        let map = neighborhood(&|_, _, z| if z <= 65 { stone } else { Block::AIR });
        let mesh = build_chunk_mesh(&map, ChunkCoord::new(0, 0), &reg, true);
        // 256 top faces at z=65 plus 256 floor faces at z=0 (the world
        // has no chunk below, so those cannot be culled).
        assert_eq!(mesh.face_count(), 512);
    }

    #[test]
    fn face_color_encodes_neighbor_light() {
        let reg = BlockRegistry::builtin();
        let stone = Block::new(reg.id_or_air("stone"));
        let mut map = neighborhood(&|_, _, z| if z <= 65 { stone } else { Block::AIR });
        // Hand-light the air above one column as if the sky pass ran.
        let above = BlockIter::from_local(ChunkCoord::new(0, 0), 3, 3, 66);
        map.update_block(above, |b| {
            b.set_outdoor_light(15);
            b.set_indoor_light(4);
        });
        let mesh = build_chunk_mesh(&map, ChunkCoord::new(0, 0), &reg, true);
        let lit = mesh
            .vertices
            .iter()
            .find(|v| v.color == [255, 68, 255, 255])
            .expect("a face lit by the hand-set neighbor");
        // That face is the top of the column at local (3,3,65).
        assert_eq!(lit.position.z, 66.0);
    }

    #[test]
    fn invisible_blocks_do_not_mesh() {
        let reg = BlockRegistry::builtin();
        // Air is the only invisible builtin type; a chunk of air plus
        // one glowstone meshes exactly the glowstone.
        let glow = Block::new(reg.id_or_air("glowstone"));
        let map = neighborhood(&|x, y, z| {
            if (x, y, z) == (0, 0, 10) { glow } else { Block::AIR }
        });
        let mesh = build_chunk_mesh(&map, ChunkCoord::new(0, 0), &reg, true);
        assert_eq!(mesh.face_count(), 6);
    }

    #[test]
    fn uv_rect_indexes_the_atlas_grid() {
        let uv = sprite_uvs(33 + 32 * ATLAS_WIDTH);
        assert!((uv.u0 - 33.0 / 64.0).abs() < 1e-6);
        assert!((uv.v0 - 32.0 / 64.0).abs() < 1e-6);
        assert!((uv.u1 - 34.0 / 64.0).abs() < 1e-6);
        assert!((uv.v1 - 33.0 / 64.0).abs() < 1e-6);
    }
}
