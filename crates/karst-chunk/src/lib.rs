//! Chunk storage, the active-chunk map, and cross-seam block iteration.
#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU8, Ordering};

use hashbrown::HashMap;
use karst_blocks::{Block, BlockId};
use karst_geom::{Aabb3, Vec2, Vec3};
use karst_world::{
    CHUNK_BITS_X, CHUNK_BITS_Y, CHUNK_MAX_X, CHUNK_MAX_Y, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z,
    CHUNK_TOTAL_BLOCKS, ChunkCoord, block_index, block_xyz,
};

/// Chunk lifecycle. The atomic state is the only cross-thread channel:
/// a worker owns the grid while `Generating`, the main thread owns it
/// once it has observed `Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ChunkState {
    Queued = 0,
    Generating = 1,
    Completed = 2,
    Activated = 3,
}

impl ChunkState {
    fn from_u8(v: u8) -> ChunkState {
        match v {
            0 => ChunkState::Queued,
            1 => ChunkState::Generating,
            2 => ChunkState::Completed,
            _ => ChunkState::Activated,
        }
    }
}

pub struct Chunk {
    pub coord: ChunkCoord,
    pub blocks: Vec<Block>,
    state: AtomicU8,
    pub needs_saving: bool,
    pub mesh_dirty: bool,
}

impl Chunk {
    /// Fresh all-air chunk awaiting generation.
    pub fn new(coord: ChunkCoord) -> Self {
        Self::from_blocks(coord, vec![Block::AIR; CHUNK_TOTAL_BLOCKS])
    }

    pub fn from_blocks(coord: ChunkCoord, mut blocks: Vec<Block>) -> Self {
        if blocks.len() != CHUNK_TOTAL_BLOCKS {
            blocks.resize(CHUNK_TOTAL_BLOCKS, Block::AIR);
        }
        Chunk {
            coord,
            blocks,
            state: AtomicU8::new(ChunkState::Queued as u8),
            needs_saving: false,
            mesh_dirty: true,
        }
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_state(&self, state: ChunkState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn get(&self, index: usize) -> Block {
        self.blocks[index]
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[block_index(x, y, z)]
    }

    /// Change a block's type. Flags the mesh and marks the chunk for
    /// persistence; light state is left for the lighting pass.
    pub fn set_block_id(&mut self, index: usize, id: BlockId) {
        self.blocks[index].id = id;
        self.mesh_dirty = true;
        self.needs_saving = true;
    }

    pub fn bounds(&self) -> Aabb3 {
        let (x0, y0) = self.coord.origin();
        let min = Vec3::new(x0 as f32, y0 as f32, 0.0);
        Aabb3::new(
            min,
            min + Vec3::new(
                CHUNK_SIZE_X as f32,
                CHUNK_SIZE_Y as f32,
                CHUNK_SIZE_Z as f32,
            ),
        )
    }

    pub fn center_xy(&self) -> Vec2 {
        let (x0, y0) = self.coord.origin();
        Vec2::new(
            x0 as f32 + CHUNK_SIZE_X as f32 * 0.5,
            y0 as f32 + CHUNK_SIZE_Y as f32 * 0.5,
        )
    }
}

/// Six-connected neighborhood directions. East/west are ±X, north/south
/// ±Y, up/down ±Z.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dir {
    East,
    West,
    North,
    South,
    Up,
    Down,
}

impl Dir {
    pub const ALL: [Dir; 6] = [
        Dir::East,
        Dir::West,
        Dir::North,
        Dir::South,
        Dir::Up,
        Dir::Down,
    ];

    pub const HORIZONTAL: [Dir; 4] = [Dir::East, Dir::West, Dir::North, Dir::South];

    #[inline]
    pub fn opposite(self) -> Dir {
        match self {
            Dir::East => Dir::West,
            Dir::West => Dir::East,
            Dir::North => Dir::South,
            Dir::South => Dir::North,
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
        }
    }

    /// Unit step in world coordinates.
    #[inline]
    pub fn step(self) -> (i32, i32, i32) {
        match self {
            Dir::East => (1, 0, 0),
            Dir::West => (-1, 0, 0),
            Dir::North => (0, 1, 0),
            Dir::South => (0, -1, 0),
            Dir::Up => (0, 0, 1),
            Dir::Down => (0, 0, -1),
        }
    }
}

/// Value-semantics cursor onto a block in the active set. Neighbor
/// traversal resolves seam crossings through the chunk map, so a step
/// into a non-active chunk (or off the world's floor or ceiling) yields
/// `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockIter {
    pub coord: ChunkCoord,
    pub index: usize,
}

impl BlockIter {
    #[inline]
    pub fn new(coord: ChunkCoord, index: usize) -> Self {
        debug_assert!(index < CHUNK_TOTAL_BLOCKS, "bad block index {index}");
        Self { coord, index }
    }

    #[inline]
    pub fn from_local(coord: ChunkCoord, x: usize, y: usize, z: usize) -> Self {
        Self::new(coord, block_index(x, y, z))
    }

    #[inline]
    pub fn local(self) -> (usize, usize, usize) {
        block_xyz(self.index)
    }

    #[inline]
    pub fn world_pos(self) -> (i32, i32, i32) {
        let (x, y, z) = self.local();
        let (x0, y0) = self.coord.origin();
        (x0 + x as i32, y0 + y as i32, z as i32)
    }

    #[inline]
    pub fn world_center(self) -> Vec3 {
        let (x, y, z) = self.world_pos();
        Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5)
    }

    pub fn neighbor(self, dir: Dir, chunks: &ChunkMap) -> Option<BlockIter> {
        let (x, y, z) = self.local();
        match dir {
            Dir::East => {
                if x < CHUNK_MAX_X {
                    Some(Self::new(self.coord, self.index + 1))
                } else {
                    let coord = self.coord.east();
                    chunks
                        .contains(coord)
                        .then(|| Self::from_local(coord, 0, y, z))
                }
            }
            Dir::West => {
                if x > 0 {
                    Some(Self::new(self.coord, self.index - 1))
                } else {
                    let coord = self.coord.west();
                    chunks
                        .contains(coord)
                        .then(|| Self::from_local(coord, CHUNK_MAX_X, y, z))
                }
            }
            Dir::North => {
                if y < CHUNK_MAX_Y {
                    Some(Self::new(self.coord, self.index + CHUNK_SIZE_X))
                } else {
                    let coord = self.coord.north();
                    chunks
                        .contains(coord)
                        .then(|| Self::from_local(coord, x, 0, z))
                }
            }
            Dir::South => {
                if y > 0 {
                    Some(Self::new(self.coord, self.index - CHUNK_SIZE_X))
                } else {
                    let coord = self.coord.south();
                    chunks
                        .contains(coord)
                        .then(|| Self::from_local(coord, x, CHUNK_MAX_Y, z))
                }
            }
            Dir::Up => {
                // The world has a ceiling; there is no chunk above.
                (z + 1 < CHUNK_SIZE_Z)
                    .then(|| Self::new(self.coord, self.index + (1 << (CHUNK_BITS_X + CHUNK_BITS_Y))))
            }
            Dir::Down => {
                (z > 0).then(|| Self::new(self.coord, self.index - (1 << (CHUNK_BITS_X + CHUNK_BITS_Y))))
            }
        }
    }

    #[inline]
    pub fn east(self, chunks: &ChunkMap) -> Option<BlockIter> {
        self.neighbor(Dir::East, chunks)
    }

    #[inline]
    pub fn west(self, chunks: &ChunkMap) -> Option<BlockIter> {
        self.neighbor(Dir::West, chunks)
    }

    #[inline]
    pub fn north(self, chunks: &ChunkMap) -> Option<BlockIter> {
        self.neighbor(Dir::North, chunks)
    }

    #[inline]
    pub fn south(self, chunks: &ChunkMap) -> Option<BlockIter> {
        self.neighbor(Dir::South, chunks)
    }

    #[inline]
    pub fn up(self, chunks: &ChunkMap) -> Option<BlockIter> {
        self.neighbor(Dir::Up, chunks)
    }

    #[inline]
    pub fn down(self, chunks: &ChunkMap) -> Option<BlockIter> {
        self.neighbor(Dir::Down, chunks)
    }
}

/// The active set. Chunk coords are the canonical key; "neighbor
/// wiring" is simply membership, so deactivating a chunk unwires it
/// from every neighbor at once.
#[derive(Default)]
pub struct ChunkMap {
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl ChunkMap {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::new(),
        }
    }

    #[inline]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn insert(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.coord, chunk);
    }

    pub fn remove(&mut self, coord: ChunkCoord) -> Option<Chunk> {
        self.chunks.remove(&coord)
    }

    #[inline]
    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    #[inline]
    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &Chunk)> {
        self.chunks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ChunkCoord, &mut Chunk)> {
        self.chunks.iter_mut()
    }

    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    #[inline]
    pub fn block(&self, iter: BlockIter) -> Option<Block> {
        self.get(iter.coord).map(|c| c.get(iter.index))
    }

    /// Mutate a block in place without touching the chunk's mesh or
    /// save flags (lighting bookkeeping goes through here).
    pub fn update_block(&mut self, iter: BlockIter, f: impl FnOnce(&mut Block)) -> bool {
        match self.get_mut(iter.coord) {
            Some(chunk) => {
                f(&mut chunk.blocks[iter.index]);
                true
            }
            None => false,
        }
    }

    /// Type edit via `Chunk::set_block_id`, dirtying mesh + save state.
    pub fn set_block_id(&mut self, iter: BlockIter, id: BlockId) -> bool {
        match self.get_mut(iter.coord) {
            Some(chunk) => {
                chunk.set_block_id(iter.index, id);
                true
            }
            None => false,
        }
    }

    pub fn mark_mesh_dirty(&mut self, coord: ChunkCoord) {
        if let Some(chunk) = self.get_mut(coord) {
            chunk.mesh_dirty = true;
        }
    }

    pub fn has_all_horizontal_neighbors(&self, coord: ChunkCoord) -> bool {
        self.contains(coord.east())
            && self.contains(coord.west())
            && self.contains(coord.north())
            && self.contains(coord.south())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with(coords: &[(i32, i32)]) -> ChunkMap {
        let mut map = ChunkMap::new();
        for &(cx, cy) in coords {
            map.insert(Chunk::new(ChunkCoord::new(cx, cy)));
        }
        map
    }

    #[test]
    fn seam_crossing_east_west() {
        let map = map_with(&[(0, 0), (1, 0)]);
        let edge = BlockIter::from_local(ChunkCoord::new(0, 0), CHUNK_MAX_X, 5, 20);
        let east = edge.east(&map).unwrap();
        assert_eq!(east.coord, ChunkCoord::new(1, 0));
        assert_eq!(east.local(), (0, 5, 20));
        assert_eq!(east.west(&map), Some(edge));
    }

    #[test]
    fn seam_into_missing_chunk_is_invalid() {
        let map = map_with(&[(0, 0)]);
        let edge = BlockIter::from_local(ChunkCoord::new(0, 0), CHUNK_MAX_X, 0, 0);
        assert_eq!(edge.east(&map), None);
        let south_edge = BlockIter::from_local(ChunkCoord::new(0, 0), 3, 0, 0);
        assert_eq!(south_edge.south(&map), None);
    }

    #[test]
    fn world_floor_and_ceiling_are_invalid() {
        let map = map_with(&[(0, 0)]);
        let floor = BlockIter::from_local(ChunkCoord::new(0, 0), 4, 4, 0);
        assert_eq!(floor.down(&map), None);
        let ceiling = BlockIter::from_local(ChunkCoord::new(0, 0), 4, 4, CHUNK_SIZE_Z - 1);
        assert_eq!(ceiling.up(&map), None);
        assert!(floor.up(&map).is_some());
        assert!(ceiling.down(&map).is_some());
    }

    #[test]
    fn world_pos_accounts_for_chunk_origin() {
        let it = BlockIter::from_local(ChunkCoord::new(-1, 2), 3, 4, 5);
        assert_eq!(it.world_pos(), (-16 + 3, 32 + 4, 5));
        let c = it.world_center();
        assert_eq!(c, Vec3::new(-12.5, 36.5, 5.5));
    }

    #[test]
    fn state_round_trips_through_atomic() {
        let chunk = Chunk::new(ChunkCoord::new(0, 0));
        assert_eq!(chunk.state(), ChunkState::Queued);
        chunk.set_state(ChunkState::Generating);
        assert_eq!(chunk.state(), ChunkState::Generating);
        chunk.set_state(ChunkState::Completed);
        chunk.set_state(ChunkState::Activated);
        assert_eq!(chunk.state(), ChunkState::Activated);
    }

    #[test]
    fn set_block_id_flags_mesh_and_save() {
        let mut map = map_with(&[(0, 0)]);
        {
            let c = map.get_mut(ChunkCoord::new(0, 0)).unwrap();
            c.mesh_dirty = false;
        }
        let it = BlockIter::from_local(ChunkCoord::new(0, 0), 1, 2, 3);
        assert!(map.set_block_id(it, 7));
        let c = map.get(ChunkCoord::new(0, 0)).unwrap();
        assert!(c.mesh_dirty);
        assert!(c.needs_saving);
        assert_eq!(map.block(it).unwrap().id, 7);
    }

    #[test]
    fn neighbor_presence_check() {
        let map = map_with(&[(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)]);
        assert!(map.has_all_horizontal_neighbors(ChunkCoord::new(0, 0)));
        assert!(!map.has_all_horizontal_neighbors(ChunkCoord::new(1, 0)));
    }
}
