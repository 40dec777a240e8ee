//! Chunk persistence: the `GCHK` run-length-encoded save format and the
//! per-seed save directory layout.
//!
//! Layout: `<saves_root>/World_<seed>/Chunk(<cx>,<cy>).chunk`, little-
//! endian byte stream:
//!
//! ```text
//! 0..3   ASCII "GCHK"
//! 4      format version (3)
//! 5..7   chunk bit counts BX, BY, BZ
//! 8..11  world seed, u32 little-endian
//! 12..   pairs { block type: u8, run length: u8 (1..=255) }
//! ```
//!
//! Lighting, sky flags, and dirty flags are never persisted; activation
//! recomputes them.
#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use karst_blocks::Block;
use karst_world::{CHUNK_BITS_X, CHUNK_BITS_Y, CHUNK_BITS_Z, CHUNK_TOTAL_BLOCKS, ChunkCoord};
use thiserror::Error;

pub const CHUNK_MAGIC: [u8; 4] = *b"GCHK";
pub const CHUNK_FORMAT_VERSION: u8 = 3;

const HEADER_LEN: usize = 12;
const DIMS: [u8; 3] = [CHUNK_BITS_X as u8, CHUNK_BITS_Y as u8, CHUNK_BITS_Z as u8];

#[derive(Debug, Error)]
pub enum ChunkFileError {
    #[error("chunk file i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("chunk file missing GCHK tag")]
    BadMagic,
    #[error("chunk file version {0}, expected {CHUNK_FORMAT_VERSION}")]
    BadVersion(u8),
    #[error("chunk file dimensions {got:?}, expected {want:?}")]
    BadDimensions { got: [u8; 3], want: [u8; 3] },
    #[error("chunk file truncated")]
    Truncated,
    #[error("chunk file has a zero-length run")]
    ZeroRun,
    #[error("chunk file run lengths sum to {got}, expected {want}")]
    RunLengthMismatch { got: usize, want: usize },
}

/// What a well-formed chunk file yielded.
pub enum LoadOutcome {
    Blocks(Vec<Block>),
    /// The file was written under a different world seed; the payload
    /// is ignored and the chunk must be regenerated.
    SeedMismatch,
}

/// Encode a block grid. Run lengths sum to exactly the grid size and
/// never cross the 255 boundary without starting a new pair.
pub fn encode_chunk(blocks: &[Block], world_seed: u32) -> Vec<u8> {
    assert_eq!(
        blocks.len(),
        CHUNK_TOTAL_BLOCKS,
        "encoding a malformed block grid"
    );
    let mut out = Vec::with_capacity(HEADER_LEN + 512);
    out.extend_from_slice(&CHUNK_MAGIC);
    out.push(CHUNK_FORMAT_VERSION);
    out.extend_from_slice(&DIMS);
    out.extend_from_slice(&world_seed.to_le_bytes());

    let mut run_type = blocks[0].id;
    let mut run_len: usize = 0;
    for block in blocks {
        if block.id != run_type || run_len == 255 {
            out.push(run_type);
            out.push(run_len as u8);
            run_type = block.id;
            run_len = 0;
        }
        run_len += 1;
    }
    out.push(run_type);
    out.push(run_len as u8);
    out
}

/// Decode a chunk file. Header mismatches are hard errors (the file was
/// produced by this same system); a stale seed is an expected outcome.
pub fn decode_chunk(bytes: &[u8], world_seed: u32) -> Result<LoadOutcome, ChunkFileError> {
    if bytes.len() < HEADER_LEN {
        return Err(ChunkFileError::Truncated);
    }
    if bytes[0..4] != CHUNK_MAGIC {
        return Err(ChunkFileError::BadMagic);
    }
    if bytes[4] != CHUNK_FORMAT_VERSION {
        return Err(ChunkFileError::BadVersion(bytes[4]));
    }
    let got = [bytes[5], bytes[6], bytes[7]];
    if got != DIMS {
        return Err(ChunkFileError::BadDimensions { got, want: DIMS });
    }
    let stored_seed = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    if stored_seed != world_seed {
        return Ok(LoadOutcome::SeedMismatch);
    }

    let payload = &bytes[HEADER_LEN..];
    if payload.len() % 2 != 0 {
        return Err(ChunkFileError::Truncated);
    }
    let mut blocks = Vec::with_capacity(CHUNK_TOTAL_BLOCKS);
    for pair in payload.chunks_exact(2) {
        let (id, run) = (pair[0], pair[1] as usize);
        if run == 0 {
            return Err(ChunkFileError::ZeroRun);
        }
        if blocks.len() + run > CHUNK_TOTAL_BLOCKS {
            return Err(ChunkFileError::RunLengthMismatch {
                got: blocks.len() + run,
                want: CHUNK_TOTAL_BLOCKS,
            });
        }
        blocks.resize(blocks.len() + run, Block::new(id));
    }
    if blocks.len() != CHUNK_TOTAL_BLOCKS {
        return Err(ChunkFileError::RunLengthMismatch {
            got: blocks.len(),
            want: CHUNK_TOTAL_BLOCKS,
        });
    }
    Ok(LoadOutcome::Blocks(blocks))
}

pub fn world_dir(saves_root: &Path, world_seed: u32) -> PathBuf {
    saves_root.join(format!("World_{world_seed}"))
}

pub fn chunk_path(saves_root: &Path, world_seed: u32, coord: ChunkCoord) -> PathBuf {
    world_dir(saves_root, world_seed).join(format!("Chunk({},{}).chunk", coord.cx, coord.cy))
}

pub fn chunk_file_exists(saves_root: &Path, world_seed: u32, coord: ChunkCoord) -> bool {
    chunk_path(saves_root, world_seed, coord).is_file()
}

/// Write a chunk to disk, creating the per-seed directory on first use.
pub fn save_chunk(
    saves_root: &Path,
    world_seed: u32,
    coord: ChunkCoord,
    blocks: &[Block],
) -> Result<(), ChunkFileError> {
    fs::create_dir_all(world_dir(saves_root, world_seed))?;
    let path = chunk_path(saves_root, world_seed, coord);
    fs::write(&path, encode_chunk(blocks, world_seed))?;
    log::debug!("saved chunk ({},{}) to {:?}", coord.cx, coord.cy, path);
    Ok(())
}

pub fn load_chunk(
    saves_root: &Path,
    world_seed: u32,
    coord: ChunkCoord,
) -> Result<LoadOutcome, ChunkFileError> {
    let bytes = fs::read(chunk_path(saves_root, world_seed, coord))?;
    decode_chunk(&bytes, world_seed)
}
