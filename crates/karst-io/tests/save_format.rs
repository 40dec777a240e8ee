use karst_blocks::Block;
use karst_io::{
    CHUNK_FORMAT_VERSION, CHUNK_MAGIC, ChunkFileError, LoadOutcome, chunk_file_exists, chunk_path,
    decode_chunk, encode_chunk, load_chunk, save_chunk,
};
use karst_world::{CHUNK_TOTAL_BLOCKS, ChunkCoord};
use proptest::prelude::*;

fn blocks_from_ids(ids: &[u8]) -> Vec<Block> {
    ids.iter().map(|&id| Block::new(id)).collect()
}

fn ids_of(blocks: &[Block]) -> Vec<u8> {
    blocks.iter().map(|b| b.id).collect()
}

/// Runs as written in the file: (type, length) pairs after the header.
fn parse_runs(bytes: &[u8]) -> Vec<(u8, usize)> {
    bytes[12..]
        .chunks_exact(2)
        .map(|p| (p[0], p[1] as usize))
        .collect()
}

#[test]
fn header_layout() {
    let blocks = blocks_from_ids(&vec![0u8; CHUNK_TOTAL_BLOCKS]);
    let bytes = encode_chunk(&blocks, 0xDEAD_BEEF);
    assert_eq!(&bytes[0..4], &CHUNK_MAGIC);
    assert_eq!(bytes[4], CHUNK_FORMAT_VERSION);
    assert_eq!(&bytes[5..8], &[4, 4, 7]);
    // Seed bytes low-first.
    assert_eq!(&bytes[8..12], &[0xEF, 0xBE, 0xAD, 0xDE]);
}

#[test]
fn uniform_chunk_runs_split_at_255() {
    let blocks = blocks_from_ids(&vec![1u8; CHUNK_TOTAL_BLOCKS]);
    let bytes = encode_chunk(&blocks, 7);
    let runs = parse_runs(&bytes);
    assert!(runs.iter().all(|&(id, len)| id == 1 && len >= 1 && len <= 255));
    assert_eq!(runs.iter().map(|&(_, len)| len).sum::<usize>(), CHUNK_TOTAL_BLOCKS);
    // 32768 = 128 * 255 + 128.
    assert_eq!(runs.len(), 129);
    match decode_chunk(&bytes, 7).unwrap() {
        LoadOutcome::Blocks(decoded) => assert_eq!(ids_of(&decoded), ids_of(&blocks)),
        LoadOutcome::SeedMismatch => panic!("seed should match"),
    }
}

#[test]
fn seed_mismatch_ignores_payload() {
    let blocks = blocks_from_ids(&vec![3u8; CHUNK_TOTAL_BLOCKS]);
    let bytes = encode_chunk(&blocks, 41);
    assert!(matches!(
        decode_chunk(&bytes, 42).unwrap(),
        LoadOutcome::SeedMismatch
    ));
}

#[test]
fn corrupt_headers_are_fatal() {
    let blocks = blocks_from_ids(&vec![0u8; CHUNK_TOTAL_BLOCKS]);
    let good = encode_chunk(&blocks, 1);

    let mut bad_magic = good.clone();
    bad_magic[0] = b'X';
    assert!(matches!(
        decode_chunk(&bad_magic, 1),
        Err(ChunkFileError::BadMagic)
    ));

    let mut bad_version = good.clone();
    bad_version[4] = 2;
    assert!(matches!(
        decode_chunk(&bad_version, 1),
        Err(ChunkFileError::BadVersion(2))
    ));

    let mut bad_dims = good.clone();
    bad_dims[6] = 5;
    assert!(matches!(
        decode_chunk(&bad_dims, 1),
        Err(ChunkFileError::BadDimensions { .. })
    ));

    assert!(matches!(
        decode_chunk(&good[..8], 1),
        Err(ChunkFileError::Truncated)
    ));
}

#[test]
fn malformed_rle_payloads_are_rejected() {
    let blocks = blocks_from_ids(&vec![0u8; CHUNK_TOTAL_BLOCKS]);
    let good = encode_chunk(&blocks, 1);

    // Odd payload byte count.
    let mut odd = good.clone();
    odd.push(9);
    assert!(matches!(decode_chunk(&odd, 1), Err(ChunkFileError::Truncated)));

    // Zero-length run.
    let mut zero = good.clone();
    zero.truncate(12);
    zero.extend_from_slice(&[1, 0]);
    assert!(matches!(decode_chunk(&zero, 1), Err(ChunkFileError::ZeroRun)));

    // Too much data.
    let mut over = good.clone();
    over.extend_from_slice(&[1, 1]);
    assert!(matches!(
        decode_chunk(&over, 1),
        Err(ChunkFileError::RunLengthMismatch { .. })
    ));

    // Too little data.
    let mut under = good.clone();
    under.truncate(good.len() - 2);
    assert!(matches!(
        decode_chunk(&under, 1),
        Err(ChunkFileError::RunLengthMismatch { .. })
    ));
}

#[test]
fn save_and_load_through_the_directory_layout() {
    let dir = tempfile::tempdir().unwrap();
    let coord = ChunkCoord::new(-3, 12);
    let mut ids = vec![1u8; CHUNK_TOTAL_BLOCKS];
    ids[0] = 14;
    ids[100] = 5;
    let blocks = blocks_from_ids(&ids);

    assert!(!chunk_file_exists(dir.path(), 99, coord));
    save_chunk(dir.path(), 99, coord, &blocks).unwrap();
    assert!(chunk_file_exists(dir.path(), 99, coord));
    assert_eq!(
        chunk_path(dir.path(), 99, coord),
        dir.path().join("World_99").join("Chunk(-3,12).chunk")
    );

    match load_chunk(dir.path(), 99, coord).unwrap() {
        LoadOutcome::Blocks(decoded) => assert_eq!(ids_of(&decoded), ids),
        LoadOutcome::SeedMismatch => panic!("seed should match"),
    }

    // A different seed resolves to a different world directory, so the
    // file simply does not exist there.
    assert!(!chunk_file_exists(dir.path(), 100, coord));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // Round trip: decode(encode(blocks)) == blocks, and runs sum to the
    // grid size without crossing the 255 boundary.
    #[test]
    fn rle_round_trips(runs in prop::collection::vec((0u8..22, 1usize..600), 1..64)) {
        let mut ids = Vec::with_capacity(CHUNK_TOTAL_BLOCKS);
        'outer: for (id, len) in runs {
            for _ in 0..len {
                if ids.len() == CHUNK_TOTAL_BLOCKS {
                    break 'outer;
                }
                ids.push(id);
            }
        }
        let pad = *ids.last().unwrap_or(&0);
        while ids.len() < CHUNK_TOTAL_BLOCKS {
            ids.push(pad);
        }

        let blocks = blocks_from_ids(&ids);
        let bytes = encode_chunk(&blocks, 1234);
        let parsed = parse_runs(&bytes);
        prop_assert!(parsed.iter().all(|&(_, len)| (1..=255).contains(&len)));
        prop_assert_eq!(parsed.iter().map(|&(_, len)| len).sum::<usize>(), CHUNK_TOTAL_BLOCKS);
        match decode_chunk(&bytes, 1234).unwrap() {
            LoadOutcome::Blocks(decoded) => prop_assert_eq!(ids_of(&decoded), ids),
            LoadOutcome::SeedMismatch => prop_assert!(false, "seed should match"),
        }
    }
}
