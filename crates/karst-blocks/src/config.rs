//! Serde-facing block table schema, compiled into the registry at startup.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BlocksConfig {
    pub blocks: Vec<BlockDefConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockDefConfig {
    pub name: String,
    pub id: Option<u8>,
    pub visible: Option<bool>,
    pub solid: Option<bool>,
    pub opaque: Option<bool>,
    /// Atlas cell for every face; overridden per-role below.
    pub sprite: Option<[u16; 2]>,
    pub top: Option<[u16; 2]>,
    pub side: Option<[u16; 2]>,
    pub bottom: Option<[u16; 2]>,
    pub emission: Option<u8>,
}
