use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use super::config::BlocksConfig;
use super::types::{Block, BlockId};

/// Sprite sheet is a square grid this many cells wide.
pub const ATLAS_WIDTH: u16 = 64;

/// Immutable per-type block properties. Published once at startup and
/// read-only for the life of the process.
#[derive(Clone, Debug)]
pub struct BlockDef {
    pub id: BlockId,
    pub name: String,
    pub visible: bool,
    pub solid: bool,
    pub opaque: bool,
    pub sprite_top: u16,
    pub sprite_side: u16,
    pub sprite_bottom: u16,
    pub emission: u8,
}

impl BlockDef {
    fn placeholder(id: BlockId) -> Self {
        BlockDef {
            id,
            name: String::new(),
            visible: false,
            solid: false,
            opaque: false,
            sprite_top: 0,
            sprite_side: 0,
            sprite_bottom: 0,
            emission: 0,
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct BlockRegistry {
    pub defs: Vec<BlockDef>,
    pub by_name: HashMap<String, BlockId>,
}

/// The stock block table. Id 0 must stay air: the save format, the
/// generator, and template clipping all treat 0 as empty space.
const BUILTIN_BLOCKS_TOML: &str = r#"
[[blocks]]
name = "air"
visible = false
solid = false
opaque = false
sprite = [0, 0]

[[blocks]]
name = "stone"
sprite = [33, 32]

[[blocks]]
name = "dirt"
sprite = [32, 34]

[[blocks]]
name = "grass"
top = [32, 33]
side = [33, 33]
bottom = [32, 34]

[[blocks]]
name = "cobblestone"
sprite = [35, 32]

[[blocks]]
name = "glowstone"
sprite = [46, 34]
emission = 15

[[blocks]]
name = "sand"
sprite = [34, 34]

[[blocks]]
name = "oak_log"
top = [38, 33]
side = [36, 33]
bottom = [38, 33]

[[blocks]]
name = "spruce_log"
top = [38, 33]
side = [37, 33]
bottom = [38, 33]

[[blocks]]
name = "cactus"
top = [39, 36]
side = [37, 36]
bottom = [39, 36]

[[blocks]]
name = "coal_ore"
sprite = [63, 34]

[[blocks]]
name = "iron_ore"
sprite = [63, 35]

[[blocks]]
name = "gold_ore"
sprite = [63, 36]

[[blocks]]
name = "diamond_ore"
sprite = [63, 37]

[[blocks]]
name = "water"
sprite = [32, 44]

[[blocks]]
name = "ice"
sprite = [45, 34]

[[blocks]]
name = "oak_leaves"
sprite = [32, 35]

[[blocks]]
name = "spruce_leaves"
sprite = [34, 35]

[[blocks]]
name = "lava"
sprite = [48, 43]
emission = 7

[[blocks]]
name = "volcanic_rock"
sprite = [48, 41]
emission = 2

[[blocks]]
name = "mushroom_stem"
top = [38, 34]
side = [37, 34]
bottom = [38, 34]

[[blocks]]
name = "mushroom_cap"
sprite = [39, 34]
"#;

impl BlockRegistry {
    /// Registry compiled from the stock table above.
    pub fn builtin() -> Self {
        let cfg: BlocksConfig =
            toml::from_str(BUILTIN_BLOCKS_TOML).expect("built-in block table must parse");
        Self::from_config(cfg).expect("built-in block table must compile")
    }

    pub fn load_from_path(blocks_path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(blocks_path)?;
        let cfg: BlocksConfig = toml::from_str(&text)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry {
            defs: Vec::new(),
            by_name: HashMap::new(),
        };
        for def in cfg.blocks.into_iter() {
            let id = def.id.unwrap_or(reg.defs.len() as u8);
            let visible = def.visible.unwrap_or(true);
            let solid = def.solid.unwrap_or(true);
            let opaque = def.opaque.unwrap_or(solid);
            let all = def.sprite.unwrap_or([0, 0]);
            let top = def.top.unwrap_or(all);
            let side = def.side.unwrap_or(all);
            let bottom = def.bottom.unwrap_or(all);
            let compiled = BlockDef {
                id,
                name: def.name,
                visible,
                solid,
                opaque,
                sprite_top: sprite_index(top),
                sprite_side: sprite_index(side),
                sprite_bottom: sprite_index(bottom),
                emission: def.emission.unwrap_or(0),
            };
            if reg.defs.len() <= id as usize {
                reg.defs.resize(id as usize + 1, BlockDef::placeholder(id));
            }
            reg.defs[id as usize] = compiled;
        }
        let air = reg
            .defs
            .first()
            .ok_or("block table is empty")?;
        if air.solid || air.opaque || air.visible {
            return Err(format!("block id 0 must be air-like, got {:?}", air.name).into());
        }
        reg.by_name = reg
            .defs
            .iter()
            .map(|d| (d.name.clone(), d.id))
            .collect();
        Ok(reg)
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockDef> {
        self.defs.get(id as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    /// Like `id_by_name` but falls back to air, matching the original
    /// table's behavior for unknown names.
    pub fn id_or_air(&self, name: &str) -> BlockId {
        self.id_by_name(name).unwrap_or(0)
    }

    pub fn make_block(&self, name: &str) -> Option<Block> {
        self.id_by_name(name).map(Block::new)
    }

    #[inline]
    pub fn is_opaque(&self, id: BlockId) -> bool {
        self.get(id).map(|d| d.opaque).unwrap_or(false)
    }

    #[inline]
    pub fn is_solid(&self, id: BlockId) -> bool {
        self.get(id).map(|d| d.solid).unwrap_or(false)
    }

    #[inline]
    pub fn emission(&self, id: BlockId) -> u8 {
        self.get(id).map(|d| d.emission).unwrap_or(0)
    }
}

#[inline]
fn sprite_index(cell: [u16; 2]) -> u16 {
    cell[0] + cell[1] * ATLAS_WIDTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_reserves_air_at_zero() {
        let reg = BlockRegistry::builtin();
        let air = reg.get(0).unwrap();
        assert_eq!(air.name, "air");
        assert!(!air.visible && !air.solid && !air.opaque);
        assert_eq!(reg.id_by_name("air"), Some(0));
    }

    #[test]
    fn builtin_table_has_the_world_palette() {
        let reg = BlockRegistry::builtin();
        for name in [
            "stone",
            "dirt",
            "grass",
            "cobblestone",
            "glowstone",
            "sand",
            "oak_log",
            "spruce_log",
            "cactus",
            "coal_ore",
            "iron_ore",
            "gold_ore",
            "diamond_ore",
            "water",
            "ice",
            "oak_leaves",
            "spruce_leaves",
            "lava",
            "volcanic_rock",
            "mushroom_stem",
            "mushroom_cap",
        ] {
            let id = reg.id_by_name(name).unwrap_or_else(|| panic!("missing {name}"));
            let def = reg.get(id).unwrap();
            assert!(def.visible && def.solid && def.opaque, "{name} should be a full block");
        }
        assert_eq!(reg.emission(reg.id_or_air("glowstone")), 15);
        assert_eq!(reg.emission(reg.id_or_air("lava")), 7);
        assert_eq!(reg.emission(reg.id_or_air("volcanic_rock")), 2);
    }

    #[test]
    fn grass_uses_distinct_face_sprites() {
        let reg = BlockRegistry::builtin();
        let grass = reg.get(reg.id_or_air("grass")).unwrap();
        assert_ne!(grass.sprite_top, grass.sprite_side);
        assert_eq!(grass.sprite_top, 32 + 33 * ATLAS_WIDTH);
    }

    #[test]
    fn unknown_names_fall_back_to_air() {
        let reg = BlockRegistry::builtin();
        assert_eq!(reg.id_or_air("bedrock"), 0);
        assert!(reg.make_block("bedrock").is_none());
    }

    #[test]
    fn table_without_air_is_rejected() {
        let cfg: crate::config::BlocksConfig = toml::from_str(
            r#"
            [[blocks]]
            name = "stone"
            sprite = [1, 1]
            "#,
        )
        .unwrap();
        assert!(BlockRegistry::from_config(cfg).is_err());
    }
}
