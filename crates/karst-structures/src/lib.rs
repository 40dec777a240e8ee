//! Named block templates stamped into chunks by the generator.
#![forbid(unsafe_code)]

use std::collections::HashMap;

use karst_blocks::{Block, BlockRegistry};
use karst_geom::{IVec3, Vec3};

#[derive(Clone, Debug)]
pub struct TemplateEntry {
    pub offset: IVec3,
    pub block: String,
}

#[derive(Clone, Debug, Default)]
pub struct BlockTemplate {
    pub name: String,
    pub blueprint: Vec<TemplateEntry>,
}

impl BlockTemplate {
    fn new(name: &str) -> Self {
        BlockTemplate {
            name: name.to_string(),
            blueprint: Vec::new(),
        }
    }

    fn push(&mut self, block: &str, x: i32, y: i32, z: i32) {
        self.blueprint.push(TemplateEntry {
            offset: IVec3::new(x, y, z),
            block: block.to_string(),
        });
    }

    /// Blueprint with block names resolved against the registry.
    /// Unknown names resolve to air, same as the generator's fills.
    pub fn resolved_blueprint(&self, reg: &BlockRegistry) -> Vec<(IVec3, Block)> {
        self.blueprint
            .iter()
            .map(|e| (e.offset, Block::new(reg.id_or_air(&e.block))))
            .collect()
    }
}

#[derive(Default)]
pub struct TemplateLibrary {
    templates: Vec<BlockTemplate>,
    by_name: HashMap<String, usize>,
}

impl TemplateLibrary {
    /// The stock structures: trees, cacti, mushrooms, and the lava pit
    /// carved under volcanic cave segments.
    pub fn builtin() -> Self {
        let mut lib = TemplateLibrary::default();
        lib.insert(oak_tree());
        lib.insert(spruce_tree());
        lib.insert(cactus());
        lib.insert(lava_pit());
        lib.insert(giant_mushroom());
        lib
    }

    pub fn insert(&mut self, template: BlockTemplate) {
        self.by_name
            .insert(template.name.clone(), self.templates.len());
        self.templates.push(template);
    }

    pub fn get(&self, name: &str) -> Option<&BlockTemplate> {
        self.by_name.get(name).map(|&i| &self.templates[i])
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn oak_tree() -> BlockTemplate {
    let mut t = BlockTemplate::new("oak_tree");
    for z in 0..6 {
        t.push("oak_log", 0, 0, z);
    }
    for x in -2..3 {
        for y in -2..3 {
            if x != 0 || y != 0 {
                t.push("oak_leaves", x, y, 3);
                t.push("oak_leaves", x, y, 4);
            }
        }
    }
    for x in -1..2 {
        for y in -1..2 {
            if x != 0 || y != 0 {
                t.push("oak_leaves", x, y, 5);
            }
        }
    }
    t.push("oak_leaves", 0, 0, 6);
    t
}

fn spruce_tree() -> BlockTemplate {
    let mut t = BlockTemplate::new("spruce_tree");
    for z in 0..8 {
        t.push("spruce_log", 0, 0, z);
    }
    for x in -2..3 {
        for y in -2..3 {
            if x != 0 || y != 0 {
                for z in 3..7 {
                    t.push("spruce_leaves", x, y, z);
                }
            }
        }
    }
    for x in -1..2 {
        for y in -1..2 {
            if x != 0 || y != 0 {
                t.push("spruce_leaves", x, y, 7);
            }
            t.push("spruce_leaves", x, y, 8);
        }
    }
    t.push("spruce_leaves", 0, 0, 9);
    t
}

fn cactus() -> BlockTemplate {
    let mut t = BlockTemplate::new("cactus");
    for z in 0..4 {
        t.push("cactus", 0, 0, z);
    }
    t
}

fn lava_pit() -> BlockTemplate {
    let mut t = BlockTemplate::new("lava_pit");
    for z in -7..8 {
        for y in -7..8 {
            for x in -7..8 {
                let center = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5);
                if center.length() < 5.0 {
                    if z >= 0 {
                        t.push("air", x, y, z);
                    } else {
                        t.push("lava", x, y, z);
                    }
                } else if center.length() < 7.0 {
                    if z >= 0 {
                        t.push("air", x, y, z);
                    } else {
                        t.push("volcanic_rock", x, y, z);
                    }
                }
            }
        }
    }
    t
}

fn giant_mushroom() -> BlockTemplate {
    let mut t = BlockTemplate::new("giant_mushroom");
    for z in 0..9 {
        for y in -4..5i32 {
            for x in -4..5i32 {
                if x.abs() < 2 && y.abs() < 2 && z < 7 {
                    t.push("mushroom_stem", x, y, z);
                } else if z > 2 && z < 8 && !(x.abs() == 4 && y.abs() == 4) {
                    t.push("mushroom_cap", x, y, z);
                } else if z == 8 && x.abs() < 4 && y.abs() < 4 {
                    t.push("mushroom_cap", x, y, z);
                }
            }
        }
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_has_all_stock_templates() {
        let lib = TemplateLibrary::builtin();
        assert_eq!(lib.len(), 5);
        for name in ["oak_tree", "spruce_tree", "cactus", "lava_pit", "giant_mushroom"] {
            assert!(lib.get(name).is_some(), "missing template {name}");
        }
        assert!(lib.get("redwood").is_none());
    }

    #[test]
    fn oak_tree_shape() {
        let lib = TemplateLibrary::builtin();
        let oak = lib.get("oak_tree").unwrap();
        let trunk = oak
            .blueprint
            .iter()
            .filter(|e| e.block == "oak_log")
            .count();
        assert_eq!(trunk, 6);
        // 24 ring blocks on each of two wide layers, 8 on the narrow one,
        // plus the cap leaf.
        let leaves = oak
            .blueprint
            .iter()
            .filter(|e| e.block == "oak_leaves")
            .count();
        assert_eq!(leaves, 24 * 2 + 8 + 1);
    }

    #[test]
    fn cactus_is_a_column() {
        let lib = TemplateLibrary::builtin();
        let c = lib.get("cactus").unwrap();
        assert_eq!(c.blueprint.len(), 4);
        assert!(c.blueprint.iter().all(|e| e.offset.x == 0 && e.offset.y == 0));
    }

    #[test]
    fn lava_pit_opens_upward_and_fills_downward() {
        let lib = TemplateLibrary::builtin();
        let pit = lib.get("lava_pit").unwrap();
        assert!(pit
            .blueprint
            .iter()
            .filter(|e| e.offset.z >= 0)
            .all(|e| e.block == "air"));
        assert!(pit
            .blueprint
            .iter()
            .filter(|e| e.offset.z < 0)
            .all(|e| e.block == "lava" || e.block == "volcanic_rock"));
        // Lava core is enclosed by volcanic rock at the rim.
        assert!(pit.blueprint.iter().any(|e| e.block == "lava"));
        assert!(pit.blueprint.iter().any(|e| e.block == "volcanic_rock"));
    }

    #[test]
    fn resolved_blueprint_maps_names_to_ids() {
        let reg = BlockRegistry::builtin();
        let lib = TemplateLibrary::builtin();
        let resolved = lib.get("cactus").unwrap().resolved_blueprint(&reg);
        let cactus_id = reg.id_or_air("cactus");
        assert!(cactus_id != 0);
        assert!(resolved.iter().all(|(_, b)| b.id == cactus_id));
    }
}
