//! MTL companion-file parser (diffuse color, opacity, diffuse texture map).

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};

use crate::material::Material;
use crate::texture::TextureData;

/// Parsed material entry before textures are resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct MtlEntry {
    pub name: String,
    pub diffuse: [f32; 3],
    pub opacity: f32,
    pub diffuse_map: Option<String>,
}

impl MtlEntry {
    fn new(name: String) -> Self {
        Self {
            name,
            diffuse: [1.0, 1.0, 1.0],
            opacity: 1.0,
            diffuse_map: None,
        }
    }
}

/// Materials by name, ready to attach to OBJ parts.
#[derive(Clone, Debug, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
}

impl MaterialLibrary {
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Build the library, loading `map_Kd` textures relative to `base_dir`.
    /// A texture that fails to load is logged and skipped.
    pub fn from_entries(entries: Vec<MtlEntry>, base_dir: &Path) -> Self {
        let mut textures: HashMap<PathBuf, Arc<TextureData>> = HashMap::new();
        let mut materials = HashMap::new();
        for entry in entries {
            let texture = entry.diffuse_map.as_ref().and_then(|map| {
                let path = base_dir.join(map);
                if let Some(tex) = textures.get(&path) {
                    return Some(tex.clone());
                }
                match TextureData::load(&path) {
                    Ok(tex) => {
                        let tex = Arc::new(tex);
                        textures.insert(path, tex.clone());
                        Some(tex)
                    }
                    Err(err) => {
                        log::warn!("Material '{}': texture skipped: {err:#}", entry.name);
                        None
                    }
                }
            });
            materials.insert(
                entry.name.clone(),
                Material {
                    name: entry.name,
                    diffuse: entry.diffuse,
                    opacity: entry.opacity,
                    texture,
                },
            );
        }
        Self { materials }
    }
}

/// Parse MTL source into entries (textures are not touched).
pub fn parse_mtl(contents: &str) -> Result<Vec<MtlEntry>> {
    let mut entries: Vec<MtlEntry> = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (tag, rest) = trimmed
            .split_once(char::is_whitespace)
            .map(|(t, r)| (t, r.trim()))
            .unwrap_or((trimmed, ""));

        if tag == "newmtl" {
            if rest.is_empty() {
                anyhow::bail!("newmtl without a name on line {}", line_no + 1);
            }
            entries.push(MtlEntry::new(rest.to_owned()));
            continue;
        }

        // Everything else belongs to the current material.
        let Some(current) = entries.last_mut() else {
            log::debug!("MTL statement before newmtl on line {} ignored", line_no + 1);
            continue;
        };

        match tag {
            "Kd" => {
                let mut values = rest.split_whitespace().map(|t| {
                    t.parse::<f32>()
                        .with_context(|| format!("Invalid Kd value '{}' on line {}", t, line_no + 1))
                });
                let r = values
                    .next()
                    .ok_or_else(|| anyhow!("Kd missing components on line {}", line_no + 1))??;
                // A single component means grey.
                let g = values.next().transpose()?.unwrap_or(r);
                let b = values.next().transpose()?.unwrap_or(g);
                current.diffuse = [r, g, b];
            }
            "d" => {
                current.opacity = parse_scalar(rest, line_no)?.clamp(0.0, 1.0);
            }
            "Tr" => {
                current.opacity = (1.0 - parse_scalar(rest, line_no)?).clamp(0.0, 1.0);
            }
            "map_Kd" => {
                // Options (-s, -o, ...) precede the file name; the name is the last token.
                if let Some(file) = rest.split_whitespace().last() {
                    current.diffuse_map = Some(file.replace('\\', "/"));
                }
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn parse_scalar(rest: &str, line_no: usize) -> Result<f32> {
    let token = rest
        .split_whitespace()
        .last()
        .ok_or_else(|| anyhow!("Missing value on line {}", line_no + 1))?;
    token
        .parse::<f32>()
        .with_context(|| format!("Invalid value '{}' on line {}", token, line_no + 1))
}
