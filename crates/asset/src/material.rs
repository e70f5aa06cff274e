//! Surface description attached to every drawable part.

use std::sync::Arc;

use crate::texture::TextureData;

/// Flat-colored or textured diffuse material. `diffuse` is sRGB as written in MTL files.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    pub diffuse: [f32; 3],
    pub opacity: f32,
    pub texture: Option<Arc<TextureData>>,
}

impl Material {
    /// Used for OBJ parts without a (known) material.
    pub fn default_obj() -> Self {
        Self {
            name: "default".to_owned(),
            diffuse: [1.0, 1.0, 1.0],
            opacity: 1.0,
            texture: None,
        }
    }

    /// Light grey (0xdddddd) applied to STL meshes.
    pub fn default_stl() -> Self {
        let grey = 0xdd as f32 / 255.0;
        Self {
            name: "stl".to_owned(),
            diffuse: [grey; 3],
            opacity: 1.0,
            texture: None,
        }
    }

    /// Diffuse color converted to linear space for shading.
    pub fn diffuse_linear(&self) -> [f32; 3] {
        self.diffuse.map(srgb_to_linear)
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
