//! Fixed scene lighting and background.

use glam::Vec3;

use asset::material::srgb_to_linear;

#[derive(Clone, Copy, Debug)]
pub struct SceneLighting {
    /// Clear color, sRGB hex.
    pub background: u32,
    pub sky: u32,
    pub ground: u32,
    pub hemisphere_intensity: f32,
    pub sun_color: u32,
    pub sun_intensity: f32,
    /// The sun shines from this point towards the origin.
    pub sun_position: Vec3,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            background: 0x0b1020,
            sky: 0xffffff,
            ground: 0x444444,
            hemisphere_intensity: 0.6,
            sun_color: 0xffffff,
            sun_intensity: 1.0,
            sun_position: Vec3::new(3.0, 5.0, 2.0),
        }
    }
}

impl SceneLighting {
    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b] = hex_to_linear(self.background);
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }

    pub fn sun_direction(&self) -> Vec3 {
        self.sun_position.normalize_or(Vec3::Y)
    }
}

/// 0xRRGGBB (sRGB) to linear RGB.
pub fn hex_to_linear(hex: u32) -> [f32; 3] {
    [(hex >> 16) & 0xff, (hex >> 8) & 0xff, hex & 0xff].map(|c| srgb_to_linear(c as f32 / 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_conversion_extremes() {
        assert_eq!(hex_to_linear(0x000000), [0.0; 3]);
        let white = hex_to_linear(0xffffff);
        assert!(white.iter().all(|c| (c - 1.0).abs() < 1e-6));
        let bg = hex_to_linear(0x0b1020);
        assert!(bg[2] > bg[0]);
    }

    #[test]
    fn sun_direction_is_normalized() {
        let d = SceneLighting::default().sun_direction();
        assert!((d.length() - 1.0).abs() < 1e-6);
        assert!(d.y > 0.0);
    }
}
