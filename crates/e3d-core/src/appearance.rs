//! Material appearance of a part

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_AMBIENT_INTENSITY, DEFAULT_SHININESS};

/// Optical attributes of a surface, in the VRML material model.
///
/// Colors are linear RGB in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    diffuse_color: [f32; 3],
    ambient_intensity: f32,
    specular_color: [f32; 3],
    shininess: f32,
    emissive_color: [f32; 3],
    transparency: f32,
}

impl Appearance {
    /// Appearance with the given diffuse color and default secondary attributes
    pub fn new(diffuse_color: [f32; 3]) -> Self {
        Self {
            diffuse_color,
            ambient_intensity: DEFAULT_AMBIENT_INTENSITY,
            specular_color: [0.0; 3],
            shininess: DEFAULT_SHININESS,
            emissive_color: [0.0; 3],
            transparency: 0.0,
        }
    }

    pub fn with_ambient_intensity(mut self, value: f32) -> Self {
        self.ambient_intensity = value;
        self
    }

    pub fn with_specular_color(mut self, color: [f32; 3]) -> Self {
        self.specular_color = color;
        self
    }

    pub fn with_shininess(mut self, value: f32) -> Self {
        self.shininess = value;
        self
    }

    pub fn with_emissive_color(mut self, color: [f32; 3]) -> Self {
        self.emissive_color = color;
        self
    }

    pub fn with_transparency(mut self, value: f32) -> Self {
        self.transparency = value;
        self
    }

    pub fn diffuse_color(&self) -> [f32; 3] {
        self.diffuse_color
    }

    pub fn ambient_intensity(&self) -> f32 {
        self.ambient_intensity
    }

    pub fn specular_color(&self) -> [f32; 3] {
        self.specular_color
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn emissive_color(&self) -> [f32; 3] {
        self.emissive_color
    }

    pub fn transparency(&self) -> f32 {
        self.transparency
    }
}

/// Color attached to a part: a bare RGB triple or a full appearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PartColor {
    Rgb([f32; 3]),
    Appearance(Appearance),
}

impl PartColor {
    /// Full appearance; bare RGB expands with default attributes
    pub fn appearance(&self) -> Appearance {
        match self {
            PartColor::Rgb(rgb) => Appearance::new(*rgb),
            PartColor::Appearance(a) => *a,
        }
    }

    pub fn diffuse(&self) -> [f32; 3] {
        match self {
            PartColor::Rgb(rgb) => *rgb,
            PartColor::Appearance(a) => a.diffuse_color(),
        }
    }
}

impl From<[f32; 3]> for PartColor {
    fn from(rgb: [f32; 3]) -> Self {
        PartColor::Rgb(rgb)
    }
}

impl From<Appearance> for PartColor {
    fn from(appearance: Appearance) -> Self {
        PartColor::Appearance(appearance)
    }
}
