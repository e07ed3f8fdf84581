//! Baking imported materials into [`Material`] records.
//!
//! Colors are clamped to `[0, 1]`, transparency is derived from opacity or a
//! transparent color, texture paths are interned into the shared file list
//! and finally a small table of name-based overrides patches materials whose
//! source files are known to carry wrong values.

use crate::{
    data_structures::material::{Material, MaterialFlags, NO_TEXTURE},
    resources::ImportedMaterial,
};

/// Computed transparency below this is treated as fully opaque.
pub const OPAQUENESS_THRESHOLD: f32 = 0.05;

/// Values a [`NameRule`] forces onto a matching material.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MaterialOverride {
    pub alpha_test: Option<f32>,
    pub transparency_factor: Option<f32>,
    pub metallic_factor: Option<f32>,
    pub roughness: Option<f32>,
    pub transparent: bool,
}

impl MaterialOverride {
    pub fn apply(&self, material: &mut Material) {
        if let Some(alpha_test) = self.alpha_test {
            material.alpha_test = alpha_test;
        }
        if let Some(transparency) = self.transparency_factor {
            material.transparency_factor = transparency;
        }
        if let Some(metallic) = self.metallic_factor {
            material.metallic_factor = metallic;
        }
        if let Some(roughness) = self.roughness {
            material.roughness = roughness;
        }
        if self.transparent {
            material.set_flag(MaterialFlags::TRANSPARENT);
        }
    }
}

/// Matches when the material name contains any of `patterns` (case-sensitive).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NameRule {
    pub patterns: &'static [&'static str],
    pub overrides: MaterialOverride,
}

impl NameRule {
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| name.contains(p))
    }
}

const fn see_through(alpha_test: f32, transparency: f32) -> MaterialOverride {
    MaterialOverride {
        alpha_test: Some(alpha_test),
        transparency_factor: Some(transparency),
        metallic_factor: None,
        roughness: None,
        transparent: true,
    }
}

/// Evaluated in order, the first matching rule wins.
pub const NAME_RULES: [NameRule; 5] = [
    NameRule {
        patterns: &["Glass", "Vespa_Headlight"],
        overrides: see_through(0.75, 0.1),
    },
    NameRule {
        patterns: &["Frosted"],
        overrides: see_through(0.6, 0.35),
    },
    NameRule {
        patterns: &["StreetLight"],
        overrides: see_through(0.5, 0.2),
    },
    NameRule {
        patterns: &["Bottle"],
        overrides: see_through(0.54, 0.4),
    },
    NameRule {
        patterns: &["Metal"],
        overrides: MaterialOverride {
            alpha_test: None,
            transparency_factor: None,
            metallic_factor: Some(1.0),
            roughness: Some(0.1),
            transparent: false,
        },
    },
];

/// Applies the first rule of `rules` matching `name`. Returns its position.
pub fn apply_name_rules(rules: &[NameRule], name: &str, material: &mut Material) -> Option<usize> {
    let position = rules.iter().position(|rule| rule.matches(name))?;
    rules[position].overrides.apply(material);
    Some(position)
}

/// Index of `path` in `files`, appending it when new.
pub fn add_unique(files: &mut Vec<String>, path: &str) -> i32 {
    if path.is_empty() {
        return NO_TEXTURE;
    }
    match files.iter().position(|f| f == path) {
        Some(index) => index as i32,
        None => {
            files.push(path.to_string());
            (files.len() - 1) as i32
        }
    }
}

fn clamp_color(color: [f32; 4]) -> [f32; 4] {
    color.map(|c| c.clamp(0.0, 1.0))
}

fn snap_transparency(transparency: f32) -> f32 {
    let transparency = transparency.clamp(0.0, 1.0);
    if transparency < OPAQUENESS_THRESHOLD {
        0.0
    } else {
        transparency
    }
}

/// Bakes one imported material, interning its texture paths into `files`.
pub fn bake_material(imported: &ImportedMaterial, files: &mut Vec<String>) -> Material {
    let mut material = Material::default();

    let mut emissive = [0.0; 4];
    if let Some(ambient) = imported.ambient_color {
        emissive = ambient;
    }
    if let Some(color) = imported.emissive_color {
        for (e, c) in emissive.iter_mut().zip(color) {
            *e += c;
        }
    }
    material.emissive_factor = clamp_color(emissive);

    if let Some(diffuse) = imported.diffuse_color {
        material.base_color_factor = clamp_color(diffuse);
    }

    if let Some(opacity) = imported.opacity {
        material.transparency_factor = snap_transparency(1.0 - opacity);
    }
    if let Some([r, g, b]) = imported.transparent_color {
        material.transparency_factor = snap_transparency(r.max(g).max(b));
        material.alpha_test = 0.5;
    }

    if let Some(metallic) = imported.metallic_factor {
        material.metallic_factor = metallic.clamp(0.0, 1.0);
    }
    if let Some(roughness) = imported.roughness_factor {
        material.roughness = roughness.clamp(0.0, 1.0);
    }

    if let Some(path) = &imported.emissive_texture {
        material.emissive_texture = add_unique(files, path);
    }
    if let Some(path) = &imported.diffuse_texture {
        material.base_color_texture = add_unique(files, path);
        // some assets ship a grey placeholder albedo on see-through parts
        if path.contains("grey_30") {
            material.set_flag(MaterialFlags::TRANSPARENT);
        }
    }
    match (&imported.normal_texture, &imported.height_texture) {
        (Some(path), _) | (None, Some(path)) => material.normal_texture = add_unique(files, path),
        (None, None) => {}
    }
    if let Some(path) = &imported.opacity_texture {
        material.opacity_texture = add_unique(files, path);
        material.alpha_test = 0.5;
    }

    if let Some(rule) = apply_name_rules(&NAME_RULES, &imported.name, &mut material) {
        log::debug!("Material {} patched by name rule {}", imported.name, rule);
    }
    material
}
