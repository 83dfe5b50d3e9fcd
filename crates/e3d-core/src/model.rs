//! Component model: the output of one generator run

use e3d_cad::Solid;

use crate::appearance::PartColor;

/// One colored, optionally named solid of a component
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub solid: Solid,
    pub color: PartColor,
    pub name: Option<String>,
}

/// Ordered collection of parts making up one component.
///
/// Insertion order is preserved and governs export numbering. Name
/// uniqueness is expected but not enforced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentModel {
    parts: Vec<Part>,
}

impl ComponentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part
    pub fn add_part(&mut self, solid: Solid, color: impl Into<PartColor>, name: impl Into<String>) {
        self.parts.push(Part {
            solid,
            color: color.into(),
            name: Some(name.into()),
        });
    }

    /// Append a part without a name
    pub fn add_unnamed_part(&mut self, solid: Solid, color: impl Into<PartColor>) {
        self.parts.push(Part {
            solid,
            color: color.into(),
            name: None,
        });
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Part> {
        self.parts.iter()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// First part with the given name
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name.as_deref() == Some(name))
    }

    /// Part names in insertion order (unnamed parts are skipped)
    pub fn names(&self) -> Vec<&str> {
        self.parts.iter().filter_map(|p| p.name.as_deref()).collect()
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }
}

impl<'a> IntoIterator for &'a ComponentModel {
    type Item = &'a Part;
    type IntoIter = std::slice::Iter<'a, Part>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}
