//! Anchor registry shared by the solver and the generator

use crate::core::{Anchor, Point3};
use std::collections::BTreeMap;
use thiserror::Error;

/// Registry construction errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("duplicate anchor id {id}")]
    DuplicateAnchor { id: String },
    #[error("anchor {id} has a non-finite coordinate")]
    NonFiniteCoordinate { id: String },
    #[error("anchor id must not be empty")]
    EmptyId,
}

/// Immutable table of anchor id to surveyed position
///
/// Iteration is ordered by anchor id so every consumer sees the same
/// anchor sequence regardless of how the table was built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorRegistry {
    anchors: BTreeMap<String, Point3>,
}

impl AnchorRegistry {
    /// Build a registry, rejecting duplicate ids and non-finite positions
    pub fn new<I>(anchors: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Anchor>,
    {
        let mut table = BTreeMap::new();
        for anchor in anchors {
            if anchor.id.is_empty() {
                return Err(RegistryError::EmptyId);
            }
            if !anchor.position.iter().all(|c| c.is_finite()) {
                return Err(RegistryError::NonFiniteCoordinate { id: anchor.id });
            }
            if table.contains_key(&anchor.id) {
                return Err(RegistryError::DuplicateAnchor { id: anchor.id });
            }
            table.insert(anchor.id, anchor.position);
        }
        Ok(Self { anchors: table })
    }

    /// Four-anchor room layout used by the reference deployment (8 m x 6 m x 3 m)
    pub fn reference_room() -> Self {
        let anchors = [
            ("A1", 0.0, 0.0, 0.0),
            ("A2", 8.0, 0.0, 0.0),
            ("A3", 4.0, 6.0, 0.0),
            ("A4", 4.0, 3.0, 3.0),
        ];
        Self {
            anchors: anchors
                .iter()
                .map(|(id, x, y, z)| (id.to_string(), Point3::new(*x, *y, *z)))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Point3> {
        self.anchors.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.anchors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Anchors in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Point3)> {
        self.anchors.iter().map(|(id, pos)| (id.as_str(), pos))
    }
}
