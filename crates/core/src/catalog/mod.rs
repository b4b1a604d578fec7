//! The tag catalog: an arena of tag definitions indexed by id and by `(owner, code)`.
//!
//! ## Resolution
//!
//! [`TagCatalog::resolve`] is an explicit two-step lookup: the authoring clinician's private
//! definition first, then the global one. A private tag therefore shadows a global tag with the
//! same code for its owner only.
//!
//! ## Hierarchy
//!
//! Tags form a forest through their `parent` reference. Writes that would close a cycle are
//! rejected, and every traversal still carries a visited set so a corrupted hierarchy surfaces
//! as [`CatalogError::CyclicHierarchy`] instead of looping.
//!
//! The catalog is read-only during assembly and is `Send + Sync`, so one snapshot can be shared
//! behind an `Arc` by any number of concurrent parses.

pub mod wire;

use crate::error::{CatalogError, CatalogResult, UnknownTagError};
use crate::tag::Tag;
use ctag_types::TagCode;
use ctag_uuid::{ClinicianId, TagId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

type ScopeKey = (Option<ClinicianId>, TagCode);

#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    nodes: Vec<Tag>,
    by_id: HashMap<TagId, usize>,
    by_scope: HashMap<ScopeKey, usize>,
    children: HashMap<TagId, Vec<usize>>,
}

fn scope_label(owner: Option<ClinicianId>) -> String {
    match owner {
        Some(owner) => format!("clinician {owner}"),
        None => "global".to_string(),
    }
}

impl TagCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a complete set of definitions.
    ///
    /// Definitions may appear in any order (children before parents). The whole set is checked
    /// for unique ids, unique `(owner, code)` pairs, known parents and an acyclic hierarchy.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError`] found.
    pub fn from_tags(tags: impl IntoIterator<Item = Tag>) -> CatalogResult<Self> {
        let mut catalog = Self::new();
        for tag in tags {
            catalog.push_unchecked_parent(tag)?;
        }

        for tag in &catalog.nodes {
            if let Some(parent) = tag.parent {
                if !catalog.by_id.contains_key(&parent) {
                    return Err(CatalogError::UnknownParent {
                        tag: tag.id,
                        parent,
                    });
                }
            }
        }
        catalog.check_hierarchy()?;

        Ok(catalog)
    }

    /// Loads a catalog from a YAML file (see [`wire`] for the format).
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(CatalogError::FileRead)?;
        Self::from_yaml_str(&yaml)
    }

    /// Parses a catalog from YAML text (see [`wire`] for the format).
    pub fn from_yaml_str(yaml: &str) -> CatalogResult<Self> {
        Self::from_tags(wire::parse_catalog_yaml(yaml)?)
    }

    fn push_unchecked_parent(&mut self, tag: Tag) -> CatalogResult<()> {
        tag.kind.check(&tag.code)?;

        if self.by_id.contains_key(&tag.id) {
            return Err(CatalogError::DuplicateId(tag.id));
        }
        let key = (tag.owner, tag.code.clone());
        if self.by_scope.contains_key(&key) {
            return Err(CatalogError::DuplicateCode {
                code: tag.code.clone(),
                scope: scope_label(tag.owner),
            });
        }
        if tag.parent == Some(tag.id) {
            return Err(CatalogError::CyclicHierarchy(tag.id));
        }

        let index = self.nodes.len();
        self.by_id.insert(tag.id, index);
        self.by_scope.insert(key, index);
        if let Some(parent) = tag.parent {
            self.children.entry(parent).or_default().push(index);
        }
        self.nodes.push(tag);
        Ok(())
    }

    /// Adds one definition. Its parent, if any, must already be in the catalog.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::DuplicateId`] / [`CatalogError::DuplicateCode`] on a uniqueness clash,
    /// - [`CatalogError::UnknownParent`] if the parent is not defined,
    /// - [`CatalogError::CyclicHierarchy`] if the tag names itself as parent,
    /// - [`CatalogError::InvalidRules`] if the rules are incoherent.
    pub fn insert(&mut self, tag: Tag) -> CatalogResult<()> {
        if let Some(parent) = tag.parent {
            if parent != tag.id && !self.by_id.contains_key(&parent) {
                return Err(CatalogError::UnknownParent {
                    tag: tag.id,
                    parent,
                });
            }
        }
        self.push_unchecked_parent(tag)
    }

    /// Moves a tag under a new parent (or to the top level with `None`).
    ///
    /// The move is rejected if the new parent is the tag itself or one of its descendants.
    pub fn set_parent(&mut self, id: TagId, parent: Option<TagId>) -> CatalogResult<()> {
        let index = self.index_of(id)?;

        if let Some(new_parent) = parent {
            self.index_of(new_parent).map_err(|_| CatalogError::UnknownParent {
                tag: id,
                parent: new_parent,
            })?;
            if new_parent == id
                || self
                    .ancestors_of(new_parent)?
                    .iter()
                    .any(|ancestor| ancestor.id == id)
            {
                return Err(CatalogError::CyclicHierarchy(id));
            }
        }

        if let Some(old_parent) = self.nodes[index].parent {
            if let Some(siblings) = self.children.get_mut(&old_parent) {
                siblings.retain(|&i| i != index);
            }
        }
        if let Some(new_parent) = parent {
            self.children.entry(new_parent).or_default().push(index);
        }
        self.nodes[index].parent = parent;

        tracing::debug!("re-parented tag {} under {:?}", id, parent);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.nodes.iter()
    }

    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.by_id.get(&id).map(|&i| &self.nodes[i])
    }

    fn index_of(&self, id: TagId) -> CatalogResult<usize> {
        self.by_id
            .get(&id)
            .copied()
            .ok_or(CatalogError::UnknownTagId(id))
    }

    /// Resolves a code for an authoring clinician: private definition first, then global.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownTagError`] if neither scope defines the code.
    pub fn resolve(&self, code: &TagCode, clinician: ClinicianId) -> Result<&Tag, UnknownTagError> {
        self.lookup(Some(clinician), code)
            .or_else(|| self.lookup(None, code))
            .ok_or_else(|| UnknownTagError { code: code.clone() })
    }

    fn lookup(&self, owner: Option<ClinicianId>, code: &TagCode) -> Option<&Tag> {
        self.by_scope
            .get(&(owner, code.clone()))
            .map(|&i| &self.nodes[i])
    }

    /// Every tag a clinician can use, private definitions replacing global ones with the same
    /// code, ordered by code.
    pub fn visible_to(&self, clinician: ClinicianId) -> Vec<&Tag> {
        let mut visible: BTreeMap<&TagCode, &Tag> = BTreeMap::new();
        for tag in self.nodes.iter().filter(|t| t.owner.is_none()) {
            visible.insert(&tag.code, tag);
        }
        for tag in self.nodes.iter().filter(|t| t.owner == Some(clinician)) {
            visible.insert(&tag.code, tag);
        }
        visible.into_values().collect()
    }

    /// Top-level tags in insertion order.
    pub fn roots(&self) -> Vec<&Tag> {
        self.nodes.iter().filter(|t| t.parent.is_none()).collect()
    }

    /// Direct children of a tag, in insertion order.
    pub fn children_of(&self, id: TagId) -> CatalogResult<Vec<&Tag>> {
        self.index_of(id)?;
        Ok(self
            .children
            .get(&id)
            .map(|indices| indices.iter().map(|&i| &self.nodes[i]).collect())
            .unwrap_or_default())
    }

    /// The parent chain of a tag, nearest first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::CyclicHierarchy`] if the chain revisits a tag.
    pub fn ancestors_of(&self, id: TagId) -> CatalogResult<Vec<&Tag>> {
        let mut visited = HashSet::from([id]);
        let mut ancestors = Vec::new();
        let mut current = self.nodes[self.index_of(id)?].parent;

        while let Some(parent_id) = current {
            if !visited.insert(parent_id) {
                return Err(CatalogError::CyclicHierarchy(parent_id));
            }
            let parent = &self.nodes[self.index_of(parent_id)?];
            ancestors.push(parent);
            current = parent.parent;
        }

        Ok(ancestors)
    }

    /// All tags below a tag, depth-first in insertion order.
    pub fn descendants_of(&self, id: TagId) -> CatalogResult<Vec<&Tag>> {
        self.index_of(id)?;
        let mut visited = HashSet::from([id]);
        let mut descendants = Vec::new();
        let mut stack: Vec<usize> = self
            .children
            .get(&id)
            .map(|c| c.iter().rev().copied().collect())
            .unwrap_or_default();

        while let Some(index) = stack.pop() {
            let tag = &self.nodes[index];
            if !visited.insert(tag.id) {
                return Err(CatalogError::CyclicHierarchy(tag.id));
            }
            descendants.push(tag);
            if let Some(children) = self.children.get(&tag.id) {
                stack.extend(children.iter().rev().copied());
            }
        }

        Ok(descendants)
    }

    /// Walks every parent chain once.
    pub fn check_hierarchy(&self) -> CatalogResult<()> {
        for tag in &self.nodes {
            self.ancestors_of(tag.id)?;
        }
        Ok(())
    }
}
