//! Projected fields.
//!
//! A projected field has no storage of its own. Each node of its subtree is
//! mapped to a source field of the owning model, and reading the projected
//! field reads the source. Mappings are validated once, when the field is
//! added.

use std::collections::HashMap;

use super::field::{Field, Structure};
use super::tree::{FieldId, FieldTree};
use crate::common::{Error, Result};

/// Target (projected tree) to source (model tree) mapping.
pub type FieldMap = HashMap<FieldId, FieldId>;

/// The projected fields of a model plus their source mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedFields {
    tree: FieldTree,
    sources: FieldMap,
}

/// A projected field attached to a scratch copy of the projected tree.
///
/// Nothing is visible in the owning table until
/// [`ProjectedFields::commit`] installs it.
#[derive(Debug)]
pub(crate) struct StagedProjection {
    tree: FieldTree,
    root: FieldId,
    map: FieldMap,
}

impl ProjectedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// The projected field tree. Its zero field is private to the table.
    pub fn tree(&self) -> &FieldTree {
        &self.tree
    }

    /// Source field, in the model tree, of a projected field.
    pub fn source_of(&self, target: FieldId) -> Option<FieldId> {
        self.sources.get(&target).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Attach `field` to a copy of the projected tree and resolve the source
    /// of it and every descendant through `mapping`.
    pub(crate) fn stage(
        &self,
        field: Field,
        mapping: &dyn Fn(&str) -> String,
        model_tree: &FieldTree,
    ) -> Result<StagedProjection> {
        let mut tree = self.tree.clone();
        let root = tree.attach(FieldId::ZERO, field);

        let mut map = FieldMap::new();
        for target in tree.subtree(root) {
            let source_path = mapping(tree.node(target).qualified_name());
            let source = model_tree
                .find(&source_path)
                .ok_or(Error::NoSuchField(source_path))?;
            map.insert(target, source);
        }

        Ok(StagedProjection { tree, root, map })
    }

    /// Install a validated projection and return its id in [`tree`](Self::tree).
    pub(crate) fn commit(&mut self, staged: StagedProjection) -> FieldId {
        self.tree = staged.tree;
        self.sources.extend(staged.map);
        staged.root
    }

    /// Copy of the table whose sources point into `new_model`, a copy of
    /// `old_model`. Mappings are matched up by qualified name.
    pub(crate) fn rewire(&self, old_model: &FieldTree, new_model: &FieldTree) -> ProjectedFields {
        let tree = self.tree.clone();
        let mut sources = FieldMap::new();
        for (&target, &source) in &self.sources {
            let target_name = self.tree.node(target).qualified_name();
            let Some(new_target) = tree
                .iter()
                .find(|&id| tree.node(id).qualified_name() == target_name)
            else {
                continue;
            };
            if let Some(new_source) = new_model.find(old_model.node(source).qualified_name()) {
                sources.insert(new_target, new_source);
            }
        }
        ProjectedFields { tree, sources }
    }
}

impl StagedProjection {
    /// Check the mapping of the staged field and all of its descendants.
    pub(crate) fn validate(&self, model_tree: &FieldTree) -> Result<()> {
        for target in self.tree.subtree(self.root) {
            ensure_valid_mapping(&self.tree, model_tree, &self.map, target)?;
        }
        Ok(())
    }
}

/// Check that `target` may read from its mapped source.
///
/// Source and target must have the same structure, except that a cardinality
/// leaf may read a collection. Leaves and unsplit fields must agree on their
/// type. Neither side may live below a fixed-size array, and both must sit
/// below the same chain of collections: each side's nearest non-record
/// ancestor must be a collection, and the target's must map to the source's.
pub fn ensure_valid_mapping(
    target_tree: &FieldTree,
    source_tree: &FieldTree,
    map: &FieldMap,
    target: FieldId,
) -> Result<()> {
    let Some(&source) = map.get(&target) else {
        return Err(Error::NoSuchField(
            target_tree.node(target).qualified_name().to_string(),
        ));
    };
    let t = target_tree.node(target);
    let s = source_tree.node(source);
    let names = || (s.qualified_name().to_string(), t.qualified_name().to_string());

    let compatible = s.structure() == t.structure()
        || (s.structure() == Structure::Collection && t.is_cardinality());
    if !compatible {
        let (source_field, target) = names();
        return Err(Error::MappingStructureMismatch {
            source_field,
            target,
        });
    }
    if matches!(s.structure(), Structure::Leaf | Structure::Unsplit)
        && s.type_name() != t.type_name()
    {
        let (source_field, target) = names();
        return Err(Error::MappingTypeMismatch {
            source_field,
            target,
        });
    }

    if source_tree.has_array_ancestor(source) || target_tree.has_array_ancestor(target) {
        let (source_field, target) = names();
        return Err(Error::ArrayMapping {
            source_field,
            target,
        });
    }

    let source_break = source_tree.break_point(source);
    if let Some(bp) = source_break {
        if source_tree.node(bp).structure() != Structure::Collection {
            let (source_field, target) = names();
            return Err(Error::UnsupportedMapping {
                side: "source",
                source_field,
                target,
            });
        }
    }
    let target_break = target_tree.break_point(target);
    if let Some(bp) = target_break {
        if target_tree.node(bp).structure() != Structure::Collection {
            let (source_field, target) = names();
            return Err(Error::UnsupportedMapping {
                side: "target",
                source_field,
                target,
            });
        }
    }

    match (source_break, target_break) {
        (None, None) => Ok(()),
        (Some(sb), Some(tb)) if map.get(&tb) == Some(&sb) => Ok(()),
        _ => {
            let (source_field, target) = names();
            Err(Error::MappingStructureMismatch {
                source_field,
                target,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_tree() -> FieldTree {
        let mut tree = FieldTree::new();
        tree.attach(FieldId::ZERO, Field::new("pt", "float").unwrap());
        tree.attach(FieldId::ZERO, Field::new("jets", "std::vector<float>").unwrap());
        tree.attach(FieldId::ZERO, Field::new("arr", "std::array<float,2>").unwrap());
        tree
    }

    fn add(
        table: &ProjectedFields,
        model: &FieldTree,
        field: Field,
        mapping: &dyn Fn(&str) -> String,
    ) -> Result<StagedProjection> {
        let staged = table.stage(field, mapping, model)?;
        staged.validate(model)?;
        Ok(staged)
    }

    #[test]
    fn test_leaf_alias() {
        let model = model_tree();
        let mut table = ProjectedFields::new();
        let staged = add(&table, &model, Field::new("alias", "float").unwrap(), &|_| {
            "pt".to_string()
        })
        .unwrap();
        let id = table.commit(staged);
        assert_eq!(table.source_of(id), model.find("pt"));
    }

    #[test]
    fn test_type_mismatch() {
        let model = model_tree();
        let table = ProjectedFields::new();
        let err = add(&table, &model, Field::new("alias", "double").unwrap(), &|_| {
            "pt".to_string()
        })
        .unwrap_err();
        assert!(matches!(err, Error::MappingTypeMismatch { .. }));
    }

    #[test]
    fn test_collection_projection() {
        let model = model_tree();
        let table = ProjectedFields::new();
        let mapping = |name: &str| name.replacen("vec", "jets", 1);
        assert!(add(
            &table,
            &model,
            Field::new("vec", "std::vector<float>").unwrap(),
            &mapping
        )
        .is_ok());
    }

    #[test]
    fn test_missing_source_names_path() {
        let model = model_tree();
        let table = ProjectedFields::new();
        let err = table
            .stage(
                Field::new("vec", "std::vector<float>").unwrap(),
                &|name: &str| if name == "vec" { "jets".into() } else { "jets._1".into() },
                &model,
            )
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchField(p) if p == "jets._1"));
    }

    #[test]
    fn test_array_source_rejected() {
        let model = model_tree();
        let table = ProjectedFields::new();
        let err = add(&table, &model, Field::new("a", "float").unwrap(), &|_| {
            "arr._0".to_string()
        })
        .unwrap_err();
        assert!(matches!(err, Error::ArrayMapping { .. }));
    }

    #[test]
    fn test_failed_stage_leaves_table_untouched() {
        let model = model_tree();
        let table = ProjectedFields::new();
        let _ = add(&table, &model, Field::new("x", "double").unwrap(), &|_| {
            "pt".to_string()
        });
        assert!(table.is_empty());
    }

    #[test]
    fn test_rewire() {
        let model = model_tree();
        let mut table = ProjectedFields::new();
        let staged = add(&table, &model, Field::new("alias", "float").unwrap(), &|_| {
            "pt".to_string()
        })
        .unwrap();
        let id = table.commit(staged);

        let copy = model.clone();
        let rewired = table.rewire(&model, &copy);
        assert_eq!(rewired.source_of(id), copy.find("pt"));
    }
}
