//! FieldTree - arena of attached fields.
//!
//! Attached fields live in a flat arena indexed by [`FieldId`]. Parents are
//! stored as ids, so walking toward the root never borrows a node from its
//! owner. Index 0 is the zero field: the unnamed root record.

use super::field::{Field, FieldKind, Structure};
use super::value::Value;
use crate::storage::page::ElementType;

/// Index of a field within one [`FieldTree`].
///
/// Ids are only meaningful for the tree that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    /// The zero field of every tree.
    pub const ZERO: FieldId = FieldId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// An attached field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNode {
    name: String,
    qualified_name: String,
    type_name: String,
    kind: FieldKind,
    parent: Option<FieldId>,
    children: Vec<FieldId>,
}

impl FieldNode {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted path from the root, e.g. `jets._0.pt`.
    #[inline]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[inline]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    #[inline]
    pub fn structure(&self) -> Structure {
        self.kind.structure()
    }

    #[inline]
    pub fn repetition(&self) -> u64 {
        self.kind.repetition()
    }

    #[inline]
    pub fn is_cardinality(&self) -> bool {
        self.kind == FieldKind::Cardinality
    }

    /// `None` only for the zero field.
    #[inline]
    pub fn parent(&self) -> Option<FieldId> {
        self.parent
    }

    pub fn children(&self) -> &[FieldId] {
        &self.children
    }

    pub fn column_types(&self) -> &'static [ElementType] {
        self.kind.column_types()
    }
}

/// Owning arena of a field tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTree {
    nodes: Vec<FieldNode>,
}

impl FieldTree {
    /// Create a tree holding only the zero field.
    pub fn new() -> Self {
        Self {
            nodes: vec![FieldNode {
                name: String::new(),
                qualified_name: String::new(),
                type_name: String::new(),
                kind: FieldKind::Record,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Attach `field` and its sub-fields below `parent`.
    ///
    /// # Panics
    /// Panics if `parent` was not issued by this tree.
    pub(crate) fn attach(&mut self, parent: FieldId, field: Field) -> FieldId {
        let (name, type_name, kind, children) = field.into_parts();
        let qualified_name = if parent == FieldId::ZERO {
            name.clone()
        } else {
            format!("{}.{}", self.nodes[parent.0].qualified_name, name)
        };

        let id = FieldId(self.nodes.len());
        self.nodes.push(FieldNode {
            name,
            qualified_name,
            type_name,
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);

        for child in children {
            self.attach(id, child);
        }
        id
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// # Panics
    /// Panics if `id` was not issued by this tree.
    #[inline]
    pub fn node(&self, id: FieldId) -> &FieldNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn get(&self, id: FieldId) -> Option<&FieldNode> {
        self.nodes.get(id.0)
    }

    pub fn zero(&self) -> &FieldNode {
        &self.nodes[0]
    }

    /// Number of attached fields, not counting the zero field.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn top_level(&self) -> &[FieldId] {
        &self.nodes[0].children
    }

    /// Resolve a dotted path segment by segment. Empty paths resolve to
    /// nothing.
    pub fn find(&self, path: &str) -> Option<FieldId> {
        if path.is_empty() {
            return None;
        }
        let mut current = FieldId::ZERO;
        for segment in path.split('.') {
            current = self
                .node(current)
                .children
                .iter()
                .copied()
                .find(|&child| self.node(child).name == segment)?;
        }
        Some(current)
    }

    /// `id` followed by all of its descendants, depth first.
    pub fn subtree(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// All descendants of `id`, depth first.
    pub fn descendants(&self, id: FieldId) -> Vec<FieldId> {
        let mut out = self.subtree(id);
        out.remove(0);
        out
    }

    /// All attached fields, depth first.
    pub fn iter(&self) -> impl Iterator<Item = FieldId> {
        self.descendants(FieldId::ZERO).into_iter()
    }

    fn ancestors(&self, id: FieldId) -> impl Iterator<Item = FieldId> + '_ {
        std::iter::successors(self.node(id).parent, move |&p| self.node(p).parent)
    }

    // ========================================================================
    // Structural queries
    // ========================================================================

    /// Whether any ancestor is a fixed-size array.
    pub fn has_array_ancestor(&self, id: FieldId) -> bool {
        self.ancestors(id).any(|a| self.node(a).repetition() > 0)
    }

    /// The nearest ancestor that is neither a record nor a leaf.
    ///
    /// `None` if only records lie between `id` and the zero field.
    pub fn break_point(&self, id: FieldId) -> Option<FieldId> {
        self.ancestors(id).find(|&a| {
            !matches!(
                self.node(a).structure(),
                Structure::Record | Structure::Leaf
            )
        })
    }

    /// Default-constructed value of a field.
    pub fn default_value(&self, id: FieldId) -> Value {
        let node = self.node(id);
        let first_child = || self.default_value(node.children[0]);
        match node.kind {
            FieldKind::Primitive(p) => Value::default_of(p),
            FieldKind::Record => Value::Record(
                node.children
                    .iter()
                    .map(|&c| self.default_value(c))
                    .collect(),
            ),
            FieldKind::Collection => Value::Collection(Vec::new()),
            FieldKind::Array(n) => Value::Array(vec![first_child(); n as usize]),
            FieldKind::Variant => Value::Variant {
                index: 0,
                value: Box::new(first_child()),
            },
            FieldKind::Unsplit => Value::Unsplit(Vec::new()),
            FieldKind::Cardinality => Value::Cardinality(0),
        }
    }

    /// Detach a copy of the subtree rooted at `id`.
    pub fn to_field(&self, id: FieldId) -> Field {
        let node = self.node(id);
        Field::from_parts(
            node.name.clone(),
            node.type_name.clone(),
            node.kind,
            node.children.iter().map(|&c| self.to_field(c)).collect(),
        )
    }
}

impl Default for FieldTree {
    fn default() -> Self {
        Self::new()
    }
}
