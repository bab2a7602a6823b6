//! Bulk value arrays.

use super::value::Value;
use crate::common::ClusterIndex;

/// A contiguous run of values of one field, with a validity mask.
///
/// Created by [`SchemaModel::create_bulk`](super::SchemaModel::create_bulk).
/// [`reset`](Bulk::reset) re-targets the bulk to a new row range and
/// restores every slot to the field's default value.
#[derive(Debug, Clone, PartialEq)]
pub struct Bulk {
    field_name: String,
    template: Value,
    first_index: ClusterIndex,
    values: Vec<Value>,
    mask: Vec<bool>,
}

impl Bulk {
    pub(crate) fn new(field_name: String, template: Value) -> Self {
        Self {
            field_name,
            template,
            first_index: ClusterIndex::default(),
            values: Vec::new(),
            mask: Vec::new(),
        }
    }

    /// Qualified name of the field the bulk holds.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Re-target the bulk to `size` rows starting at `first_index`.
    ///
    /// Existing slots are reused; all slots end up default-valued and invalid.
    pub fn reset(&mut self, first_index: ClusterIndex, size: usize) {
        self.first_index = first_index;
        self.values.truncate(size);
        for value in self.values.iter_mut() {
            value.clone_from(&self.template);
        }
        self.values.resize(size, self.template.clone());
        self.mask.clear();
        self.mask.resize(size, false);
    }

    /// Store `value` for the row `first_index + offset` and mark it valid.
    ///
    /// Returns `false` if `offset` is outside the current range.
    pub fn set(&mut self, offset: usize, value: Value) -> bool {
        match self.values.get_mut(offset) {
            Some(slot) => {
                *slot = value;
                self.mask[offset] = true;
                true
            }
            None => false,
        }
    }

    /// The value at `offset`, if it has been set.
    pub fn get(&self, offset: usize) -> Option<&Value> {
        if *self.mask.get(offset)? {
            self.values.get(offset)
        } else {
            None
        }
    }

    pub fn first_index(&self) -> ClusterIndex {
        self.first_index
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    /// Number of valid slots.
    pub fn n_valid(&self) -> usize {
        self.mask.iter().filter(|&&valid| valid).count()
    }
}
