//! Model and schema identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one in-memory instance of a schema model.
///
/// `ModelId::ZERO` is never handed out by a generator. A model carries it only
/// while a schema update is open, which blocks row appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u64);

impl ModelId {
    /// Placeholder id used during an in-place schema update.
    pub const ZERO: ModelId = ModelId(0);

    /// Check if this id is a real model id.
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::ZERO
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model({})", self.0)
    }
}

/// Identifies the shape of a model's field tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub u64);

impl From<ModelId> for SchemaId {
    fn from(id: ModelId) -> Self {
        SchemaId(id.0)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Schema({})", self.0)
    }
}

/// Monotonic source of model ids.
///
/// Models created through [`SchemaModel::create`](crate::schema::SchemaModel::create)
/// share [`IdGenerator::global`]. Tests inject their own generator to get
/// deterministic ids.
///
/// Ids are only unique within one generator, so two generators compare equal
/// only if they are the same instance. Entries remember their generator and
/// writers reject entries drawn from another one.
///
/// # Example
/// ```
/// use columnardb::common::IdGenerator;
///
/// let ids = IdGenerator::new();
/// assert_eq!(ids.next_model_id().0, 1);
/// assert_eq!(ids.next_model_id().0, 2);
/// ```
#[derive(Debug)]
pub struct IdGenerator {
    last: AtomicU64,
}

static GLOBAL_IDS: IdGenerator = IdGenerator::new();

impl IdGenerator {
    /// Create a generator whose first id is 1.
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// The process-wide generator.
    pub fn global() -> &'static IdGenerator {
        &GLOBAL_IDS
    }

    /// Draw the next model id.
    pub fn next_model_id(&self) -> ModelId {
        ModelId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl PartialEq for IdGenerator {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for IdGenerator {}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_monotonic() {
        let ids = IdGenerator::new();
        let a = ids.next_model_id();
        let b = ids.next_model_id();
        assert!(a < b);
        assert!(a.is_valid());
    }

    #[test]
    fn test_generators_compare_by_identity() {
        static A: IdGenerator = IdGenerator::new();
        static B: IdGenerator = IdGenerator::new();
        assert_eq!(A.next_model_id(), B.next_model_id());
        assert_eq!(&A, &A);
        assert_ne!(&A, &B);
    }

    #[test]
    fn test_zero_is_not_valid() {
        assert!(!ModelId::ZERO.is_valid());
        assert_eq!(format!("{}", ModelId::ZERO), "Model(0)");
    }

    #[test]
    fn test_schema_id_from_model_id() {
        assert_eq!(SchemaId::from(ModelId(7)), SchemaId(7));
        assert_eq!(format!("{}", SchemaId(7)), "Schema(7)");
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let ids = Arc::new(IdGenerator::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let ids = Arc::clone(&ids);
            handles.push(thread::spawn(move || {
                (0..100).map(|_| ids.next_model_id()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
