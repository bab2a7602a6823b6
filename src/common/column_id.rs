//! Column and cluster identifiers.

use std::fmt;

/// Identifies a physical column of a dataset.
///
/// # Example
/// ```
/// use columnardb::ColumnId;
///
/// let column = ColumnId::new(3);
/// assert_eq!(column.0, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(pub u64);

impl ColumnId {
    /// Create a new ColumnId.
    #[inline]
    pub fn new(id: u64) -> Self {
        ColumnId(id)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({})", self.0)
    }
}

/// Identifies a cluster, a contiguous block of rows stored together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClusterId(pub u64);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cluster({})", self.0)
    }
}

/// A row addressed relative to the start of its cluster.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClusterIndex {
    pub cluster_id: ClusterId,
    pub index: u64,
}

impl ClusterIndex {
    #[inline]
    pub fn new(cluster_id: u64, index: u64) -> Self {
        Self {
            cluster_id: ClusterId(cluster_id),
            index,
        }
    }
}

impl fmt::Display for ClusterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.cluster_id.0, self.index)
    }
}
