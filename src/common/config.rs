//! Configuration constants and writer options for columnardb.

/// Default compression setting (algorithm * 100 + level).
pub const DEFAULT_COMPRESSION: u32 = 505;

/// Target size of a compressed cluster (50 MB).
pub const DEFAULT_APPROX_ZIPPED_CLUSTER_SIZE: usize = 50 * 1000 * 1000;

/// Upper bound for the uncompressed size of a cluster (512 MiB).
pub const DEFAULT_MAX_UNZIPPED_CLUSTER_SIZE: usize = 512 * 1024 * 1024;

/// Number of elements a freshly allocated write page starts with.
pub const DEFAULT_INITIAL_ELEMENTS_PER_PAGE: usize = 64;

/// Upper bound for the uncompressed size of a page (1 MiB).
pub const DEFAULT_MAX_UNZIPPED_PAGE_SIZE: usize = 1024 * 1024;

/// Whether compression may run on worker threads.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ImplicitMt {
    /// Compress on the filling thread only.
    Off,
    /// Let the runtime decide; compression may happen asynchronously.
    #[default]
    Default,
}

/// Options that shape how a writer buffers pages and clusters.
///
/// Only [`SchemaModel::estimate_write_memory_usage`] reads them inside this
/// crate; the sink implementations own the actual buffering.
///
/// # Example
/// ```
/// use columnardb::common::config::WriteOptions;
///
/// let options = WriteOptions::new().with_compression(0).with_page_buffer_budget(4096);
/// assert_eq!(options.page_buffer_budget(), 4096);
/// ```
///
/// [`SchemaModel::estimate_write_memory_usage`]: crate::schema::SchemaModel::estimate_write_memory_usage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    compression: u32,
    approx_zipped_cluster_size: usize,
    max_unzipped_cluster_size: usize,
    initial_elements_per_page: usize,
    max_unzipped_page_size: usize,
    /// Zero means "derive from the cluster size".
    page_buffer_budget: usize,
    use_buffered_write: bool,
    implicit_mt: ImplicitMt,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            approx_zipped_cluster_size: DEFAULT_APPROX_ZIPPED_CLUSTER_SIZE,
            max_unzipped_cluster_size: DEFAULT_MAX_UNZIPPED_CLUSTER_SIZE,
            initial_elements_per_page: DEFAULT_INITIAL_ELEMENTS_PER_PAGE,
            max_unzipped_page_size: DEFAULT_MAX_UNZIPPED_PAGE_SIZE,
            page_buffer_budget: 0,
            use_buffered_write: true,
            implicit_mt: ImplicitMt::Default,
        }
    }

    pub fn with_compression(mut self, compression: u32) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_approx_zipped_cluster_size(mut self, bytes: usize) -> Self {
        self.approx_zipped_cluster_size = bytes;
        self
    }

    pub fn with_max_unzipped_cluster_size(mut self, bytes: usize) -> Self {
        self.max_unzipped_cluster_size = bytes;
        self
    }

    pub fn with_initial_elements_per_page(mut self, n: usize) -> Self {
        self.initial_elements_per_page = n;
        self
    }

    pub fn with_max_unzipped_page_size(mut self, bytes: usize) -> Self {
        self.max_unzipped_page_size = bytes;
        self
    }

    pub fn with_page_buffer_budget(mut self, bytes: usize) -> Self {
        self.page_buffer_budget = bytes;
        self
    }

    pub fn with_buffered_write(mut self, enabled: bool) -> Self {
        self.use_buffered_write = enabled;
        self
    }

    pub fn with_implicit_mt(mut self, mode: ImplicitMt) -> Self {
        self.implicit_mt = mode;
        self
    }

    pub fn compression(&self) -> u32 {
        self.compression
    }

    pub fn approx_zipped_cluster_size(&self) -> usize {
        self.approx_zipped_cluster_size
    }

    pub fn max_unzipped_cluster_size(&self) -> usize {
        self.max_unzipped_cluster_size
    }

    pub fn initial_elements_per_page(&self) -> usize {
        self.initial_elements_per_page
    }

    pub fn max_unzipped_page_size(&self) -> usize {
        self.max_unzipped_page_size
    }

    /// Memory all page buffers of a writer may use together.
    ///
    /// Without an explicit budget this is one compressed cluster, doubled when
    /// compression is on because uncompressed pages stay around as well.
    pub fn page_buffer_budget(&self) -> usize {
        if self.page_buffer_budget != 0 {
            return self.page_buffer_budget;
        }
        if self.compression != 0 {
            2 * self.approx_zipped_cluster_size
        } else {
            self.approx_zipped_cluster_size
        }
    }

    pub fn use_buffered_write(&self) -> bool {
        self.use_buffered_write
    }

    pub fn implicit_mt(&self) -> ImplicitMt {
        self.implicit_mt
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::new()
    }
}
