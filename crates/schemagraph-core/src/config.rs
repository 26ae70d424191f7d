//! Engine configuration.

/// Default size of chunks streamed into description blobs.
pub const DEFAULT_BLOB_CHUNK_SIZE: usize = 8192;

/// Name prefix reserved for catalog system objects.
pub const DEFAULT_SYSTEM_PREFIX: &str = "RDB$";

/// Display text for a description that cannot be provided.
pub const DEFAULT_NOT_AVAILABLE_TEXT: &str = "N/A";

/// Metadata engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Size of chunks handed to the catalog when writing a description.
    pub blob_chunk_size: usize,

    /// Name prefix identifying system objects.
    pub system_prefix: String,

    /// Whether the catalog loader imports system objects.
    pub include_system_objects: bool,

    /// Text shown when a description is not available.
    pub not_available_text: String,
}

impl EngineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self {
            blob_chunk_size: DEFAULT_BLOB_CHUNK_SIZE,
            system_prefix: DEFAULT_SYSTEM_PREFIX.to_string(),
            include_system_objects: false,
            not_available_text: DEFAULT_NOT_AVAILABLE_TEXT.to_string(),
        }
    }

    /// Set the blob chunk size. Zero is raised to one byte.
    pub fn with_blob_chunk_size(mut self, size: usize) -> Self {
        self.blob_chunk_size = size.max(1);
        self
    }

    /// Set the system-object prefix.
    pub fn with_system_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.system_prefix = prefix.into();
        self
    }

    /// Import system objects when loading from the catalog.
    pub fn with_system_objects(mut self) -> Self {
        self.include_system_objects = true;
        self
    }

    /// Set the "not available" display text.
    pub fn with_not_available_text(mut self, text: impl Into<String>) -> Self {
        self.not_available_text = text.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
