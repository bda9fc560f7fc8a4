use thiserror::Error;

#[derive(Debug, Error)]
pub enum BspError {
    #[error("failed to open {path}: {source}")]
    IoOpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("short read in {path}: expected {expected} bytes, got {got}")]
    IoShortRead {
        path: String,
        expected: usize,
        got: usize,
    },

    #[error("bad magic in {path}: expected {expected:?}, found {found:?}")]
    BadMagic {
        path: String,
        expected: [u8; 8],
        found: [u8; 8],
    },

    #[error("unsupported file version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("scene is empty; nothing to build")]
    EmptyScene,

    #[error("allocation failed: requested {requested} primitives exceeds the {limit} index-space limit")]
    AllocationFailed { requested: u64, limit: u64 },

    #[error("degenerate geometry encountered: {0}")]
    DegenerateGeometry(String),

    #[error("leaf overflow: {count} primitives exceed the {limit} hard cap at max depth")]
    LeafOverflow { count: u32, limit: u32 },

    #[error("missing voxel subtree file: {0}")]
    MissingSubtree(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type BspResult<T> = Result<T, BspError>;
