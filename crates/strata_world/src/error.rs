// error.rs - Voxel world errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    /// Background sector load or persistence IO failed. Logged by the
    /// streaming controller; the affected region stays empty.
    #[error("sector io failed: {0}")]
    StreamingIo(#[from] std::io::Error),

    /// A sector file did not match the expected layout.
    #[error("sector file corrupt: {0}")]
    Corrupt(String),

    /// A sector file was written by an unknown format version.
    #[error("unsupported sector format version {0}")]
    UnsupportedVersion(u16),
}
