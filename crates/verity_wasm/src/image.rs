//! Module image validation.

use serde::{Deserialize, Serialize};
use verity_core::{Bytes32, ModuleRoot};

/// Largest module binary the catalog will load, in bytes
pub const MAX_IMAGE_BYTES: usize = 256 * 1024 * 1024;

const WASM_MAGIC: [u8; 4] = *b"\0asm";
const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// Image validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// Binary too small to carry a module header
    #[error("module too small: {0} bytes")]
    TooSmall(usize),

    /// Binary over the size ceiling
    #[error("module size {size} exceeds limit {limit}")]
    TooLarge {
        /// Observed size in bytes
        size: usize,
        /// Configured ceiling in bytes
        limit: usize,
    },

    /// Wrong magic number
    #[error("invalid module magic")]
    BadMagic,

    /// Unsupported binary version
    #[error("unsupported module version: {0:?}")]
    BadVersion([u8; 4]),

    /// Binary does not hash to the requested module root
    #[error("module root mismatch: expected {expected}, got {actual}")]
    RootMismatch {
        /// Root the caller asked for
        expected: ModuleRoot,
        /// Root the binary actually hashes to
        actual: ModuleRoot,
    },
}

/// A validated replay module binary.
///
/// The root is the BLAKE3 hash of the full binary and doubles as the
/// catalog key. Deserialization bypasses validation, so images that
/// cross a serialization boundary must be re-checked with [`verify`]
/// before use.
///
/// [`verify`]: ModuleImage::verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleImage {
    bytes: Vec<u8>,
    root: ModuleRoot,
}

impl ModuleImage {
    /// Validate a module binary and compute its root
    ///
    /// # Errors
    ///
    /// Returns error if the header or size is invalid
    pub fn parse(bytes: Vec<u8>) -> Result<Self, ImageError> {
        if bytes.len() < 8 {
            return Err(ImageError::TooSmall(bytes.len()));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ImageError::TooLarge {
                size: bytes.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }
        if bytes[0..4] != WASM_MAGIC {
            return Err(ImageError::BadMagic);
        }
        if bytes[4..8] != WASM_VERSION {
            let mut version = [0u8; 4];
            version.copy_from_slice(&bytes[4..8]);
            return Err(ImageError::BadVersion(version));
        }

        let root = Bytes32::compute(&bytes);
        Ok(Self { bytes, root })
    }

    /// Validate a module binary against the root the caller expects
    ///
    /// # Errors
    ///
    /// Returns error if the header is invalid or the root differs
    pub fn parse_expected(bytes: Vec<u8>, expected: ModuleRoot) -> Result<Self, ImageError> {
        let image = Self::parse(bytes)?;
        if image.root != expected {
            return Err(ImageError::RootMismatch {
                expected,
                actual: image.root,
            });
        }
        Ok(image)
    }

    /// The module root this binary hashes to
    #[must_use]
    pub fn root(&self) -> ModuleRoot {
        self.root
    }

    /// The raw binary
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Binary size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Re-check that the binary still hashes to its recorded root
    #[must_use]
    pub fn verify(&self) -> bool {
        Bytes32::compute(&self.bytes) == self.root
    }
}
