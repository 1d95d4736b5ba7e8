use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::{fs, path::Path};

use crate::report::model::{ModuleHash, ModuleInfo};

/// Raw module context used during validation.
///
/// Holds the exact bytes analyzed and a cryptographic fingerprint that
/// uniquely identifies the module, so admission logs can state exactly which
/// artifact was checked.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    /// Optional source path (informational only).
    pub path: Option<String>,

    /// Exact bytes read.
    pub bytes: Vec<u8>,

    /// Size of the module in bytes.
    pub size_bytes: u64,

    /// Hash algorithm used for fingerprinting.
    pub hash_alg: String,

    /// Hex-encoded hash of the module bytes.
    pub hash_hex: String,
}

impl ModuleContext {
    /// Builds a context from in-memory bytes (e.g. a module read off stdin).
    ///
    /// The identity depends **only** on the bytes; the path is carried along
    /// for display and never hashed.
    pub fn from_bytes(path: Option<String>, bytes: Vec<u8>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();

        Self {
            path,
            size_bytes: bytes.len() as u64,
            bytes,
            hash_alg: "sha256".to_string(),
            hash_hex: hex::encode(digest),
        }
    }

    /// Convert into the public, report-facing module metadata.
    ///
    /// This intentionally drops the raw bytes to prevent reuse after
    /// validation.
    pub fn into_module_info(self) -> ModuleInfo {
        ModuleInfo {
            path: self.path,
            size_bytes: self.size_bytes,
            hash: ModuleHash {
                algorithm: self.hash_alg,
                value: self.hash_hex,
            },
        }
    }
}

/// Read a hook module from disk and compute a stable cryptographic identity.
pub fn read_module(path: &Path) -> Result<ModuleContext> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read module: {}", path.display()))?;
    Ok(ModuleContext::from_bytes(
        Some(path.display().to_string()),
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_module(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_bytes_and_computes_stable_hash() {
        let data = b"hookguard-test";
        let file = temp_module(data);

        let ctx = read_module(file.path()).expect("module read succeeds");

        assert_eq!(ctx.bytes, data);
        assert_eq!(ctx.size_bytes, data.len() as u64);
        assert_eq!(ctx.hash_alg, "sha256");
        // echo -n "hookguard-test" | sha256sum
        assert_eq!(
            ctx.hash_hex,
            "c62c50ce004b34cee38bfcc905fd9f4ce8dcd37b7ec87a616fab60eb69ee61cc"
        );
    }

    #[test]
    fn different_inputs_produce_different_hashes() {
        let a = read_module(temp_module(b"data-a").path()).unwrap();
        let b = read_module(temp_module(b"data-b").path()).unwrap();
        assert_ne!(a.hash_hex, b.hash_hex);
    }

    #[test]
    fn from_bytes_matches_file_read() {
        let data = b"\0asm\x01\0\0\0";
        let file = temp_module(data);
        let from_file = read_module(file.path()).unwrap();
        let from_bytes = ModuleContext::from_bytes(None, data.to_vec());
        assert_eq!(from_file.hash_hex, from_bytes.hash_hex);
        assert!(from_bytes.path.is_none());
    }

    #[test]
    fn missing_file_returns_error() {
        assert!(read_module(Path::new("non_existent.wasm")).is_err());
    }

    #[test]
    fn converts_to_module_info() {
        let ctx = ModuleContext::from_bytes(Some("hook.wasm".into()), vec![0x00, 0x61]);
        let info = ctx.into_module_info();
        assert_eq!(info.path, Some("hook.wasm".into()));
        assert_eq!(info.size_bytes, 2);
        assert_eq!(info.hash.algorithm, "sha256");
        assert_eq!(info.hash.value.len(), 64);
    }
}
