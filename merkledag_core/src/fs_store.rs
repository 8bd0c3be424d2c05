//! On-disk key-value store.
//!
//! Values are kept one file per key, sharded by the first hash byte:
//!
//! ```text
//! <root>/config                                  version=1, algo=<algorithm>
//! <root>/objects/<algorithm>/<prefix>/<suffix>   record
//! ```
//!
//! Each record is a 16-byte header followed by the (possibly compressed)
//! value:
//!
//! ```text
//! 0x00  4   "MDKV" magic
//! 0x04  1   version (u8) = 1
//! 0x05  1   algo: 1=blake3-256, 2=sha2-256
//! 0x06  1   compression: 0=none, 1=zstd
//! 0x07  1   reserved (must be 0)
//! 0x08  8   payload_len (u64 LE) - stored size
//! 0x10  ... payload
//! ```

use crate::error::{Error, Result};
use crate::hash::{Algorithm, Hash};
use crate::kv::KvStore;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Magic bytes at the start of every record file.
pub const MAGIC: &[u8; 4] = b"MDKV";

/// Current record format version.
pub const VERSION: u8 = 1;

/// Size of the record header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Compression threshold: values >= 4KB are compressed.
const COMPRESSION_THRESHOLD: usize = 4096;

/// Compression types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    /// No compression.
    None = 0,
    /// Zstandard compression.
    Zstd = 1,
}

impl CompressionType {
    /// Convert to byte representation.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from byte representation.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Zstd),
            _ => Err(Error::compression_error(format!(
                "Invalid compression type: {}",
                value
            ))),
        }
    }
}

/// A 16-byte record header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// Hash algorithm of the store the record was written to.
    pub algorithm: Algorithm,
    /// Compression applied to the payload.
    pub compression: CompressionType,
    /// Length of the stored payload in bytes.
    pub payload_len: u64,
}

impl RecordHeader {
    /// Encode the header to a 16-byte array.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = VERSION;
        buf[5] = self.algorithm.id();
        buf[6] = self.compression.to_u8();
        // buf[7] reserved
        buf[8..16].copy_from_slice(&self.payload_len.to_le_bytes());
        buf
    }

    /// Decode a header from its 16-byte form.
    pub fn decode(buf: &[u8], location: &Path) -> Result<Self> {
        let corrupted =
            |reason: String| Error::corrupted_object(location.display().to_string(), reason);

        if buf.len() < HEADER_SIZE {
            return Err(corrupted(format!(
                "Header too short: {} bytes (expected {})",
                buf.len(),
                HEADER_SIZE
            )));
        }

        if &buf[0..4] != MAGIC {
            return Err(corrupted(format!(
                "Invalid magic: expected {:?}, got {:?}",
                MAGIC,
                &buf[0..4]
            )));
        }

        if buf[4] != VERSION {
            return Err(corrupted(format!("Unsupported version: {}", buf[4])));
        }

        if buf[7] != 0 {
            return Err(corrupted(format!("Reserved byte must be 0, got {}", buf[7])));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&buf[8..16]);

        Ok(Self {
            algorithm: Algorithm::from_id(buf[5])?,
            compression: CompressionType::from_u8(buf[6])?,
            payload_len: u64::from_le_bytes(len_bytes),
        })
    }
}

/// A key-value store backed by a directory tree.
#[derive(Debug)]
pub struct FsStore {
    root: PathBuf,
    algorithm: Algorithm,
}

impl FsStore {
    /// Initialize a new store at the given path.
    ///
    /// Creates `objects/<algorithm>/` and the `config` file.
    pub fn init<P: AsRef<Path>>(root: P, algorithm: Algorithm) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("objects").join(algorithm.as_str()))?;

        let config_content = format!("version=1\nalgo={}\n", algorithm.as_str());
        fs::write(root.join("config"), config_content)?;

        debug!(root = %root.display(), algorithm = algorithm.as_str(), "initialized store");

        Ok(Self { root, algorithm })
    }

    /// Open an existing store at the given path.
    ///
    /// Validates the store structure and reads the configuration.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            return Err(Error::invalid_store(&root, "directory does not exist"));
        }

        let config_path = root.join("config");
        if !config_path.exists() {
            return Err(Error::invalid_store(&root, "config file not found"));
        }

        let config_content = fs::read_to_string(&config_path)?;
        let algorithm = Self::parse_config(&root, &config_content)?;

        if !root.join("objects").join(algorithm.as_str()).exists() {
            return Err(Error::invalid_store(
                &root,
                "objects directory structure missing",
            ));
        }

        Ok(Self { root, algorithm })
    }

    /// Parse the config file to extract the algorithm.
    fn parse_config(root: &Path, content: &str) -> Result<Algorithm> {
        let mut version = None;
        let mut algo = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                match key.trim() {
                    "version" => version = Some(value.trim()),
                    "algo" => algo = Some(value.trim()),
                    _ => {}
                }
            }
        }

        if version != Some("1") {
            return Err(Error::invalid_store(
                root,
                format!("Unsupported config version: {:?}", version),
            ));
        }

        let algo_str = algo.ok_or_else(|| Error::invalid_store(root, "Missing algo in config"))?;
        Algorithm::parse(algo_str)
    }

    /// Get the path to a record file given its hash.
    ///
    /// Returns: `objects/{algorithm}/{prefix}/{suffix}`
    pub fn object_path(&self, hash: &Hash) -> PathBuf {
        self.root
            .join("objects")
            .join(self.algorithm.as_str())
            .join(hash.prefix())
            .join(hash.suffix())
    }

    /// Get the root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a record atomically using tempfile.
    fn write_record_atomic(
        &self,
        path: &Path,
        header: &RecordHeader,
        payload: &[u8],
    ) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::invalid_store(&self.root, "object path has no parent"))?;
        fs::create_dir_all(parent)?;

        let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
        temp_file.write_all(&header.encode())?;
        temp_file.write_all(payload)?;
        temp_file.flush()?;

        // Persist atomically
        temp_file.persist(path)?;

        Ok(())
    }
}

impl KvStore for FsStore {
    fn has(&self, hash: &Hash) -> Result<bool> {
        Ok(self.object_path(hash).try_exists()?)
    }

    fn put(&self, hash: &Hash, value: &[u8]) -> Result<()> {
        let path = self.object_path(hash);

        let (payload, compression) = if value.len() >= COMPRESSION_THRESHOLD {
            (compress_zstd(value)?, CompressionType::Zstd)
        } else {
            (value.to_vec(), CompressionType::None)
        };

        let header = RecordHeader {
            algorithm: self.algorithm,
            compression,
            payload_len: payload.len() as u64,
        };

        self.write_record_atomic(&path, &header, &payload)?;

        debug!(hash = %hash, len = value.len(), stored = payload.len(), "record written");

        Ok(())
    }

    fn get(&self, hash: &Hash) -> Result<Option<Vec<u8>>> {
        let path = self.object_path(hash);

        let mut file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut header_buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut header_buf)?;
        let header = RecordHeader::decode(&header_buf, &path)?;

        if header.algorithm != self.algorithm {
            return Err(Error::corrupted_object(
                path.display().to_string(),
                format!(
                    "Record algorithm {} does not match store algorithm {}",
                    header.algorithm.as_str(),
                    self.algorithm.as_str()
                ),
            ));
        }

        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;

        if payload.len() as u64 != header.payload_len {
            return Err(Error::corrupted_object(
                path.display().to_string(),
                format!(
                    "Payload length mismatch: expected {}, got {}",
                    header.payload_len,
                    payload.len()
                ),
            ));
        }

        let value = match header.compression {
            CompressionType::None => payload,
            CompressionType::Zstd => decompress_zstd(&payload)?,
        };

        Ok(Some(value))
    }

    fn algorithm(&self) -> Option<Algorithm> {
        Some(self.algorithm)
    }
}

/// Compress data using zstd.
fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 3) // Level 3 = fast compression
        .map_err(|e| Error::compression_error(format!("zstd compression failed: {}", e)))
}

/// Decompress data using zstd.
fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data)
        .map_err(|e| Error::compression_error(format!("zstd decompression failed: {}", e)))
}
