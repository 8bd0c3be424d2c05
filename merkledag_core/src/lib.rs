//! # Merkle DAG Core
//!
//! Builds a content-addressed Merkle DAG from a file/directory tree and
//! persists its objects into a key-value store.
//!
//! Files shorter than the block size become a single `blob` object. Longer
//! files are cut into fixed-size blocks, each stored as a blob, and linked in
//! order from a `list` object. Directories become `tree` objects linking their
//! entries by name. Every object is addressed by the hash of its encoding and
//! written only if the store does not already hold it, so identical content
//! is stored once.
//!
//! ## Features
//!
//! - Deterministic object encoding with explicit object kinds
//! - Fixed-size block splitting (256 KiB by default)
//! - Pluggable hash primitive (BLAKE3 or SHA-256)
//! - In-memory and on-disk key-value stores
//! - Reading files and directories back, and materializing them to disk
//!
//! ## Example
//!
//! ```no_run
//! use merkledag_core::{Algorithm, Dag, FsStore};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FsStore::init("./my-store", Algorithm::Blake3)?;
//! let mut dag = Dag::new(store)?;
//!
//! // Add a file or directory
//! let root = dag.add_path(Path::new("./my-data"))?;
//! println!("root {}", root);
//!
//! // Materialize back to filesystem
//! dag.materialize(&root, Path::new("./restored"))?;
//! # Ok(())
//! # }
//! ```

mod chunking;
mod config;
mod dag;
mod error;
mod fs_store;
mod hash;
mod kv;
mod node;
mod object;
mod walk;

pub use chunking::{BLOCK_SIZE, Split, block_count, split};
pub use config::{DagConfig, DirWrites};
pub use dag::{AddStats, Dag};
pub use error::{Error, Result};
pub use fs_store::FsStore;
pub use hash::{Algorithm, ContentHasher, Digester, HASH_SIZE, Hash};
pub use kv::{KvStore, MemoryStore};
pub use node::{Dir, File, Node};
pub use object::{Link, Object, ObjectKind, Payload, TypeTag};
