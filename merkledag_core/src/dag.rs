//! Building a Merkle DAG from a source tree and reading it back.

use crate::chunking::{Split, split};
use crate::config::{DagConfig, DirWrites};
use crate::error::{Error, Result};
use crate::hash::{ContentHasher, Digester, Hash};
use crate::kv::KvStore;
use crate::node::{Dir, File, Node};
use crate::object::{Link, Object, ObjectKind, TypeTag};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Counters accumulated across [`Dag::add`] calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddStats {
    /// Objects written to the store.
    pub objects_written: usize,
    /// Objects skipped because the store already had them.
    pub dedup_hits: usize,
    /// Encoded bytes written to the store.
    pub bytes_written: u64,
}

/// Builds DAGs into a key-value store.
///
/// Objects are written bottom-up: every object a link points to is in the
/// store before the object holding the link.
#[derive(Debug)]
pub struct Dag<S, D = blake3::Hasher> {
    store: S,
    hasher: ContentHasher<D>,
    config: DagConfig,
    stats: AddStats,
}

impl<S: KvStore> Dag<S> {
    /// A DAG builder hashing with BLAKE3 and the default configuration.
    pub fn new(store: S) -> Result<Self> {
        Self::with_hasher(store, ContentHasher::blake3(), DagConfig::default())
    }
}

impl<S: KvStore, D: Digester> Dag<S, D> {
    /// A DAG builder with an explicit hasher and configuration.
    ///
    /// Fails if the configuration is invalid or the store is pinned to a
    /// different algorithm than the hasher.
    pub fn with_hasher(store: S, hasher: ContentHasher<D>, config: DagConfig) -> Result<Self> {
        config.validate()?;

        if let Some(algorithm) = store.algorithm()
            && algorithm != hasher.algorithm()
        {
            return Err(Error::algorithm_mismatch(
                algorithm.as_str(),
                hasher.algorithm().as_str(),
            ));
        }

        Ok(Self {
            store,
            hasher,
            config,
            stats: AddStats::default(),
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give back the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// The configuration in use.
    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    /// Counters since this builder was created.
    pub fn stats(&self) -> AddStats {
        self.stats
    }

    /// Store a node and everything below it, returning the root hash.
    pub fn add(&mut self, node: &Node) -> Result<Hash> {
        let before = self.stats;

        let hash = match node {
            Node::File(file) => self.store_file(file)?.0,
            Node::Dir(dir) => self.store_dir(dir)?,
        };

        info!(
            root = %hash,
            written = self.stats.objects_written - before.objects_written,
            deduplicated = self.stats.dedup_hits - before.dedup_hits,
            "added node"
        );

        Ok(hash)
    }

    /// Read a file or directory from disk and store it.
    pub fn add_path(&mut self, path: &Path) -> Result<Hash> {
        let node = Node::from_path(path)?;
        self.add(&node)
    }

    /// Store a file, returning its hash and the tag a parent records for it.
    ///
    /// Files shorter than the block size become a single blob. Longer files
    /// become one blob per block plus a list linking them in order.
    pub fn store_file(&mut self, file: &File) -> Result<(Hash, TypeTag)> {
        match split(file.bytes(), self.config.block_size) {
            Split::Single(data) => {
                let hash = self.persist(&Object::blob(data))?;
                Ok((hash, TypeTag::Blob))
            }
            Split::Blocks(blocks) => {
                let mut list = Object::list();
                for block in blocks {
                    let hash = self.persist(&Object::blob(block))?;
                    list.push_chunk(hash, block.len() as u64)?;
                }

                let hash = self.persist(&list)?;
                debug!(
                    hash = %hash,
                    blocks = list.links().len(),
                    size = file.size(),
                    "stored list"
                );
                Ok((hash, TypeTag::List))
            }
        }
    }

    /// Store a directory and, depth-first, all of its children.
    ///
    /// Entries keep the directory's iteration order.
    pub fn store_dir(&mut self, dir: &Dir) -> Result<Hash> {
        let mut tree = Object::tree();

        for child in dir {
            let (tag, link) = match child {
                Node::File(file) => {
                    let (hash, tag) = self.store_file(file)?;
                    (tag, Link::entry(file.name(), hash, file.size())?)
                }
                Node::Dir(sub) => {
                    let hash = self.store_dir(sub)?;
                    (TypeTag::Tree, Link::entry(sub.name(), hash, sub.size())?)
                }
            };
            tree.push_entry(tag, link)?;

            if self.config.dir_writes == DirWrites::Incremental {
                self.persist(&tree)?;
            }
        }

        let hash = self.persist(&tree)?;
        debug!(hash = %hash, entries = tree.links().len(), "stored tree");
        Ok(hash)
    }

    /// Encode, hash, and write an object unless the store already has it.
    fn persist(&mut self, object: &Object) -> Result<Hash> {
        let encoded = object.encode();
        let hash = self.hasher.digest(&encoded);

        if self.store.has(&hash)? {
            self.stats.dedup_hits += 1;
            debug!(hash = %hash, kind = object.kind().as_str(), "already stored");
            return Ok(hash);
        }

        self.store.put(&hash, &encoded)?;
        self.stats.objects_written += 1;
        self.stats.bytes_written += encoded.len() as u64;
        debug!(
            hash = %hash,
            kind = object.kind().as_str(),
            len = encoded.len(),
            "stored object"
        );

        Ok(hash)
    }

    /// Fetch and decode an object, verifying it against its address.
    pub fn get_object(&mut self, hash: &Hash) -> Result<Object> {
        let bytes = self
            .store
            .get(hash)?
            .ok_or_else(|| Error::object_not_found(hash.to_hex()))?;

        let computed = self.hasher.digest(&bytes);
        if computed != *hash {
            return Err(Error::corrupted_object(
                hash.to_hex(),
                format!(
                    "Hash mismatch: expected {}, got {}",
                    hash.to_hex(),
                    computed.to_hex()
                ),
            ));
        }

        Object::decode(&bytes)
    }

    /// Read back the content of a blob or list.
    pub fn read_file(&mut self, hash: &Hash) -> Result<Vec<u8>> {
        let object = self.get_object(hash)?;

        match object.kind() {
            ObjectKind::Blob => Ok(object.raw().unwrap_or_default().to_vec()),
            ObjectKind::List => {
                let mut data = Vec::new();
                for link in object.links() {
                    let block = self.get_object(&link.hash)?;
                    let bytes = block.raw().ok_or_else(|| {
                        Error::invalid_object_type(
                            ObjectKind::Blob.as_str(),
                            block.kind().as_str(),
                        )
                    })?;

                    if bytes.len() as u64 != link.size {
                        return Err(Error::corrupted_object(
                            link.hash.to_hex(),
                            format!(
                                "Block size mismatch: link says {}, block has {}",
                                link.size,
                                bytes.len()
                            ),
                        ));
                    }
                    data.extend_from_slice(bytes);
                }
                Ok(data)
            }
            ObjectKind::Tree => Err(Error::invalid_object_type(
                "blob or list",
                ObjectKind::Tree.as_str(),
            )),
        }
    }

    /// List a tree's entries in stored order.
    pub fn read_dir(&mut self, hash: &Hash) -> Result<Vec<(TypeTag, Link)>> {
        let object = self.get_object(hash)?;

        if object.kind() != ObjectKind::Tree {
            return Err(Error::invalid_object_type(
                ObjectKind::Tree.as_str(),
                object.kind().as_str(),
            ));
        }

        Ok(object
            .entries()
            .into_iter()
            .map(|(tag, link)| (tag, link.clone()))
            .collect())
    }

    /// Write an object back to the filesystem.
    ///
    /// Blobs and lists become a file at `dest`, trees a directory.
    pub fn materialize(&mut self, hash: &Hash, dest: &Path) -> Result<()> {
        if dest.exists() {
            return Err(Error::path_exists(dest));
        }

        let kind = self.get_object(hash)?.kind();
        self.materialize_as(kind.tag(), hash, dest)
    }

    fn materialize_as(&mut self, tag: TypeTag, hash: &Hash, dest: &Path) -> Result<()> {
        match tag {
            TypeTag::Blob | TypeTag::List => {
                let data = self.read_file(hash)?;
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(dest, data)?;
            }
            TypeTag::Tree => {
                fs::create_dir_all(dest)?;
                for (tag, link) in self.read_dir(hash)? {
                    self.materialize_as(tag, &link.hash, &dest.join(&link.name))?;
                }
            }
        }
        Ok(())
    }
}
