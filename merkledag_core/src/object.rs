//! DAG objects and their binary encoding.
//!
//! Every object is encoded with a 16-byte header followed by its links and
//! its data field:
//!
//! ```text
//! 0x00  4   "MDAG" magic
//! 0x04  1   version (u8) = 1
//! 0x05  1   kind: 1=blob, 2=list, 3=tree
//! 0x06  2   reserved (must be 0)
//! 0x08  4   link_count (u32 LE)
//! 0x0c  4   data_len (u32 LE)
//! 0x10  ... links
//! ...   ... data
//! ```
//!
//! Each link is a 32-byte hash, the logical size (u64 LE), a one-byte name
//! length and the UTF-8 name. The data field holds the raw bytes of a blob,
//! or for lists and trees the 4-byte type tag of every link, concatenated.

use crate::error::{Error, Result};
use crate::hash::{HASH_SIZE, Hash};

/// Magic bytes at the start of every encoded object.
pub const MAGIC: &[u8; 4] = b"MDAG";

/// Current object format version.
pub const VERSION: u8 = 1;

/// Size of the object header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Length of every type tag in the data field.
pub const TAG_LEN: usize = 4;

/// Maximum length of a directory entry name in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// The kind of object a link resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    /// Raw content held directly.
    Blob,
    /// Content split into blocks; links point to blobs.
    List,
    /// A directory; links point to files and subdirectories.
    Tree,
}

impl TypeTag {
    /// The 4-byte tag as written into a data field.
    pub fn as_bytes(&self) -> &'static [u8; TAG_LEN] {
        match self {
            TypeTag::Blob => b"blob",
            TypeTag::List => b"list",
            TypeTag::Tree => b"tree",
        }
    }

    /// Get the string name of this tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Blob => "blob",
            TypeTag::List => "list",
            TypeTag::Tree => "tree",
        }
    }

    /// Parse a tag from its 4-byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            b"blob" => Ok(TypeTag::Blob),
            b"list" => Ok(TypeTag::List),
            b"tree" => Ok(TypeTag::Tree),
            _ => Err(Error::invalid_object(format!(
                "Unknown type tag: {:?}",
                String::from_utf8_lossy(bytes)
            ))),
        }
    }

    /// Split a concatenated tags payload back into tags.
    pub fn parse_all(data: &[u8]) -> Result<Vec<Self>> {
        if !data.len().is_multiple_of(TAG_LEN) {
            return Err(Error::invalid_object(format!(
                "Tags payload size {} is not a multiple of {}",
                data.len(),
                TAG_LEN
            )));
        }
        data.chunks_exact(TAG_LEN).map(TypeTag::from_bytes).collect()
    }
}

/// Object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Raw content (a whole small file or a single block).
    Blob = 1,
    /// A file split into blocks.
    List = 2,
    /// A directory listing.
    Tree = 3,
}

impl ObjectKind {
    /// Convert to byte representation.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse from byte representation.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ObjectKind::Blob),
            2 => Ok(ObjectKind::List),
            3 => Ok(ObjectKind::Tree),
            _ => Err(Error::invalid_object(format!(
                "Invalid object kind: {}",
                value
            ))),
        }
    }

    /// The type tag a parent records for an object of this kind.
    pub fn tag(self) -> TypeTag {
        match self {
            ObjectKind::Blob => TypeTag::Blob,
            ObjectKind::List => TypeTag::List,
            ObjectKind::Tree => TypeTag::Tree,
        }
    }

    /// Get the string name of this kind.
    pub fn as_str(&self) -> &'static str {
        self.tag().as_str()
    }
}

/// A reference from a parent object to an already persisted child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Entry name; empty for chunk links.
    pub name: String,
    /// Address of the child object.
    pub hash: Hash,
    /// Logical byte size of the content behind the link.
    pub size: u64,
}

impl Link {
    /// An anonymous link to a block of a split file.
    pub fn chunk(hash: Hash, size: u64) -> Self {
        Self {
            name: String::new(),
            hash,
            size,
        }
    }

    /// A named directory entry.
    pub fn entry(name: impl Into<String>, hash: Hash, size: u64) -> Result<Self> {
        let name = name.into();
        validate_entry_name(&name)?;
        Ok(Self { name, hash, size })
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.hash.as_bytes());
        buf.extend_from_slice(&self.size.to_le_bytes());
        // Names are validated to at most 255 bytes when links are built.
        buf.push(self.name.len() as u8);
        buf.extend_from_slice(self.name.as_bytes());
    }
}

/// Check that a directory entry name is usable as a single path component.
pub fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_link("Name cannot be empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_link(format!(
            "Name too long: {} bytes (max {})",
            name.len(),
            MAX_NAME_LEN
        )));
    }

    if name.contains('\0') {
        return Err(Error::invalid_link("Name cannot contain null bytes"));
    }

    if name.contains('/') || name == "." || name == ".." {
        return Err(Error::invalid_link(format!(
            "Name is not a single path component: {}",
            name
        )));
    }

    Ok(())
}

/// The data field of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Raw leaf content.
    Raw(Vec<u8>),
    /// One type tag per link.
    Tags(Vec<TypeTag>),
}

/// A DAG node: ordered links plus a payload, selected by an explicit kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    kind: ObjectKind,
    links: Vec<Link>,
    payload: Payload,
}

impl Object {
    /// A blob holding `data` directly.
    pub fn blob(data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: ObjectKind::Blob,
            links: Vec::new(),
            payload: Payload::Raw(data.into()),
        }
    }

    /// An empty list; chunks are added with [`Object::push_chunk`].
    pub fn list() -> Self {
        Self {
            kind: ObjectKind::List,
            links: Vec::new(),
            payload: Payload::Tags(Vec::new()),
        }
    }

    /// An empty tree; entries are added with [`Object::push_entry`].
    pub fn tree() -> Self {
        Self {
            kind: ObjectKind::Tree,
            links: Vec::new(),
            payload: Payload::Tags(Vec::new()),
        }
    }

    /// Append a block link to a list.
    pub fn push_chunk(&mut self, hash: Hash, size: u64) -> Result<()> {
        self.push(ObjectKind::List, TypeTag::Blob, Link::chunk(hash, size))
    }

    /// Append a named entry to a tree.
    pub fn push_entry(&mut self, tag: TypeTag, link: Link) -> Result<()> {
        validate_entry_name(&link.name)?;
        self.push(ObjectKind::Tree, tag, link)
    }

    fn push(&mut self, expected: ObjectKind, tag: TypeTag, link: Link) -> Result<()> {
        if self.kind != expected {
            return Err(Error::invalid_object_type(expected.as_str(), self.kind.as_str()));
        }
        if let Payload::Tags(tags) = &mut self.payload {
            tags.push(tag);
        }
        self.links.push(link);
        Ok(())
    }

    /// The object kind.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The ordered links.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Raw content of a blob, `None` for lists and trees.
    pub fn raw(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Raw(data) => Some(data),
            Payload::Tags(_) => None,
        }
    }

    /// Each link paired with the tag describing what it points to.
    ///
    /// Empty for blobs.
    pub fn entries(&self) -> Vec<(TypeTag, &Link)> {
        match &self.payload {
            Payload::Raw(_) => Vec::new(),
            Payload::Tags(tags) => tags.iter().copied().zip(self.links.iter()).collect(),
        }
    }

    /// The bytes of the serialized data field.
    pub fn data_bytes(&self) -> Vec<u8> {
        match &self.payload {
            Payload::Raw(data) => data.clone(),
            Payload::Tags(tags) => tags.iter().flat_map(|t| t.as_bytes().iter().copied()).collect(),
        }
    }

    /// Encode the object to its canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        let data = self.data_bytes();
        let links_len: usize = self
            .links
            .iter()
            .map(|l| HASH_SIZE + 8 + 1 + l.name.len())
            .sum();

        let mut buf = Vec::with_capacity(HEADER_SIZE + links_len + data.len());

        // Magic (4 bytes)
        buf.extend_from_slice(MAGIC);

        // Version and kind (1 byte each)
        buf.push(VERSION);
        buf.push(self.kind.to_u8());

        // Reserved (2 bytes)
        buf.extend_from_slice(&[0, 0]);

        // Counts (u32 LE each)
        buf.extend_from_slice(&(self.links.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(data.len() as u32).to_le_bytes());

        for link in &self.links {
            link.encode_into(&mut buf);
        }

        buf.extend_from_slice(&data);
        buf
    }

    /// Decode an object, rejecting anything [`Object::encode`] would not produce.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::invalid_object(format!(
                "Header too short: {} bytes (expected {})",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(Error::invalid_object(format!(
                "Invalid magic: expected {:?}, got {:?}",
                MAGIC,
                &bytes[0..4]
            )));
        }

        if bytes[4] != VERSION {
            return Err(Error::invalid_object(format!(
                "Unsupported version: {} (expected {})",
                bytes[4], VERSION
            )));
        }

        let kind = ObjectKind::from_u8(bytes[5])?;

        if bytes[6] != 0 || bytes[7] != 0 {
            return Err(Error::invalid_object("Reserved bytes must be 0"));
        }

        let link_count = read_u32(&bytes[8..12]) as usize;
        let data_len = read_u32(&bytes[12..16]) as usize;

        let mut reader = Reader::new(&bytes[HEADER_SIZE..]);
        let mut links = Vec::with_capacity(link_count.min(1024));
        for _ in 0..link_count {
            let hash_bytes: [u8; HASH_SIZE] = reader
                .take(HASH_SIZE)?
                .try_into()
                .map_err(|_| Error::invalid_object("Failed to parse link hash"))?;
            let size = u64::from_le_bytes(
                reader
                    .take(8)?
                    .try_into()
                    .map_err(|_| Error::invalid_object("Failed to parse link size"))?,
            );
            let name_len = reader.take(1)?[0] as usize;
            let name = std::str::from_utf8(reader.take(name_len)?)
                .map_err(|e| Error::invalid_object(format!("Invalid UTF-8 in name: {}", e)))?
                .to_string();
            links.push(Link {
                name,
                hash: Hash::from_bytes(hash_bytes),
                size,
            });
        }

        let data = reader.take(data_len)?;
        if !reader.is_empty() {
            return Err(Error::invalid_object(format!(
                "{} trailing bytes after data",
                reader.remaining()
            )));
        }

        let payload = match kind {
            ObjectKind::Blob => {
                if !links.is_empty() {
                    return Err(Error::invalid_object("Blob objects cannot have links"));
                }
                Payload::Raw(data.to_vec())
            }
            ObjectKind::List | ObjectKind::Tree => {
                let tags = TypeTag::parse_all(data)?;
                if tags.len() != links.len() {
                    return Err(Error::invalid_object(format!(
                        "{} tags for {} links",
                        tags.len(),
                        links.len()
                    )));
                }
                Payload::Tags(tags)
            }
        };

        let object = Self {
            kind,
            links,
            payload,
        };
        object.validate()?;
        Ok(object)
    }

    /// Check the kind-specific shape of links and tags.
    fn validate(&self) -> Result<()> {
        match self.kind {
            ObjectKind::Blob => Ok(()),
            ObjectKind::List => {
                for (tag, link) in self.entries() {
                    if tag != TypeTag::Blob {
                        return Err(Error::invalid_object(format!(
                            "List entries must be blobs, got {}",
                            tag.as_str()
                        )));
                    }
                    if !link.name.is_empty() {
                        return Err(Error::invalid_object("Chunk links must be unnamed"));
                    }
                }
                Ok(())
            }
            ObjectKind::Tree => {
                for link in &self.links {
                    validate_entry_name(&link.name)?;
                }
                Ok(())
            }
        }
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

/// Bounds-checked cursor over a byte slice.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::invalid_object(format!(
                "Truncated object: need {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}
