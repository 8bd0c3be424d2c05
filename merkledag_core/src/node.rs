//! The source tree walked when building a DAG.

/// A file or directory in the tree being added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A leaf holding its content.
    File(File),
    /// A directory holding ordered children.
    Dir(Dir),
}

impl Node {
    /// The entry name of this node.
    pub fn name(&self) -> &str {
        match self {
            Node::File(file) => file.name(),
            Node::Dir(dir) => dir.name(),
        }
    }

    /// Logical size: byte length for files, declared size for directories.
    pub fn size(&self) -> u64 {
        match self {
            Node::File(file) => file.size(),
            Node::Dir(dir) => dir.size(),
        }
    }
}

impl From<File> for Node {
    fn from(file: File) -> Self {
        Node::File(file)
    }
}

impl From<Dir> for Node {
    fn from(dir: Dir) -> Self {
        Node::Dir(dir)
    }
}

/// A leaf node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    name: String,
    data: Vec<u8>,
}

impl File {
    /// Create a file.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw content.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Logical size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A directory node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dir {
    name: String,
    size: u64,
    children: Vec<Node>,
}

impl Dir {
    /// Create a directory whose declared size is the total size of `children`.
    pub fn new(name: impl Into<String>, children: Vec<Node>) -> Self {
        let size = children.iter().map(Node::size).sum();
        Self {
            name: name.into(),
            size,
            children,
        }
    }

    /// Override the declared size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Children in the order they are stored.
    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.children.iter()
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the directory has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dir {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
