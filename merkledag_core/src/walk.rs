//! Filesystem walking into a source tree.

use crate::error::{Error, Result};
use crate::node::{Dir, File, Node};
use std::fs;
use std::path::Path;

impl Node {
    /// Read a file or directory from disk.
    ///
    /// Files become [`Node::File`] with their full content. Directories become
    /// [`Node::Dir`] with their immediate entries (recursively), ordered by file
    /// name. `.gitignore` rules are honoured whether or not the tree is inside
    /// a git repository, hidden files are included except for `.git`, and
    /// symlinks and special files (FIFOs, sockets, devices) are rejected.
    pub fn from_path(path: &Path) -> Result<Node> {
        if !path.exists() {
            return Err(Error::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Path does not exist: {}", path.display()),
                ),
            });
        }

        let metadata = fs::symlink_metadata(path)?;
        let name = entry_name(path)?;

        read_entry(path, &metadata, name)
    }
}

/// Turn one file-system entry into a node.
fn read_entry(path: &Path, metadata: &fs::Metadata, name: String) -> Result<Node> {
    if metadata.is_file() {
        Ok(Node::File(File::new(name, fs::read(path)?)))
    } else if metadata.is_dir() {
        Ok(Node::Dir(read_directory(path, name)?))
    } else {
        Err(Error::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("Unsupported file type: {}", path.display()),
            ),
        })
    }
}

/// Read a directory's children recursively.
fn read_directory(path: &Path, name: String) -> Result<Dir> {
    let mut children = Vec::new();

    // .gitignore applies outside git repositories too; the user's global
    // excludes do not, so the same tree hashes the same on every machine.
    let walker = ignore::WalkBuilder::new(path)
        .max_depth(Some(1)) // Only immediate children
        .hidden(false) // Include hidden files
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .require_git(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker {
        let entry = entry?;
        let entry_path = entry.path();

        // Skip the directory itself
        if entry_path == path {
            continue;
        }

        let metadata = fs::symlink_metadata(entry_path)?;
        if metadata.is_symlink() {
            return Err(Error::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    format!("Symlinks not supported: {}", entry_path.display()),
                ),
            });
        }

        let file_name = entry_name(entry_path)?;
        children.push(read_entry(entry_path, &metadata, file_name)?);
    }

    Ok(Dir::new(name, children))
}

/// The final path component as UTF-8.
fn entry_name(path: &Path) -> Result<String> {
    // Paths like "." have no file name; fall back to the canonical form.
    let resolved;
    let path = if path.file_name().is_none() {
        resolved = fs::canonicalize(path)?;
        resolved.as_path()
    } else {
        path
    };

    Ok(path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::invalid_link(format!("Invalid filename: {}", path.display())))?
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("test.txt");
        fs::write(&test_file, b"hello world").unwrap();

        let node = Node::from_path(&test_file).unwrap();
        assert_eq!(node, Node::File(File::new("test.txt", b"hello world".to_vec())));
    }

    #[test]
    fn test_nested_directories_sorted_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("parent");
        fs::create_dir(&test_dir).unwrap();
        fs::write(test_dir.join("b.txt"), b"bb").unwrap();
        fs::write(test_dir.join("a.txt"), b"a").unwrap();
        let sub_dir = test_dir.join("subdir");
        fs::create_dir(&sub_dir).unwrap();
        fs::write(sub_dir.join("sub_file.txt"), b"sub").unwrap();

        let Node::Dir(dir) = Node::from_path(&test_dir).unwrap() else {
            panic!("expected a directory");
        };
        assert_eq!(dir.name(), "parent");
        assert_eq!(dir.size(), 6);

        let names: Vec<&str> = dir.iter().map(Node::name).collect();
        assert_eq!(names, ["a.txt", "b.txt", "subdir"]);

        let Some(Node::Dir(sub)) = dir.iter().nth(2) else {
            panic!("expected subdir");
        };
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.size(), 3);
    }

    #[test]
    fn test_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("empty_dir");
        fs::create_dir(&test_dir).unwrap();

        let Node::Dir(dir) = Node::from_path(&test_dir).unwrap() else {
            panic!("expected a directory");
        };
        assert!(dir.is_empty());
        assert_eq!(dir.size(), 0);
    }

    #[test]
    fn test_nonexistent_path() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Node::from_path(&temp_dir.path().join("nonexistent")).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_symlink_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("dir");
        fs::create_dir(&test_dir).unwrap();
        fs::write(test_dir.join("target"), b"x").unwrap();
        std::os::unix::fs::symlink(test_dir.join("target"), test_dir.join("link")).unwrap();

        assert!(Node::from_path(&test_dir).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_special_file_rejected_at_any_depth() {
        let temp_dir = TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("dir");
        fs::create_dir(&test_dir).unwrap();
        fs::write(test_dir.join("plain.txt"), b"x").unwrap();
        let socket = test_dir.join("sock");
        let _listener = std::os::unix::net::UnixListener::bind(&socket).unwrap();

        let err = Node::from_path(&test_dir).unwrap_err();
        assert!(matches!(
            err,
            Error::Io { ref source } if source.kind() == std::io::ErrorKind::Unsupported
        ));

        let err = Node::from_path(&socket).unwrap_err();
        assert!(matches!(
            err,
            Error::Io { ref source } if source.kind() == std::io::ErrorKind::Unsupported
        ));
    }

    #[test]
    fn test_gitignore_honoured_without_repository() {
        let temp_dir = TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("plain");
        fs::create_dir_all(test_dir.join("sub")).unwrap();
        fs::write(test_dir.join(".gitignore"), b"secret.txt\n*.log\n").unwrap();
        fs::write(test_dir.join("secret.txt"), b"hidden").unwrap();
        fs::write(test_dir.join("keep.txt"), b"kept").unwrap();
        fs::write(test_dir.join("sub/debug.log"), b"noise").unwrap();
        fs::write(test_dir.join("sub/notes.txt"), b"notes").unwrap();

        let Node::Dir(dir) = Node::from_path(&test_dir).unwrap() else {
            panic!("expected a directory");
        };
        let names: Vec<&str> = dir.iter().map(Node::name).collect();
        assert_eq!(names, [".gitignore", "keep.txt", "sub"]);

        let Some(Node::Dir(sub)) = dir.iter().nth(2) else {
            panic!("expected sub");
        };
        let sub_names: Vec<&str> = sub.iter().map(Node::name).collect();
        assert_eq!(sub_names, ["notes.txt"]);
    }

    #[test]
    fn test_git_directory_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let test_dir = temp_dir.path().join("repo");
        fs::create_dir_all(test_dir.join(".git/objects")).unwrap();
        fs::write(test_dir.join(".git/HEAD"), b"ref: refs/heads/main\n").unwrap();
        fs::write(test_dir.join(".gitignore"), b"build/\n").unwrap();
        fs::create_dir(test_dir.join("build")).unwrap();
        fs::write(test_dir.join("build/out.bin"), b"artifact").unwrap();
        fs::write(test_dir.join("src.txt"), b"source").unwrap();

        let Node::Dir(dir) = Node::from_path(&test_dir).unwrap() else {
            panic!("expected a directory");
        };
        let names: Vec<&str> = dir.iter().map(Node::name).collect();
        assert_eq!(names, [".gitignore", "src.txt"]);
    }
}
