//! Case-insensitive filename tree.
//!
//! Root manifests come in several product-specific binary formats; a
//! platform decoder (behind [`RootParser`]) turns whichever format is in
//! use into a flat `path → file` map, and the tree built here serves
//! lookups and directory listings over it. Comparison folds ASCII to
//! lowercase while listings preserve the original casing.

use std::collections::HashMap;
use std::collections::hash_map;

use sleet_types::{ContentHash, FilenameMapper};

use crate::error::{Error, Result};

/// Metadata for one file in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub content_hash: ContentHash,
    pub size: u32,
    pub locale_flags: u32,
    pub file_id: u32,
}

/// Flat manifest contents: path → file metadata.
pub type FileList = HashMap<String, FileMeta>;

/// Decodes a product's root manifest into a flat file list.
///
/// The manifest formats themselves are platform-specific and opaque to
/// this crate.
pub trait RootParser: Send + Sync {
    fn file_list(&self, data: &[u8]) -> Result<FileList>;
}

/// A node of the tree: a subdirectory or a file.
#[derive(Debug)]
pub enum Node {
    Directory(Directory),
    File(FileMeta),
}

/// A named directory entry, with the original casing preserved.
#[derive(Debug)]
pub struct DirEntry {
    pub name: String,
    pub node: Node,
    /// ASCII-lowercase name, the binary search key.
    folded: String,
}

/// A directory: children sorted by case-folded name.
#[derive(Debug, Default)]
pub struct Directory {
    children: Vec<DirEntry>,
}

impl Directory {
    /// Children in case-folded name order.
    pub fn entries(&self) -> &[DirEntry] {
        &self.children
    }

    fn find(&self, folded: &str) -> Option<&DirEntry> {
        self.children
            .binary_search_by(|e| e.folded.as_str().cmp(folded))
            .ok()
            .map(|i| &self.children[i])
    }
}

/// The result of a lookup: a directory listing or a file.
#[derive(Debug)]
pub enum Entry<'a> {
    Directory(&'a Directory),
    File(&'a FileMeta),
}

/// Case-insensitive hierarchical index from paths to content hashes.
#[derive(Debug)]
pub struct FilenameTree {
    root: Directory,
}

impl FilenameTree {
    /// Build a tree from a flat manifest.
    ///
    /// Paths are normalized (repeated and leading `/` dropped). A file
    /// whose name collides with a directory is a [`Error::FileDirClash`];
    /// two files with the same case-folded path are a
    /// [`Error::DuplicateEntry`].
    pub fn build(files: FileList) -> Result<Self> {
        let mut root = BuildDir::default();

        for (path, meta) in files {
            let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            let Some((file_name, dirs)) = segments.split_last() else {
                return Err(Error::EmptyFilename);
            };

            let mut dir = &mut root;
            for segment in dirs {
                dir = dir.subdir(segment).ok_or_else(|| Error::FileDirClash {
                    path: path.clone(),
                })?;
            }

            match dir.children.entry(fold(file_name)) {
                hash_map::Entry::Occupied(existing) => {
                    return Err(match existing.get().1 {
                        BuildNode::Dir(_) => Error::FileDirClash { path: path.clone() },
                        BuildNode::File(_) => Error::DuplicateEntry { path: path.clone() },
                    });
                }
                hash_map::Entry::Vacant(slot) => {
                    slot.insert((file_name.to_string(), BuildNode::File(meta)));
                }
            }
        }

        Ok(Self {
            root: root.flatten(),
        })
    }

    /// Look up a `/`-separated path.
    pub fn get(&self, path: &str) -> Result<Entry<'_>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let mut dir = &self.root;
        for (depth, segment) in segments.iter().enumerate() {
            let entry = dir.find(&fold(segment)).ok_or_else(|| Error::NotFound {
                path: path.to_string(),
            })?;

            if depth + 1 == segments.len() {
                return Ok(match &entry.node {
                    Node::Directory(d) => Entry::Directory(d),
                    Node::File(f) => Entry::File(f),
                });
            }

            match &entry.node {
                Node::Directory(d) => dir = d,
                Node::File(_) => {
                    return Err(Error::NotADirectory {
                        path: path.to_string(),
                    });
                }
            }
        }

        // Empty path: the root listing.
        Ok(Entry::Directory(dir))
    }
}

impl FilenameMapper for FilenameTree {
    fn content_hash(&self, path: &str) -> Option<ContentHash> {
        match self.get(path) {
            Ok(Entry::File(meta)) => Some(meta.content_hash),
            _ => None,
        }
    }
}

/// Comparison key: lowercase-ASCII fold. The manifest domain is ASCII
/// paths; non-ASCII bytes pass through unchanged.
fn fold(s: &str) -> String {
    s.to_ascii_lowercase()
}

/// Mutable tree used during construction, keyed by folded name.
#[derive(Debug, Default)]
struct BuildDir {
    children: HashMap<String, (String, BuildNode)>,
}

#[derive(Debug)]
enum BuildNode {
    Dir(BuildDir),
    File(FileMeta),
}

impl BuildDir {
    /// Descend into (creating if needed) a subdirectory. `None` when a
    /// file already owns the name.
    fn subdir(&mut self, name: &str) -> Option<&mut BuildDir> {
        let slot = self
            .children
            .entry(fold(name))
            .or_insert_with(|| (name.to_string(), BuildNode::Dir(BuildDir::default())));
        match &mut slot.1 {
            BuildNode::Dir(dir) => Some(dir),
            BuildNode::File(_) => None,
        }
    }

    /// Freeze into the sorted, binary-searchable form.
    fn flatten(self) -> Directory {
        let mut children: Vec<DirEntry> = self
            .children
            .into_iter()
            .map(|(folded, (name, node))| DirEntry {
                name,
                folded,
                node: match node {
                    BuildNode::Dir(dir) => Node::Directory(dir.flatten()),
                    BuildNode::File(meta) => Node::File(meta),
                },
            })
            .collect();
        children.sort_unstable_by(|a, b| a.folded.cmp(&b.folded));
        Directory { children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(n: u8) -> FileMeta {
        FileMeta {
            content_hash: ContentHash::new([n; 16]),
            size: u32::from(n) * 100,
            locale_flags: 0,
            file_id: u32::from(n),
        }
    }

    fn tree(paths: &[(&str, u8)]) -> Result<FilenameTree> {
        FilenameTree::build(
            paths
                .iter()
                .map(|&(p, n)| (p.to_string(), meta(n)))
                .collect(),
        )
    }

    #[test]
    fn test_file_lookup_is_case_insensitive() {
        let t = tree(&[("Base/Hero.stormmod", 1), ("Base/Data.xml", 2)]).unwrap();

        match t.get("base/HERO.STORMMOD").unwrap() {
            Entry::File(f) => assert_eq!(*f, meta(1)),
            other => panic!("expected file, got {other:?}"),
        }
        assert_eq!(t.content_hash("base/hero.stormmod"), Some(meta(1).content_hash));
    }

    #[test]
    fn test_listing_preserves_casing_and_sorts() {
        let t = tree(&[("Dir/B.txt", 1), ("Dir/a.txt", 2), ("Dir/C.txt", 3)]).unwrap();

        let Entry::Directory(dir) = t.get("dir").unwrap() else {
            panic!("expected directory");
        };
        let names: Vec<&str> = dir.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "B.txt", "C.txt"]);
    }

    #[test]
    fn test_path_normalization() {
        let t = tree(&[("/deep//nested///file.bin", 7)]).unwrap();
        assert!(t.content_hash("deep/nested/file.bin").is_some());
        assert!(t.content_hash("/deep/nested/file.bin").is_some());
    }

    #[test]
    fn test_missing_segment() {
        let t = tree(&[("a/b.txt", 1)]).unwrap();
        assert!(matches!(
            t.get("a/missing.txt").unwrap_err(),
            Error::NotFound { .. }
        ));
        assert!(matches!(t.get("x/b.txt").unwrap_err(), Error::NotFound { .. }));
    }

    #[test]
    fn test_descending_into_file() {
        let t = tree(&[("a/b.txt", 1)]).unwrap();
        assert!(matches!(
            t.get("a/b.txt/c").unwrap_err(),
            Error::NotADirectory { .. }
        ));
    }

    #[test]
    fn test_file_dir_clash() {
        let result = tree(&[("a/b", 1), ("a/b/c.txt", 2)]);
        assert!(matches!(result.unwrap_err(), Error::FileDirClash { .. }));
    }

    #[test]
    fn test_duplicate_entry_differs_only_by_case() {
        let result = tree(&[("a/File.txt", 1), ("a/file.TXT", 2)]);
        assert!(matches!(result.unwrap_err(), Error::DuplicateEntry { .. }));
    }

    #[test]
    fn test_root_listing() {
        let t = tree(&[("a/b.txt", 1), ("c.txt", 2)]).unwrap();
        let Entry::Directory(root) = t.get("").unwrap() else {
            panic!("expected root directory");
        };
        assert_eq!(root.entries().len(), 2);
    }
}
