use crate::path::{localize, make_dir, simplify, strip_dir};

use std::{
    collections::{BTreeMap, btree_map::Entry},
    path::{Path as StdPath, PathBuf as StdPathBuf},
    sync::Arc,
};

/// Where one archive member's bytes live.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct FileEntry {
    /// The archive file. Shared by every entry from the same archive.
    pub archive: Arc<StdPath>,
    /// The member's name as stored, lowercased and with platform separators
    /// but otherwise untouched. A file link gets its own name here.
    pub name: String,
    /// Offset of the member body within the archive.
    pub offset: u64,
    /// Length of the member body.
    pub size: u64,
}

/// What we remember about a scanned archive.
#[derive(Debug,Clone,PartialEq,Eq)]
pub struct ArchiveInfo {
    pub path: Arc<StdPath>,
    /// Name of the first directory entry in the archive (with a trailing
    /// separator, lowercased), if there was one. This is the directory
    /// `extract` creates.
    pub first_dir: Option<String>,
}

/// All archive members known for one category.
///
/// Keys in `files` and both sides of `links` are in index form (see
/// [`path::simplify`](path/fn.simplify.html)). `links` only ever maps a
/// directory to a literal directory, so resolving a name never takes more
/// than one step.
#[derive(Debug,Default,Clone,PartialEq,Eq)]
pub struct TarIndex {
    files: BTreeMap<String, FileEntry>,
    links: BTreeMap<String, String>,
    archives: BTreeMap<StdPathBuf, ArchiveInfo>,
}

impl TarIndex {
    pub fn new() -> TarIndex { TarIndex::default() }
    /// Forgets everything. Used at the start of a rescan.
    pub fn clear(&mut self) {
        self.files.clear();
        self.links.clear();
        self.archives.clear();
    }
    pub fn files(&self) -> &BTreeMap<String, FileEntry> { &self.files }
    pub fn links(&self) -> &BTreeMap<String, String> { &self.links }
    pub fn archives(&self) -> &BTreeMap<StdPathBuf, ArchiveInfo> {
        &self.archives
    }
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.links.is_empty()
            && self.archives.is_empty()
    }
    pub fn contains_archive(&self, archive: &StdPath) -> bool {
        self.archives.contains_key(archive)
    }
    pub fn archive(&self, archive: &StdPath) -> Option<&ArchiveInfo> {
        self.archives.get(archive)
    }
    /// Adds a file unless one by that name is already known. The first
    /// archive to provide a name keeps it. Returns true if it was added.
    pub(crate) fn insert_file(&mut self, name: String, entry: FileEntry)
                              -> bool {
        match self.files.entry(name) {
            Entry::Vacant(x) => { x.insert(entry); true },
            Entry::Occupied(_) => false,
        }
    }
    pub(crate) fn insert_archive(&mut self, info: ArchiveInfo) {
        self.archives.insert(info.path.to_path_buf(), info);
    }
    /// Adds a link found in an archive. `source` and `dest` are both
    /// relative to the archive root, and `dest` must already be fully
    /// resolved.
    ///
    /// If `dest` is a known file, `source` becomes another name for it.
    /// Otherwise `dest` is assumed to be a directory, and `source` becomes a
    /// directory link. An empty `dest` is the archive root.
    pub fn add_link(&mut self, source: &str, dest: &str) {
        let name = localize(source);
        let source = simplify(source);
        let dest = simplify(dest);
        if let Some(entry) = self.files.get(&dest).cloned() {
            log::trace!("File link in tar: {} -> {}", source, dest);
            self.insert_file(source, FileEntry { name, ..entry });
        }
        else {
            let source = make_dir(source);
            let dest = make_dir(dest);
            log::trace!("Directory link in tar: {} -> {}", source, dest);
            self.links.entry(source).or_insert(dest);
        }
    }
    /// Applies at most one directory link to `name`, which must be in index
    /// form. The first link (in key order) whose source is a directory
    /// containing `name` wins.
    pub fn resolve_link(&self, name: &str) -> Option<String> {
        self.links.iter().find_map(|(source, dest)| {
            strip_dir(name, source).map(|rest| {
                let mut ret = String::with_capacity(dest.len() + rest.len());
                ret.push_str(dest);
                ret.push_str(rest);
                ret
            })
        })
    }
    /// Finds an archive member by logical name. The name is simplified, one
    /// directory link is applied if any matches, and the result is looked up.
    pub fn find(&self, name: &str) -> Option<&FileEntry> {
        let name = simplify(name);
        match self.resolve_link(&name) {
            Some(resolved) => self.files.get(&resolved),
            None => self.files.get(&name),
        }
    }
    /// Every member belonging to one archive, in name order.
    pub fn members_of<'a>(&'a self, archive: &'a StdPath)
                          -> impl Iterator<Item=(&'a String, &'a FileEntry)> {
        self.files.iter().filter(move |(_, entry)| &*entry.archive == archive)
    }
}
