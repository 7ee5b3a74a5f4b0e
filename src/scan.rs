//! Finding files on disk, and indexing the tar archives among them.
//!
//! Scanning an archive reads only its headers, seeking over every member
//! body. Nothing found in an archive reaches the shared index until the
//! whole archive has been read without error, so a corrupt archive
//! contributes nothing, and links always see every file in their archive
//! regardless of header order.

use crate::*;
use crate::index::{ArchiveInfo, FileEntry};
use crate::path::{localize, make_dir, resolve_link, simplify};
use crate::tar::{BLOCK_LEN, EntryKind, TarHeader, padded, read_block};

use std::{
    collections::{BTreeMap, btree_map::Entry},
    fs,
    fs::File,
    io::BufReader,
    path::{Path as StdPath, PathBuf as StdPathBuf},
    sync::Arc,
};
use once_cell::sync::Lazy;
use regex::Regex;

/// How adding one archive went, if it didn't fail outright.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum ScanOutcome {
    /// The archive was read and indexed. `new_files` counts names that were
    /// not already known from other archives.
    Added { new_files: usize },
    /// This exact archive path was already indexed; nothing was done.
    AlreadyIndexed,
}

/// Reads the headers of the tar file at `path` and adds its members to
/// `index`.
pub fn scan_archive(index: &mut TarIndex, path: &StdPath)
                    -> Result<ScanOutcome, FsError> {
    if index.contains_archive(path) {
        return Ok(ScanOutcome::AlreadyIndexed)
    }
    // Failing to open is common and harmless (no read permission, say).
    let file = File::open(path)?;
    let archive: Arc<StdPath> = Arc::from(path);
    let mut input = BufReader::new(file);
    let mut staged_files: Vec<(String, FileEntry)> = Vec::new();
    // simplified link name -> (link name as stored, resolved target)
    let mut staged_links: BTreeMap<String, (String, String)> = BTreeMap::new();
    let mut first_dir: Option<String> = None;
    let mut block = [0u8; BLOCK_LEN];
    let mut pos: u64 = 0;
    while read_block(&mut input, &mut block)? {
        pos += BLOCK_LEN as u64;
        let header = TarHeader::decode(block).map_err(|reason| {
            log::warn!("The file {:?} isn't a valid tar file", path);
            FsError::ArchiveCorrupt { archive: path.to_owned(), reason }
        })?;
        let size = header.size();
        match header.kind() {
            EntryKind::Regular => {
                let name = header.name();
                // Empty files have nothing to open, and the zero blocks at
                // the end of an archive end up here too.
                if size > 0 && !name.is_empty() {
                    let key = simplify(&name);
                    log::trace!("Found file in tar: {} ({} bytes, {} offset)",
                                key, size, pos);
                    staged_files.push((key, FileEntry {
                        archive: archive.clone(), name: localize(&name),
                        offset: pos, size,
                    }));
                }
            },
            kind if kind.is_link() => {
                let raw_name = header.name();
                let name = simplify(&raw_name);
                let target = simplify(&header.link_name());
                match resolve_link(&name, &target) {
                    Ok(dest) => {
                        log::trace!("Found link in tar: {} -> {}", name, dest);
                        if let Entry::Vacant(x) = staged_links.entry(name) {
                            x.insert((raw_name.into_owned(), dest));
                        }
                    },
                    Err(x) => log::warn!("Ignoring link in tar {:?}: \
                                          {:?} -> {:?}: {}",
                                         path, name, target, x),
                }
            },
            EntryKind::Directory => {
                let name = make_dir(localize(&header.name()));
                log::trace!("Found dir in tar: {}", name);
                if first_dir.is_none() && !name.is_empty() {
                    first_dir = Some(name);
                }
            },
            _ => (),
        }
        let skip = padded(size);
        let skip = i64::try_from(skip).map_err(|_| {
            log::warn!("The file {:?} can't be read as a tar file", path);
            FsError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData,
                                            "member too large to skip"))
        })?;
        if let Err(x) = input.seek_relative(skip) {
            log::warn!("The file {:?} can't be read as a tar file", path);
            return Err(x.into())
        }
        pos += skip as u64;
    }
    let mut new_files = 0;
    for (name, entry) in staged_files {
        if index.insert_file(name, entry) { new_files += 1 }
    }
    // Links are only added after all the files, so that whether a link
    // points to a file or a directory doesn't depend on header order.
    for (source, dest) in staged_links.values() {
        index.add_link(source, dest);
    }
    index.insert_archive(ArchiveInfo { path: archive, first_dir });
    log::debug!("Found tar {:?} with {} new files", path, new_files);
    Ok(ScanOutcome::Added { new_files })
}

impl TarIndex {
    /// Indexes one archive. See [`scan_archive`](fn.scan_archive.html).
    pub fn add_archive(&mut self, path: &StdPath)
                       -> Result<ScanOutcome, FsError> {
        scan_archive(self, path)
    }
}

/// Something that wants to hear about files found while walking
/// directories.
pub trait FileScanner {
    /// Called for every file with a matching extension.
    ///
    /// Takes: the file's path; how many bytes at the start of that path are
    /// the directory being scanned; and, for archive members, the archive.
    ///
    /// Returns: true if the file was accepted (and should be counted).
    fn add_file(&mut self, path: &StdPath, basepath_length: usize,
                archive: Option<&StdPath>) -> bool;
}

/// Checks a filename's extension, ignoring case. `None` matches everything.
pub fn matches_extension(extension: Option<&str>, filename: &StdPath) -> bool {
    let extension = match extension {
        None => return true,
        Some(x) => x.strip_prefix('.').unwrap_or(x),
    };
    filename.extension().and_then(|x| x.to_str())
        .map(|x| x.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Walks `path`, offering every regular file with a matching extension to
/// `scanner`. Returns the number of files the scanner accepted. Unreadable
/// directories count as empty.
pub fn scan_path(scanner: &mut dyn FileScanner, extension: Option<&str>,
                 path: &StdPath, basepath_length: usize, recursive: bool)
                 -> usize {
    let dir = match fs::read_dir(path) {
        Ok(x) => x,
        Err(_) => return 0,
    };
    let mut entries: Vec<StdPathBuf> = dir
        .filter_map(|entry| entry.ok().map(|x| x.path()))
        .collect();
    // read_dir order is up to the OS; make the scan order reproducible.
    entries.sort();
    let mut num = 0;
    for entry in entries {
        let metadata = match fs::metadata(&entry) {
            Ok(x) => x,
            Err(_) => continue,
        };
        if metadata.is_dir() {
            if recursive {
                num += scan_path(scanner, extension, &entry,
                                 basepath_length, recursive);
            }
        }
        else if metadata.is_file() && matches_extension(extension, &entry)
            && scanner.add_file(&entry, basepath_length, None) {
            num += 1;
        }
    }
    num
}

static TAR_EXTENSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\.tar$"#)
        .unwrap()
});

/// Whether a file looks like a tar archive, by name.
pub fn is_tar_name(path: &StdPath) -> bool {
    path.file_name().and_then(|x| x.to_str())
        .map(|x| TAR_EXTENSION_PATTERN.is_match(x))
        .unwrap_or(false)
}

/// Feeds every tar file found to one archive index.
pub struct TarScanner<'a> {
    index: &'a mut TarIndex,
}

impl<'a> TarScanner<'a> {
    pub fn new(index: &'a mut TarIndex) -> TarScanner<'a> {
        TarScanner { index }
    }
}

impl FileScanner for TarScanner<'_> {
    fn add_file(&mut self, path: &StdPath, _basepath_length: usize,
                archive: Option<&StdPath>) -> bool {
        // No tars within tars.
        if archive.is_some() || !is_tar_name(path) { return false }
        match self.index.add_archive(path) {
            Ok(ScanOutcome::Added { .. }) => true,
            Ok(ScanOutcome::AlreadyIndexed) => false,
            Err(FsError::ArchiveCorrupt { .. }) => false,
            Err(x) => {
                log::debug!("Couldn't scan {:?}: {}", path, x);
                false
            },
        }
    }
}

bitflags::bitflags! {
    /// Which groups of categories a tar rescan covers.
    #[derive(Debug,Clone,Copy,PartialEq,Eq,Hash)]
    pub struct TarScanMode: u8 {
        const BASESET = 1 << 0;
        const NEWGRF = 1 << 1;
        const AI = 1 << 2;
        const GAME = 1 << 3;
        const SCENARIO = 1 << 4;
        const ALL = Self::BASESET.bits() | Self::NEWGRF.bits()
            | Self::AI.bits() | Self::GAME.bits() | Self::SCENARIO.bits();
    }
}

impl TarScanMode {
    /// The categories this mode rescans, in scan order.
    pub fn categories(self) -> Vec<Category> {
        const GROUPS: &[(TarScanMode, &[Category])] = &[
            (TarScanMode::BASESET, &[Category::Baseset]),
            (TarScanMode::NEWGRF, &[Category::Newgrf]),
            (TarScanMode::AI, &[Category::Ai, Category::AiLibrary]),
            (TarScanMode::GAME, &[Category::Game, Category::GameLibrary]),
            (TarScanMode::SCENARIO, &[Category::Scenario, Category::Heightmap]),
        ];
        GROUPS.iter().filter(|(mode, _)| self.contains(*mode))
            .flat_map(|(_, categories)| categories.iter().copied())
            .collect()
    }
}
