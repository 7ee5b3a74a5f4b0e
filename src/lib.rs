//! This is the file layer for a game that keeps its data in a handful of
//! well-known directories, some of it packed into tar archives. It finds a
//! file by name wherever it happens to live, and hands back a plain
//! `std::fs::File` positioned at the right place.
//!
//! Everything here is synchronous and uses plain `std::io`.
//!
//! # Overview
//!
//! A [`FileSystem`](struct.FileSystem.html) is built from a set of
//! [`SearchPaths`](struct.SearchPaths.html): the installation directory, the
//! user's personal directory, the working directory, and so on, in a fixed
//! priority order. Files are looked up by name within a
//! [`Category`](enum.Category.html), which picks a subdirectory under each
//! search path (`lang/`, `save/`, `ai/library/`...).
//!
//! ## Lookup order
//!
//! For `open_file("english.lng", OpenMode::Read, Category::Lang)`:
//!
//! 1. `<search path>/lang/english.lng` for each search path, highest priority
//!    first. If that doesn't exist, the same name lowercased (except on
//!    Windows).
//! 2. Members of the tar archives found under any `lang/` directory during
//!    the last scan.
//! 3. For a couple of categories, the same again in the directory that
//!    category used to live in.
//! 4. If the name has a directory part, the name as a path by itself.
//!
//! A plain file always wins over an archive member, no matter which search
//! path either one is under.
//!
//! ## Archives
//!
//! [`FileSystem::scan_archives`](struct.FileSystem.html#method.scan_archives)
//! reads the headers of every `.tar` under the chosen categories' directories
//! and indexes the members. Member names are matched case-insensitively.
//! Symbolic and hard links inside an archive are honored, with two limits:
//! a link may not leave the archive, and a lookup follows at most one
//! directory link. An archive with a bad header is skipped whole.
//!
//! Opening an archive member opens the archive itself, seeked to the start of
//! the member. Reading past the member's size reads whatever comes next in
//! the archive; use
//! [`OpenedFile::into_bounded`](struct.OpenedFile.html#method.into_bounded)
//! if that matters.
//!
//! ## Names
//!
//! Names use `/` or the platform separator. Inside the archive index every
//! name is lowercased, uses the platform separator, and is Unicode
//! normalized (NFD), so that archives made on systems that decompose accents
//! still match. See the [`path`](path/index.html) module.

mod error;
pub use error::FsError;

mod category;
pub use category::Category;

pub mod path;
pub use path::{LinkError, sanitize_filename};

pub mod tar;
pub use tar::{EntryKind, TarHeader, TarHeaderError};

mod index;
pub use index::{ArchiveInfo, FileEntry, TarIndex};

mod open;
pub use open::{OpenMode, OpenedFile, Origin, open_archive_member, open_plain,
               read_file_to_mem};

mod searchpath;
pub use searchpath::{SearchPaths, SearchRoot, SearchSlot,
                     should_use_working_dir};
#[cfg(feature = "stdpaths")]
pub use searchpath::StandardPaths;

mod scan;
pub use scan::{FileScanner, ScanOutcome, TarScanMode, TarScanner,
               is_tar_name, matches_extension, scan_archive};

mod fio;
pub use fio::FileSystem;

mod slots;
pub use slots::{FileSlots, MAX_FILE_SLOTS};

#[cfg(test)]
mod testutil;
