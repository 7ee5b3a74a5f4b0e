use crate::*;
use crate::open::{open_archive_member, open_with_case_retry};
use crate::path::SEP;
use crate::scan::{matches_extension, scan_path};

use std::{
    fs,
    fs::File,
    io::{ErrorKind, Read, Write},
    path::{Component, Path as StdPath, PathBuf as StdPathBuf},
};

const EXTRACT_BUFFER_LEN: usize = 4096;

/// The search paths plus one archive index per category. Everything that
/// finds, opens or scans game files goes through one of these.
///
/// Scanning needs `&mut self` and lookups need `&self`, so nothing can look
/// things up while a scan is half done.
#[derive(Debug,Clone)]
pub struct FileSystem {
    search_paths: SearchPaths,
    indices: [TarIndex; Category::COUNT],
}

/// Whether a relative name can't climb out of wherever it's joined onto.
fn stays_inside(relative: &StdPath) -> bool {
    relative.components().all(|x| matches!(x, Component::Normal(_)))
}

/// A name counts as a full path if it's absolute or has a directory part.
fn looks_like_full_path(name: &str) -> bool {
    StdPath::new(name).is_absolute() || name.contains('/') || name.contains(SEP)
}

impl FileSystem {
    /// A filesystem over the given search paths. Nothing is indexed until
    /// [`scan_archives`](#method.scan_archives) is called.
    pub fn new(search_paths: SearchPaths) -> FileSystem {
        FileSystem { search_paths, indices: Default::default() }
    }
    /// A filesystem over the standard search paths for this platform.
    #[cfg(feature = "stdpaths")]
    pub fn with_standard_paths(config: &StandardPaths) -> FileSystem {
        FileSystem::new(SearchPaths::standard(config))
    }
    pub fn search_paths(&self) -> &SearchPaths { &self.search_paths }
    /// The archive index for a category. `NoDirectory` has none.
    pub fn index(&self, category: Category) -> Option<&TarIndex> {
        category.index().map(|i| &self.indices[i])
    }
    /// Opens a game file.
    ///
    /// Plain files under each search root come first, in priority order.
    /// Then, for reads only, the category's archives. Then the category's
    /// legacy fallbacks, if any, the same way. Finally, a name with a
    /// directory part is tried again as a path in its own right.
    pub fn open_file(&self, name: &str, mode: OpenMode, category: Category)
                     -> Result<OpenedFile, FsError> {
        if let Some(ret) = self.open_in_category(name, mode, category) {
            return Ok(ret)
        }
        if category != Category::NoDirectory && looks_like_full_path(name) {
            if let Some(ret) = self.open_in_category(name, mode,
                                                     Category::NoDirectory) {
                return Ok(ret)
            }
        }
        Err(FsError::NotFound)
    }
    fn open_in_category(&self, name: &str, mode: OpenMode,
                        category: Category) -> Option<OpenedFile> {
        let suffix = match category.suffix() {
            Some(x) => x,
            None => return match open_with_case_retry(None, name, mode) {
                Ok(x) => Some(x),
                Err(x) => {
                    if !x.is_not_found() {
                        log::debug!("Couldn't open {:?}: {}", name, x);
                    }
                    None
                },
            },
        };
        let relative = format!("{}{}", suffix, name);
        for (slot, base) in self.search_paths.iter() {
            match open_with_case_retry(Some(base), &relative, mode) {
                Ok(x) => return Some(x),
                Err(x) if x.is_not_found() => (),
                Err(x) => log::debug!("Couldn't open {:?} in {} path {:?}: {}",
                                      relative, slot, base, x),
            }
        }
        if mode.is_read() {
            if let Some(entry) = self.index(category)
                .and_then(|index| index.find(name)) {
                match open_archive_member(&entry.archive, entry.offset,
                                          entry.size) {
                    Ok(x) => return Some(x),
                    Err(x) => log::warn!("Couldn't open {:?} in {:?}: {}",
                                         name, entry.archive, x),
                }
            }
        }
        category.legacy_fallbacks().iter().find_map(|&fallback| {
            self.open_in_category(name, mode, fallback)
        })
    }
    /// Whether `name` could be opened for reading.
    pub fn check_file_exists(&self, name: &str, category: Category) -> bool {
        self.open_file(name, OpenMode::Read, category).is_ok()
    }
    /// The first search root where `name` exists as a plain file (or
    /// directory) in `category`'s directory. Archives aren't consulted.
    pub fn find_full_path(&self, category: Category, name: &str)
                          -> Option<StdPathBuf> {
        let relative = format!("{}{}", category.suffix()?, name);
        for (_, base) in self.search_paths.iter() {
            let path = base.join(&relative);
            if path.exists() { return Some(path) }
            if !cfg!(windows) {
                let lower = base.join(relative.to_lowercase());
                if lower.exists() { return Some(lower) }
            }
        }
        None
    }
    /// The first search root's directory for `category` that exists. If none
    /// do, the personal directory, and if there isn't one of those either,
    /// an empty path.
    pub fn directory(&self, category: Category) -> StdPathBuf {
        self.search_paths.category_dirs(category)
            .find(|x| x.exists())
            .or_else(|| self.search_paths.base(SearchSlot::Personal)
                     .map(StdPath::to_owned))
            .unwrap_or_default()
    }
    /// Throws away a category's archive index and rebuilds it from every
    /// `.tar` under the category's directories. Returns the number of
    /// archives indexed.
    pub fn scan_category(&mut self, category: Category) -> usize {
        let i = match category.index() {
            Some(x) => x,
            None => return 0,
        };
        self.indices[i].clear();
        self.scan_category_tars(i, category)
    }
    fn scan_category_tars(&mut self, i: usize, category: Category) -> usize {
        let mut scanner = TarScanner::new(&mut self.indices[i]);
        let mut num = 0;
        for dir in self.search_paths.category_dirs(category) {
            let basepath_length = dir.as_os_str().len();
            // the scanner itself picks out the tars
            num += scan_path(&mut scanner, None, &dir, basepath_length, true);
        }
        log::debug!("Found {} tars for {}", num, category);
        num
    }
    /// Rescans the archives of every category `mode` names. Base sets and
    /// NewGRFs also pick up archives from the old data directory, which is
    /// added to rather than rebuilt. Returns the number of archives indexed.
    pub fn scan_archives(&mut self, mode: TarScanMode) -> usize {
        log::debug!("Scanning for tars");
        let mut num = 0;
        for category in mode.categories() {
            num += self.scan_category(category);
            if let Some(legacy) = category.legacy_scan() {
                if let Some(i) = legacy.index() {
                    num += self.scan_category_tars(i, legacy);
                }
            }
        }
        log::info!("Tar scan complete, found {} archives", num);
        num
    }
    /// Offers every file in `category` with a matching extension to
    /// `scanner`: plain files under each search root, and, if `tars` is set,
    /// members of the category's archives. Legacy categories are scanned
    /// after. Returns how many files the scanner accepted.
    pub fn scan_files(&self, scanner: &mut dyn FileScanner,
                      extension: Option<&str>, category: Category,
                      tars: bool, recursive: bool) -> usize {
        let mut num = 0;
        for dir in self.search_paths.category_dirs(category) {
            let basepath_length = dir.as_os_str().len();
            num += scan_path(scanner, extension, &dir, basepath_length,
                             recursive);
        }
        if tars {
            if let Some(index) = self.index(category) {
                for (name, entry) in index.files() {
                    let name = StdPath::new(name);
                    if matches_extension(extension, name)
                        && scanner.add_file(name, 0, Some(&*entry.archive)) {
                        num += 1;
                    }
                }
            }
        }
        for &fallback in category.legacy_fallbacks() {
            num += self.scan_files(scanner, extension, fallback, tars,
                                   recursive);
        }
        num
    }
    /// Offers every file under `directory` with a matching extension to
    /// `scanner`. Returns how many files the scanner accepted.
    pub fn scan_directory(scanner: &mut dyn FileScanner,
                          extension: Option<&str>, directory: &StdPath,
                          recursive: bool) -> usize {
        // ensure a trailing separator, so the base length covers it
        let directory = directory.join("");
        let basepath_length = directory.as_os_str().len();
        scan_path(scanner, extension, &directory, basepath_length, recursive)
    }
    /// Writes an indexed archive's members out as plain files, next to the
    /// archive, under the archive's first directory. Returns the number of
    /// files written.
    ///
    /// Stops at the first failure. Whatever was written by then stays.
    pub fn extract(&self, archive: &StdPath) -> Result<usize, FsError> {
        let (index, info) = self.indices.iter()
            .find_map(|index| index.archive(archive).map(|info| (index, info)))
            .ok_or_else(|| FsError::UnknownArchive(archive.to_owned()))?;
        let (first_dir, base) = match (&info.first_dir, archive.parent()) {
            (Some(first_dir), Some(base))
                if stays_inside(StdPath::new(first_dir)) => (first_dir, base),
            _ => return Err(FsError::NoDirectory(archive.to_owned())),
        };
        let target = base.join(first_dir);
        log::debug!("Extracting {:?} to directory {:?}", archive, target);
        fs::create_dir_all(&target)?;
        let mut buf = [0u8; EXTRACT_BUFFER_LEN];
        let mut num = 0;
        for (_, entry) in index.members_of(archive) {
            let relative = StdPath::new(&entry.name);
            if !stays_inside(relative) {
                log::warn!("Not extracting {:?} from {:?}, it would land \
                            outside the archive's directory", entry.name,
                           archive);
                continue
            }
            let path = base.join(relative);
            log::trace!("  extracting {:?}", path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut input = open_archive_member(&entry.archive, entry.offset,
                                                entry.size)?.file;
            let mut output = File::create(&path)?;
            let mut remaining = entry.size;
            while remaining > 0 {
                let want = remaining.min(buf.len() as u64) as usize;
                let got = match input.read(&mut buf[..want]) {
                    Ok(0) => break,
                    Ok(x) => x,
                    Err(x) if x.kind() == ErrorKind::Interrupted => continue,
                    Err(x) => return Err(x.into()),
                };
                output.write_all(&buf[..got])?;
                remaining -= got as u64;
            }
            if remaining != 0 {
                log::debug!("Extracting {:?} failed; still {} bytes to copy",
                            path, remaining);
                return Err(FsError::ShortCopy { path, remaining })
            }
            num += 1;
        }
        log::trace!("  extraction successful");
        Ok(num)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{TarBuilder, put};
    use std::sync::Arc;
    fn n(s: &str) -> String { s.replace('/', &SEP.to_string()) }
    fn read(fs: &FileSystem, name: &str, category: Category) -> Vec<u8> {
        fs.open_file(name, OpenMode::Read, category).unwrap()
            .read_all().unwrap()
    }
    fn two_roots() -> (tempfile::TempDir, tempfile::TempDir, FileSystem) {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let mut paths = SearchPaths::new();
        paths.set(SearchSlot::Personal, Some(first.path().to_owned()))
            .set(SearchSlot::Shared, Some(second.path().to_owned()));
        (first, second, FileSystem::new(paths))
    }
    #[test] fn earlier_root_wins() {
        let (first, second, fs) = two_roots();
        put(first.path(), "lang/f", b"first");
        put(second.path(), "lang/f", b"second");
        put(second.path(), "lang/g", b"only second");
        assert_eq!(read(&fs, "f", Category::Lang), b"first");
        assert_eq!(read(&fs, "g", Category::Lang), b"only second");
        assert!(fs.open_file("h", OpenMode::Read, Category::Lang)
                .unwrap_err().is_not_found());
        assert!(fs.check_file_exists("g", Category::Lang));
        assert!(!fs.check_file_exists("g", Category::Save));
    }
    #[test] fn plain_beats_archive() {
        let (first, second, mut fs) = two_roots();
        let mut builder = TarBuilder::new();
        builder.file("f", b"from the archive");
        builder.file("g", b"archived g");
        builder.write(&first.path().join("lang"), "pack.tar");
        put(second.path(), "lang/f", b"plain");
        assert!(fs.open_file("g", OpenMode::Read, Category::Lang).is_err());
        assert_eq!(fs.scan_archives(TarScanMode::ALL), 0);
        assert_eq!(fs.scan_category(Category::Lang), 1);
        assert_eq!(read(&fs, "f", Category::Lang), b"plain");
        assert_eq!(read(&fs, "G", Category::Lang), b"archived g");
        // archives are only for reading
        let opened = fs.open_file("g", OpenMode::Append, Category::Lang)
            .unwrap();
        assert_eq!(opened.origin, Origin::Plain(first.path().join("lang/g")));
    }
    #[test] fn linked_language_dir() {
        let (first, _second, mut fs) = two_roots();
        let mut builder = TarBuilder::new();
        builder.dir("lang/");
        let offset = builder.file("lang/english.lng", &[b'x'; 100]);
        builder.symlink("lang2", "lang");
        builder.write(&first.path().join("lang"), "lang.tar");
        assert!(fs.open_file(&n("lang2/english.lng"), OpenMode::Read,
                             Category::Lang).is_err());
        fs.scan_category(Category::Lang);
        let opened = fs.open_file(&n("lang2/english.lng"), OpenMode::Read,
                                  Category::Lang).unwrap();
        assert_eq!(opened.size, 100);
        match &opened.origin {
            Origin::Archive { offset: x, .. } => assert_eq!(*x, offset),
            x => panic!("expected an archive member, got {:?}", x),
        }
        assert_eq!(opened.read_all().unwrap(), vec![b'x'; 100]);
    }
    #[test] fn rescan_is_idempotent() {
        let (first, second, mut fs) = two_roots();
        let mut builder = TarBuilder::new();
        builder.dir("set/");
        builder.file("set/a.obg", b"a");
        builder.symlink("old", "set");
        builder.write(&first.path().join("baseset"), "one.tar");
        builder.file("set/a.obg", b"shadowed");
        builder.file("set/b.obg", b"b");
        builder.write(&second.path().join("baseset/nested"), "two.tar");
        assert_eq!(fs.scan_archives(TarScanMode::BASESET), 2);
        let before = fs.index(Category::Baseset).unwrap().clone();
        assert_eq!(before.files().len(), 2);
        assert_eq!(before.links().len(), 1);
        assert_eq!(fs.scan_archives(TarScanMode::BASESET), 2);
        assert_eq!(fs.index(Category::Baseset).unwrap(), &before);
    }
    #[test] fn corrupt_archive_contributes_nothing() {
        let (first, _second, mut fs) = two_roots();
        let mut builder = TarBuilder::new();
        builder.file("good.nut", b"good");
        let mut bad = crate::testutil::header("bad.nut", 0, b'0', None);
        bad[crate::tar::MAGIC.0] = b'X';
        builder.raw(bad);
        builder.write(&first.path().join("ai"), "bad.tar");
        let mut builder = TarBuilder::new();
        builder.file("fine.nut", b"fine");
        builder.write(&first.path().join("ai"), "fine.tar");
        assert_eq!(fs.scan_archives(TarScanMode::AI), 1);
        let index = fs.index(Category::Ai).unwrap();
        assert_eq!(index.files().len(), 1);
        assert!(!fs.check_file_exists("good.nut", Category::Ai));
        assert!(fs.check_file_exists("fine.nut", Category::Ai));
    }
    #[test] fn legacy_fallback() {
        let (first, _second, mut fs) = two_roots();
        put(first.path(), "gm/tune.mid", b"music");
        put(first.path(), "data/old.grf", b"grf");
        assert_eq!(read(&fs, "tune.mid", Category::Baseset), b"music");
        assert_eq!(read(&fs, "old.grf", Category::Baseset), b"grf");
        assert_eq!(read(&fs, "old.grf", Category::Newgrf), b"grf");
        assert!(fs.open_file("tune.mid", OpenMode::Read, Category::Newgrf)
                .is_err());
        let mut builder = TarBuilder::new();
        builder.file("archived.grf", b"in data");
        builder.write(&first.path().join("data"), "old.tar");
        assert_eq!(fs.scan_archives(TarScanMode::NEWGRF), 1);
        assert_eq!(read(&fs, "archived.grf", Category::Newgrf), b"in data");
        // the old data directory is added to, not rebuilt
        assert_eq!(fs.scan_archives(TarScanMode::BASESET), 0);
        assert!(fs.check_file_exists("archived.grf", Category::Newgrf));
    }
    #[test] fn full_path_retry() {
        let (first, _second, fs) = two_roots();
        let path = put(first.path(), "elsewhere/my.cfg", b"config");
        let name = path.to_str().unwrap();
        assert_eq!(read(&fs, name, Category::Base), b"config");
        assert_eq!(read(&fs, name, Category::NoDirectory), b"config");
        assert!(fs.open_file("my.cfg", OpenMode::Read, Category::Base)
                .is_err());
    }
    #[test] fn disabled_roots_are_skipped() {
        let (first, _second, mut fs) = two_roots();
        put(first.path(), "save/game.sav", b"save");
        assert!(fs.check_file_exists("game.sav", Category::Save));
        fs.search_paths.disable(SearchSlot::Personal);
        assert!(!fs.check_file_exists("game.sav", Category::Save));
    }
    #[test] fn full_paths_and_directories() {
        let (first, second, fs) = two_roots();
        put(second.path(), "scenario/x.scn", b"");
        assert_eq!(fs.find_full_path(Category::Scenario, "x.scn"),
                   Some(second.path().join("scenario/x.scn")));
        #[cfg(not(windows))]
        assert_eq!(fs.find_full_path(Category::Scenario, "X.SCN"),
                   Some(second.path().join("scenario/x.scn")));
        assert_eq!(fs.find_full_path(Category::Scenario, "y.scn"), None);
        assert_eq!(fs.find_full_path(Category::NoDirectory, "x.scn"), None);
        assert_eq!(fs.directory(Category::Scenario),
                   second.path().join("scenario/"));
        assert_eq!(fs.directory(Category::Screenshot), first.path());
        assert_eq!(FileSystem::new(SearchPaths::new())
                   .directory(Category::Screenshot), StdPathBuf::new());
    }
    struct Names(Vec<(StdPathBuf, usize, Option<StdPathBuf>)>);
    impl FileScanner for Names {
        fn add_file(&mut self, path: &StdPath, basepath_length: usize,
                    archive: Option<&StdPath>) -> bool {
            self.0.push((path.to_owned(), basepath_length,
                         archive.map(StdPath::to_owned)));
            true
        }
    }
    #[test] fn scanning_files() {
        let (first, second, mut fs) = two_roots();
        put(first.path(), "ai/a/main.nut", b"");
        put(second.path(), "ai/b.nut", b"");
        put(second.path(), "ai/b.txt", b"");
        let mut builder = TarBuilder::new();
        builder.file("c/main.nut", b"c");
        let tar = builder.write(&second.path().join("ai"), "c.tar");
        fs.scan_archives(TarScanMode::AI);
        let mut names = Names(vec![]);
        assert_eq!(fs.scan_files(&mut names, Some(".nut"), Category::Ai,
                                 true, true), 3);
        assert_eq!(names.0[0].0, first.path().join("ai/a/main.nut"));
        assert_eq!(names.0[0].1,
                   first.path().join("ai/").as_os_str().len());
        assert_eq!(names.0[2], (StdPathBuf::from(n("c/main.nut")), 0,
                                Some(tar)));
        let mut names = Names(vec![]);
        assert_eq!(fs.scan_files(&mut names, Some(".nut"), Category::Ai,
                                 false, false), 1);
        let mut names = Names(vec![]);
        assert_eq!(FileSystem::scan_directory(&mut names, None,
                                              &second.path().join("ai"),
                                              false), 3);
        assert_eq!(names.0[0].1,
                   second.path().join("ai/").as_os_str().len());
    }
    #[test] fn extracting() {
        let (first, _second, mut fs) = two_roots();
        let mut builder = TarBuilder::new();
        builder.dir("data/");
        let readme = vec![b'r'; 5000];
        builder.file("data/readme.txt", &readme);
        builder.file("data/sub/deeper.txt", b"deeper");
        let tar = builder.write(&first.path().join("newgrf"), "pack.tar");
        let mut builder = TarBuilder::new();
        builder.file("loose.txt", b"no directory");
        let flat = builder.write(&first.path().join("newgrf"), "flat.tar");
        assert!(matches!(fs.extract(&tar),
                         Err(FsError::UnknownArchive(_))));
        fs.scan_archives(TarScanMode::NEWGRF);
        assert_eq!(fs.extract(&tar).unwrap(), 2);
        let out = first.path().join("newgrf/data");
        assert_eq!(std::fs::read(out.join("readme.txt")).unwrap(), readme);
        assert_eq!(std::fs::read(out.join("sub/deeper.txt")).unwrap(),
                   b"deeper");
        assert!(matches!(fs.extract(&flat), Err(FsError::NoDirectory(_))));
    }
    #[test] fn extracting_keeps_member_names() {
        let (first, _second, mut fs) = two_roots();
        let mut builder = TarBuilder::new();
        builder.dir("Data/");
        builder.file("Data/R\u{e9}sum\u{e9}.txt", b"cv");
        let tar = builder.write(&first.path().join("newgrf"), "cv.tar");
        fs.scan_category(Category::Newgrf);
        assert_eq!(fs.extract(&tar).unwrap(), 1);
        let out = first.path().join("newgrf/data");
        assert_eq!(std::fs::read(out.join("r\u{e9}sum\u{e9}.txt")).unwrap(),
                   b"cv");
        assert!(!out.join("re\u{301}sume\u{301}.txt").exists());
        // the extracted copy now answers for the member
        #[cfg(not(windows))]
        assert!(matches!(fs.open_file(&n("data/R\u{e9}sum\u{e9}.txt"),
                                      OpenMode::Read, Category::Newgrf)
                         .unwrap().origin, Origin::Plain(_)));
    }
    #[test] fn extracting_stays_next_to_the_archive() {
        let (first, _second, mut fs) = two_roots();
        let mut builder = TarBuilder::new();
        builder.dir("../outside/");
        builder.file("../outside/x.txt", b"x");
        let tar = builder.write(&first.path().join("newgrf"), "sneaky.tar");
        fs.scan_category(Category::Newgrf);
        assert!(matches!(fs.extract(&tar), Err(FsError::NoDirectory(_))));
        assert!(!first.path().join("outside").exists());
    }
    #[test] fn member_bigger_than_its_archive() {
        let (first, _second, mut fs) = two_roots();
        let mut block = crate::testutil::header("huge.bin", 0, b'0', None);
        let size = crate::tar::SIZE;
        block[size.0..size.0 + size.1].copy_from_slice(b"777777777777");
        let mut builder = TarBuilder::new();
        builder.raw(block);
        builder.write(&first.path().join("lang"), "huge.tar");
        assert_eq!(fs.scan_category(Category::Lang), 1);
        let opened = fs.open_file("huge.bin", OpenMode::Read, Category::Lang)
            .unwrap();
        assert_eq!(opened.size, 0o777777777777);
        assert_eq!(opened.read_all().unwrap(), vec![0; 1024]);
    }
    #[test] fn extracting_truncated() {
        let (first, _second, mut fs) = two_roots();
        let mut builder = TarBuilder::new();
        builder.dir("data/");
        builder.file("data/big.bin", &[1; 2000]);
        let tar = builder.write(&first.path().join("newgrf"), "cut.tar");
        fs.scan_category(Category::Newgrf);
        // lop off most of the body after scanning
        let bytes = std::fs::read(&tar).unwrap();
        std::fs::write(&tar, &bytes[..1024 + 100]).unwrap();
        match fs.extract(&tar) {
            Err(FsError::ShortCopy { remaining, .. })
                => assert_eq!(remaining, 1900),
            x => panic!("expected a short copy, got {:?}", x),
        }
        let archive: Arc<StdPath> = Arc::from(tar.as_path());
        assert_eq!(fs.index(Category::Newgrf).unwrap()
                   .members_of(&archive).count(), 1);
    }
}
