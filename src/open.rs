use crate::*;

use std::{
    fs::{File, OpenOptions},
    io, io::{Read, Seek, SeekFrom},
    path::{Path as StdPath, PathBuf as StdPathBuf},
    sync::Arc,
};

/// Most we'll allocate up front when reading a whole file. Archive member
/// sizes come straight from the header and can be anything.
const PREALLOC_LIMIT: u64 = 64 * 1024;

fn prealloc(size: u64) -> Vec<u8> {
    Vec::with_capacity(size.min(PREALLOC_LIMIT) as usize)
}

/// How a file is to be opened.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum OpenMode {
    Read,
    /// Create or truncate.
    Write,
    /// Create if needed, write at the end.
    Append,
}

impl OpenMode {
    pub fn is_read(self) -> bool { self == OpenMode::Read }
    fn options(self) -> OpenOptions {
        let mut ret = OpenOptions::new();
        match self {
            OpenMode::Read => ret.read(true),
            OpenMode::Write => ret.write(true).create(true).truncate(true),
            OpenMode::Append => ret.append(true).create(true),
        };
        ret
    }
}

/// Where an opened file came from.
#[derive(Debug,Clone,PartialEq,Eq)]
pub enum Origin {
    /// A file of its own.
    Plain(StdPathBuf),
    /// A member of a tar archive, starting at `offset`.
    Archive { archive: Arc<StdPath>, offset: u64 },
}

/// An open file, plus how much of it the caller should read.
///
/// For archive members the handle is a handle on the whole archive,
/// positioned at the member's first byte. Nothing stops a reader from going
/// past `size` and into whatever the archive holds next; callers that can't
/// be trusted to stop should use [`into_bounded`](#method.into_bounded).
#[derive(Debug)]
pub struct OpenedFile {
    pub file: File,
    /// Size of the file, or of the member. Always 0 for files not opened for
    /// reading.
    pub size: u64,
    pub origin: Origin,
}

impl OpenedFile {
    /// Wraps the handle so that it reports end of file after `size` bytes.
    pub fn into_bounded(self) -> io::Take<File> {
        self.file.take(self.size)
    }
    /// Reads the whole thing into memory.
    pub fn read_all(self) -> io::Result<Vec<u8>> {
        let mut buf = prealloc(self.size);
        self.into_bounded().read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Opens a member of a tar archive: opens the archive and seeks to `offset`.
pub fn open_archive_member(archive: &Arc<StdPath>, offset: u64, size: u64)
                           -> Result<OpenedFile, FsError> {
    let mut file = File::open(archive)?;
    file.seek(SeekFrom::Start(offset))?;
    Ok(OpenedFile {
        file, size,
        origin: Origin::Archive { archive: archive.clone(), offset },
    })
}

/// Opens a file directly. When reading, the size is found by seeking to the
/// end and back.
pub fn open_plain(path: &StdPath, mode: OpenMode)
                  -> Result<OpenedFile, FsError> {
    let mut file = mode.options().open(path)?;
    let size = if mode.is_read() {
        let size = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;
        size
    }
    else { 0 };
    Ok(OpenedFile { file, size, origin: Origin::Plain(path.to_owned()) })
}

/// Opens `base` + `relative`. If that doesn't work, this is a read, and this
/// platform's filesystems care about case, tries again with `relative`
/// lowercased. `base` keeps its case either way.
pub fn open_with_case_retry(base: Option<&StdPath>, relative: &str,
                            mode: OpenMode) -> Result<OpenedFile, FsError> {
    let join = |rel: &str| match base {
        Some(base) => base.join(rel),
        None => StdPathBuf::from(rel),
    };
    match open_plain(&join(relative), mode) {
        Ok(x) => Ok(x),
        Err(x) if cfg!(windows) || !mode.is_read() => Err(x),
        Err(x) => {
            let lower = relative.to_lowercase();
            if lower == relative { return Err(x) }
            open_plain(&join(&lower), mode)
        },
    }
}

/// Reads an entire file into memory, failing if it's bigger than
/// `max_size`.
pub fn read_file_to_mem(path: &StdPath, max_size: u64) -> io::Result<Vec<u8>> {
    let mut opened = match open_plain(path, OpenMode::Read) {
        Ok(x) => x,
        Err(FsError::Io(x)) => return Err(x),
        Err(x) => return Err(io::Error::new(io::ErrorKind::NotFound,
                                            x.to_string())),
    };
    if opened.size > max_size {
        let err = format!("{:?} is {} bytes, more than the limit of {}",
                          path, opened.size, max_size);
        return Err(io::Error::new(io::ErrorKind::InvalidData, err))
    }
    let mut buf = prealloc(opened.size);
    (&mut opened.file).take(max_size).read_to_end(&mut buf)?;
    Ok(buf)
}
