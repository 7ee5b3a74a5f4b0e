use std::{
    error::Error,
    fmt::{Display, Formatter},
    io,
    path::PathBuf,
};

use crate::tar::TarHeaderError;

/// Everything that can go wrong while finding, opening, scanning or
/// extracting files.
///
/// Only `ArchiveCorrupt` distinguishes a broken archive from one we merely
/// couldn't read. Permission problems come through as `Io`, and callers that
/// scan many archives treat both as "skip this one and carry on".
#[derive(Debug)]
pub enum FsError {
    /// Every search root, archive index and fallback came up empty.
    NotFound,
    /// A tar header failed validation. Nothing from this archive was indexed.
    ArchiveCorrupt {
        archive: PathBuf,
        reason: TarHeaderError,
    },
    /// Opening, seeking, reading or writing failed.
    Io(io::Error),
    /// `extract` was handed an archive that no index knows about.
    UnknownArchive(PathBuf),
    /// `extract` was handed an archive without a directory entry, or one that
    /// has no parent directory to extract into.
    NoDirectory(PathBuf),
    /// A member ran out of bytes before it was completely copied.
    ShortCopy {
        path: PathBuf,
        remaining: u64,
    },
}

impl Display for FsError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FsError::NotFound
                => write!(fmt, "file not found in any search path or archive"),
            FsError::ArchiveCorrupt { archive, reason }
                => write!(fmt, "{:?} isn't a valid tar file: {}", archive,
                          reason),
            FsError::Io(x) => Display::fmt(x, fmt),
            FsError::UnknownArchive(path)
                => write!(fmt, "{:?} is not a scanned archive", path),
            FsError::NoDirectory(path)
                => write!(fmt, "{:?} has no directory to extract into", path),
            FsError::ShortCopy { path, remaining }
                => write!(fmt, "{:?}: still {} bytes to copy", path,
                          remaining),
        }
    }
}

impl Error for FsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FsError::Io(x) => Some(x),
            FsError::ArchiveCorrupt { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(x: io::Error) -> FsError {
        if x.kind() == io::ErrorKind::NotFound { FsError::NotFound }
        else { FsError::Io(x) }
    }
}

impl FsError {
    /// True if this just means "not here", which callers probing several
    /// locations should treat as a reason to try the next one.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound)
    }
}
