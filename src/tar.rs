//! Decoding of ustar (and pre-POSIX) tar headers.
//!
//! Only what the index needs is decoded: names, size, type and link target.
//! Numeric fields other than size, checksums and owner data are ignored.

use std::{
    borrow::Cow,
    error::Error,
    fmt::{Display, Formatter},
    io, io::Read,
};

/// Size of a header, and the alignment of every member body.
pub const BLOCK_LEN: usize = 512;

// Field offsets and widths, in header order.
pub const NAME: (usize, usize) = (0, 100);
pub const MODE: (usize, usize) = (100, 8);
pub const UID: (usize, usize) = (108, 8);
pub const GID: (usize, usize) = (116, 8);
pub const SIZE: (usize, usize) = (124, 12);
pub const MTIME: (usize, usize) = (136, 12);
pub const CHKSUM: (usize, usize) = (148, 8);
pub const TYPEFLAG: (usize, usize) = (156, 1);
pub const LINKNAME: (usize, usize) = (157, 100);
pub const MAGIC: (usize, usize) = (257, 6);
pub const VERSION: (usize, usize) = (263, 2);
pub const UNAME: (usize, usize) = (265, 32);
pub const GNAME: (usize, usize) = (297, 32);
pub const DEVMAJOR: (usize, usize) = (329, 8);
pub const DEVMINOR: (usize, usize) = (337, 8);
pub const PREFIX: (usize, usize) = (345, 155);
pub const PADDING: (usize, usize) = (500, 12);

const USTAR_MAGIC: &[u8] = b"ustar";

#[derive(Debug,PartialEq,Eq)]
pub enum TarHeaderError {
    /// The magic field was neither "ustar" nor part of an all-zero tail.
    BadMagic,
}

impl Display for TarHeaderError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
	match *self {
	    TarHeaderError::BadMagic
		=> write!(fmt, "header has neither ustar magic nor a zeroed \
				legacy tail"),
	}
    }
}

impl Error for TarHeaderError {}

/// What a header describes, as far as we care.
#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum EntryKind {
    /// `'0'` or NUL.
    Regular,
    /// `'1'`, a hard link.
    HardLink,
    /// `'2'`, a symbolic link.
    SymLink,
    /// `'5'`.
    Directory,
    /// Anything else: devices, FIFOs, GNU and PAX extension records...
    Other(u8),
}

impl EntryKind {
    pub fn from_typeflag(flag: u8) -> EntryKind {
        match flag {
            b'0' | 0 => EntryKind::Regular,
            b'1' => EntryKind::HardLink,
            b'2' => EntryKind::SymLink,
            b'5' => EntryKind::Directory,
            x => EntryKind::Other(x),
        }
    }
    pub fn is_link(self) -> bool {
        matches!(self, EntryKind::HardLink | EntryKind::SymLink)
    }
}

/// One validated 512-byte header.
pub struct TarHeader {
    block: [u8; BLOCK_LEN],
}

impl TarHeader {
    /// Checks the magic and wraps the block. Old (pre-POSIX) archives have no
    /// magic at all; everything from the magic field to the end of the block
    /// is zero in those, and that is accepted too. This also covers the
    /// zeroed end-of-archive blocks.
    pub fn decode(block: [u8; BLOCK_LEN]) -> Result<TarHeader, TarHeaderError> {
        let magic = field(&block, MAGIC);
        if !magic.starts_with(USTAR_MAGIC)
            && block[MAGIC.0..].iter().any(|&b| b != 0) {
            return Err(TarHeaderError::BadMagic)
        }
        Ok(TarHeader { block })
    }
    pub fn kind(&self) -> EntryKind {
        EntryKind::from_typeflag(self.block[TYPEFLAG.0])
    }
    /// Size of the member body, in bytes.
    pub fn size(&self) -> u64 {
        parse_octal(field(&self.block, SIZE))
    }
    /// Full member name: the prefix field, a `/`, and the name field, or just
    /// the name field if there is no prefix.
    pub fn name(&self) -> Cow<'_, str> {
        let prefix = cstr(field(&self.block, PREFIX));
        let name = cstr(field(&self.block, NAME));
        if prefix.is_empty() {
            String::from_utf8_lossy(name)
        }
        else {
            let mut ret = String::from_utf8_lossy(prefix).into_owned();
            ret.push('/');
            ret.push_str(&String::from_utf8_lossy(name));
            Cow::Owned(ret)
        }
    }
    /// Link target. Only meaningful for links.
    pub fn link_name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(cstr(field(&self.block, LINKNAME)))
    }
}

fn field(block: &[u8; BLOCK_LEN], (offset, len): (usize, usize)) -> &[u8] {
    &block[offset..offset + len]
}

/// A fixed-width field, up to its first NUL (or all of it, if none).
fn cstr(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(end) => &field[..end],
        None => field,
    }
}

/// Parses an octal ASCII number the lenient way tar implementations always
/// have: leading blanks skipped, stop at the first non-octal byte, nothing at
/// all means zero.
pub fn parse_octal(field: &[u8]) -> u64 {
    field.iter()
        .skip_while(|&&b| b == b' ')
        .take_while(|&&b| (b'0'..=b'7').contains(&b))
        .fold(0u64, |acc, &b| acc.saturating_mul(8)
              .saturating_add(u64::from(b - b'0')))
}

/// Rounds a body size up to the block size.
pub fn padded(size: u64) -> u64 {
    let block = BLOCK_LEN as u64;
    size.div_ceil(block).saturating_mul(block)
}

/// Reads one whole block. Returns `Ok(false)` on a short read, which is how
/// the end of an archive is found.
pub fn read_block<R: Read + ?Sized>(input: &mut R, buf: &mut [u8; BLOCK_LEN])
                                    -> io::Result<bool> {
    let mut filled = 0;
    while filled < BLOCK_LEN {
        match input.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(x) if x.kind() == io::ErrorKind::Interrupted => continue,
            Err(x) => return Err(x),
        }
    }
    Ok(true)
}
