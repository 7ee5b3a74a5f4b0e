//! Builds small tar archives for tests.

use std::{fs, path::{Path, PathBuf}};

use crate::tar::{BLOCK_LEN, CHKSUM, LINKNAME, MAGIC, MODE, NAME, SIZE,
                 TYPEFLAG, VERSION, padded};

/// A ustar header block with sane metadata.
pub fn header(name: &str, size: u64, typeflag: u8, link: Option<&str>)
              -> [u8; BLOCK_LEN] {
    let mut buf = [0u8; BLOCK_LEN];
    let name = name.as_bytes();
    let name_len = name.len().min(NAME.1);
    buf[NAME.0..NAME.0 + name_len].copy_from_slice(&name[..name_len]);
    buf[MODE.0..MODE.0 + MODE.1].copy_from_slice(b"0000644\0");
    let size_field = format!("{:011o}\0", size);
    buf[SIZE.0..SIZE.0 + SIZE.1].copy_from_slice(size_field.as_bytes());
    buf[TYPEFLAG.0] = typeflag;
    if let Some(link) = link {
        let link = link.as_bytes();
        let link_len = link.len().min(LINKNAME.1);
        buf[LINKNAME.0..LINKNAME.0 + link_len]
            .copy_from_slice(&link[..link_len]);
    }
    buf[MAGIC.0..MAGIC.0 + MAGIC.1].copy_from_slice(b"ustar\0");
    buf[VERSION.0..VERSION.0 + VERSION.1].copy_from_slice(b"00");
    buf[CHKSUM.0..CHKSUM.0 + CHKSUM.1].fill(b' ');
    let sum: u32 = buf.iter().map(|&b| u32::from(b)).sum();
    let chk = format!("{:06o}\0 ", sum);
    buf[CHKSUM.0..CHKSUM.0 + CHKSUM.1].copy_from_slice(chk.as_bytes());
    buf
}

/// Accumulates archive bytes, remembering where each body starts.
#[derive(Default)]
pub struct TarBuilder {
    out: Vec<u8>,
}

impl TarBuilder {
    pub fn new() -> TarBuilder { TarBuilder::default() }
    /// Adds a regular file and returns the offset of its body.
    pub fn file(&mut self, name: &str, data: &[u8]) -> u64 {
        self.out.extend_from_slice(&header(name, data.len() as u64, b'0',
                                           None));
        let offset = self.out.len() as u64;
        self.out.extend_from_slice(data);
        let pad = padded(data.len() as u64) as usize - data.len();
        self.out.resize(self.out.len() + pad, 0);
        offset
    }
    pub fn dir(&mut self, name: &str) -> &mut Self {
        self.out.extend_from_slice(&header(name, 0, b'5', None));
        self
    }
    pub fn symlink(&mut self, name: &str, target: &str) -> &mut Self {
        self.out.extend_from_slice(&header(name, 0, b'2', Some(target)));
        self
    }
    pub fn raw(&mut self, block: [u8; BLOCK_LEN]) -> &mut Self {
        self.out.extend_from_slice(&block);
        self
    }
    /// Terminates the archive with two zero blocks and returns its bytes.
    pub fn finish(&mut self) -> Vec<u8> {
        let mut ret = std::mem::take(&mut self.out);
        ret.resize(ret.len() + 2 * BLOCK_LEN, 0);
        ret
    }
    /// Finishes the archive and writes it to `dir/name`, making any missing
    /// directories on the way.
    pub fn write(&mut self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, self.finish()).unwrap();
        path
    }
}

/// Writes a plain file, making any missing directories on the way.
pub fn put(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, data).unwrap();
    path
}
