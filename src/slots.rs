//! A small table of long-lived read handles, for streaming big data files a
//! piece at a time.
//!
//! Each slot remembers how to reopen its file, so on platforms that can only
//! have a few descriptors open the least used handle can be closed behind
//! the caller's back and reopened when it's next wanted.

use crate::*;
use crate::path::SEP;

use std::{
    fs::File,
    io::{Seek, SeekFrom},
};

/// How many slots a default `FileSlots` has.
pub const MAX_FILE_SLOTS: usize = 64;

#[derive(Debug)]
struct Slot {
    name: String,
    category: Category,
    short_name: String,
    /// Where the file starts within `file`. Nonzero for archive members.
    start: u64,
    size: u64,
    /// `None` if the handle was closed to make room for another.
    file: Option<File>,
    usage_count: u64,
}

#[derive(Debug)]
pub struct FileSlots {
    slots: Vec<Option<Slot>>,
    open_handles: usize,
    fd_limit: Option<usize>,
}

/// The file name without directory or extension, lowercased.
fn short_name_of(name: &str) -> String {
    let base = name.rsplit(|c| c == '/' || c == SEP).next().unwrap_or(name);
    let stem = match base.rfind('.') {
        Some(dot) => &base[..dot],
        None => base,
    };
    stem.to_lowercase()
}

impl Default for FileSlots {
    fn default() -> FileSlots { FileSlots::new() }
}

impl FileSlots {
    /// `MAX_FILE_SLOTS` slots, and no limit on open descriptors.
    pub fn new() -> FileSlots { FileSlots::with_limits(MAX_FILE_SLOTS, None) }
    /// `num_slots` slots. If `fd_limit` is given, no more than
    /// `fd_limit - 1` of them will have a handle open at once.
    pub fn with_limits(num_slots: usize, fd_limit: Option<usize>)
                       -> FileSlots {
        FileSlots {
            slots: (0..num_slots).map(|_| None).collect(),
            open_handles: 0,
            fd_limit,
        }
    }
    pub fn len(&self) -> usize { self.slots.len() }
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }
    /// How many slots currently hold an open handle.
    pub fn open_handles(&self) -> usize { self.open_handles }
    /// Whether `slot` has a handle open right now (as opposed to never
    /// having been opened, or having been closed to make room).
    pub fn is_open(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(Slot { file: Some(_), .. })))
    }
    /// Opens `name` for reading into `slot`, replacing whatever was there.
    /// A slot past the end of the table is `NotFound`, like everything else
    /// that takes a slot.
    pub fn open(&mut self, fs: &FileSystem, slot: usize, name: &str,
                category: Category) -> Result<(), FsError> {
        if slot >= self.slots.len() {
            log::warn!("File slot {} out of range (have {})", slot,
                       self.slots.len());
            return Err(FsError::NotFound)
        }
        self.free_handle();
        let opened = fs.open_file(name, OpenMode::Read, category)?;
        self.close(slot);
        let start = match opened.origin {
            Origin::Archive { offset, .. } => offset,
            Origin::Plain(_) => 0,
        };
        self.slots[slot] = Some(Slot {
            name: name.to_owned(),
            category,
            short_name: short_name_of(name),
            start,
            size: opened.size,
            file: Some(opened.file),
            usage_count: 0,
        });
        self.open_handles += 1;
        Ok(())
    }
    /// Makes room for one more handle, if there's a limit and we're at it,
    /// by closing the open handle that has been used the least.
    fn free_handle(&mut self) {
        let limit = match self.fd_limit {
            Some(x) => x,
            None => return,
        };
        if self.open_handles + 1 < limit { return }
        let victim = self.slots.iter().enumerate()
            .filter_map(|(i, x)| x.as_ref()
                        .filter(|x| x.file.is_some())
                        .map(|x| (x.usage_count, i)))
            .min();
        if let Some((_, i)) = victim {
            if let Some(slot) = self.slots[i].as_mut() {
                log::debug!("Closing {:?} in slot {} because of the \
                             descriptor limit", slot.name, i);
                slot.file = None;
                self.open_handles -= 1;
            }
        }
    }
    /// Gets the handle for `slot`, positioned `pos` bytes into the file.
    /// Reopens the file first if its handle was closed to make room.
    pub fn seek_to(&mut self, fs: &FileSystem, slot: usize, pos: u64)
                   -> Result<&mut File, FsError> {
        let needs_reopen = match self.slots.get(slot) {
            Some(Some(x)) => x.file.is_none(),
            _ => return Err(FsError::NotFound),
        };
        if needs_reopen {
            self.free_handle();
        }
        let entry = match self.slots.get_mut(slot) {
            Some(Some(x)) => x,
            _ => return Err(FsError::NotFound),
        };
        if needs_reopen {
            log::trace!("Restoring {:?} in slot {} from disk",
                        entry.name, slot);
            let opened = fs.open_file(&entry.name, OpenMode::Read,
                                      entry.category)?;
            entry.start = match opened.origin {
                Origin::Archive { offset, .. } => offset,
                Origin::Plain(_) => 0,
            };
            entry.size = opened.size;
            entry.file = Some(opened.file);
            self.open_handles += 1;
        }
        entry.usage_count += 1;
        let start = entry.start;
        match entry.file.as_mut() {
            Some(file) => {
                file.seek(SeekFrom::Start(start + pos))?;
                Ok(file)
            },
            None => Err(FsError::NotFound),
        }
    }
    /// Closes `slot` and forgets about it.
    pub fn close(&mut self, slot: usize) {
        if let Some(Some(old)) = self.slots.get_mut(slot).map(Option::take) {
            if old.file.is_some() { self.open_handles -= 1 }
        }
    }
    pub fn close_all(&mut self) {
        for slot in 0 .. self.slots.len() {
            self.close(slot);
        }
    }
    /// The lowercased file name of whatever is in `slot`, without directory
    /// or extension.
    pub fn short_name(&self, slot: usize) -> Option<&str> {
        self.slots.get(slot)?.as_ref().map(|x| x.short_name.as_str())
    }
    /// Size of whatever is in `slot`.
    pub fn size(&self, slot: usize) -> Option<u64> {
        self.slots.get(slot)?.as_ref().map(|x| x.size)
    }
}
