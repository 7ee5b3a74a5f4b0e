use crate::*;

use std::{
    fmt::{Display, Formatter},
    path::{Path as StdPath, PathBuf as StdPathBuf},
};

#[cfg(feature = "stdpaths")]
mod stdpaths;
#[cfg(feature = "stdpaths")]
pub use stdpaths::StandardPaths;

/// One slot in the search order. Earlier slots take priority.
#[derive(Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub enum SearchSlot {
    /// Systemwide installation, e.g. `/usr/share/games/<name>/`.
    Installation,
    /// Per-user data under the XDG data home.
    PersonalXdg,
    /// Per-user data in the home directory, e.g. `~/.<name>/`.
    Personal,
    /// The working directory at startup.
    Working,
    /// A directory shared between users.
    Shared,
    /// The directory containing the executable.
    Binary,
    /// Application bundle resources, where the platform has them.
    ApplicationBundle,
    /// Where downloaded content goes.
    AutoDownload,
}

impl SearchSlot {
    pub const COUNT: usize = 8;
    pub const ALL: [SearchSlot; SearchSlot::COUNT] = [
        SearchSlot::Installation,
        SearchSlot::PersonalXdg,
        SearchSlot::Personal,
        SearchSlot::Working,
        SearchSlot::Shared,
        SearchSlot::Binary,
        SearchSlot::ApplicationBundle,
        SearchSlot::AutoDownload,
    ];
}

impl Display for SearchSlot {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SearchSlot::Installation => "installation",
            SearchSlot::PersonalXdg => "personal (XDG)",
            SearchSlot::Personal => "personal",
            SearchSlot::Working => "working",
            SearchSlot::Shared => "shared",
            SearchSlot::Binary => "binary",
            SearchSlot::ApplicationBundle => "application bundle",
            SearchSlot::AutoDownload => "autodownload",
        };
        write!(fmt, "{}", name)
    }
}

/// A search root: where one slot points, and whether to use it.
#[derive(Debug,Clone,Default,PartialEq,Eq)]
pub struct SearchRoot {
    pub base: Option<StdPathBuf>,
    pub enabled: bool,
}

/// The ordered set of directories every lookup goes through.
#[derive(Debug,Clone,Default,PartialEq,Eq)]
pub struct SearchPaths {
    roots: [SearchRoot; SearchSlot::COUNT],
}

impl SearchPaths {
    /// No search paths at all. Only `Category::NoDirectory` lookups and
    /// archives added by hand will find anything.
    pub fn new() -> SearchPaths { SearchPaths::default() }
    /// Points `slot` somewhere (or nowhere), enabling it if it points
    /// somewhere.
    pub fn set(&mut self, slot: SearchSlot, base: Option<StdPathBuf>)
               -> &mut Self {
        let root = &mut self.roots[slot as usize];
        root.enabled = base.is_some();
        root.base = base;
        self
    }
    /// Keeps a slot's path but stops using it.
    pub fn disable(&mut self, slot: SearchSlot) -> &mut Self {
        self.roots[slot as usize].enabled = false;
        self
    }
    pub fn get(&self, slot: SearchSlot) -> &SearchRoot {
        &self.roots[slot as usize]
    }
    /// Path of a slot, whether or not it's enabled.
    pub fn base(&self, slot: SearchSlot) -> Option<&StdPath> {
        self.roots[slot as usize].base.as_deref()
    }
    /// Every enabled slot that points somewhere, in priority order.
    pub fn iter(&self) -> impl Iterator<Item=(SearchSlot, &StdPath)> {
        SearchSlot::ALL.into_iter().zip(self.roots.iter())
            .filter(|(_, root)| root.enabled)
            .filter_map(|(slot, root)| root.base.as_deref()
                        .map(|base| (slot, base)))
    }
    /// The directory for `category` under every enabled root, in priority
    /// order. Nothing for `NoDirectory`.
    pub fn category_dirs(&self, category: Category)
                         -> impl Iterator<Item=StdPathBuf> + '_ {
        let suffix = category.suffix();
        self.iter().filter_map(move |(_, base)| suffix.map(|x| base.join(x)))
    }
    /// Applies the rule for whether the working directory is worth scanning,
    /// enabling or disabling the `Working` slot accordingly.
    pub fn update_working_dir_enabled(&mut self, personal_dir_name: &str) {
        let enabled = should_use_working_dir(
            self.base(SearchSlot::Working),
            self.base(SearchSlot::Personal),
            personal_dir_name);
        if !enabled {
            log::debug!("Not using the working directory as a search path");
        }
        self.roots[SearchSlot::Working as usize].enabled = enabled;
    }
}

/// Whether to use the working directory. Not if there isn't one, not if it's
/// the filesystem root, and not if it's the home directory (as in, working
/// directory + personal directory name is the personal directory). Scanning
/// either of those could find huge numbers of unrelated files, and nobody
/// keeps game data directly in them anyway.
pub fn should_use_working_dir(working: Option<&StdPath>,
                              personal: Option<&StdPath>,
                              personal_dir_name: &str) -> bool {
    let working = match working {
        None => return false,
        Some(x) => x,
    };
    if working.parent().is_none() { return false }
    match personal {
        None => true,
        Some(personal) => working.join(personal_dir_name) != personal,
    }
}
