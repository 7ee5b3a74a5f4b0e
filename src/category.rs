use std::fmt::{Display, Formatter};

/// The kind of file being looked for. Each category lives in its own
/// subdirectory of every search root, and has its own archive index.
#[derive(Debug,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash)]
pub enum Category {
    /// Directly in the search root.
    Base,
    Save,
    Autosave,
    Scenario,
    Heightmap,
    /// Where base graphics lived before `Baseset` existed.
    OldGm,
    /// Where base sets and NewGRFs lived before they got their own homes.
    OldData,
    Baseset,
    Newgrf,
    Lang,
    Ai,
    AiLibrary,
    Game,
    GameLibrary,
    Screenshot,
    /// Not a subdirectory at all. The filename already says where to look,
    /// relative to the working directory or absolute.
    NoDirectory,
}

impl Category {
    /// Number of categories with a subdirectory (and an archive index).
    pub const COUNT: usize = 15;

    /// Every category that has a subdirectory, in table order.
    pub const ALL: [Category; Category::COUNT] = [
        Category::Base,
        Category::Save,
        Category::Autosave,
        Category::Scenario,
        Category::Heightmap,
        Category::OldGm,
        Category::OldData,
        Category::Baseset,
        Category::Newgrf,
        Category::Lang,
        Category::Ai,
        Category::AiLibrary,
        Category::Game,
        Category::GameLibrary,
        Category::Screenshot,
    ];

    /// The path suffix this category appends to a search root, always
    /// '/'-separated and ending with '/' (except `Base`, which is empty).
    /// `None` for `NoDirectory`.
    pub const fn suffix(self) -> Option<&'static str> {
        Some(match self {
            Category::Base => "",
            Category::Save => "save/",
            Category::Autosave => "save/autosave/",
            Category::Scenario => "scenario/",
            Category::Heightmap => "scenario/heightmap/",
            Category::OldGm => "gm/",
            Category::OldData => "data/",
            Category::Baseset => "baseset/",
            Category::Newgrf => "newgrf/",
            Category::Lang => "lang/",
            Category::Ai => "ai/",
            Category::AiLibrary => "ai/library/",
            Category::Game => "game/",
            Category::GameLibrary => "game/library/",
            Category::Screenshot => "screenshot/",
            Category::NoDirectory => return None,
        })
    }

    /// Position in `ALL`, used to pick the archive index. `None` for
    /// `NoDirectory`.
    pub const fn index(self) -> Option<usize> {
        match self {
            Category::NoDirectory => None,
            x => Some(x as usize),
        }
    }

    /// Categories retried, in order, when a lookup in this one fails. These
    /// follow old directory renames, nothing more principled than that.
    pub const fn legacy_fallbacks(self) -> &'static [Category] {
        match self {
            Category::Baseset => &[Category::OldGm, Category::OldData],
            Category::Newgrf => &[Category::OldData],
            _ => &[],
        }
    }

    /// Extra category whose archives are scanned along with this one's.
    pub const fn legacy_scan(self) -> Option<Category> {
        match self {
            Category::Baseset | Category::Newgrf => Some(Category::OldData),
            _ => None,
        }
    }
}

impl Display for Category {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        match self.suffix() {
            Some("") => write!(fmt, "(base)"),
            Some(x) => write!(fmt, "{}", x),
            None => write!(fmt, "(no directory)"),
        }
    }
}
