//! Name handling for archive members.
//!
//! Tar files always use `/`, and nobody agrees on case. Inside the index every
//! member name is lowercase, in Unicode normal form D, and uses the platform
//! separator. All the functions here work on names in that form, and none of
//! them touch the real filesystem.

use std::{
    error::Error,
    fmt::{Display, Formatter},
    path::MAIN_SEPARATOR,
};
use unicode_normalization::UnicodeNormalization;

/// The separator used in index keys.
pub const SEP: char = MAIN_SEPARATOR;

#[derive(Debug,PartialEq,Eq)]
pub enum LinkError {
    /// The link had no name, or pointed at nothing.
    Empty,
    /// The link target began with a separator.
    Absolute,
    /// The link target used ".." to reach above the archive root.
    EscapedRoot,
}

impl Display for LinkError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
	match *self {
	    LinkError::Empty
		=> write!(fmt, "link or link target is empty"),
	    LinkError::Absolute
		=> write!(fmt, "link target is an absolute path"),
	    LinkError::EscapedRoot
		=> write!(fmt, "link target points outside of the archive"),
	}
    }
}

impl Error for LinkError {}

/// Turns a raw member name (as stored in the archive) into index key form:
/// lowercase, NFD, and with `/` replaced by the platform separator.
pub fn simplify(raw: &str) -> String {
    raw.nfd()
	.flat_map(char::to_lowercase)
	.map(|c| if c == '/' { SEP } else { c })
	.collect()
}

/// Lowercases a raw member name and switches it to the platform separator,
/// leaving its Unicode form alone. This is the name a member is extracted
/// under.
pub fn localize(raw: &str) -> String {
    raw.chars()
	.flat_map(char::to_lowercase)
	.map(|c| if c == '/' { SEP } else { c })
	.collect()
}

/// Returns the directory part of a simplified name, without the trailing
/// separator. A name without a separator is in the archive root, so this
/// returns "".
pub fn parent(name: &str) -> &str {
    match name.rfind(SEP) {
	Some(i) => &name[..i],
	None => "",
    }
}

/// Resolves a (simplified) link target relative to the directory containing
/// the (simplified) link `name`.
///
/// "." and empty components are dropped and ".." removes one component.
/// The result never contains relative components. This assumes every
/// directory on the way is a real directory, not another link.
pub fn resolve_link(name: &str, target: &str) -> Result<String, LinkError> {
    if name.is_empty() || target.is_empty() {
	return Err(LinkError::Empty)
    }
    if target.starts_with(SEP) {
	return Err(LinkError::Absolute)
    }
    let mut dest = parent(name).to_owned();
    for component in target.split(SEP) {
	match component {
	    "" | "." => (),
	    ".." => {
		if dest.is_empty() {
		    return Err(LinkError::EscapedRoot)
		}
		let cut = dest.rfind(SEP).unwrap_or(0);
		dest.truncate(cut);
	    },
	    _ => {
		if !dest.is_empty() { dest.push(SEP) }
		dest.push_str(component);
	    },
	}
    }
    Ok(dest)
}

/// Appends a separator to `s` unless it is empty or already ends with one.
pub fn make_dir(mut s: String) -> String {
    if !s.is_empty() && !s.ends_with(SEP) { s.push(SEP) }
    s
}

/// If `prefix` (a directory, ending in a separator) is a leading part of
/// `name`, returns the remainder.
pub fn strip_dir<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    if !prefix.ends_with(SEP) { return None }
    name.strip_prefix(prefix)
}

/// Replaces characters that are illegal in filenames on at least one
/// supported platform with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars().map(|c| match c {
	':' | '\\' | '*' | '?' | '/' | '<' | '>' | '|' | '"' => '_',
	c => c,
    }).collect()
}
