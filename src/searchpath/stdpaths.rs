use std::{
    env,
    fs,
    io::ErrorKind,
    path::{Path as StdPath, PathBuf as StdPathBuf},
};

use super::*;

/// What the standard search paths are built from.
///
/// Everything that depends on the environment (home directory, XDG
/// variables, working directory, executable location) is probed by
/// [`SearchPaths::standard`](struct.SearchPaths.html#method.standard). The
/// things that only the game knows go here.
#[derive(Debug,Clone)]
pub struct StandardPaths<'a> {
    /// Name of the per-user directory under the home directory, usually a
    /// dotted name like `.psilo`. The XDG data directory gets the same name
    /// without the dot.
    pub personal_dir: &'a str,
    /// Systemwide data directory, if this build has one.
    pub installation_dir: Option<&'a StdPath>,
    /// Directory shared between users, if this build has one.
    pub shared_dir: Option<&'a StdPath>,
}

fn cranky_does_exist(path: &StdPath) -> bool {
    match fs::metadata(path) {
        Ok(_) => true,
        Err(x) if x.kind() == ErrorKind::NotFound => false,
        Err(x) => {
            log::error!("{:?}: {:?}", path, x);
            false
        },
    }
}

fn get_us_dir() -> Option<StdPathBuf> {
    match env::current_exe() {
        Ok(mut x) => {
            if x.pop() { Some(x) }
            else { None }
        },
        Err(x) => {
            log::warn!("Couldn't get the path to our own executable! {:?}",
                       x);
            None
        },
    }
}

fn get_home_dir() -> Option<StdPathBuf> {
    // HOME first, even if it disagrees with the password database, so that
    // users can point us elsewhere.
    env::var_os("HOME").filter(|x| !x.is_empty()).map(StdPathBuf::from)
        .or_else(dirs::home_dir)
}

fn get_xdg_data_home(home: Option<&StdPath>) -> Option<StdPathBuf> {
    env::var_os("XDG_DATA_HOME").filter(|x| !x.is_empty())
        .map(StdPathBuf::from)
        .or_else(|| home.map(|home| {
            let mut ret = home.to_owned();
            ret.push(".local");
            ret.push("share");
            ret
        }))
}

impl SearchPaths {
    /// Probes the environment for the usual places game data lives.
    pub fn standard(config: &StandardPaths) -> SearchPaths {
        let mut ret = SearchPaths::new();
        let home = get_home_dir();
        if home.is_none() {
            log::warn!("No home directory, so no personal directory either");
        }
        let personal = home.as_ref().map(|x| x.join(config.personal_dir));
        if cfg!(target_family="unix") {
            let xdg_name = config.personal_dir.strip_prefix('.')
                .unwrap_or(config.personal_dir);
            ret.set(SearchSlot::PersonalXdg,
                    get_xdg_data_home(home.as_deref())
                    .map(|x| x.join(xdg_name)));
        }
        ret.set(SearchSlot::Personal, personal.clone());
        ret.set(SearchSlot::Shared, config.shared_dir.map(StdPath::to_owned));
        ret.set(SearchSlot::Working, match env::current_dir() {
            Ok(x) => Some(x),
            Err(x) => {
                log::warn!("Couldn't get the working directory! {:?}", x);
                None
            },
        });
        ret.update_working_dir_enabled(config.personal_dir);
        ret.set(SearchSlot::Binary, get_us_dir());
        ret.set(SearchSlot::Installation,
                config.installation_dir.map(StdPath::to_owned));
        // Content downloads only count if the directory is already there.
        let download = personal.map(|x| x.join("content_download"))
            .filter(|x| cranky_does_exist(x));
        ret.set(SearchSlot::AutoDownload, download);
        for (slot, base) in ret.iter() {
            log::info!("{:?} added as {} search path", base, slot);
        }
        ret
    }
}
