//! Desktop entries: parsing `[Desktop Entry]` files and finding exported apps on the host.

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONTAINER_APPS_DIR: &str = "/usr/share/applications";

/// The keys of a `[Desktop Entry]` group that we care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesktopEntry {
    pub name: Option<String>,
    pub name_en: Option<String>,
    pub generic_name: Option<String>,
    pub icon: Option<String>,
    pub no_display: bool,
}

impl DesktopEntry {
    /// Keys before any group header count as part of the main group; later groups
    /// (actions and the like) are ignored. The first occurrence of a key wins.
    pub fn parse(content: &str) -> Self {
        let mut entry = Self::default();
        let mut in_main = true;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                in_main = line == "[Desktop Entry]";
                continue;
            }
            if !in_main {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else { continue };
            let value = value.trim();
            let slot = match key.trim() {
                "Name" => &mut entry.name,
                "Name[en]" => &mut entry.name_en,
                "GenericName" => &mut entry.generic_name,
                "Icon" => &mut entry.icon,
                "NoDisplay" => {
                    entry.no_display = value.eq_ignore_ascii_case("true");
                    continue;
                }
                _ => continue,
            };
            slot.get_or_insert_with(|| value.to_string());
        }
        entry
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(|s| Self::parse(&s))
    }

    /// `Name[en]` wins over `Name`.
    pub fn display_name(&self) -> Option<&str> {
        fn non_empty(s: &Option<String>) -> Option<&str> {
            s.as_deref().filter(|v| !v.is_empty())
        }
        non_empty(&self.name_en).or_else(|| non_empty(&self.name))
    }

    pub fn icon(&self) -> &str {
        self.icon.as_deref().unwrap_or("")
    }
}

/// An application inside a container, or one exported from it to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub basename: String,
    pub name: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_source_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

pub type ExportedApp = App;
pub type AvailableApp = App;

impl App {
    pub fn from_entry(basename: &str, entry: &DesktopEntry) -> Self {
        Self {
            basename: basename.to_string(),
            name: entry.display_name().unwrap_or(basename).to_string(),
            icon: entry.icon().to_string(),
            ..Self::default()
        }
    }
}

/// Basename of an entry found under the container's applications directory.
/// Entries in subdirectories keep their relative path.
pub fn container_basename(path: &str) -> &str {
    let rel = path
        .strip_prefix(CONTAINER_APPS_DIR)
        .map(|p| p.trim_start_matches('/'))
        .unwrap_or(path);
    rel.strip_suffix(".desktop").unwrap_or(rel)
}

/// Host file name distrobox-export uses for `basename` exported from `container`.
pub fn exported_file_name(container: &str, basename: &str) -> String {
    format!("{container}-{basename}.desktop")
}

fn is_clone_entry(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.ends_with("clone.desktop") || lower.contains("-clone.desktop")
}

/// Apps exported from `container`, scanning `dirs` in order and keeping the first
/// entry for each basename.
pub fn scan_exported(dirs: &[PathBuf], container: &str) -> Vec<ExportedApp> {
    let prefix = format!("{container}-");
    let mut seen = HashSet::new();
    let mut apps = Vec::new();
    for dir in dirs {
        let Ok(read) = fs::read_dir(dir) else { continue };
        let mut files: Vec<(String, PathBuf)> = read
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| Some((e.file_name().into_string().ok()?, e.path())))
            .collect();
        files.sort();
        for (file_name, path) in files {
            let Some(basename) = file_name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".desktop"))
            else {
                continue;
            };
            if basename.is_empty() || is_clone_entry(&file_name) {
                continue;
            }
            if !seen.insert(basename.to_string()) {
                continue;
            }
            let entry = match DesktopEntry::read(&path) {
                Ok(entry) => entry,
                Err(err) => {
                    log::debug!("skipping {}: {}", path.display(), err);
                    continue;
                }
            };
            let mut app = App::from_entry(basename, &entry);
            // distrobox-export names entries "App (on box)"
            if let Some((name, _)) = app.name.split_once(" (on ") {
                app.name = name.to_string();
            }
            log::trace!("exported app {} ({}) in {}", app.name, basename, dir.display());
            apps.push(app);
        }
    }
    apps
}

/// True when a `<other>-<basename>.desktop` not belonging to `container` sits in one of `dirs`.
pub fn exported_elsewhere(dirs: &[PathBuf], basename: &str, container: &str) -> bool {
    let suffix = format!("-{basename}.desktop");
    let own = exported_file_name(container, basename);
    dirs.iter().filter_map(|d| fs::read_dir(d).ok()).flatten().filter_map(|e| e.ok()).any(|e| {
        let name = e.file_name();
        let name = name.to_string_lossy();
        name.len() > suffix.len() && name.ends_with(&suffix) && name != own.as_str()
    })
}

/// True when any of `containers` has `basename` exported into one of `dirs`.
pub fn exported_by_any(dirs: &[PathBuf], basename: &str, containers: &[String]) -> bool {
    containers.iter().any(|c| {
        let file_name = exported_file_name(c, basename);
        dirs.iter().any(|d| d.join(&file_name).is_file())
    })
}
