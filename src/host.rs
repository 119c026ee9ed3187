use std::path::{Path, PathBuf};

/// Present inside every Flatpak sandbox.
pub const SANDBOX_MARKER: &str = "/.flatpak-info";

pub const FLATPAK_APP_ID: &str = "io.github.DenysMb.Kontainer";

/// Where we run and which directories matter for that.
#[derive(Debug, Clone)]
pub struct Host {
    pub sandboxed: bool,
    pub home: PathBuf,
    pub data_home: PathBuf,
    pub cache_home: PathBuf,
}

impl Host {
    pub fn detect() -> Self {
        Self::with_marker(Path::new(SANDBOX_MARKER))
    }

    pub fn with_marker(marker: &Path) -> Self {
        let home = home_dir();
        Self {
            sandboxed: marker.exists(),
            data_home: xdg_dir("XDG_DATA_HOME", &home, ".local/share"),
            cache_home: xdg_dir("XDG_CACHE_HOME", &home, ".cache"),
            home,
        }
    }

    /// Desktop-entry directories to scan, most specific first.
    pub fn application_dirs(&self) -> Vec<PathBuf> {
        if self.sandboxed {
            let app = self.home.join(".var/app").join(FLATPAK_APP_ID);
            vec![
                app.join("data/applications"),
                app.join(".local/share/applications"),
                PathBuf::from("/var/lib/flatpak/exports/share/applications"),
                self.home.join(".local/share/flatpak/exports/share/applications"),
                self.home.join(".local/share/applications"),
            ]
        } else {
            vec![self.data_home.join("applications")]
        }
    }

    /// Where `distrobox-export` writes entries for this user on the host.
    pub fn user_applications_dir(&self) -> PathBuf {
        if self.sandboxed {
            self.home.join(".local/share/applications")
        } else {
            self.data_home.join("applications")
        }
    }

    /// Icons saved by `distrobox generate-entry`.
    pub fn container_icons_dir(&self) -> PathBuf {
        if self.sandboxed {
            self.home.join(".local/share/icons/distrobox")
        } else {
            self.data_home.join("icons/distrobox")
        }
    }

    pub fn icon_cache_root(&self) -> PathBuf {
        self.cache_home.join("kontainer/icons")
    }

    #[cfg(test)]
    pub fn rooted_at(root: &Path, sandboxed: bool) -> Self {
        let home = root.join("home");
        Self {
            sandboxed,
            data_home: home.join(".local/share"),
            cache_home: home.join(".cache"),
            home,
        }
    }
}

pub fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
}

pub fn xdg_dir(var: &str, home: &Path, fallback: &str) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(fallback))
}
