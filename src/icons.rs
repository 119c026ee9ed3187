use crate::desktop::DesktopEntry;
use crate::host::Host;

pub const FALLBACK_ICON: &str = "preferences-virtualization-container";

/// Icon name or path representing `container` in a list of containers.
///
/// Looks at the `<container>.desktop` launcher written by `distrobox generate-entry`
/// in each search directory, skipping launchers without an icon, then at the icon
/// distrobox saved for the container, then falls back to a generic icon.
pub fn resolve_icon(host: &Host, container: &str) -> String {
    let file_name = format!("{container}.desktop");
    for dir in host.application_dirs() {
        let path = dir.join(&file_name);
        if !path.is_file() {
            continue;
        }
        match DesktopEntry::read(&path) {
            Ok(entry) if !entry.icon().is_empty() => return entry.icon().to_string(),
            Ok(_) => log::trace!("{} has no icon, continuing", path.display()),
            Err(err) => log::debug!("reading {}: {}", path.display(), err),
        }
    }

    let icons = host.container_icons_dir();
    for ext in ["png", "svg"] {
        let path = icons.join(format!("{container}.{ext}"));
        if path.is_file() {
            return path.to_string_lossy().into_owned();
        }
    }

    FALLBACK_ICON.to_string()
}
