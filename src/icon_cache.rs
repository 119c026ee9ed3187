//! Icons copied out of containers onto the host.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::shell::{in_container, quote, CommandRunner};

/// Where icons are looked for inside a container, in order.
const ICON_ROOTS: [&str; 5] = [
    "/usr/share/icons",
    "/usr/local/share/icons",
    "/usr/share/pixmaps",
    "/usr/share/applications",
    "/usr/share/icons/hicolor",
];

/// Finds the file behind an `Icon=` value; `$icon` and `$roots` are set before it runs.
///
/// Absolute paths are taken as they are. A relative directory part (`apps/foo`)
/// is looked up under each root. Names without an extension try the usual image
/// extensions. Roots are checked directly first, then searched recursively.
const ICON_LOOKUP: &str = r#"
case "$icon" in
  /*) if [ -e "$icon" ]; then printf '%s' "$icon"; exit 0; fi ;;
esac
base=${icon##*/}
sub=
case "$icon" in */*) sub=${icon%/*} ;; esac
[ -n "$base" ] || exit 1
case "$base" in
  *.*) names="$base" ;;
  *) names="$base.png $base.svg $base.xpm $base.jpg $base.jpeg $base.ico" ;;
esac
for root in $roots; do
  dir=$root
  if [ -n "$sub" ] && [ "$sub" != . ]; then dir="$root/$sub"; fi
  [ -d "$dir" ] || continue
  for n in $names; do
    if [ -e "$dir/$n" ]; then printf '%s' "$dir/$n"; exit 0; fi
  done
done
for root in $roots; do
  [ -d "$root" ] || continue
  for n in $names; do
    found=$(find "$root" -type f -name "$n" 2>/dev/null | head -n 1)
    if [ -n "$found" ]; then printf '%s' "$found"; exit 0; fi
  done
done
exit 1
"#;

fn icon_lookup_script(icon: &str, roots: &[&str]) -> String {
    format!("icon={}\nroots={}\n{}", quote(icon), quote(&roots.join(" ")), ICON_LOOKUP)
}

/// Per-container icon files keyed by `(container, Icon= value)`.
///
/// Misses are remembered too, so a container without an icon is asked only once.
#[derive(Debug)]
pub struct IconCache {
    root: PathBuf,
    entries: HashMap<(String, String), Option<PathBuf>>,
}

impl IconCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root, entries: HashMap::new() }
    }

    /// Local copy of the icon `icon` of app `basename`, fetching it on first use.
    pub fn get_or_fetch<R: CommandRunner + ?Sized>(
        &mut self,
        runner: &R,
        container: &str,
        basename: &str,
        icon: &str,
    ) -> Option<PathBuf> {
        let key = (container.to_string(), icon.to_string());
        if let Some(hit) = self.entries.get(&key) {
            return hit.clone();
        }
        let fetched = self.fetch(runner, container, basename, icon);
        self.entries.insert(key, fetched.clone());
        fetched
    }

    fn fetch<R: CommandRunner + ?Sized>(&self, runner: &R, container: &str, basename: &str, icon: &str) -> Option<PathBuf> {
        if icon.trim().is_empty() || container.is_empty() || container.contains('/') {
            return None;
        }
        let lookup = runner.run(&in_container(container, &icon_lookup_script(icon, &ICON_ROOTS)));
        let remote = lookup.stdout.trim();
        if !lookup.success || remote.is_empty() {
            log::debug!("icon {:?} not found in {}", icon, container);
            return None;
        }

        let remote_path = Path::new(remote);
        let stem = if basename.is_empty() {
            remote_path.file_stem().and_then(|s| s.to_str()).unwrap_or("icon")
        } else {
            basename
        };
        let ext = remote_path.extension().and_then(|s| s.to_str()).unwrap_or("png");
        let dir = self.root.join(container);
        let local = dir.join(format!("{}.{}", stem.replace('/', "_"), ext));
        if local.exists() {
            return Some(local);
        }

        let out = runner.run(&in_container(container, &format!("base64 -w0 {}", quote(remote))));
        if !out.success {
            return None;
        }
        let encoded: String = out.stdout.split_whitespace().collect();
        let bytes = match STANDARD.decode(encoded) {
            Ok(b) if !b.is_empty() => b,
            Ok(_) => return None,
            Err(err) => {
                log::warn!("bad icon data for {} from {}: {}", remote, container, err);
                return None;
            }
        };
        if let Err(err) = fs::create_dir_all(&dir).and_then(|_| fs::write(&local, bytes)) {
            log::warn!("caching icon {}: {}", local.display(), err);
            return None;
        }
        Some(local)
    }
}
