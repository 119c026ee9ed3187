//! The container manager: every Distrobox operation behind one facade.
//!
//! Nothing here returns an error. Operations report `false`, an empty list or
//! `"[]"`, and log why at `warn` level.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fs;

use crate::colors;
use crate::config::Config;
use crate::desktop::{self, App, AvailableApp, DesktopEntry, ExportedApp, CONTAINER_APPS_DIR};
use crate::distro::{self, AvailableImage, Container};
use crate::host::Host;
use crate::icon_cache::IconCache;
use crate::icons;
use crate::packages;
use crate::portal;
use crate::shell::{self, quote, CommandRunner, HostShell};
use crate::terminal::{Launcher, OnFinished, TerminalLauncher};

pub const PRESS_ANY_KEY: &str = "Press any key to close this terminal…";

pub const UNSUPPORTED_PACKAGE: &str = "Cannot automatically install packages for this distribution. \
Please enter the distrobox manually and install it using the appropriate package manager.";

/// Lists `.desktop` files that are meant to be shown in menus.
const LIST_APPS: &str =
    "find /usr/share/applications -type f -name '*.desktop' ! -exec grep -q '^NoDisplay=true' {} \\; -print";

/// Completion of long-running operations started in a terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerEvent {
    CloneFinished { name: String, success: bool },
    AssembleFinished { file: String, success: bool },
}

/// `command`, then wait for a key press so the terminal stays open.
fn with_pause(command: &str) -> String {
    format!("{command} && echo '' && echo {} && read -s -n 1", quote(PRESS_ANY_KEY))
}

fn strip_file_uri(path: &str) -> &str {
    path.strip_prefix("file://").unwrap_or(path)
}

fn fetch_images<R: CommandRunner>(runner: &R) -> Vec<AvailableImage> {
    let out = runner.run(distro::IMAGES_COMMAND);
    if !out.success {
        log::warn!("`{}` failed, no images available", distro::IMAGES_COMMAND);
        return Vec::new();
    }
    distro::parse_image_list(&out.stdout)
}

pub struct ContainerManager<R = HostShell, L = TerminalLauncher> {
    runner: R,
    launcher: L,
    host: Host,
    images: Vec<AvailableImage>,
    icons: IconCache,
    events: Sender<ManagerEvent>,
    receiver: Receiver<ManagerEvent>,
}

impl ContainerManager {
    pub fn for_host(host: Host, config: &Config) -> Self {
        let runner = HostShell::new(host.sandboxed);
        let launcher = TerminalLauncher::new(&config.terminal, host.sandboxed);
        Self::new(runner, launcher, host)
    }
}

impl<R: CommandRunner, L: Launcher> ContainerManager<R, L> {
    /// Builds the manager and loads the image list once.
    pub fn new(runner: R, launcher: L, host: Host) -> Self {
        let images = fetch_images(&runner);
        let icons = IconCache::new(host.icon_cache_root());
        let (events, receiver) = unbounded();
        Self { runner, launcher, host, images, icons, events, receiver }
    }

    pub fn is_sandboxed(&self) -> bool {
        self.host.sandboxed
    }

    /// Receiver for clone and assemble completions.
    pub fn events(&self) -> Receiver<ManagerEvent> {
        self.receiver.clone()
    }

    /// Block until every terminal opened by this manager has closed.
    pub fn wait_for_terminals(&self) {
        self.launcher.wait();
    }

    fn run_ok(&self, command: &str) -> bool {
        let out = self.runner.run(command);
        if !out.success {
            log::warn!("`{}` failed", command);
        }
        out.success
    }

    fn open_terminal(&self, command: &str, on_finished: Option<OnFinished>) -> bool {
        self.launcher.launch(command, &self.host.home, on_finished)
    }

    pub fn list_containers(&self) -> Vec<Container> {
        self.fetch_containers().unwrap_or_default()
    }

    fn fetch_containers(&self) -> Option<Vec<Container>> {
        let out = self.runner.run(distro::LIST_COMMAND);
        if !out.success {
            log::warn!("`{}` failed", distro::LIST_COMMAND);
            return None;
        }
        Some(distro::parse_container_list(&out.stdout))
    }

    pub fn list_containers_json(&self) -> String {
        distro::to_json(&self.list_containers())
    }

    /// Cached images, asking distrobox again if the cache is empty.
    pub fn list_available_images(&mut self) -> &[AvailableImage] {
        if self.images.is_empty() {
            self.images = fetch_images(&self.runner);
        }
        &self.images
    }

    pub fn list_available_images_json(&mut self) -> String {
        distro::to_json(self.list_available_images())
    }

    /// `extra_args` is split like a shell would and every word re-quoted.
    pub fn create_container(&self, name: &str, image: &str, extra_args: &str) -> bool {
        if name.is_empty() || image.is_empty() {
            log::warn!("create needs both a name and an image");
            return false;
        }
        let Some(extra) = shlex::split(extra_args) else {
            log::warn!("unbalanced quotes in extra arguments: {}", extra_args);
            return false;
        };
        self.run_ok(&distro::create_command(name, image, &extra))
    }

    pub fn enter_container(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.open_terminal(&distro::enter_command(name), None)
    }

    pub fn remove_container(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.run_ok(&distro::remove_command(name))
    }

    /// Stops `source` and clones it in a terminal; `CloneFinished` follows when it closes.
    pub fn clone_container(&self, source: &str, clone_name: Option<&str>) -> bool {
        let clone = clone_name
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{source}-clone"));
        let events = self.events.clone();
        let name = clone.clone();
        let done: OnFinished = Box::new(move |success| {
            let _ = events.send(ManagerEvent::CloneFinished { name, success });
        });
        if source.is_empty() {
            done(false);
            return false;
        }
        let command = shell::bash(&with_pause(&distro::clone_command(source, &clone)));
        self.open_terminal(&command, Some(done))
    }

    /// Runs `distrobox assemble create` for an ini file, possibly a portal path.
    pub fn assemble_container(&self, ini_path: &str) -> bool {
        let file = portal::resolve_host_path(strip_file_uri(ini_path));
        let events = self.events.clone();
        let reported = file.clone();
        let done: OnFinished = Box::new(move |success| {
            let _ = events.send(ManagerEvent::AssembleFinished { file: reported, success });
        });
        if file.is_empty() {
            done(false);
            return false;
        }
        let command = shell::bash(&with_pause(&distro::assemble_command(&file)));
        self.open_terminal(&command, Some(done))
    }

    pub fn upgrade_container(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.open_terminal(&shell::bash(&with_pause(&distro::upgrade_command(Some(name)))), None)
    }

    pub fn upgrade_all_containers(&self) -> bool {
        self.open_terminal(&shell::bash(&with_pause(&distro::upgrade_command(None))), None)
    }

    /// Host launcher for one container, or for all of them.
    pub fn generate_entry(&self, name: Option<&str>) -> bool {
        self.run_ok(&distro::generate_entry_command(name.filter(|n| !n.is_empty())))
    }

    /// Installs a local package file with the container's package manager, in a terminal.
    pub fn install_package(&self, name: &str, package_path: &str, image: &str) -> bool {
        if name.is_empty() || package_path.is_empty() {
            return false;
        }
        let path = portal::resolve_host_path(strip_file_uri(package_path));
        let Some(install) = packages::install_command(image, &path) else {
            log::info!("no known package manager for image {:?}", image);
            let script = format!("echo {}; read -n 1", quote(UNSUPPORTED_PACKAGE));
            return self.open_terminal(&shell::bash(&script), None);
        };
        let command = format!("distrobox enter {} -- {}", quote(name), shell::bash(&with_pause(&install)));
        self.open_terminal(&command, None)
    }

    /// Apps inside `container` that show up in menus, with icons copied to the host.
    pub fn all_apps(&mut self, container: &str) -> Vec<AvailableApp> {
        if container.is_empty() {
            return Vec::new();
        }
        let out = self.runner.run(&shell::in_container(container, LIST_APPS));
        if !out.success {
            log::warn!("listing applications in {} failed", container);
            return Vec::new();
        }

        let mut apps = Vec::new();
        for path in out.stdout.lines().map(str::trim) {
            if !path.ends_with(".desktop") {
                continue;
            }
            let read = self.runner.run(&shell::in_container(container, &format!("cat {}", quote(path))));
            if !read.success {
                log::debug!("could not read {} in {}", path, container);
                continue;
            }
            let entry = DesktopEntry::parse(&read.stdout);
            if entry.no_display {
                log::trace!("{} is hidden, skipping", path);
                continue;
            }
            let basename = desktop::container_basename(path);
            let mut app = App::from_entry(basename, &entry);
            app.generic_name = entry.generic_name.clone();
            app.source_file = Some(path.to_string());
            app.icon_source_path = self
                .icons
                .get_or_fetch(&self.runner, container, basename, &app.icon)
                .map(|p| p.to_string_lossy().into_owned());
            log::debug!("app {} ({}) from {}", app.name, basename, path);
            apps.push(app);
        }
        log::debug!("{} apps in {}", apps.len(), container);
        apps
    }

    pub fn exported_apps(&self, container: &str) -> Vec<ExportedApp> {
        if container.is_empty() {
            return Vec::new();
        }
        desktop::scan_exported(&self.host.application_dirs(), container)
    }

    pub fn export_app(&self, basename: &str, container: &str) -> bool {
        if basename.is_empty() || container.is_empty() {
            return false;
        }
        let entry = format!("{CONTAINER_APPS_DIR}/{basename}.desktop");
        self.run_ok(&distro::export_command(container, &entry, false))
    }

    /// Removes the host entry for `basename` exported from `container`.
    ///
    /// `distrobox-export --delete` also removes files other containers' exports of
    /// the same app rely on, so it only runs when no other container exports it.
    /// If that cannot be established, only this container's entry is removed.
    pub fn unexport_app(&self, basename: &str, container: &str) -> bool {
        if basename.is_empty() || container.is_empty() {
            return false;
        }
        let dirs = self.host.application_dirs();
        let shared = match self.fetch_containers() {
            Some(containers) => {
                let others: Vec<String> =
                    containers.into_iter().map(|c| c.name).filter(|n| n != container).collect();
                desktop::exported_by_any(&dirs, basename, &others)
                    || desktop::exported_elsewhere(&dirs, basename, container)
            }
            None => true,
        };
        if shared {
            log::info!("{} may be exported by another container, removing only {}'s entry", basename, container);
            return self.remove_exported_entry(basename, container);
        }

        let full_path = format!("{CONTAINER_APPS_DIR}/{basename}.desktop");
        for target in [basename, full_path.as_str()] {
            if self.runner.run(&distro::export_command(container, target, true)).success {
                return true;
            }
            log::debug!("unexport with {} failed", target);
        }
        self.remove_exported_entry(basename, container)
    }

    fn remove_exported_entry(&self, basename: &str, container: &str) -> bool {
        let path = self
            .host
            .user_applications_dir()
            .join(desktop::exported_file_name(container, basename));
        if !path.exists() {
            log::warn!("{} does not exist", path.display());
            return false;
        }
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("removing {}: {}", path.display(), err);
                false
            }
        }
    }

    pub fn distro_color(&self, image: &str) -> String {
        colors::color_for(image)
    }

    pub fn container_icon(&self, container: &str) -> String {
        icons::resolve_icon(&self.host, container)
    }
}
