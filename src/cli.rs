use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config;
use crate::host::Host;
use crate::manager::{ContainerManager, ManagerEvent};
use crate::terminal::TerminalLauncher;

#[derive(Parser, Debug)]
#[command(name = "kontainer", version, about = "Manage Distrobox containers: create, enter, clone, upgrade and export their apps.")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Return as soon as terminal windows are opened instead of waiting for them
    #[arg(long, global = true, default_value_t = false)]
    detach: bool,
    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List containers or the images distrobox can create
    List(ListArgs),
    /// Create a container from an image
    Create(CreateArgs),
    /// Open a terminal inside a container
    Enter(NameArg),
    /// Remove a container (forced)
    Rm(NameArg),
    /// Stop a container and clone it
    Clone(CloneArgs),
    /// Create containers from a distrobox assemble ini file
    Assemble(FileArg),
    /// Upgrade one container, or all of them
    Upgrade(UpgradeArgs),
    /// Generate host launchers for one container, or all of them
    GenerateEntry(OptionalNameArg),
    /// Install a local package file into a container
    Install(InstallArgs),
    /// List apps inside a container, or the ones exported to the host
    Apps(AppsArgs),
    /// Export a container app to the host menu
    Export(AppArg),
    /// Remove an exported app from the host menu
    Unexport(AppArg),
    /// Print the accent color for an image
    Color(ImageArg),
    /// Print the icon for a container
    Icon(NameArg),
    /// Check environment (distrobox, container runtime, terminal, sandbox)
    Doctor,
    /// Show or change settings
    Config { #[command(subcommand)] cmd: ConfigCmd },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// What to list
    #[arg(value_enum, default_value_t = ListTarget::Containers)]
    target: ListTarget,
    /// Print JSON instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListTarget { Containers, Images }

#[derive(Args, Debug)]
pub struct NameArg {
    /// Container name
    name: String,
}

#[derive(Args, Debug)]
pub struct OptionalNameArg {
    /// Container name; all containers when omitted
    name: Option<String>,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Container name
    name: String,
    /// Image to create it from
    #[arg(short, long)]
    image: String,
    /// Extra arguments passed to `distrobox create`, e.g. "--home /tmp/h --init"
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    args: String,
}

#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Container to clone
    source: String,
    /// Name of the clone (default: <source>-clone)
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
pub struct FileArg {
    /// Path to the file
    file: PathBuf,
}

#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Container name
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    name: Option<String>,
    /// Upgrade every container
    #[arg(long, default_value_t = false)]
    all: bool,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Container name
    container: String,
    /// Package file (.rpm, .deb, .pkg.tar.zst, .apk, ...)
    file: PathBuf,
    /// Image of the container; looked up with `distrobox list` when omitted
    #[arg(long)]
    image: Option<String>,
}

#[derive(Args, Debug)]
pub struct AppsArgs {
    /// Container name
    container: String,
    /// Only apps already exported to the host
    #[arg(long, default_value_t = false)]
    exported: bool,
    /// Print JSON instead of a table
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
pub struct AppArg {
    /// Container name
    container: String,
    /// Desktop file basename inside the container, e.g. org.gnome.Calculator
    app: String,
}

#[derive(Args, Debug)]
pub struct ImageArg {
    /// Image name, e.g. quay.io/toolbx/ubuntu-toolbox:24.04
    image: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCmd {
    /// Print the current settings
    Show,
    /// Set the terminal command line used to open containers
    SetTerminal { command: String },
    /// Set how long to wait when probing the host for a terminal, e.g. "3s"
    SetProbeTimeout { timeout: String },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    let cfg = config::load_config();
    match &cli.command {
        Commands::Doctor => return doctor(&cfg),
        Commands::Config { cmd } => return config_cmd(cmd.clone(), cfg),
        Commands::Color(arg) => {
            println!("{}", crate::colors::color_for(&arg.image));
            return Ok(());
        }
        _ => {}
    }

    let mut manager = ContainerManager::for_host(Host::detect(), &cfg);
    log::debug!("sandboxed: {}", manager.is_sandboxed());
    let events = manager.events();

    let ok = match &cli.command {
        Commands::List(args) => {
            list(&mut manager, args);
            true
        }
        Commands::Create(args) => manager.create_container(&args.name, &args.image, &args.args),
        Commands::Enter(arg) => manager.enter_container(&arg.name),
        Commands::Rm(arg) => manager.remove_container(&arg.name),
        Commands::Clone(args) => manager.clone_container(&args.source, args.name.as_deref()),
        Commands::Assemble(arg) => {
            let file = absolute(&arg.file)?;
            manager.assemble_container(&file)
        }
        Commands::Upgrade(args) => match &args.name {
            Some(name) if !args.all => manager.upgrade_container(name),
            _ => manager.upgrade_all_containers(),
        },
        Commands::GenerateEntry(arg) => manager.generate_entry(arg.name.as_deref()),
        Commands::Install(args) => {
            let file = absolute(&args.file)?;
            let image = match &args.image {
                Some(image) => image.clone(),
                None => manager
                    .list_containers()
                    .into_iter()
                    .find(|c| c.name == args.container)
                    .map(|c| c.image)
                    .ok_or_else(|| anyhow!("container '{}' not found (pass --image)", args.container))?,
            };
            manager.install_package(&args.container, &file, &image)
        }
        Commands::Apps(args) => {
            apps(&mut manager, args);
            true
        }
        Commands::Export(arg) => manager.export_app(&arg.app, &arg.container),
        Commands::Unexport(arg) => manager.unexport_app(&arg.app, &arg.container),
        Commands::Icon(arg) => {
            println!("{}", manager.container_icon(&arg.name));
            true
        }
        Commands::Color(_) | Commands::Doctor | Commands::Config { .. } => true,
    };

    if !cli.detach {
        manager.wait_for_terminals();
    }
    for event in events.try_iter() {
        match event {
            ManagerEvent::CloneFinished { name, success } => {
                println!("clone {}: {}", name, if success { "done" } else { "failed" })
            }
            ManagerEvent::AssembleFinished { file, success } => {
                println!("assemble {}: {}", file, if success { "done" } else { "failed" })
            }
        }
    }

    if ok {
        Ok(())
    } else {
        Err(anyhow!("command failed (run with --log-level debug for details)"))
    }
}

fn list(manager: &mut ContainerManager, args: &ListArgs) {
    match args.target {
        ListTarget::Containers if args.json => println!("{}", manager.list_containers_json()),
        ListTarget::Containers => {
            let containers = manager.list_containers();
            if containers.is_empty() {
                println!("No containers found (is 'distrobox' installed?)");
                return;
            }
            println!("NAME\tIMAGE");
            for c in containers {
                println!("{}\t{}", c.name, c.image);
            }
        }
        ListTarget::Images if args.json => println!("{}", manager.list_available_images_json()),
        ListTarget::Images => {
            for image in manager.list_available_images() {
                println!("{}", image.full_name);
            }
        }
    }
}

fn apps(manager: &mut ContainerManager, args: &AppsArgs) {
    let apps = if args.exported {
        manager.exported_apps(&args.container)
    } else {
        manager.all_apps(&args.container)
    };
    if args.json {
        println!("{}", crate::distro::to_json(&apps));
        return;
    }
    if apps.is_empty() {
        println!("No apps found in '{}'", args.container);
        return;
    }
    println!("BASENAME\tNAME\tICON");
    for app in apps {
        println!("{}\t{}\t{}", app.basename, app.name, app.icon);
    }
}

/// Package and ini paths are handed to distrobox on the host, so make them absolute.
fn absolute(path: &Path) -> Result<String> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().context("resolving current directory")?.join(path)
    };
    if !abs.exists() {
        return Err(anyhow!("file not found: {}", abs.display()));
    }
    Ok(abs.to_string_lossy().into_owned())
}

fn doctor(cfg: &config::Config) -> Result<()> {
    println!("kontainer doctor:");

    let host = Host::detect();
    println!("- sandboxed (flatpak): {}", yes_no(host.sandboxed));
    if host.sandboxed {
        match which::which("flatpak-spawn") {
            Ok(path) => println!("- flatpak-spawn: found at {}", path.display()),
            Err(_) => println!("- flatpak-spawn: NOT FOUND (host commands will fail)"),
        }
    }

    // distrobox itself
    match which::which("distrobox") {
        Ok(path) => println!("- distrobox: found at {}", path.display()),
        Err(_) if host.sandboxed => println!("- distrobox: not visible from the sandbox (checked on the host at run time)"),
        Err(_) => println!("- distrobox: NOT FOUND (install distrobox for full functionality)"),
    }

    // Container runtimes
    let podman = which::which("podman").is_ok();
    let docker = which::which("docker").is_ok();
    println!("- container runtime: podman: {}, docker: {}", yes_no(podman), yes_no(docker));

    let launcher = TerminalLauncher::new(&cfg.terminal, host.sandboxed);
    match launcher.discover() {
        Some(t) => println!("- terminal: {}", t),
        None => println!("- terminal: NONE of {} found (set one with `kontainer config set-terminal`)", launcher.candidates().join(", ")),
    }

    let apps_dir = host.user_applications_dir();
    println!("- applications dir: {}", apps_dir.display());
    println!("- applications dir exists: {}", yes_no(apps_dir.is_dir()));
    println!("- icon cache: {}", host.icon_cache_root().display());
    println!("- config file: {}", config::config_path().display());

    Ok(())
}

fn yes_no(b: bool) -> &'static str { if b { "yes" } else { "no" } }

fn config_cmd(cmd: ConfigCmd, mut cfg: config::Config) -> Result<()> {
    match cmd {
        ConfigCmd::Show => {
            let s = toml::to_string_pretty(&cfg).context("serializing config")?;
            println!("# {}", config::config_path().display());
            print!("{}", s);
        }
        ConfigCmd::SetTerminal { command } => {
            if shlex::split(&command).map_or(true, |parts| parts.is_empty()) {
                return Err(anyhow!("not a usable command line: {:?}", command));
            }
            cfg.terminal.application = Some(command.clone());
            config::save_config(&cfg)?;
            println!("Terminal set to {}", command);
        }
        ConfigCmd::SetProbeTimeout { timeout } => {
            humantime::parse_duration(&timeout).with_context(|| format!("invalid duration '{}'", timeout))?;
            cfg.terminal.probe_timeout = timeout.clone();
            config::save_config(&cfg)?;
            println!("Probe timeout set to {}", timeout);
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel { Trace, Debug, Info, Warn, Error }

fn init_logger(level: Option<LogLevel>) {
    let filter = match level.unwrap_or(LogLevel::Info) {
        LogLevel::Trace => log::LevelFilter::Trace,
        LogLevel::Debug => log::LevelFilter::Debug,
        LogLevel::Info => log::LevelFilter::Info,
        LogLevel::Warn => log::LevelFilter::Warn,
        LogLevel::Error => log::LevelFilter::Error,
    };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(filter);
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn upgrade_needs_a_name_or_all() {
        assert!(Cli::try_parse_from(["kontainer", "upgrade"]).is_err());
        assert!(Cli::try_parse_from(["kontainer", "upgrade", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["kontainer", "upgrade", "arch", "--all"]).is_err());
    }

    #[test]
    fn create_accepts_extra_arguments() {
        let cli = Cli::try_parse_from(["kontainer", "create", "dev", "-i", "fedora:39", "--args", "--init --home /tmp/h"]).unwrap();
        match cli.command {
            Commands::Create(args) => {
                assert_eq!(args.image, "fedora:39");
                assert_eq!(args.args, "--init --home /tmp/h");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn list_defaults_to_containers() {
        let cli = Cli::try_parse_from(["kontainer", "list", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::List(ListArgs { target: ListTarget::Containers, json: true })));
    }

    #[test]
    fn relative_paths_must_exist() {
        assert!(absolute(Path::new("kontainer-test-missing.rpm")).is_err());
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pkg.rpm");
        std::fs::write(&file, "").unwrap();
        assert_eq!(absolute(&file).unwrap(), file.to_string_lossy());
    }
}
