mod cli;
mod colors;
mod config;
mod desktop;
mod distro;
mod host;
mod icon_cache;
mod icons;
mod manager;
mod packages;
mod portal;
mod shell;
mod table;
mod terminal;
#[cfg(test)]
mod testing;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
