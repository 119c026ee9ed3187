//! Brand colors for distribution images.

use once_cell::sync::Lazy;
use rand::Rng;

use crate::table::PatternTable;

static DISTRO_COLORS: Lazy<PatternTable<&'static str>> = Lazy::new(|| {
    PatternTable::new([
        // Major distributions
        ("fedora|bluefin|ublue-os/fedora|fedoraproject\\.org/fedora", "#3c6eb4"),
        ("ubuntu|toolbx/ubuntu|ubuntu-toolbox", "#e95420"),
        ("debian|neurodebian", "#d70a53"),
        ("opensuse|tumbleweed|leap", "#73ba25"),
        ("arch|blackarch|ublue-os/arch|bazzite-arch|arch-toolbox", "#1793d1"),
        ("centos|rhel|rocky|alma|ubi[789]?/|amazonlinux", "#262577"),
        // Everything else
        ("gentoo", "#54487a"),
        ("alpine", "#0d597f"),
        ("kali", "#367bf0"),
        ("mint", "#87cf3e"),
        ("void", "#478061"),
        ("nixos", "#5277c3"),
        ("deepin|linuxdeepin", "#0188D7"),
        ("crystal", "#1E63A4"),
        ("clear", "#003366"),
        ("slack", "#333333"),
        ("steamos", "#1A9FFF"),
        ("vanilla", "#0F0F0F"),
        ("wolfi|chainguard", "#007D9C"),
        ("oracle", "#C74634"),
        ("kde|neon", "#1D99F3"),
    ])
});

/// Hex color for an image. Unknown images get a fresh random pastel on every call.
pub fn color_for(image: &str) -> String {
    color_for_with(image, &mut rand::rng())
}

pub fn color_for_with<R: Rng + ?Sized>(image: &str, rng: &mut R) -> String {
    if let Some(color) = DISTRO_COLORS.lookup(image) {
        return (*color).to_string();
    }
    let r: u8 = rng.random_range(100..=200);
    let g: u8 = rng.random_range(100..=200);
    let b: u8 = rng.random_range(100..=200);
    format!("#{r:02x}{g:02x}{b:02x}")
}
