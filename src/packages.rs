use once_cell::sync::Lazy;

use crate::shell::quote;
use crate::table::PatternTable;

static INSTALLERS: Lazy<PatternTable<&'static str>> = Lazy::new(|| {
    PatternTable::new([
        ("fedora|bluefin|ublue-os/fedora|fedoraproject\\.org/fedora", "sudo dnf install"),
        ("ubuntu|toolbx/ubuntu|ubuntu-toolbox|debian|neurodebian|mint|kali|neon", "sudo apt install"),
        ("opensuse|tumbleweed|leap", "sudo zypper install"),
        ("arch|blackarch|ublue-os/arch|bazzite-arch|arch-toolbox", "sudo pacman -U --noconfirm"),
        ("centos|rhel|rocky|alma|ubi[789]?/|amazonlinux|oracle", "sudo dnf install"),
        ("alpine", "sudo apk add --allow-untrusted"),
        ("void", "sudo xbps-install"),
        ("gentoo", "sudo emerge"),
        ("slack", "sudo installpkg"),
        ("wolfi|chainguard", "sudo apk add --allow-untrusted"),
    ])
});

/// Native install command for a local package file, or `None` for unknown distributions.
pub fn install_command(image: &str, package_path: &str) -> Option<String> {
    INSTALLERS
        .lookup(image)
        .map(|installer| format!("{} {}", installer, quote(package_path)))
}
