use serde::{Deserialize, Serialize};

use crate::shell::quote;

/// A Distrobox container as shown by `distrobox list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
}

/// An image offered by `distrobox create -C`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableImage {
    #[serde(rename = "display")]
    pub display_name: String,
    #[serde(rename = "full")]
    pub full_name: String,
}

pub const LIST_COMMAND: &str = "distrobox list --no-color";
pub const IMAGES_COMMAND: &str = "distrobox create -C";

/// Parse the pipe table printed by `distrobox list`.
///
/// The header row ("ID | NAME | STATUS | IMAGE") tells which columns hold the name
/// and the image. Without a header the first and last columns are used.
pub fn parse_container_list(s: &str) -> Vec<Container> {
    let mut columns: Option<(usize, usize)> = None;
    let mut containers = Vec::new();
    for line in s.lines() {
        let t = line.trim();
        if t.is_empty() || !t.contains('|') {
            continue;
        }
        let cols: Vec<&str> = t.split('|').map(str::trim).collect();
        // Separator rows like "+----+"
        if cols.iter().all(|c| c.chars().all(|ch| ch == '-' || ch == '+')) {
            continue;
        }
        if columns.is_none() {
            let name = cols.iter().position(|c| c.eq_ignore_ascii_case("NAME"));
            let image = cols.iter().position(|c| c.eq_ignore_ascii_case("IMAGE"));
            if let (Some(name), Some(image)) = (name, image) {
                columns = Some((name, image));
                continue;
            }
        }
        let (name_col, image_col) = columns.unwrap_or((0, cols.len() - 1));
        let name = cols.get(name_col).copied().unwrap_or_default();
        let image = cols.get(image_col).copied().unwrap_or_default();
        if name.is_empty() || image.is_empty() || name_col == image_col {
            log::trace!("skipping list row {:?}", t);
            continue;
        }
        containers.push(Container { name: name.to_string(), image: image.to_string() });
    }
    containers
}

/// One image per non-empty line; display and full names are the same.
pub fn parse_image_list(s: &str) -> Vec<AvailableImage> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| AvailableImage { display_name: l.to_string(), full_name: l.to_string() })
        .collect()
}

/// JSON array for the presentation layer; `[]` when there is nothing to show.
pub fn to_json<T: Serialize>(items: &[T]) -> String {
    if items.is_empty() {
        return "[]".into();
    }
    serde_json::to_string_pretty(items).unwrap_or_else(|err| {
        log::warn!("serializing list: {}", err);
        "[]".into()
    })
}

pub fn create_command(name: &str, image: &str, extra_args: &[String]) -> String {
    let mut cmd = format!("distrobox create --name {} --image {} --yes", quote(name), quote(image));
    for arg in extra_args {
        cmd.push(' ');
        cmd.push_str(&quote(arg));
    }
    cmd
}

pub fn enter_command(name: &str) -> String {
    format!("distrobox enter {}", quote(name))
}

pub fn remove_command(name: &str) -> String {
    format!("distrobox rm -f {}", quote(name))
}

pub fn clone_command(source: &str, clone: &str) -> String {
    format!(
        "distrobox-stop {src} -Y && distrobox create --clone {src} --name {clone}",
        src = quote(source),
        clone = quote(clone)
    )
}

pub fn upgrade_command(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("distrobox upgrade {}", quote(name)),
        None => "distrobox upgrade --all".into(),
    }
}

pub fn generate_entry_command(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("distrobox generate-entry {}", quote(name)),
        None => "distrobox generate-entry -a".into(),
    }
}

pub fn assemble_command(file: &str) -> String {
    format!("distrobox assemble create --file {}", quote(file))
}

/// `distrobox-export --app` run inside `container`.
pub fn export_command(container: &str, app: &str, delete: bool) -> String {
    let mut cmd = format!("distrobox enter {} -- distrobox-export --app {}", quote(container), quote(app));
    if delete {
        cmd.push_str(" --delete");
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headerless_rows_use_first_and_last_columns() {
        let boxes = parse_container_list("box1|busy|img1|fedora:39\nbox2|busy|img2|ubuntu:24.04");
        let json: serde_json::Value = serde_json::from_str(&to_json(&boxes)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"name": "box1", "image": "fedora:39"},
                {"name": "box2", "image": "ubuntu:24.04"}
            ])
        );
    }

    #[test]
    fn header_locates_columns() {
        let out = "ID           | NAME                 | STATUS             | IMAGE\n\
                   3d5b2c1a0f9e | fedora-39            | Up 2 hours         | registry.fedoraproject.org/fedora-toolbox:39\n\
                   7a8b9c0d1e2f | ubuntu               | Exited (0) 3 days  | quay.io/toolbx/ubuntu-toolbox:24.04\n";
        let boxes = parse_container_list(out);
        assert_eq!(
            boxes,
            vec![
                Container { name: "fedora-39".into(), image: "registry.fedoraproject.org/fedora-toolbox:39".into() },
                Container { name: "ubuntu".into(), image: "quay.io/toolbx/ubuntu-toolbox:24.04".into() },
            ]
        );
    }

    #[test]
    fn empty_or_garbage_output_is_an_empty_list() {
        assert!(parse_container_list("").is_empty());
        assert!(parse_container_list("ID | NAME | STATUS | IMAGE\n").is_empty());
        assert!(parse_container_list("command not found\n").is_empty());
        assert_eq!(to_json::<Container>(&[]), "[]");
    }

    #[test]
    fn images_serialize_as_display_and_full() {
        let images = parse_image_list("\nregistry.fedoraproject.org/fedora-toolbox:39\n  docker.io/library/debian:stable \n");
        assert_eq!(images.len(), 2);
        let json: serde_json::Value = serde_json::from_str(&to_json(&images)).unwrap();
        assert_eq!(json[1], serde_json::json!({"display": "docker.io/library/debian:stable", "full": "docker.io/library/debian:stable"}));
    }

    #[test]
    fn commands_quote_user_input() {
        assert_eq!(
            create_command("my box", "fedora", &["--home".into(), "/tmp/my home".into(), "--init".into()]),
            "distrobox create --name 'my box' --image fedora --yes --home '/tmp/my home' --init"
        );
        assert_eq!(remove_command("x; rm -rf ~"), "distrobox rm -f 'x; rm -rf ~'");
        assert_eq!(clone_command("arch", "arch-clone"), "distrobox-stop arch -Y && distrobox create --clone arch --name arch-clone");
        assert_eq!(upgrade_command(None), "distrobox upgrade --all");
        assert_eq!(generate_entry_command(Some("arch")), "distrobox generate-entry arch");
        assert_eq!(generate_entry_command(None), "distrobox generate-entry -a");
        assert_eq!(
            export_command("arch", "firefox", true),
            "distrobox enter arch -- distrobox-export --app firefox --delete"
        );
    }
}
