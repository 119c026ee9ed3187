//! Document portal paths handed to a sandboxed app, mapped back to the real host file.

use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("path contains a NUL byte")]
    Nul,

    #[error("reading host path attribute: {0}")]
    Attr(#[from] io::Error),

    #[error("host path attribute is not UTF-8")]
    Utf8,
}

/// Set by xdg-document-portal on every file it exports.
pub const HOST_PATH_ATTR: &str = "user.document-portal.host-path";

pub fn is_portal_path(path: &str) -> bool {
    if path.starts_with("/run/flatpak/doc/") {
        return true;
    }
    // /run/user/<uid>/doc/<id>/<file>
    let mut parts = path.split('/');
    parts.next() == Some("")
        && parts.next() == Some("run")
        && parts.next() == Some("user")
        && parts.next().is_some_and(|uid| !uid.is_empty())
        && parts.next() == Some("doc")
        && parts.next().is_some_and(|id| !id.is_empty())
}

/// Real host path for a portal path; anything else, or an unreadable attribute,
/// comes back unchanged.
pub fn resolve_host_path(path: &str) -> String {
    if !is_portal_path(path) {
        return path.to_string();
    }
    match read_host_path(Path::new(path)) {
        Ok(host) if !host.is_empty() => {
            log::debug!("portal path {} -> {}", path, host);
            host
        }
        Ok(_) => path.to_string(),
        Err(err) => {
            log::warn!("could not resolve portal path {}: {}", path, err);
            path.to_string()
        }
    }
}

#[cfg(target_os = "linux")]
fn read_host_path(path: &Path) -> Result<String, PortalError> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| PortalError::Nul)?;
    let c_name = CString::new(HOST_PATH_ATTR).map_err(|_| PortalError::Nul)?;
    let mut buf = vec![0u8; libc::PATH_MAX as usize];
    let len = unsafe {
        libc::getxattr(
            c_path.as_ptr(),
            c_name.as_ptr(),
            buf.as_mut_ptr().cast::<libc::c_void>(),
            buf.len(),
        )
    };
    if len < 0 {
        return Err(io::Error::last_os_error().into());
    }
    buf.truncate(len as usize);
    while buf.last() == Some(&0) {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| PortalError::Utf8)
}

#[cfg(not(target_os = "linux"))]
fn read_host_path(_path: &Path) -> Result<String, PortalError> {
    Err(io::Error::from(io::ErrorKind::Unsupported).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_portal_mounts() {
        assert!(is_portal_path("/run/user/1000/doc/8a1f2c/box.ini"));
        assert!(is_portal_path("/run/flatpak/doc/8a1f2c/box.ini"));
        assert!(!is_portal_path("/run/user/1000/docs/box.ini"));
        assert!(!is_portal_path("/run/user/1000/doc/"));
        assert!(!is_portal_path("/home/me/box.ini"));
        assert!(!is_portal_path("run/user/1000/doc/x/box.ini"));
    }

    #[test]
    fn ordinary_paths_pass_through() {
        assert_eq!(resolve_host_path("/home/me/pkg.rpm"), "/home/me/pkg.rpm");
    }

    #[test]
    fn unreadable_portal_path_passes_through() {
        let missing = "/run/user/4294967294/doc/nope/pkg.rpm";
        assert_eq!(resolve_host_path(missing), missing);
    }
}
