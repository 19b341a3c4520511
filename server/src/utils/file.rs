//! File path helpers

use std::path::{Path, PathBuf};

/// Resolve a user-supplied path (config file, schema file) to an absolute path.
///
/// `~` and `~/...` expand to the home directory. Relative paths are joined to
/// the current working directory. Blank input resolves to the working directory.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    let cwd = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if path.is_empty() {
        return cwd();
    }

    let expanded = match path.strip_prefix('~') {
        Some("") => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => dirs::home_dir()
            .map(|home| home.join(&rest[1..]))
            .unwrap_or_else(|| PathBuf::from(path)),
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        cwd().join(expanded)
    } else {
        expanded
    }
}

/// Display form of a path relative to the working directory when possible
pub fn display_relative(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_absolute_unchanged() {
        assert_eq!(
            expand_path("/etc/querygate.json"),
            PathBuf::from("/etc/querygate.json")
        );
    }

    #[test]
    fn test_relative_joined_to_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("schema.sql"), cwd.join("schema.sql"));
        assert_eq!(expand_path("./db/schema.sql"), cwd.join("./db/schema.sql"));
    }

    #[test]
    fn test_blank_is_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path(""), cwd);
        assert_eq!(expand_path("   "), cwd);
    }

    #[test]
    fn test_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/querygate.json"), home.join("querygate.json"));
        }
    }

    #[test]
    fn test_tilde_user_form_is_relative() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(expand_path("~other/x"), cwd.join("~other/x"));
    }

    #[test]
    fn test_display_relative() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(display_relative(&cwd.join("querygate.json")), "querygate.json");
    }
}
