//! `.env` loading.
//!
//! Values already present in the process environment always win.

use std::path::{Path, PathBuf};

/// Outcome of looking for a `.env` file.
#[derive(Debug)]
pub enum DotenvStatus {
    /// The file was found and applied.
    Loaded(PathBuf),
    /// No `.env` exists at or above the start directory.
    NotFound,
    /// The nearest `.env` could not be parsed. Lines before the bad one may
    /// already have been applied; ancestors are not consulted.
    Invalid {
        /// File that failed.
        path: PathBuf,
        /// Parser error.
        error: dotenvy::Error,
    },
}

/// Load the nearest `.env` at or above the current directory.
///
/// Runs before logging is configured, so the caller reports the outcome.
#[must_use]
pub fn load_dotenv() -> DotenvStatus {
    match std::env::current_dir() {
        Ok(cwd) => load_dotenv_from(&cwd),
        Err(_) => DotenvStatus::NotFound,
    }
}

/// Load the nearest `.env` at or above `start`.
#[must_use]
pub fn load_dotenv_from(start: &Path) -> DotenvStatus {
    let Some(path) = start
        .ancestors()
        .map(|dir| dir.join(".env"))
        .find(|path| path.is_file())
    else {
        return DotenvStatus::NotFound;
    };

    match dotenvy::from_path(&path) {
        Ok(()) => DotenvStatus::Loaded(path),
        Err(error) => DotenvStatus::Invalid { path, error },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_nearest_ancestor_file() {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join(".env"),
            "MCP_TOOL_SERVER_DOTENV_TEST=loaded\n",
        )
        .unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let status = load_dotenv_from(&nested);

        assert!(matches!(status, DotenvStatus::Loaded(ref path) if *path == root.path().join(".env")));
        assert_eq!(
            std::env::var("MCP_TOOL_SERVER_DOTENV_TEST").unwrap(),
            "loaded"
        );
    }

    #[test]
    fn existing_variables_are_not_overridden() {
        let before = std::env::var_os("PATH").unwrap();
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "PATH=/from-dotenv\nMCP_TOOL_SERVER_DOTENV_FRESH=fresh\n",
        )
        .unwrap();

        let status = load_dotenv_from(dir.path());

        assert!(matches!(status, DotenvStatus::Loaded(_)));
        assert_eq!(std::env::var_os("PATH").unwrap(), before);
        assert_eq!(
            std::env::var("MCP_TOOL_SERVER_DOTENV_FRESH").unwrap(),
            "fresh"
        );
    }

    #[test]
    fn unparseable_file_stops_the_search() {
        let root = tempfile::tempdir().unwrap();
        fs::write(
            root.path().join(".env"),
            "MCP_TOOL_SERVER_DOTENV_ANCESTOR=used\n",
        )
        .unwrap();
        let nested = root.path().join("child");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join(".env"), "this is not a valid line\n").unwrap();

        let status = load_dotenv_from(&nested);

        assert!(
            matches!(status, DotenvStatus::Invalid { ref path, .. } if *path == nested.join(".env"))
        );
        assert!(std::env::var("MCP_TOOL_SERVER_DOTENV_ANCESTOR").is_err());
    }
}
