use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user's home directory ({0} is not set)")]
    NoHome(&'static str),

    #[error("cannot determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(windows)]
const HOME_ENV: &str = "APPDATA";
#[cfg(not(windows))]
const HOME_ENV: &str = "HOME";

fn platform_home() -> Result<PathBuf, HomeDirError> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::NoHome(HOME_ENV))
}

/// Resolve the server home directory into an absolute path.
///
/// - `None` => `<platform home>/<default_subdir>`
/// - `~` or `~/x` => expanded against the platform home
/// - relative paths => joined onto the current directory
///
/// With `create`, the directory is created when missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match configured.as_deref().map(str::trim) {
        None | Some("") => platform_home()?.join(default_subdir),
        Some("~") => platform_home()?,
        Some(p) if p.starts_with("~/") || p.starts_with("~\\") => platform_home()?.join(&p[2..]),
        Some(p) => absolutize(Path::new(p))?,
    };

    if create {
        std::fs::create_dir_all(&path).map_err(|source| HomeDirError::Create {
            path: path.to_string_lossy().into_owned(),
            source,
        })?;
    }

    Ok(path)
}

fn absolutize(p: &Path) -> Result<PathBuf, HomeDirError> {
    if p.is_absolute() {
        Ok(p.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .map_err(HomeDirError::CurrentDir)?
            .join(p))
    }
}
