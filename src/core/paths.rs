use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base config directory (~/.config/carryover/, %APPDATA%\carryover on Windows)
pub fn carryover() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows".to_string())
        })?;
        Ok(PathBuf::from(appdata).join("carryover"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("carryover"))
    }
}

/// Global carryover.json config file path
pub fn carryover_json() -> Result<PathBuf> {
    Ok(carryover()?.join("carryover.json"))
}

/// Remembered search dialog values
pub fn preferences_json() -> Result<PathBuf> {
    Ok(carryover()?.join("preferences.json"))
}

/// Expand a leading `~` in a user-supplied path.
pub fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_files_live_in_carryover_dir() {
        let base = carryover().unwrap();
        assert_eq!(carryover_json().unwrap().parent().unwrap(), base);
        assert_eq!(preferences_json().unwrap().parent().unwrap(), base);
    }

    #[cfg(not(windows))]
    #[test]
    fn expand_resolves_home() {
        let home = env::var("HOME").unwrap();
        assert_eq!(expand("~/src"), PathBuf::from(home).join("src"));
        assert_eq!(expand("relative/dir"), PathBuf::from("relative/dir"));
    }
}
