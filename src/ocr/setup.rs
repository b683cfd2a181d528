use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

use crate::log;

/// Homebrew install locations (Apple Silicon, then Intel).
const COMMON_EXECUTABLES: [&str; 2] = ["/opt/homebrew/bin/tesseract", "/usr/local/bin/tesseract"];
const COMMON_TESSDATA: [&str; 2] = ["/opt/homebrew/share/tessdata", "/usr/local/share/tessdata"];

/// Returns the per-user directory checked for a private tessdata copy.
pub fn get_user_tessdata_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autofight")
        .join("tessdata")
}

/// Finds the Tesseract executable: configured path first, then PATH, then
/// common install locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!(
            "Configured tesseract_path does not exist: {}",
            path.display()
        ));
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in &COMMON_EXECUTABLES {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install it with `brew install tesseract`."
    ))
}

/// Finds a tessdata directory containing `eng.traineddata`.
///
/// Returns `None` when only Tesseract's built-in default is available.
pub fn find_tessdata_dir() -> Option<PathBuf> {
    let user_dir = get_user_tessdata_dir();
    if has_eng(&user_dir) {
        return Some(user_dir);
    }

    // Check TESSDATA_PREFIX environment variable
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let p = PathBuf::from(&prefix);
        if has_eng(&p) {
            return Some(p);
        }
        let p = p.join("tessdata");
        if has_eng(&p) {
            return Some(p);
        }
    }

    COMMON_TESSDATA
        .iter()
        .map(PathBuf::from)
        .find(|p| has_eng(p))
}

fn has_eng(dir: &Path) -> bool {
    dir.join("eng.traineddata").exists()
}

/// Locates Tesseract and its data once at startup.
pub fn ensure_tesseract(configured: Option<&Path>) -> Result<(PathBuf, Option<PathBuf>)> {
    let executable = find_tesseract_executable(configured)?;
    let tessdata = find_tessdata_dir();
    log(&format!(
        "Tesseract: {} (tessdata: {})",
        executable.display(),
        tessdata
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "default".to_string())
    ));
    Ok((executable, tessdata))
}
