use std::path::{Path, PathBuf};

use crate::error::MergeError;

pub const LEGACY_DETAIL_NAME: &str = "对账中心-明细";
pub const DETAIL_NAME: &str = "账务中心-明细";

/// Rename every file under `dir` (recursively) whose name contains
/// `对账中心-明细` so it contains `账务中心-明细` instead. Only the first
/// occurrence in a name is replaced. Returns the number of files renamed.
///
/// A file whose new name is already taken is left alone.
pub fn rename_bill_details(dir: &Path) -> Result<usize, MergeError> {
    if !dir.is_dir() {
        return Err(MergeError::SourceRootMissing(dir.to_path_buf()));
    }

    let pattern = format!(
        "{}/**/*{}*",
        glob::Pattern::escape(&dir.to_string_lossy()),
        LEGACY_DETAIL_NAME
    );

    let mut renamed = 0;
    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                log::warn!("cannot inspect {}: {}", e.path().display(), e.error());
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let Some(target) = renamed_path(&path) else {
            continue;
        };
        if target.exists() {
            log::warn!("{} already exists, leaving {} as is", target.display(), path.display());
            continue;
        }

        std::fs::rename(&path, &target).map_err(|source| MergeError::Rename {
            from: path.clone(),
            to: target.clone(),
            source,
        })?;
        log::info!("renamed {} -> {}", path.display(), target.display());
        renamed += 1;
    }

    log::info!("{} bill detail files renamed under {}", renamed, dir.display());
    Ok(renamed)
}

fn renamed_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    if !name.contains(LEGACY_DETAIL_NAME) {
        return None;
    }
    Some(path.with_file_name(name.replacen(LEGACY_DETAIL_NAME, DETAIL_NAME, 1)))
}
