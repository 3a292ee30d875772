use std::fs::File;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::core::error::{LauncherError, LauncherResult};

/// Archive container recognised by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Unpack `archive` into `destination`, keeping the archive's own layout.
pub fn extract_archive(
    archive: &Path,
    format: ArchiveFormat,
    destination: &Path,
) -> LauncherResult<()> {
    std::fs::create_dir_all(destination)
        .map_err(|source| LauncherError::io(destination, source))?;
    match format {
        ArchiveFormat::Zip => extract_zip(archive, destination),
        ArchiveFormat::TarGz => extract_tar_gz(archive, destination),
    }
}

fn extract_zip(archive_path: &Path, destination: &Path) -> LauncherResult<()> {
    let file = File::open(archive_path).map_err(|source| LauncherError::io(archive_path, source))?;
    let mut archive = zip::ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let Some(relative) = zipped.enclosed_name() else {
            return Err(LauncherError::PathEscape {
                root: destination.to_path_buf(),
                path: zipped.name().to_string(),
            });
        };
        let out_path = destination.join(relative);

        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path)
                .map_err(|source| LauncherError::io(&out_path, source))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::io(parent, source))?;
        }
        let mut out =
            File::create(&out_path).map_err(|source| LauncherError::io(&out_path, source))?;
        std::io::copy(&mut zipped, &mut out)
            .map_err(|source| LauncherError::io(&out_path, source))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = zipped.unix_mode() {
                std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode & 0o777))
                    .map_err(|source| LauncherError::io(&out_path, source))?;
            }
        }
    }

    Ok(())
}

fn extract_tar_gz(archive_path: &Path, destination: &Path) -> LauncherResult<()> {
    let file = File::open(archive_path).map_err(|source| LauncherError::io(archive_path, source))?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    // `unpack` refuses entries that would land outside `destination`.
    archive
        .unpack(destination)
        .map_err(|source| LauncherError::io(destination, source))
}

/// Mark `path` executable (rwxr-xr-x). No-op off Unix.
pub fn ensure_executable(path: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|source| LauncherError::io(path, source))?
            .permissions();
        if perms.mode() & 0o111 != 0o111 {
            perms.set_mode(perms.mode() | 0o755);
            std::fs::set_permissions(path, perms)
                .map_err(|source| LauncherError::io(path, source))?;
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
