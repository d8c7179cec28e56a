//! File copying into a bundle

use camino::Utf8Path;
use walkdir::WalkDir;

use super::BundleTree;
use crate::{Error, Result};

/// Copy the regular files of an installed file list into the bundle
///
/// `files` are absolute paths as reported by the package manager. They are
/// read relative to `sysroot` and written to the same relative location under
/// the bundle root. Directories, missing entries and broken symlinks are
/// skipped. Returns the number of files copied.
pub fn copy_installed_files<P>(tree: &BundleTree, sysroot: &Utf8Path, files: &[P]) -> Result<usize>
where
    P: AsRef<Utf8Path>,
{
    let mut copied = 0;

    for file in files {
        let file = file.as_ref();
        let relative = file.strip_prefix("/").unwrap_or(file);
        let src = sysroot.join(relative);

        // is_file follows symlinks, so broken links fall out here too
        if !src.is_file() {
            continue;
        }

        let dst = tree.rebase(file);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        replace_with_copy(&src, &dst)?;
        copied += 1;
    }

    Ok(copied)
}

/// Copy one package's entry of an install space, e.g. `share/<pkg>`
///
/// `src` may be a single file or a directory tree. Directory trees are walked
/// in file name order and symlinks are recreated rather than followed, so
/// relative links inside the install space keep pointing at bundled files.
/// Returns the number of files and links written.
pub fn copy_install_tree(src: &Utf8Path, dst: &Utf8Path) -> Result<usize> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !src.is_dir() {
        replace_with_copy(src, dst)?;
        return Ok(1);
    }

    let mut written = 0;
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::bundle(
                format!("Failed to walk install space {}: {}", src, e),
                "Check that the install space is readable",
            )
        })?;
        let relative = entry.path().strip_prefix(src).map_err(|_| {
            Error::bundle(
                format!("{} is outside {}", entry.path().display(), src),
                "This is an unexpected internal error",
            )
        })?;
        let relative = Utf8Path::from_path(relative).ok_or_else(|| {
            Error::bundle(
                format!("Install space path is not valid UTF-8: {:?}", entry.path()),
                "Rename the file to a UTF-8 name",
            )
        })?;
        let target = dst.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
            continue;
        }
        if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            remove_existing(&target)?;
            std::os::unix::fs::symlink(link, &target)?;
        } else {
            replace_with_copy(&src.join(relative), &target)?;
        }
        tracing::trace!(file = %relative, "Copied install file");
        written += 1;
    }

    Ok(written)
}

fn remove_existing(path: &Utf8Path) -> Result<()> {
    if path.is_symlink() || path.is_file() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

fn replace_with_copy(src: &Utf8Path, dst: &Utf8Path) -> Result<()> {
    remove_existing(dst)?;
    std::fs::copy(src, dst)?;
    Ok(())
}
