use std::{
    ffi::OsString,
    fs::{self, File},
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tar::Archive;
use zip::read::ZipArchive;

use super::catalog::ArchiveFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The member directory already existed; the archive was not opened.
    Skipped(PathBuf),
    Extracted(PathBuf),
}

impl ExtractOutcome {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ExtractOutcome::Skipped(path) | ExtractOutcome::Extracted(path) => path,
        }
    }
}

#[must_use]
pub fn staging_dir(models_dir: &Path, member_dir: &str) -> PathBuf {
    models_dir.join(format!(".{member_dir}.extracting"))
}

/// Expands `archive_path` into `models_dir`. The archive must contain
/// `member_dir` as a top-level directory; nothing is moved into place otherwise.
pub fn extract(
    archive_path: &Path,
    models_dir: &Path,
    member_dir: &str,
    format: ArchiveFormat,
) -> Result<ExtractOutcome> {
    let target = models_dir.join(member_dir);
    if target.exists() {
        tracing::info!(path = %target.display(), "already extracted, skipping");
        return Ok(ExtractOutcome::Skipped(target));
    }

    let staging = staging_dir(models_dir, member_dir);
    if staging.exists() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("remove stale staging dir {}", staging.display()))?;
    }
    fs::create_dir_all(&staging).context("create staging directory")?;

    let result = expand_into(archive_path, &staging, format)
        .and_then(|()| promote(&staging, models_dir, member_dir));
    if let Err(error) = fs::remove_dir_all(&staging) {
        tracing::warn!(path = %staging.display(), "failed to remove staging dir: {error}");
    }
    result?;

    tracing::info!(archive = %archive_path.display(), path = %target.display(), "extracted");
    Ok(ExtractOutcome::Extracted(target))
}

fn expand_into(archive_path: &Path, dest: &Path, format: ArchiveFormat) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("open archive {}", archive_path.display()))?;
    match format {
        ArchiveFormat::Zip => extract_zip(file, dest),
        ArchiveFormat::TarGz => extract_tar(GzDecoder::new(file), dest),
        ArchiveFormat::TarBz2 => extract_tar(BzDecoder::new(file), dest),
    }
}

fn promote(staging: &Path, models_dir: &Path, member_dir: &str) -> Result<()> {
    if !staging.join(member_dir).is_dir() {
        bail!("archive does not contain top-level directory {member_dir}");
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(staging).context("list staging directory")? {
        names.push(entry.context("read staging entry")?.file_name());
    }
    // The member directory is the "extracted" marker, so it must land last.
    for name in promotion_order(names, member_dir) {
        let dest = models_dir.join(&name);
        if dest.exists() {
            tracing::warn!(path = %dest.display(), "archive entry already present, leaving it untouched");
            continue;
        }
        fs::rename(staging.join(&name), &dest)
            .with_context(|| format!("move {} into place", dest.display()))?;
    }
    Ok(())
}

fn promotion_order(mut names: Vec<OsString>, member_dir: &str) -> Vec<OsString> {
    names.sort_by_key(|name| name.as_os_str() == member_dir);
    names
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);
    for entry in archive.entries().context("iterate tar entries")? {
        let mut entry = entry.context("read tar entry")?;
        let path = entry.path().context("read entry path")?.into_owned();
        let unpacked = entry.unpack_in(dest).context("unpack tar entry")?;
        if !unpacked {
            return Err(anyhow!("tar entry {path:?} escapes the archive root"));
        }
    }
    Ok(())
}

fn extract_zip(file: File, dest: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(file).context("open zip archive")?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context("read zip entry")?;
        let path = entry.mangled_name();
        if path.as_os_str().is_empty() {
            continue;
        }
        let out = dest.join(&path);
        if entry.is_dir() {
            fs::create_dir_all(&out).context("create zip dir")?;
        } else {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).context("create zip file parent")?;
            }
            let mut outfile = File::create(&out).context("create zip file")?;
            io::copy(&mut entry, &mut outfile).context("write zip file")?;
        }
    }
    Ok(())
}
