//! Zip archive creation and extraction.

use crate::pipeline::{
    Error, Result,
    error::ErrorExt,
};
use std::{
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

/// Zips the contents of `src_dir` into `dest`, with entry names relative to `src_dir`.
///
/// Entries are written in sorted order with `/` separators. The archive is assembled in a
/// sibling `.partial` file and renamed into place, so `dest` never holds a truncated archive.
/// Returns the number of files written.
pub async fn zip_directory(src_dir: &Path, dest: &Path) -> Result<usize> {
    if !src_dir.is_dir() {
        return Err(Error::NotFound {
            what: "directory to archive".to_string(),
            checked: vec![src_dir.to_path_buf()],
        });
    }

    let src_dir = src_dir.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || write_zip(&src_dir, &dest))
        .await
        .map_err(|e| Error::GenericError(format!("Archive task panicked: {}", e)))?
}

fn write_zip(src_dir: &Path, dest: &Path) -> Result<usize> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).fs_context("creating archive directory", parent)?;
    }

    let partial = dest.with_extension("partial");
    let file = File::create(&partial).fs_context("creating archive", &partial)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut files = 0;
    let walker = walkdir::WalkDir::new(src_dir)
        .follow_links(true)
        .sort_by_file_name()
        .min_depth(1);

    let written: Result<()> = (|| {
        for entry in walker {
            let entry = entry?;
            let name = entry_name(entry.path().strip_prefix(src_dir)?);

            if entry.file_type().is_dir() {
                zip.add_directory(format!("{}/", name), options)?;
            } else {
                zip.start_file(name, options)?;
                let mut input =
                    File::open(entry.path()).fs_context("reading file to archive", entry.path())?;
                io::copy(&mut input, &mut zip).fs_context("archiving", entry.path())?;
                files += 1;
            }
        }
        let mut out = zip.finish()?;
        io::Write::flush(&mut out).fs_context("flushing archive", &partial)?;
        Ok(())
    })();

    if let Err(e) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }

    std::fs::rename(&partial, dest).fs_context("moving archive into place", dest)?;
    log::debug!("Archived {} files into {}", files, dest.display());
    Ok(files)
}

fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Extracts a zip archive into `dest_dir`.
///
/// Entries whose names would escape `dest_dir` are rejected.
pub async fn extract_zip(archive: &Path, dest_dir: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    tokio::task::spawn_blocking(move || read_zip(&archive, &dest_dir))
        .await
        .map_err(|e| Error::GenericError(format!("Extraction task panicked: {}", e)))?
}

fn read_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let unusable = |reason: String| Error::Archive {
        archive: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).fs_context("opening archive", archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| unusable(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| unusable(e.to_string()))?;
        let rel: PathBuf = entry.enclosed_name().ok_or_else(|| {
            unusable(format!("entry {} escapes the destination", entry.name()))
        })?;
        let out = dest_dir.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&out).fs_context("creating directory", &out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }
        let mut out_file = File::create(&out).fs_context("creating extracted file", &out)?;
        io::copy(&mut entry, &mut out_file).fs_context("extracting", &out)?;
    }
    Ok(())
}
