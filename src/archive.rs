//! Archive extraction
//!
//! Turns a directory of log archives into the flat per-partition layout
//! the ingestion pipeline reads. Only the [`ArchiveExtractor`] trait is
//! used by the pipeline; [`TarExtractor`] handles `.tar`, `.tar.gz` and
//! `.tgz` files.

use crate::error::{ArchiveError, ArchiveResult};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// Source of flat log files
pub trait ArchiveExtractor {
    /// Extract every archive in `source` into `target`; returns how many
    /// archives were extracted
    fn extract_all(&self, source: &Path, target: &Path) -> ArchiveResult<usize>;
}

/// Tar archive extractor with transparent gzip support
#[derive(Debug, Clone, Copy, Default)]
pub struct TarExtractor;

impl TarExtractor {
    fn is_gzip(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext == "gz" || ext == "tgz")
            .unwrap_or(false)
    }

    fn extract_one(&self, archive: &Path, target: &Path) -> ArchiveResult<()> {
        let fail = |reason: String| ArchiveError::Extract {
            path: archive.to_path_buf(),
            reason,
        };

        let file = File::open(archive).map_err(|e| fail(e.to_string()))?;
        let reader: Box<dyn Read> = if Self::is_gzip(archive) {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        tar::Archive::new(reader)
            .unpack(target)
            .map_err(|e| fail(e.to_string()))
    }
}

impl ArchiveExtractor for TarExtractor {
    fn extract_all(&self, source: &Path, target: &Path) -> ArchiveResult<usize> {
        let archives = list_files(source).map_err(|e| ArchiveError::ReadDir {
            path: source.to_path_buf(),
            source: e,
        })?;

        info!(
            from = %source.display(),
            to = %target.display(),
            count = archives.len(),
            "Extracting archives"
        );

        for archive in &archives {
            self.extract_one(archive, target)?;
            info!(archive = %archive.display(), "Extracted");
        }

        Ok(archives.len())
    }
}

/// Regular files directly inside `dir`, sorted by name
pub fn list_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;

    fn write_tar(path: &Path, name: &str, contents: &[u8], gzip: bool) {
        let file = File::create(path).unwrap();
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();

        if gzip {
            let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
            builder.append_data(&mut header, name, contents).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        } else {
            let mut builder = tar::Builder::new(file);
            builder.append_data(&mut header, name, contents).unwrap();
            builder.finish().unwrap();
        }
    }

    #[test]
    fn test_extract_tar_and_tgz() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();

        write_tar(&src.path().join("a.tar"), "overworld/a.log", b"one", false);
        write_tar(&src.path().join("b.tar.gz"), "nether/b.log", b"two", true);

        let count = TarExtractor.extract_all(src.path(), dst.path()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(fs::read(dst.path().join("overworld/a.log")).unwrap(), b"one");
        assert_eq!(fs::read(dst.path().join("nether/b.log")).unwrap(), b"two");
    }

    #[test]
    fn test_extract_invalid_archive() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("bad.tgz"), b"not an archive").unwrap();

        let err = TarExtractor.extract_all(src.path(), dst.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::Extract { .. }));
    }

    #[test]
    fn test_list_files_sorted() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.log"), "").unwrap();
        fs::write(dir.path().join("a.log"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();

        let files = list_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.log", "b.log"]);
    }
}
