// src/archive.rs

use crate::error::BolError;
use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// `BOL_{YYYYMMDD_HHMMSS}.zip`
pub fn archive_name(at: OffsetDateTime) -> String {
    let stamp = at
        .format(format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_default();
    format!("BOL_{stamp}.zip")
}

/// Deflate `files` into a zip written to `out`, each stored under its file name.
pub fn write_zip<W: Write + Seek>(out: W, files: &[PathBuf]) -> Result<W, BolError> {
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BolError::Io(io::Error::other(format!("not a file: {}", path.display()))))?;
        zip.start_file(name, options)?;
        let mut src = File::open(path)?;
        io::copy(&mut src, &mut zip)?;
    }
    Ok(zip.finish()?)
}

/// Package `files` as `dir/BOL_{timestamp}.zip` and return its path.
pub fn package(dir: &Path, files: &[PathBuf], at: OffsetDateTime) -> Result<PathBuf, BolError> {
    let path = dir.join(archive_name(at));
    write_zip(File::create(&path)?, files)?;
    info!(path = %path.display(), files = files.len(), "Archive written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use time::macros::datetime;

    #[test]
    fn test_archive_name() {
        assert_eq!(archive_name(datetime!(2024-06-01 09:05:07 -7)), "BOL_20240601_090507.zip");
    }

    #[test]
    fn test_zip_contains_every_file_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("BOL_PO1_A_CA_EXLA.pdf");
        let b = dir.path().join("BOL_PO2_B_NJ_NOSCAC.pdf");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&b, b"second").unwrap();

        let path = package(dir.path(), &[a, b], datetime!(2024-06-01 09:05:07 UTC)).unwrap();
        assert!(path.ends_with("BOL_20240601_090507.zip"));

        let mut zip = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        let mut body = String::new();
        zip.by_name("BOL_PO2_B_NJ_NOSCAC.pdf").unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "second");
    }

    #[test]
    fn test_empty_zip_in_memory() {
        let out = write_zip(Cursor::new(Vec::new()), &[]).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(out.into_inner())).unwrap();
        assert_eq!(zip.len(), 0);
    }
}
