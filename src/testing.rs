//! Fixtures for testing CSV sessions.
//!
//! ```
//! use ironstream::testing::{CsvFixture, TV_SHOWS};
//! use ironstream::{iter_csv, ReadOptions};
//!
//! let fixture = CsvFixture::new("tv_shows.csv", TV_SHOWS)?;
//! let rows = iter_csv(fixture.path(), ReadOptions::default())?.count();
//! assert_eq!(rows, 5);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Five highly rated TV shows with a `name,year,rating` header.
pub const TV_SHOWS: &str = "\
name,year,rating
Planet Earth II,2016,9.5
Planet Earth,2006,9.4
Band of Brothers,2001,9.4
Breaking Bad,2008,9.4
Chernobyl,2019,9.4
";

/// A single-column CSV (`id`) with rows `0..n`.
#[must_use]
pub fn numbered_rows(n: usize) -> String {
    let mut out = String::from("id\n");
    for i in 0..n {
        out.push_str(&i.to_string());
        out.push('\n');
    }
    out
}

/// A file inside its own temporary directory, removed on drop.
pub struct CsvFixture {
    _dir: TempDir,
    path: PathBuf,
}

impl CsvFixture {
    /// Write `contents` as-is to a file named `file_name`.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be created.
    pub fn new(file_name: &str, contents: impl AsRef<[u8]>) -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(file_name);
        fs::write(&path, contents)?;
        Ok(Self { _dir: dir, path })
    }

    /// Write `contents` gzip-compressed to a file named `file_name`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or compressed.
    #[cfg(feature = "compression-gzip")]
    pub fn gzip(file_name: &str, contents: &str) -> io::Result<Self> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(contents.as_bytes())?;
        Self::new(file_name, encoder.finish()?)
    }

    /// Write a one-entry zip archive holding `contents` to a file named `file_name`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or compressed.
    #[cfg(feature = "compression-zip")]
    pub fn zip(file_name: &str, entry_name: &str, contents: &str, deflate: bool) -> io::Result<Self> {
        Self::new(file_name, zip_archive(entry_name, contents.as_bytes(), deflate)?)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Build an in-memory zip archive with a single stored or deflated entry.
///
/// # Errors
/// Returns an error if the archive cannot be written.
#[cfg(feature = "compression-zip")]
pub fn zip_archive(entry_name: &str, contents: &[u8], deflate: bool) -> io::Result<Vec<u8>> {
    use std::io::{Cursor, Write};
    use zip::CompressionMethod;
    use zip::write::{SimpleFileOptions, ZipWriter};

    let method = if deflate {
        CompressionMethod::Deflated
    } else {
        CompressionMethod::Stored
    };
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(entry_name, SimpleFileOptions::default().compression_method(method))
        .map_err(io::Error::other)?;
    zip.write_all(contents)?;
    Ok(zip.finish().map_err(io::Error::other)?.into_inner())
}
