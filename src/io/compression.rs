//! Pluggable decompression for CSV sources.
//!
//! This is the file-opening side of a session: it turns a path (or an already
//! open reader) into a plain byte stream, transparently decompressing it.
//!
//! ## Built-in Codecs
//!
//! When enabled via feature flags, the following codecs are available:
//! - **Gzip** (`.gz`) - via `flate2` (feature: `compression-gzip`)
//! - **Zip** (`.zip`, first file entry) - via `zip` (feature: `compression-zip`)
//! - **Zstd** (`.zst`) - via `zstd` (feature: `compression-zstd`)
//! - **Bzip2** (`.bz2`) - via `bzip2` (feature: `compression-bzip2`)
//! - **Xz** (`.xz`) - via `xz2` (feature: `compression-xz`)
//!
//! ## Selecting a codec
//!
//! [`Compression::Infer`] checks the path extension first and falls back to
//! sniffing magic bytes; [`Compression::None`] never decompresses;
//! [`Compression::Codec`] forces a registered codec by name.
//!
//! ```no_run
//! use ironstream::io::compression::{open_path, Compression};
//! # fn main() -> ironstream::Result<()> {
//! let reader = open_path("tv_shows.csv.gz", &Compression::Infer)?;
//! let forced = open_path("tv_shows.data", &Compression::from("gzip"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Custom Codec Implementation
//! ```
//! use ironstream::io::compression::{register_codec, CompressionCodec};
//! use std::io::{Read, Result};
//! use std::sync::Arc;
//!
//! struct Rot13;
//!
//! impl CompressionCodec for Rot13 {
//!     fn name(&self) -> &str { "rot13" }
//!
//!     fn extensions(&self) -> &[&str] { &[".rot13"] }
//!
//!     fn magic_bytes(&self) -> Option<&[u8]> { None }
//!
//!     fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> Result<Box<dyn Read>> {
//!         // Your decoding logic
//!         Ok(reader)
//!     }
//! }
//!
//! register_codec(Arc::new(Rot13));
//! ```

use crate::error::{ReadError, Result};
use serde::Deserialize;
use std::convert::Infallible;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Global codec registry for pluggable decompression support.
static CODEC_REGISTRY: RwLock<Option<Vec<Arc<dyn CompressionCodec>>>> = RwLock::new(None);

/// Initialize the codec registry with built-in codecs.
fn init_registry() -> Vec<Arc<dyn CompressionCodec>> {
    vec![
        #[cfg(feature = "compression-gzip")]
        Arc::new(GzipCodec),
        #[cfg(feature = "compression-zip")]
        Arc::new(ZipCodec),
        #[cfg(feature = "compression-zstd")]
        Arc::new(ZstdCodec),
        #[cfg(feature = "compression-bzip2")]
        Arc::new(Bzip2Codec),
        #[cfg(feature = "compression-xz")]
        Arc::new(XzCodec),
    ]
}

/// Snapshot of the registry, initializing it on first use.
fn get_registry() -> Vec<Arc<dyn CompressionCodec>> {
    let mut lock = CODEC_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(init_registry).clone()
}

/// Register a custom codec globally.
///
/// Later registrations take part in name lookup, extension matching, and magic
/// byte sniffing after the built-in codecs.
pub fn register_codec(codec: Arc<dyn CompressionCodec>) {
    let mut lock = CODEC_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    lock.get_or_insert_with(init_registry).push(codec);
}

/// Look up a registered codec by name, case-insensitively.
#[must_use]
pub fn find_codec(name: &str) -> Option<Arc<dyn CompressionCodec>> {
    get_registry()
        .into_iter()
        .find(|c| c.name().eq_ignore_ascii_case(name))
}

/// Pluggable decompression codec.
///
/// Codecs are detected via file extensions (fast path) or magic bytes (fallback).
/// Implementations must be `Send + Sync`; they live in a global registry.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip"); also the name [`Compression::Codec`] matches.
    fn name(&self) -> &str;

    /// File extensions associated with this codec, lowercase with the leading dot.
    fn extensions(&self) -> &[&str];

    /// Optional magic byte signature for content-based detection.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap a reader with decompression.
    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>>;
}

/// How a source should be decompressed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Compression {
    /// Use the path extension, then magic bytes; read as-is if neither matches.
    #[default]
    Infer,
    /// Never decompress.
    None,
    /// Always use the named codec.
    Codec(String),
}

impl FromStr for Compression {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Ok(match s.as_str() {
            "infer" => Self::Infer,
            "" | "none" => Self::None,
            _ => Self::Codec(s),
        })
    }
}

impl From<String> for Compression {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(c) => c,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Compression {
    fn from(value: &str) -> Self {
        value.to_owned().into()
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infer => f.write_str("infer"),
            Self::None => f.write_str("none"),
            Self::Codec(name) => f.write_str(name),
        }
    }
}

/// Detect codec from file path extension (case-insensitive).
fn detect_from_extension(path: &Path) -> Option<Arc<dyn CompressionCodec>> {
    let path_str = path.to_string_lossy().to_lowercase();
    get_registry()
        .into_iter()
        .find(|codec| codec.extensions().iter().any(|ext| path_str.ends_with(ext)))
}

/// Detect codec from magic bytes at the start of a buffered stream without consuming them.
fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<Arc<dyn CompressionCodec>> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    get_registry().into_iter().find(|codec| {
        codec
            .magic_bytes()
            .is_some_and(|magic| buf.starts_with(magic))
    })
}

fn apply_codec(codec: &dyn CompressionCodec, reader: Box<dyn Read>) -> Result<Box<dyn Read>> {
    debug!(codec = codec.name(), "decompressing source");
    codec
        .wrap_reader_dyn(reader)
        .map_err(|source| ReadError::Decompress {
            codec: codec.name().to_owned(),
            source,
        })
}

/// Wrap an open reader according to `compression`.
///
/// With [`Compression::Infer`], `path_hint` (when given) is checked first, then
/// the first bytes of the stream.
///
/// # Errors
/// [`ReadError::UnknownCodec`] for an unregistered forced codec, or
/// [`ReadError::Decompress`] if the codec rejects the stream header.
pub fn wrap_reader<R: Read + 'static>(
    reader: R,
    compression: &Compression,
    path_hint: Option<&Path>,
) -> Result<Box<dyn Read>> {
    match compression {
        Compression::None => Ok(Box::new(reader)),
        Compression::Codec(name) => {
            let codec = find_codec(name).ok_or_else(|| ReadError::UnknownCodec(name.clone()))?;
            apply_codec(codec.as_ref(), Box::new(reader))
        }
        Compression::Infer => {
            if let Some(codec) = path_hint.and_then(detect_from_extension) {
                return apply_codec(codec.as_ref(), Box::new(reader));
            }
            let mut buf_reader = BufReader::new(reader);
            if let Some(codec) = detect_from_magic(&mut buf_reader) {
                return apply_codec(codec.as_ref(), Box::new(buf_reader));
            }
            Ok(Box::new(buf_reader))
        }
    }
}

/// Open `path` and wrap it according to `compression`.
///
/// # Errors
/// [`ReadError::Open`] if the file cannot be opened, otherwise see [`wrap_reader`].
pub fn open_path(path: impl AsRef<Path>, compression: &Compression) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), %compression, "opened source");
    wrap_reader(file, compression, Some(path))
}

// ============================================================================
// Built-in Codec Implementations
// ============================================================================

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use flate2::read::MultiGzDecoder;
        Ok(Box::new(MultiGzDecoder::new(reader)))
    }
}

/// Reads the first file entry of a zip archive; directory entries are skipped.
///
/// The central directory sits at the end of the archive, so the whole input is
/// buffered before the entry is located.
#[cfg(feature = "compression-zip")]
struct ZipCodec;

#[cfg(feature = "compression-zip")]
impl CompressionCodec for ZipCodec {
    fn name(&self) -> &str {
        "zip"
    }

    fn extensions(&self) -> &[&str] {
        &[".zip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x50, 0x4b, 0x03, 0x04])
    }

    fn wrap_reader_dyn(&self, mut reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use std::io::{Cursor, Error, ErrorKind};
        use zip::ZipArchive;

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(Error::other)?;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(Error::other)?;
            if !entry.is_file() {
                continue;
            }
            debug!(entry = entry.name(), "reading zip entry");
            let mut contents = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry.read_to_end(&mut contents)?;
            return Ok(Box::new(Cursor::new(contents)));
        }
        Err(Error::new(ErrorKind::InvalidData, "zip archive has no file entries"))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn extensions(&self) -> &[&str] {
        &[".bz2", ".bzip2"]
    }

    // "BZh": the bare "BZ" prefix is too common at the start of a CSV header.
    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x42, 0x5a, 0x68])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use bzip2::read::MultiBzDecoder;
        Ok(Box::new(MultiBzDecoder::new(reader)))
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn extensions(&self) -> &[&str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00])
    }

    fn wrap_reader_dyn(&self, reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        use xz2::read::XzDecoder;
        Ok(Box::new(XzDecoder::new_multi_decoder(reader)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn compression_parses_from_strings() {
        assert_eq!("infer".parse::<Compression>().unwrap(), Compression::Infer);
        assert_eq!("None".parse::<Compression>().unwrap(), Compression::None);
        assert_eq!("".parse::<Compression>().unwrap(), Compression::None);
        assert_eq!(
            " GZIP ".parse::<Compression>().unwrap(),
            Compression::Codec("gzip".into())
        );
        assert_eq!(Compression::default(), Compression::Infer);
    }

    #[test]
    fn plain_text_passes_through_inference() {
        let mut out = String::new();
        wrap_reader(
            Cursor::new(b"a,b\n1,2\n".to_vec()),
            &Compression::Infer,
            Some(Path::new("data.csv")),
        )
        .unwrap()
        .read_to_string(&mut out)
        .unwrap();
        assert_eq!(out, "a,b\n1,2\n");
    }

    #[test]
    fn header_starting_with_bz_is_not_bzip2() {
        let mut out = String::new();
        wrap_reader(Cursor::new(b"BZ,x\n1,2\n".to_vec()), &Compression::Infer, None)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "BZ,x\n1,2\n");
    }

    #[test]
    fn unknown_codec_is_an_error() {
        let err = wrap_reader(Cursor::new(Vec::new()), &"lz77".into(), None)
            .err()
            .unwrap();
        assert!(matches!(err, ReadError::UnknownCodec(name) if name == "lz77"));
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn codec_lookup_is_case_insensitive() {
        assert_eq!(find_codec("GZip").map(|c| c.name().to_owned()), Some("gzip".into()));
    }
}
