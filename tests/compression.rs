use anyhow::Result;
use ironstream::io::compression::{CompressionCodec, find_codec, register_codec};
use ironstream::testing::{CsvFixture, TV_SHOWS};
use ironstream::{Compression, ReadError, ReadOptions, Value, iter_csv, iter_csv_reader};
use std::io::{Cursor, Read};
use std::sync::Arc;

fn names(stream: impl Iterator<Item = ironstream::Result<ironstream::Labeled>>) -> Result<Vec<String>> {
    stream
        .map(|pair| -> Result<String> {
            let (x, _) = pair?;
            Ok(x.get("name").map(Value::to_text).unwrap_or_default().into_owned())
        })
        .collect()
}

fn tv_names() -> Vec<String> {
    TV_SHOWS
        .lines()
        .skip(1)
        .filter_map(|line| line.split(',').next())
        .map(String::from)
        .collect()
}

#[test]
fn plain_file_with_no_compression() -> Result<()> {
    let fixture = CsvFixture::new("tv_shows.csv", TV_SHOWS)?;
    let stream = iter_csv(fixture.path(), ReadOptions::default().compression(Compression::None))?;
    assert_eq!(names(stream)?, tv_names());
    Ok(())
}

#[test]
fn forced_codec_must_be_registered() {
    let err = iter_csv_reader(
        Cursor::new(TV_SHOWS),
        ReadOptions::default().compression("lz4000"),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ReadError::UnknownCodec(ref name) if name == "lz4000"));
}

#[cfg(feature = "compression-gzip")]
mod gzip {
    use super::*;
    use flate2::Compression as Level;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzipped(text: &str) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Level::default());
        encoder.write_all(text.as_bytes())?;
        Ok(encoder.finish()?)
    }

    #[test]
    fn inferred_from_extension() -> Result<()> {
        let fixture = CsvFixture::gzip("tv_shows.csv.gz", TV_SHOWS)?;
        assert_eq!(names(iter_csv(fixture.path(), ReadOptions::default())?)?, tv_names());
        Ok(())
    }

    #[test]
    fn forced_on_unusual_extension() -> Result<()> {
        let fixture = CsvFixture::gzip("tv_shows.data", TV_SHOWS)?;
        let options = ReadOptions::default().compression("GZIP");
        assert_eq!(names(iter_csv(fixture.path(), options)?)?, tv_names());
        Ok(())
    }

    #[test]
    fn inferred_from_magic_bytes() -> Result<()> {
        let stream = iter_csv_reader(Cursor::new(gzipped(TV_SHOWS)?), ReadOptions::default())?;
        assert_eq!(names(stream)?, tv_names());
        Ok(())
    }

    #[test]
    fn concatenated_members_read_as_one() -> Result<()> {
        let mut bytes = gzipped("name,year,rating\nPlanet Earth II,2016,9.5\n")?;
        bytes.extend(gzipped("Chernobyl,2019,9.4\n")?);
        let stream = iter_csv_reader(Cursor::new(bytes), ReadOptions::default())?;
        assert_eq!(names(stream)?, vec!["Planet Earth II", "Chernobyl"]);
        Ok(())
    }

    #[test]
    fn none_reads_compressed_bytes_raw() -> Result<()> {
        let fixture = CsvFixture::gzip("tv_shows.csv.gz", TV_SHOWS)?;
        let options = ReadOptions::default().compression(Compression::None);
        let mut stream = iter_csv(fixture.path(), options)?;
        // gzip output is not UTF-8 text, so the header read fails
        assert!(stream.next().is_some_and(|r| r.is_err()));
        Ok(())
    }
}

#[cfg(feature = "compression-zip")]
mod zip {
    use super::*;
    use ironstream::testing::zip_archive;

    #[test]
    fn stored_entry() -> Result<()> {
        let fixture = CsvFixture::zip("tv_shows.zip", "tv_shows.csv", TV_SHOWS, false)?;
        assert_eq!(names(iter_csv(fixture.path(), ReadOptions::default())?)?, tv_names());
        Ok(())
    }

    #[test]
    fn deflated_entry() -> Result<()> {
        let fixture = CsvFixture::zip("tv_shows.zip", "tv_shows.csv", TV_SHOWS, true)?;
        let options = ReadOptions::default().target("rating");
        let targets = iter_csv(fixture.path(), options)?
            .map(|pair| pair.map(|(_, y)| y))
            .collect::<ironstream::Result<Vec<_>>>()?;
        assert_eq!(targets.len(), 5);
        assert_eq!(targets[0], Some(Value::from("9.5")));
        Ok(())
    }

    #[test]
    fn sniffed_from_open_reader() -> Result<()> {
        let bytes = zip_archive("tv_shows.csv", TV_SHOWS.as_bytes(), true)?;
        let stream = iter_csv_reader(Cursor::new(bytes), ReadOptions::default())?;
        assert_eq!(names(stream)?, tv_names());
        Ok(())
    }

    fn archive_with_directories(files: &[(&str, &str)]) -> Result<Vec<u8>> {
        use ::zip::write::{SimpleFileOptions, ZipWriter};
        use std::io::Write;

        let options = SimpleFileOptions::default();
        let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
        archive.add_directory("data/", options)?;
        for (name, contents) in files {
            archive.start_file(*name, options)?;
            archive.write_all(contents.as_bytes())?;
        }
        Ok(archive.finish()?.into_inner())
    }

    #[test]
    fn leading_directory_entry_is_skipped() -> Result<()> {
        let bytes = archive_with_directories(&[
            ("data/tv_shows.csv", TV_SHOWS),
            ("data/other.csv", "name\nignored\n"),
        ])?;
        let stream = iter_csv_reader(Cursor::new(bytes), ReadOptions::default())?;
        assert_eq!(names(stream)?, tv_names());
        Ok(())
    }

    #[test]
    fn archive_without_files_is_an_error() -> Result<()> {
        let bytes = archive_with_directories(&[])?;
        let fixture = CsvFixture::new("empty.zip", bytes)?;
        let err = iter_csv(fixture.path(), ReadOptions::default()).err().unwrap();
        assert!(matches!(err, ReadError::Decompress { ref codec, .. } if codec == "zip"));
        Ok(())
    }

    #[test]
    fn truncated_archive_is_a_decompress_error() {
        let err = iter_csv_reader(
            Cursor::new(b"PK\x03\x04\x14\x00".to_vec()),
            ReadOptions::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ReadError::Decompress { ref codec, .. } if codec == "zip"));
    }
}

#[cfg(feature = "compression-zstd")]
#[test]
fn zstd_inferred_from_extension() -> Result<()> {
    let bytes = zstd::encode_all(TV_SHOWS.as_bytes(), 3)?;
    let fixture = CsvFixture::new("tv_shows.csv.zst", bytes)?;
    assert_eq!(names(iter_csv(fixture.path(), ReadOptions::default())?)?, tv_names());
    Ok(())
}

#[cfg(feature = "compression-bzip2")]
#[test]
fn bzip2_sniffed_from_magic() -> Result<()> {
    use std::io::Write;
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(TV_SHOWS.as_bytes())?;
    let stream = iter_csv_reader(Cursor::new(encoder.finish()?), ReadOptions::default())?;
    assert_eq!(names(stream)?, tv_names());
    Ok(())
}

#[cfg(feature = "compression-bzip2")]
#[test]
fn header_starting_with_bz_is_plain_text() -> Result<()> {
    let stream = iter_csv_reader(Cursor::new("BZ,name\n1,x\n"), ReadOptions::default())?;
    assert_eq!(stream.count(), 1);
    Ok(())
}

#[cfg(feature = "compression-xz")]
#[test]
fn xz_inferred_from_extension() -> Result<()> {
    use std::io::Write;
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
    encoder.write_all(TV_SHOWS.as_bytes())?;
    let fixture = CsvFixture::new("tv_shows.csv.xz", encoder.finish()?)?;
    assert_eq!(names(iter_csv(fixture.path(), ReadOptions::default())?)?, tv_names());
    Ok(())
}

/// Flips the case of ASCII letters.
struct SwapCase;

impl CompressionCodec for SwapCase {
    fn name(&self) -> &str {
        "swapcase"
    }

    fn extensions(&self) -> &[&str] {
        &[".swapcase"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        None
    }

    fn wrap_reader_dyn(&self, mut reader: Box<dyn Read>) -> std::io::Result<Box<dyn Read>> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        for b in &mut bytes {
            if b.is_ascii_alphabetic() {
                *b ^= 0x20;
            }
        }
        Ok(Box::new(Cursor::new(bytes)))
    }
}

#[test]
fn custom_codec_by_extension_and_name() -> Result<()> {
    register_codec(Arc::new(SwapCase));
    assert!(find_codec("SwapCase").is_some());

    let fixture = CsvFixture::new("shows.csv.swapcase", "NAME\nbREAKING bAD\n")?;
    let (x, _) = iter_csv(fixture.path(), ReadOptions::default())?.next().unwrap()?;
    assert_eq!(x.get("name"), Some(&Value::from("Breaking Bad")));

    let forced = ReadOptions::default().compression("swapcase");
    let (x, _) = iter_csv_reader(Cursor::new("NAME\ncHERNOBYL\n"), forced)?.next().unwrap()?;
    assert_eq!(x.get("name"), Some(&Value::from("Chernobyl")));
    Ok(())
}
