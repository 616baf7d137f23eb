use delimload::io::compression::{CompressionCodec, SourceRead, auto_detect_reader, register_codec};
use std::io::{Read, Write};
use std::sync::Arc;
use tempfile::tempdir;

fn read_all(mut r: SourceRead) -> anyhow::Result<String> {
    let mut s = String::new();
    r.read_to_string(&mut s)?;
    Ok(s)
}

#[test]
fn plain_input_passes_through() -> anyhow::Result<()> {
    let r = auto_detect_reader(std::io::Cursor::new(b"1,a\n2,b\n".to_vec()), "data.csv")?;
    assert_eq!(read_all(r)?, "1,a\n2,b\n");
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_by_extension_and_by_magic() -> anyhow::Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(b"1,a\n2,b\n")?;
    let bytes = enc.finish()?;

    let by_ext = auto_detect_reader(std::io::Cursor::new(bytes.clone()), "data.csv.gz")?;
    assert_eq!(read_all(by_ext)?, "1,a\n2,b\n");

    let by_magic = auto_detect_reader(std::io::Cursor::new(bytes), "stdin")?;
    assert_eq!(read_all(by_magic)?, "1,a\n2,b\n");
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_file_on_disk() -> anyhow::Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    let dir = tempdir()?;
    let path = dir.path().join("rows.csv.gz");
    let mut enc = GzEncoder::new(std::fs::File::create(&path)?, Compression::fast());
    enc.write_all(b"x\n")?;
    enc.finish()?;

    let r = auto_detect_reader(std::fs::File::open(&path)?, &path)?;
    assert_eq!(read_all(r)?, "x\n");
    Ok(())
}

struct Rot13Codec;

struct Rot13<R>(R);

impl<R: Read> Read for Rot13<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.0.read(buf)?;
        for b in &mut buf[..n] {
            *b = match *b {
                b'a'..=b'z' => (*b - b'a' + 13) % 26 + b'a',
                b'A'..=b'Z' => (*b - b'A' + 13) % 26 + b'A',
                other => other,
            };
        }
        Ok(n)
    }
}

impl CompressionCodec for Rot13Codec {
    fn name(&self) -> &str {
        "rot13"
    }

    fn extensions(&self) -> &[&str] {
        &[".rot13"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        None
    }

    fn wrap_reader(&self, reader: SourceRead) -> std::io::Result<SourceRead> {
        Ok(Box::new(Rot13(reader)))
    }
}

#[test]
fn registered_codecs_are_used() -> anyhow::Result<()> {
    register_codec(Arc::new(Rot13Codec));
    let r = auto_detect_reader(std::io::Cursor::new(b"uryyb\n".to_vec()), "greeting.rot13")?;
    assert_eq!(read_all(r)?, "hello\n");
    Ok(())
}

#[test]
fn text_that_starts_like_bzip2_is_left_alone() -> anyhow::Result<()> {
    let text = b"BZh,1,plain text\nBZh9,2,more\n".to_vec();
    let r = auto_detect_reader(std::io::Cursor::new(text), "stdin")?;
    assert_eq!(read_all(r)?, "BZh,1,plain text\nBZh9,2,more\n");
    Ok(())
}

#[cfg(feature = "compression-bzip2")]
#[test]
fn bzip2_detected_by_its_full_header() -> anyhow::Result<()> {
    use bzip2::Compression;
    use bzip2::write::BzEncoder;

    let mut enc = BzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(b"1,a\n")?;
    let bytes = enc.finish()?;

    let r = auto_detect_reader(std::io::Cursor::new(bytes), "stdin")?;
    assert_eq!(read_all(r)?, "1,a\n");
    Ok(())
}
