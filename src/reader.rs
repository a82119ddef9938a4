//! Trace stream opening.
//!
//! Traces are newline-delimited text, normally gzip-compressed by the
//! instrumentor. [`open_trace`] sniffs the gzip magic and returns a
//! buffered line source either way; the builder itself only requires
//! [`BufRead`], so in-memory traces (tests) plug in directly.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Gzip stream magic.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a trace file as a buffered line source, transparently
/// decompressing gzip input.
pub fn open_trace(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let mut file = File::open(path)?;

    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    if n == 2 && magic == GZIP_MAGIC {
        Ok(Box::new(BufReader::new(GzDecoder::new(BufReader::new(
            file,
        )))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const SAMPLE: &str = "0,1,top,bb0,i0,8,0\nr,32,1,1,r0,\n";

    fn read_all(path: &Path) -> String {
        let mut reader = open_trace(path).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_plain_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(read_all(&path), SAMPLE);
    }

    #[test]
    fn test_gzip_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.gz");
        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(SAMPLE.as_bytes()).unwrap();
        encoder.finish().unwrap();
        assert_eq!(read_all(&path), SAMPLE);
    }

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, "").unwrap();
        assert_eq!(read_all(&path), "");
    }
}
