//! Delimiter-based segmentation of chunk files.
//!
//! Splits a raw byte stream into per-timestep text segments without ever
//! holding a whole multi-gigabyte file in memory: input is read in
//! bounded-size blocks and only the unsplit tail is carried between reads, so
//! a delimiter straddling a block boundary is still found. Segment boundaries
//! are logical (on the delimiter token), never physical byte offsets.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use log::debug;

use crate::ingest::error::IngestError;
use crate::ingest::paths::DataKind;

/// Default read block size: 256 KiB.
pub const DEFAULT_BLOCK_SIZE: usize = 256 * 1024;

/// Lazy iterator over the delimiter-separated segments of one file.
///
/// The file handle is owned by this iterator and released as soon as the
/// file's segments are exhausted (or the iterator is dropped). Segments that
/// are empty or consist of the bare delimiter are discarded.
pub struct FileSegments {
    reader: Option<BufReader<File>>,
    path: PathBuf,
    delimiter: &'static str,
    /// When set, each segment keeps the delimiter token at its head
    /// (species records are `#`-prefixed header lines).
    keep_delimiter: bool,
    block_size: usize,
    buffer: Vec<u8>,
    /// Offset into `buffer` from which to resume the delimiter scan; bytes
    /// before it have already been checked and cannot start an occurrence.
    scan_from: usize,
    carry_prefix: &'static str,
    failed: bool,
}

impl FileSegments {
    /// Open `path` for segmentation on `delimiter`.
    pub fn open(
        path: &Path,
        delimiter: &'static str,
        keep_delimiter: bool,
        block_size: usize,
    ) -> Result<Self, IngestError> {
        debug!("segmenting {} on {:?}", path.display(), delimiter);
        let file = File::open(path)?;
        Ok(Self {
            reader: Some(BufReader::new(file)),
            path: path.to_path_buf(),
            delimiter,
            keep_delimiter,
            block_size: block_size.max(delimiter.len()),
            buffer: Vec::new(),
            scan_from: 0,
            carry_prefix: "",
            failed: false,
        })
    }

    /// Path of the file being segmented.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn discardable(&self, segment: &str) -> bool {
        let trimmed = segment.trim();
        trimmed.is_empty() || trimmed == self.delimiter
    }

    /// Split the next complete segment off the front of `buffer`, if a
    /// delimiter occurrence is present.
    fn split_buffered(&mut self) -> Option<String> {
        let needle = self.delimiter.as_bytes();
        let position = self.buffer[self.scan_from..]
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|p| p + self.scan_from)?;

        let head = String::from_utf8_lossy(&self.buffer[..position]);
        let segment = format!("{}{}", self.carry_prefix, head);
        self.buffer.drain(..position + needle.len());
        self.scan_from = 0;
        self.carry_prefix = if self.keep_delimiter { self.delimiter } else { "" };
        Some(segment)
    }

    /// Flush whatever remains after the last delimiter as the final segment.
    fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() && self.carry_prefix.is_empty() {
            return None;
        }
        let tail = String::from_utf8_lossy(&self.buffer);
        let segment = format!("{}{}", self.carry_prefix, tail);
        self.buffer.clear();
        self.scan_from = 0;
        self.carry_prefix = "";
        Some(segment)
    }

    fn read_block(&mut self) -> Result<usize, std::io::Error> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(0),
        };
        let start = self.buffer.len();
        self.buffer.resize(start + self.block_size, 0);
        let n = reader.read(&mut self.buffer[start..])?;
        self.buffer.truncate(start + n);
        if n == 0 {
            // EOF: release the handle immediately.
            self.reader = None;
        } else {
            // An occurrence can begin at most `len - 1` bytes before the
            // freshly appended block.
            self.scan_from = start.saturating_sub(self.delimiter.len() - 1);
        }
        Ok(n)
    }
}

impl Iterator for FileSegments {
    type Item = Result<String, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(segment) = self.split_buffered() {
                if self.discardable(&segment) {
                    continue;
                }
                return Some(Ok(segment));
            }
            match self.read_block() {
                Ok(0) => {
                    let segment = self.flush()?;
                    if self.discardable(&segment) {
                        return None;
                    }
                    return Some(Ok(segment));
                }
                Ok(_) => {}
                Err(err) => {
                    self.failed = true;
                    self.reader = None;
                    return Some(Err(err.into()));
                }
            }
        }
    }
}

/// Lazy iterator over the segments of an ordered list of files.
///
/// Files are opened one at a time, on demand, in the order they were
/// resolved (ascending chunk index); ordering within each file is preserved.
/// No reordering or deduplication happens here.
pub struct SegmentStream {
    paths: std::vec::IntoIter<PathBuf>,
    current: Option<FileSegments>,
    delimiter: &'static str,
    keep_delimiter: bool,
    block_size: usize,
}

impl SegmentStream {
    /// Create a stream over `paths` for the given segmented data kind.
    ///
    /// Fails with [`IngestError::InvalidFormat`] for [`DataKind::Thermo`],
    /// which is parsed whole-file rather than segmented.
    pub fn for_kind(
        paths: Vec<PathBuf>,
        kind: DataKind,
        block_size: usize,
    ) -> Result<Self, IngestError> {
        let delimiter = kind
            .delimiter()
            .ok_or_else(|| IngestError::InvalidFormat("thermo output is not segmented".into()))?;
        Ok(Self {
            paths: paths.into_iter(),
            current: None,
            delimiter,
            keep_delimiter: kind.keeps_delimiter(),
            block_size,
        })
    }
}

impl Iterator for SegmentStream {
    type Item = Result<String, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.current.as_mut() {
                if let Some(item) = file.next() {
                    return Some(item);
                }
                self.current = None;
            }
            let path = self.paths.next()?;
            match FileSegments::open(&path, self.delimiter, self.keep_delimiter, self.block_size) {
                Ok(file) => self.current = Some(file),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn segment_str(text: &str, delimiter: &'static str, keep: bool, block: usize) -> Vec<String> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        FileSegments::open(file.path(), delimiter, keep, block)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn splits_on_delimiter_dropping_it() {
        let text = "ITEM: TIMESTEP\n100\nbody a\nITEM: TIMESTEP\n200\nbody b\n";
        let segments = segment_str(text, "ITEM: TIMESTEP", false, DEFAULT_BLOCK_SIZE);
        assert_eq!(segments, vec!["\n100\nbody a\n", "\n200\nbody b\n"]);
    }

    #[test]
    fn keep_mode_reattaches_delimiter() {
        let text = "# a b\n1 2\n# a b\n3 4\n";
        let segments = segment_str(text, "#", true, DEFAULT_BLOCK_SIZE);
        assert_eq!(segments, vec!["# a b\n1 2\n", "# a b\n3 4\n"]);
    }

    #[test]
    fn delimiter_straddling_block_boundary_is_found() {
        // Force one-byte reads so every multi-byte delimiter occurrence
        // spans a block boundary. The constructor clamps the block size to
        // the delimiter length; exercise sizes around it too.
        let text = "ITEM: TIMESTEP\n1\nx\nITEM: TIMESTEP\n2\ny\n";
        for block in [1, 7, 14, 15] {
            let segments = segment_str(text, "ITEM: TIMESTEP", false, block);
            assert_eq!(segments, vec!["\n1\nx\n", "\n2\ny\n"], "block={block}");
        }
    }

    #[test]
    fn bare_delimiter_and_empty_segments_discarded() {
        let text = "ITEM: TIMESTEP\nITEM: TIMESTEP\n\nITEM: TIMESTEP\n5\n";
        let segments = segment_str(text, "ITEM: TIMESTEP", false, DEFAULT_BLOCK_SIZE);
        assert_eq!(segments, vec!["\n5\n"]);
    }

    #[test]
    fn empty_file_yields_nothing() {
        let segments = segment_str("", "# Timestep", false, DEFAULT_BLOCK_SIZE);
        assert!(segments.is_empty());
    }

    #[test]
    fn stream_preserves_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (i, body) in ["# Timestep\n 100\na\n", "# Timestep\n 200\nb\n"]
            .iter()
            .enumerate()
        {
            let path = dir.path().join(format!("dat_bonds_t_{i}.reaxff"));
            std::fs::write(&path, body).unwrap();
            paths.push(path);
        }
        let segments: Vec<String> = SegmentStream::for_kind(paths, DataKind::Bonds, 32)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(segments, vec!["\n 100\na\n", "\n 200\nb\n"]);
    }

    #[test]
    fn thermo_is_not_segmentable() {
        match SegmentStream::for_kind(Vec::new(), DataKind::Thermo, DEFAULT_BLOCK_SIZE) {
            Err(IngestError::InvalidFormat(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("thermo must not segment"),
        }
    }
}
