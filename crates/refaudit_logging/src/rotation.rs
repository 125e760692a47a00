//! Size-capped log segments
//!
//! The active segment is `<stem>.log`. When a write would push it past the
//! size limit it becomes `<stem>.1.log`, older segments shift up by one, and
//! anything past the retention count is deleted.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

struct Segment {
    file: File,
    written: u64,
}

/// A log file that rotates by size, shareable across threads
pub struct RotatingLog {
    dir: PathBuf,
    stem: String,
    keep: usize,
    limit: u64,
    segment: Mutex<Segment>,
}

impl RotatingLog {
    /// Open (or continue) `<dir>/<stem>.log`, keeping at most `keep` files.
    pub fn open(dir: &Path, stem: &str, keep: usize, limit: u64) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let stem = file_stem(stem);
        let segment = open_segment(&dir.join(format!("{}.log", stem)))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            stem,
            keep: keep.max(1),
            limit,
            segment: Mutex::new(segment),
        })
    }

    pub fn active_path(&self) -> PathBuf {
        self.segment_path(0)
    }

    fn segment_path(&self, index: usize) -> PathBuf {
        if index == 0 {
            self.dir.join(format!("{}.log", self.stem))
        } else {
            self.dir.join(format!("{}.{}.log", self.stem, index))
        }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Segment>> {
        self.segment
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log segment lock poisoned"))
    }

    /// Shift every segment up by one and start a fresh active segment.
    fn roll(&self, segment: &mut Segment) -> io::Result<()> {
        segment.file.flush()?;

        let last = self.keep - 1;
        if last == 0 {
            // Nothing is retained: truncate in place.
            segment.file = File::create(self.active_path())?;
            segment.written = 0;
            return Ok(());
        }

        let overflow = self.segment_path(last);
        if overflow.exists() {
            fs::remove_file(&overflow)?;
        }
        for index in (0..last).rev() {
            let from = self.segment_path(index);
            if from.exists() {
                fs::rename(&from, self.segment_path(index + 1))?;
            }
        }

        *segment = open_segment(&self.active_path())?;
        Ok(())
    }
}

fn open_segment(path: &Path) -> io::Result<Segment> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let written = file.metadata()?.len();
    Ok(Segment { file, written })
}

/// Keep log file names to a safe character set
pub fn file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => ch,
            _ => '_',
        })
        .collect();
    if stem.is_empty() {
        "log".to_string()
    } else {
        stem
    }
}

impl Write for &RotatingLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let log: &RotatingLog = self;
        let mut segment = log.lock()?;
        // An oversized record still goes into an empty segment.
        if segment.written > 0 && segment.written + buf.len() as u64 > log.limit {
            log.roll(&mut segment)?;
        }
        let n = segment.file.write(buf)?;
        segment.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RotatingLog {
    type Writer = &'a RotatingLog;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_replaces_unsafe_characters() {
        assert_eq!(file_stem("ref audit/scan"), "ref_audit_scan");
        assert_eq!(file_stem("refaudit-1_x"), "refaudit-1_x");
        assert_eq!(file_stem(""), "log");
    }

    #[test]
    fn rolls_when_limit_would_be_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let log = RotatingLog::open(dir.path(), "refaudit", 3, 16).unwrap();
        let mut writer = &log;

        writer.write_all(b"0123456789").unwrap();
        writer.write_all(b"0123456789").unwrap();
        writer.write_all(b"abcdefghij").unwrap();
        writer.flush().unwrap();

        assert!(dir.path().join("refaudit.log").exists());
        assert!(dir.path().join("refaudit.1.log").exists());
        assert!(dir.path().join("refaudit.2.log").exists());
        assert!(!dir.path().join("refaudit.3.log").exists());
        assert_eq!(
            fs::read_to_string(log.active_path()).unwrap(),
            "abcdefghij"
        );
    }

    #[test]
    fn oversized_write_goes_to_empty_segment() {
        let dir = tempfile::tempdir().unwrap();
        let log = RotatingLog::open(dir.path(), "refaudit", 2, 4).unwrap();
        let mut writer = &log;

        writer.write_all(b"much longer than four bytes").unwrap();
        assert!(!dir.path().join("refaudit.1.log").exists());
    }

    #[test]
    fn reopening_continues_the_active_segment() {
        let dir = tempfile::tempdir().unwrap();
        {
            let log = RotatingLog::open(dir.path(), "refaudit", 2, 1024).unwrap();
            (&log).write_all(b"first\n").unwrap();
        }
        let log = RotatingLog::open(dir.path(), "refaudit", 2, 1024).unwrap();
        (&log).write_all(b"second\n").unwrap();

        assert_eq!(
            fs::read_to_string(log.active_path()).unwrap(),
            "first\nsecond\n"
        );
    }
}
