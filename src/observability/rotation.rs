//! Size- and count-bounded log files.
//!
//! Rotation is delegated to `file-rotate`: the active file is `<name>`,
//! archives are `<name>.1` (newest) up to `<name>.<max_files - 1>` (oldest).
//! Once the active file has grown past the size bound, the next record opens
//! a fresh one and the oldest archive is evicted.
//!
//! Write failures never reach the logging pipeline: [`LogSink`] reports them
//! on stderr and drops the record.

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Open (or create) `dir/file_name` as a rotating file sink.
///
/// The directory and the active file are created up front so that an
/// unwritable location fails at startup instead of on the first record.
pub fn rotating_file(
    dir: impl AsRef<Path>,
    file_name: &str,
    max_bytes: u64,
    max_files: usize,
) -> io::Result<LogSink<FileRotate<AppendCount>>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    OpenOptions::new().create(true).append(true).open(&path)?;

    let limit = usize::try_from(max_bytes).unwrap_or(usize::MAX);
    let file = FileRotate::new(
        &path,
        AppendCount::new(max_files.saturating_sub(1).max(1)),
        ContentLimit::BytesSurpassed(limit),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(LogSink::new(path.display().to_string(), file))
}

/// Path of the `index`-th archive next to `active`.
pub fn archive_path(active: &Path, index: usize) -> PathBuf {
    let mut name = active.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Writer that never fails: errors from `inner` are reported on stderr and
/// the record is dropped.
pub struct LogSink<W> {
    label: String,
    inner: W,
    failures: u64,
}

impl<W: Write> LogSink<W> {
    pub fn new(label: impl Into<String>, inner: W) -> Self {
        Self {
            label: label.into(),
            inner,
            failures: 0,
        }
    }

    /// Records dropped because the inner writer failed.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn report(&mut self, err: &io::Error) {
        self.failures += 1;
        eprintln!("log sink {} failed: {err}; record dropped", self.label);
    }
}

impl<W: Write> Write for LogSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Err(err) = self.inner.write_all(buf) {
            self.report(&err);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Err(err) = self.inner.flush() {
            self.report(&err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenDisk;

    impl Write for BrokenDisk {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
        }
    }

    fn line(n: usize) -> Vec<u8> {
        format!("{{\"record\":{n:0>52}}}\n").into_bytes()
    }

    fn marker(n: usize) -> String {
        format!("{n:0>52}")
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn rotates_and_evicts_oldest_archive() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("combined.log");
        let mut sink = rotating_file(dir.path(), "combined.log", 50, 3).unwrap();

        for n in 1..=4 {
            sink.write_all(&line(n)).unwrap();
        }
        sink.flush().unwrap();

        assert!(read(&active).contains(&marker(4)));
        assert!(read(&archive_path(&active, 1)).contains(&marker(3)));
        assert!(read(&archive_path(&active, 2)).contains(&marker(2)));
        assert!(!archive_path(&active, 3).exists());
        assert_eq!(sink.failures(), 0);
    }

    #[test]
    fn records_under_the_bound_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("error.log");
        let mut sink = rotating_file(dir.path(), "error.log", 1024, 5).unwrap();

        sink.write_all(b"first\n").unwrap();
        sink.write_all(b"second\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(read(&active), "first\nsecond\n");
        assert!(!archive_path(&active, 1).exists());
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("app");

        rotating_file(&nested, "error.log", 1024, 2).unwrap();
        assert!(nested.join("error.log").exists());
    }

    #[test]
    fn write_failures_are_swallowed_and_counted() {
        let mut sink = LogSink::new("broken.log", BrokenDisk);

        assert_eq!(sink.write(b"{\"level\":\"ERROR\"}\n").unwrap(), 18);
        assert_eq!(sink.failures(), 1);

        sink.flush().unwrap();
        assert_eq!(sink.failures(), 2);
    }
}
