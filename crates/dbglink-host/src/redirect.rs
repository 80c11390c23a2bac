use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info};

/// A download in progress: the next `remaining` drained bytes belong to a
/// local file instead of the console.
pub struct Redirect {
    path: PathBuf,
    sink: Box<dyn Write + Send>,
    remaining: u64,
    written: u64,
    failed: bool,
}

impl Redirect {
    /// Create (truncate) `path` and expect `len` bytes for it.
    pub fn create(path: impl AsRef<Path>, len: u64) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self::new(path, BufWriter::new(file), len))
    }

    /// Redirect into an arbitrary sink.
    pub fn new(path: PathBuf, sink: impl Write + Send + 'static, len: u64) -> Self {
        Self {
            path,
            sink: Box::new(sink),
            remaining: len,
            written: 0,
            failed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes still expected.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Take the front of `data` that belongs to the file and return the rest.
    ///
    /// A write failure is logged once; the budget keeps counting down so the
    /// file's bytes never spill onto the console.
    pub fn absorb<'a>(&mut self, data: &'a [u8]) -> &'a [u8] {
        let take = usize::try_from(self.remaining)
            .unwrap_or(usize::MAX)
            .min(data.len());
        let (mine, rest) = data.split_at(take);

        if !self.failed {
            if let Err(err) = self.sink.write_all(mine) {
                error!(
                    path = %self.path.display(),
                    %err,
                    "download write failed; discarding remainder"
                );
                self.failed = true;
            } else {
                self.written += take as u64;
            }
        }
        self.remaining -= take as u64;
        rest
    }

    /// Flush and close the sink.
    pub fn finish(mut self) -> io::Result<()> {
        self.sink.flush()?;
        info!(path = %self.path.display(), bytes = self.written, "download complete");
        Ok(())
    }
}

impl std::fmt::Debug for Redirect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redirect")
            .field("path", &self.path)
            .field("remaining", &self.remaining)
            .field("written", &self.written)
            .finish()
    }
}
