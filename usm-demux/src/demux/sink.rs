use crate::Result;
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

/// Creates the byte sinks that demuxed streams are written to.
///
/// `file_name` is the sanitized stream name including its extension.
/// The returned identifier is what ends up in [`DemuxOutput`](super::DemuxOutput).
pub trait SinkFactory {
    type Sink: Write;

    fn create(&mut self, file_name: &str) -> Result<(PathBuf, Self::Sink)>;
}

/// Writes each stream to a file inside a directory, creating the directory on first use.
#[derive(Clone, Debug)]
pub struct DirectorySink {
    directory: PathBuf,
    created: bool,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            created: false,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the output directory now instead of when the first stream opens.
    pub fn ensure_directory(&mut self) -> Result<()> {
        if !self.created {
            if !self.directory.as_os_str().is_empty() {
                fs::create_dir_all(&self.directory)?;
            }
            self.created = true;
        }

        Ok(())
    }
}

impl SinkFactory for DirectorySink {
    type Sink = BufWriter<File>;

    fn create(&mut self, file_name: &str) -> Result<(PathBuf, Self::Sink)> {
        self.ensure_directory()?;
        let path = self.directory.join(file_name);
        let file = File::create(&path)?;
        Ok((path, BufWriter::new(file)))
    }
}

/// Shared in-memory store of streams, keyed by file name.
pub type MemoryStreams = Arc<Mutex<BTreeMap<String, Vec<u8>>>>;

/// Keeps every stream in memory. Useful for inspection and tests.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    streams: MemoryStreams,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the streams written so far.
    pub fn streams(&self) -> MemoryStreams {
        Arc::clone(&self.streams)
    }

    /// Copy of the stream stored under `file_name`.
    pub fn get(&self, file_name: &str) -> Option<Vec<u8>> {
        self.streams.lock().ok()?.get(file_name).cloned()
    }
}

fn lock(streams: &MemoryStreams) -> std::io::Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
    streams
        .lock()
        .map_err(|_| std::io::Error::other("memory sink lock poisoned"))
}

/// Writer half of a [`MemorySink`] stream.
pub struct MemoryWriter {
    name: String,
    streams: MemoryStreams,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut streams = lock(&self.streams)?;
        streams.entry(self.name.clone()).or_default().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SinkFactory for MemorySink {
    type Sink = MemoryWriter;

    fn create(&mut self, file_name: &str) -> Result<(PathBuf, Self::Sink)> {
        lock(&self.streams)?.insert(file_name.to_owned(), Vec::new());

        Ok((
            PathBuf::from(file_name),
            MemoryWriter {
                name: file_name.to_owned(),
                streams: Arc::clone(&self.streams),
            },
        ))
    }
}
