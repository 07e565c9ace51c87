//! The sector-scanning demux loop.

mod context;
mod sink;

pub use context::{DemuxContext, StreamKind};
pub use sink::{DirectorySink, MemorySink, MemoryStreams, MemoryWriter, SinkFactory};

use crate::{MaskEngine, Result};
use std::{
    io::Read,
    path::{Path, PathBuf},
};

/// Outputs produced by one demux operation, in creation order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DemuxOutput {
    pub video: Vec<PathBuf>,
    pub audio: Vec<PathBuf>,
}

/// Extracts `.m2v` video and `.adx` audio streams from USM containers.
///
/// ```no_run
/// use std::fs::File;
/// use usm_demux::Demuxer;
///
/// let demuxer = Demuxer::from_key(0x0000_4533_0B2B_2A79);
/// let output = demuxer.demux(File::open("movie.usm")?, "out")?;
///
/// for path in output.video.iter().chain(&output.audio) {
///     println!("{}", path.display());
/// }
/// # Ok::<(), usm_demux::Error>(())
/// ```
///
/// The demuxer only holds the masks derived from its key. Every call runs in a
/// fresh [`DemuxContext`], so one instance can be reused or shared between threads.
#[derive(Clone, Debug)]
pub struct Demuxer {
    masks: MaskEngine,
}

impl Demuxer {
    pub fn new(key1: u32, key2: u32) -> Self {
        Self {
            masks: MaskEngine::new(key1, key2),
        }
    }

    /// The low 32 bits are key one, the high 32 bits key two.
    pub fn from_key(key: u64) -> Self {
        Self {
            masks: MaskEngine::from_key(key),
        }
    }

    pub fn masks(&self) -> &MaskEngine {
        &self.masks
    }

    /// Demux `input` into files under `directory`, which is created if missing.
    pub fn demux<R: Read>(&self, input: R, directory: impl AsRef<Path>) -> Result<DemuxOutput> {
        let mut sinks = DirectorySink::new(directory.as_ref());
        sinks.ensure_directory()?;
        self.demux_with(input, &mut sinks)
    }

    /// Demux `input` into sinks created by `sinks`.
    pub fn demux_with<R: Read, S: SinkFactory>(
        &self,
        input: R,
        sinks: &mut S,
    ) -> Result<DemuxOutput> {
        DemuxContext::new(&self.masks, sinks).run(input)
    }
}
