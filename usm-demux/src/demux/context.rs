use super::{DemuxOutput, SinkFactory};
use crate::{
    Error, MaskEngine, Result,
    meta::MetaSection,
    sector::{CRID_SIGNATURE, SFA_SIGNATURE, SFV_SIGNATURE, SectorKind, SectorReader},
    utils::sanitize_filename,
};
use log::{debug, warn};
use std::{collections::VecDeque, io::Read, io::Write, path::PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DemuxState {
    AwaitingFirstSector,
    Running,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Video => "m2v",
            Self::Audio => "adx",
        }
    }

    /// The `stmid` value that marks a metadata row as describing this kind of stream.
    pub fn signature(self) -> u32 {
        match self {
            Self::Video => SFV_SIGNATURE,
            Self::Audio => SFA_SIGNATURE,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

/// Pending names, current channel and open sink of one stream kind.
struct Track<W> {
    kind: StreamKind,
    pending: VecDeque<String>,
    channel: Option<u8>,
    sink: Option<W>,
}

impl<W: Write> Track<W> {
    fn new(kind: StreamKind) -> Self {
        Self {
            kind,
            pending: VecDeque::new(),
            channel: None,
            sink: None,
        }
    }

    fn enqueue(&mut self, name: Option<&str>) {
        let file_name = format!("{}.{}", sanitize_filename(name), self.kind.extension());
        debug!("queued {} stream {:?}", self.kind, file_name);
        self.pending.push_back(file_name);
    }

    fn write<S>(
        &mut self,
        channel: u8,
        data: &[u8],
        sinks: &mut S,
        produced: &mut Vec<PathBuf>,
    ) -> Result<()>
    where
        S: SinkFactory<Sink = W>,
    {
        if self.channel != Some(channel) {
            self.close()?;

            let file_name = self.pending.pop_front().ok_or_else(|| {
                Error::StreamSequenceError(format!(
                    "{} data for channel {} arrived before any {} stream was announced",
                    self.kind, channel, self.kind
                ))
            })?;

            let (path, sink) = sinks.create(&file_name)?;
            debug!("opened {} channel {} -> {}", self.kind, channel, path.display());
            produced.push(path);
            self.channel = Some(channel);
            self.sink = Some(sink);
        }

        match self.sink.as_mut() {
            Some(sink) => sink.write_all(data)?,
            None => {
                return Err(Error::StreamSequenceError(format!(
                    "{} channel {} has no open output",
                    self.kind, channel
                )));
            }
        }

        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut sink) = self.sink.take() {
            sink.flush()?;
        }

        Ok(())
    }

    fn ensure_drained(&self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        Err(Error::StreamSequenceError(format!(
            "{} {} stream(s) announced but never received data: {:?}",
            self.pending.len(),
            self.kind,
            self.pending
        )))
    }
}

/// State of a single demux operation.
///
/// One context is created per input, so a [`Demuxer`](super::Demuxer) can run
/// any number of operations without state carrying over between them.
pub struct DemuxContext<'a, S: SinkFactory> {
    masks: &'a MaskEngine,
    sinks: &'a mut S,
    state: DemuxState,
    video: Track<S::Sink>,
    audio: Track<S::Sink>,
    output: DemuxOutput,
}

impl<'a, S: SinkFactory> DemuxContext<'a, S> {
    pub fn new(masks: &'a MaskEngine, sinks: &'a mut S) -> Self {
        Self {
            masks,
            sinks,
            state: DemuxState::AwaitingFirstSector,
            video: Track::new(StreamKind::Video),
            audio: Track::new(StreamKind::Audio),
            output: DemuxOutput::default(),
        }
    }

    /// Demux `input` to completion. Open sinks are closed on every exit path.
    pub fn run<R: Read>(mut self, input: R) -> Result<DemuxOutput> {
        let mut sectors = SectorReader::new(input);
        let processed = self.process(&mut sectors);
        let video_closed = self.video.close();
        let audio_closed = self.audio.close();

        processed?;
        video_closed?;
        audio_closed?;

        self.video.ensure_drained()?;
        self.audio.ensure_drained()?;

        debug!(
            "demuxed {} bytes: {} video and {} audio stream(s)",
            sectors.position(),
            self.output.video.len(),
            self.output.audio.len()
        );

        Ok(self.output)
    }

    fn process<R: Read>(&mut self, sectors: &mut SectorReader<R>) -> Result<()> {
        while let Some((offset, header)) = sectors.next_header()? {
            if self.state == DemuxState::AwaitingFirstSector {
                if header.signature != CRID_SIGNATURE {
                    return Err(Error::InvalidContainer {
                        found: Some(header.signature),
                    });
                }

                self.state = DemuxState::Running;
            }

            match (header.signature, header.kind()) {
                (CRID_SIGNATURE, SectorKind::Meta) => {
                    let payload = sectors.read_body(offset, &header)?;
                    self.load_metadata(&payload)?;
                }
                (SFV_SIGNATURE, SectorKind::Data) => {
                    let mut payload = sectors.read_body(offset, &header)?;
                    self.masks.unmask_video(&mut payload);
                    self.video.write(
                        header.channel,
                        &payload,
                        &mut *self.sinks,
                        &mut self.output.video,
                    )?;
                }
                (SFA_SIGNATURE, SectorKind::Data) => {
                    let mut payload = sectors.read_body(offset, &header)?;
                    self.masks.unmask_audio(&mut payload);
                    self.audio.write(
                        header.channel,
                        &payload,
                        &mut *self.sinks,
                        &mut self.output.audio,
                    )?;
                }
                _ => sectors.skip_body(offset, &header)?,
            }
        }

        if self.state == DemuxState::AwaitingFirstSector {
            return Err(Error::InvalidContainer { found: None });
        }

        self.state = DemuxState::Done;
        Ok(())
    }

    fn load_metadata(&mut self, payload: &[u8]) -> Result<()> {
        let section = MetaSection::load(payload)?;

        for (row, page) in section.pages().iter().enumerate() {
            let stmid = page
                .get("stmid")
                .and_then(|x| x.value().as_u32())
                .ok_or(Error::MissingRequiredField {
                    row,
                    field: "stmid",
                })?;
            let name = page.get("filename").and_then(|x| x.value().as_str());

            let track = [&mut self.video, &mut self.audio]
                .into_iter()
                .find(|x| x.kind.signature() == stmid);

            match track {
                Some(track) => track.enqueue(name),
                None if stmid == 0 => (),
                None => warn!(
                    "metadata table {:?} row {}: ignoring unknown stream marker {:#010x}",
                    section.name(),
                    row,
                    stmid
                ),
            }
        }

        Ok(())
    }
}
