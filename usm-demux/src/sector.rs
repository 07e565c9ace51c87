//! Fixed 32-byte sector headers and a reader that walks a container sector by sector.

use crate::{Error, Reader, Result};
use log::trace;
use std::io::{self, Read};

/// `CRID`, the container / directory sector signature.
pub const CRID_SIGNATURE: u32 = 0x43524944;
/// `@SFV`, video stream sectors.
pub const SFV_SIGNATURE: u32 = 0x40534656;
/// `@SFA`, audio stream sectors.
pub const SFA_SIGNATURE: u32 = 0x40534641;

/// Low two bits of the sector type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SectorKind {
    Data,
    Meta,
    Footer,
    Header,
}

impl SectorKind {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::Data,
            1 => Self::Meta,
            2 => Self::Footer,
            _ => Self::Header,
        }
    }
}

/// Header that precedes every sector of the container.
///
/// Reserved fields are kept verbatim; their meaning is not known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SectorHeader {
    pub signature: u32,
    /// Size of everything after the first 8 bytes of the sector.
    pub data_size: u32,
    pub r08: u8,
    /// Distance from byte 8 of the sector to the start of the payload.
    pub data_offset: u8,
    pub padding_size: u16,
    pub channel: u8,
    pub r0d: u8,
    pub r0e: u8,
    type_byte: u8,
    pub frame_time: u32,
    pub frame_rate: u32,
    pub r18: u32,
    pub r1c: u32,
}

impl SectorHeader {
    pub const SIZE: usize = 0x20;
    /// Bytes of the header that follow `data_size`, and the minimum valid `data_offset`.
    pub const INFO_SIZE: usize = 0x18;

    /// Decode a header from exactly [`SectorHeader::SIZE`] bytes.
    pub fn parse(data: &[u8; Self::SIZE]) -> Result<Self> {
        let mut reader = Reader::new(data);

        Ok(Self {
            signature: reader.read_u32("sector signature")?,
            data_size: reader.read_u32("sector data size")?,
            r08: reader.read_u8("sector reserved byte")?,
            data_offset: reader.read_u8("sector data offset")?,
            padding_size: reader.read_u16("sector padding size")?,
            channel: reader.read_u8("sector channel")?,
            r0d: reader.read_u8("sector reserved byte")?,
            r0e: reader.read_u8("sector reserved byte")?,
            type_byte: reader.read_u8("sector type")?,
            frame_time: reader.read_u32("sector frame time")?,
            frame_rate: reader.read_u32("sector frame rate")?,
            r18: reader.read_u32("sector reserved word")?,
            r1c: reader.read_u32("sector reserved word")?,
        })
    }

    /// Read one header from `reader`, failing with [`Error::MalformedHeader`] on a short read.
    pub fn read_from<R: Read>(reader: &mut R, offset: u64) -> Result<Self> {
        let mut buf = [0; Self::SIZE];
        let read = read_full(reader, &mut buf)?;

        if read != Self::SIZE {
            return Err(Error::MalformedHeader {
                offset,
                reason: format!("expected {} header bytes, found {}", Self::SIZE, read),
            });
        }

        Self::parse(&buf)
    }

    pub fn kind(&self) -> SectorKind {
        SectorKind::from_bits(self.type_byte)
    }

    /// Bits 2-3 of the sector type byte.
    pub fn r0f1(&self) -> u8 {
        (self.type_byte >> 2) & 0b11
    }

    /// Bits 4-7 of the sector type byte.
    pub fn r0f2(&self) -> u8 {
        (self.type_byte >> 4) & 0b1111
    }

    /// Signature rendered as four ASCII characters where possible.
    pub fn signature_str(&self) -> String {
        self.signature
            .to_be_bytes()
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect()
    }

    /// Bytes between the end of this header and the start of the payload.
    pub fn payload_gap(&self) -> usize {
        (self.data_offset as usize).saturating_sub(Self::INFO_SIZE)
    }

    /// `data_size - data_offset - padding_size`, or `None` if that is negative.
    pub fn payload_size(&self) -> Option<usize> {
        (self.data_size as usize)
            .checked_sub(self.data_offset as usize)?
            .checked_sub(self.padding_size as usize)
    }

    /// Bytes of the sector that follow this header.
    pub fn body_size(&self) -> usize {
        (self.data_size as usize).saturating_sub(Self::INFO_SIZE)
    }

    fn validate(&self, offset: u64) -> Result<usize> {
        if (self.data_offset as usize) < Self::INFO_SIZE {
            return Err(Error::MalformedHeader {
                offset,
                reason: format!(
                    "data offset {:#x} is smaller than the header info size {:#x}",
                    self.data_offset,
                    Self::INFO_SIZE
                ),
            });
        }

        self.payload_size().ok_or_else(|| Error::MalformedHeader {
            offset,
            reason: format!(
                "data size {:#x} is smaller than data offset {:#x} plus padding {:#x}",
                self.data_size, self.data_offset, self.padding_size
            ),
        })
    }
}

/// One sector: its header and the payload bytes between data offset and padding.
#[derive(Clone, Debug)]
pub struct Sector {
    /// Absolute offset of the sector header in the input.
    pub offset: u64,
    pub header: SectorHeader,
    pub payload: Vec<u8>,
}

/// Walks a forward-only byte source one sector at a time.
///
/// Sectors are fully consumed (payload and trailing padding) before the
/// next header is read, so the source never needs to seek.
pub struct SectorReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> SectorReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read the next sector, or `None` at a clean end of input.
    pub fn next_sector(&mut self) -> Result<Option<Sector>> {
        let Some((offset, header)) = self.next_header()? else {
            return Ok(None);
        };
        let payload = self.read_body(offset, &header)?;

        Ok(Some(Sector {
            offset,
            header,
            payload,
        }))
    }

    /// Read the next sector header and its offset, or `None` at a clean end of input.
    ///
    /// The caller must follow up with [`SectorReader::read_body`] or
    /// [`SectorReader::skip_body`] before reading another header.
    pub fn next_header(&mut self) -> Result<Option<(u64, SectorHeader)>> {
        let offset = self.position;
        let mut buf = [0; SectorHeader::SIZE];
        let read = read_full(&mut self.inner, &mut buf)?;
        self.position += read as u64;

        if read == 0 {
            return Ok(None);
        }

        if read != SectorHeader::SIZE {
            return Err(Error::MalformedHeader {
                offset,
                reason: format!(
                    "expected {} header bytes, found {}",
                    SectorHeader::SIZE,
                    read
                ),
            });
        }

        Ok(Some((offset, SectorHeader::parse(&buf)?)))
    }

    /// Read the payload of the sector whose header was just returned, then skip its padding.
    pub fn read_body(&mut self, offset: u64, header: &SectorHeader) -> Result<Vec<u8>> {
        let payload_size = header.validate(offset)?;

        trace!(
            "sector {} at {:#x}: kind={:?} channel={} payload={} padding={}",
            header.signature_str(),
            offset,
            header.kind(),
            header.channel,
            payload_size,
            header.padding_size
        );

        self.skip(header.payload_gap() as u64, "sector data offset")?;

        // grows only with bytes that actually arrive
        let mut payload = Vec::new();
        let read = (&mut self.inner)
            .take(payload_size as u64)
            .read_to_end(&mut payload)?;
        self.position += read as u64;

        if read != payload_size {
            return Err(Error::TruncatedStream {
                context: "sector payload",
                offset: self.position,
                needed: payload_size as u64,
                found: read as u64,
            });
        }

        self.skip(header.padding_size as u64, "sector padding")?;
        Ok(payload)
    }

    /// Skip everything after the header of the sector whose header was just returned.
    pub fn skip_body(&mut self, offset: u64, header: &SectorHeader) -> Result<()> {
        header.validate(offset)?;

        trace!(
            "skipping sector {} at {:#x}: kind={:?} channel={}",
            header.signature_str(),
            offset,
            header.kind(),
            header.channel
        );

        self.skip(header.body_size() as u64, "sector body")
    }

    fn skip(&mut self, bytes: u64, context: &'static str) -> Result<()> {
        if bytes == 0 {
            return Ok(());
        }

        let skipped = io::copy(&mut (&mut self.inner).take(bytes), &mut io::sink())?;
        self.position += skipped;

        if skipped != bytes {
            return Err(Error::TruncatedStream {
                context,
                offset: self.position,
                needed: bytes,
                found: skipped,
            });
        }

        Ok(())
    }
}

impl<R: Read> Iterator for SectorReader<R> {
    type Item = Result<Sector>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_sector().transpose()
    }
}

/// Fill `buf` as far as the source allows, returning the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
