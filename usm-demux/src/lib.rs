#![cfg_attr(docsrs, feature(doc_cfg))]

//! Demuxer for CRI Middleware USM containers.
//!
//! A USM file is a sequence of sectors, each opened by a 32-byte header. `CRID`
//! sectors carry `@UTF` metadata tables that announce the streams; `@SFV` and
//! `@SFA` sectors carry masked video and audio data. This crate walks the
//! sectors, decodes the tables, removes the payload masks and writes one
//! elementary stream per channel.
//!
//! # Optional Features
//!
//! - **serde**: Implements `Serialize` for metadata tables, sector headers and demux results.

pub mod demux;
pub mod mask;
pub mod meta;
pub mod sector;

mod error;
mod reader;
mod utils;

pub use demux::{DemuxOutput, Demuxer};
pub use error::{Error, Result};
pub use mask::{MaskEngine, key_schedule};
pub use meta::MetaSection;
pub use reader::Reader;
pub use sector::{Sector, SectorHeader, SectorKind, SectorReader};
pub use utils::sanitize_filename;
