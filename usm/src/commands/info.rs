use super::demux::expand;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use log::warn;
use serde::Serialize;
use std::{collections::BTreeMap, fs::File, io::BufReader, path::PathBuf};
use usm_demux::{
    MetaSection, SectorHeader, SectorKind, SectorReader,
    meta::UTF_SIGNATURE,
};

/// Show the sectors and metadata tables of USM files.
#[derive(Debug, Clone, Args)]
pub struct Info {
    /// USM files to inspect, glob patterns are expanded.
    #[arg(required = true)]
    input: Vec<String>,

    /// List every sector instead of a summary per stream.
    #[arg(short, long)]
    sectors: bool,

    /// Print a JSON document instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    file: PathBuf,
    size: u64,
    streams: Vec<StreamSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sectors: Vec<SectorEntry>,
    tables: Vec<TableEntry>,
}

#[derive(Serialize)]
struct StreamSummary {
    signature: String,
    kind: SectorKind,
    channel: u8,
    count: usize,
    payload_bytes: u64,
}

#[derive(Serialize)]
struct SectorEntry {
    offset: u64,
    signature: String,
    kind: SectorKind,
    channel: u8,
    payload_size: usize,
    padding_size: u16,
    frame_time: u32,
    frame_rate: u32,
}

#[derive(Serialize)]
struct TableEntry {
    offset: u64,
    signature: String,
    kind: SectorKind,
    #[serde(flatten)]
    section: MetaSection,
}

impl Info {
    pub fn execute(self) -> Result<()> {
        let mut reports = vec![];

        for file in expand(&self.input)? {
            reports.push(self.inspect(file)?);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for report in &reports {
                print_report(report);
            }
        }

        Ok(())
    }

    fn inspect(&self, file: PathBuf) -> Result<Report> {
        let input = File::open(&file).with_context(|| format!("cannot open {}", file.display()))?;
        let mut reader = SectorReader::new(BufReader::new(input));
        let mut streams = BTreeMap::<(u32, u8, u8), StreamSummary>::new();
        let mut sectors = vec![];
        let mut tables = vec![];

        while let Some((offset, header)) = reader.next_header()? {
            let payload_size = header.payload_size().unwrap_or(0);

            if header.kind() == SectorKind::Data {
                reader.skip_body(offset, &header)?;
            } else {
                let payload = reader.read_body(offset, &header)?;

                if payload.starts_with(&UTF_SIGNATURE.to_be_bytes()) {
                    match MetaSection::load(&payload) {
                        Ok(section) => tables.push(TableEntry {
                            offset,
                            signature: header.signature_str(),
                            kind: header.kind(),
                            section,
                        }),
                        Err(e) => warn!("{}: table at {:#x}: {}", file.display(), offset, e),
                    }
                }
            }

            let summary = streams
                .entry((header.signature, header.kind() as u8, header.channel))
                .or_insert_with(|| StreamSummary {
                    signature: header.signature_str(),
                    kind: header.kind(),
                    channel: header.channel,
                    count: 0,
                    payload_bytes: 0,
                });
            summary.count += 1;
            summary.payload_bytes += payload_size as u64;

            if self.sectors {
                sectors.push(entry(offset, &header, payload_size));
            }
        }

        Ok(Report {
            file,
            size: reader.position(),
            streams: streams.into_values().collect(),
            sectors,
            tables,
        })
    }
}

fn entry(offset: u64, header: &SectorHeader, payload_size: usize) -> SectorEntry {
    SectorEntry {
        offset,
        signature: header.signature_str(),
        kind: header.kind(),
        channel: header.channel,
        payload_size,
        padding_size: header.padding_size,
        frame_time: header.frame_time,
        frame_rate: header.frame_rate,
    }
}

fn print_report(report: &Report) {
    println!(
        "{} ({} bytes)",
        report.file.display().to_string().bold(),
        report.size
    );

    println!("  {}", "streams".bold().cyan());
    for x in &report.streams {
        println!(
            "    {} {:<6} ch {:<3} {:>8} sector(s) {:>12} bytes",
            x.signature,
            format!("{:?}", x.kind),
            x.channel,
            x.count,
            x.payload_bytes
        );
    }

    if !report.sectors.is_empty() {
        println!("  {}", "sectors".bold().cyan());
        for x in &report.sectors {
            println!(
                "    {:#010x} {} {:<6} ch {:<3} payload {:>8} padding {:>4} time {}/{}",
                x.offset,
                x.signature,
                format!("{:?}", x.kind),
                x.channel,
                x.payload_size,
                x.padding_size,
                x.frame_time,
                x.frame_rate
            );
        }
    }

    for table in &report.tables {
        println!(
            "  {} {} ({} {:?} at {:#x}, {} row(s))",
            "table".bold().cyan(),
            table.section.name().bold(),
            table.signature,
            table.kind,
            table.offset,
            table.section.page_count()
        );

        for (row, page) in table.section.pages().iter().enumerate() {
            let cells = page
                .iter()
                .map(|x| format!("{}={}", x.name(), x.value()))
                .collect::<Vec<_>>();
            println!("    [{}] {}", row, cells.join(" "));
        }
    }
}
