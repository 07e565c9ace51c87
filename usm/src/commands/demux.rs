use crate::key::KeyArgs;
use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;
use log::{error, info};
use rayon::prelude::*;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};
use usm_demux::{DemuxOutput, Demuxer};

/// Extract the m2v video and adx audio streams of USM files.
#[derive(Debug, Clone, Args)]
pub struct Demux {
    /// USM files to demux, glob patterns are expanded e.g. movies/*.usm .
    #[arg(required = true)]
    input: Vec<String>,

    #[command(flatten)]
    key: KeyArgs,

    /// Directory where streams are written, created if missing.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Write each input into its own sub-directory named after the file.
    #[arg(long)]
    split: bool,

    /// Demux multiple inputs in parallel.
    #[arg(short, long)]
    parallel: bool,
}

impl Demux {
    pub fn execute(self) -> Result<()> {
        let demuxer = self.key.demuxer()?;
        let files = expand(&self.input)?;

        let results = if self.parallel {
            files
                .par_iter()
                .map(|x| self.demux(&demuxer, x))
                .collect::<Vec<_>>()
        } else {
            files.iter().map(|x| self.demux(&demuxer, x)).collect()
        };

        let mut failed = 0;

        for (file, result) in files.iter().zip(results) {
            match result {
                Ok(output) => {
                    for path in output.video.iter().chain(&output.audio) {
                        println!("{}", path.display());
                    }
                }
                Err(e) => {
                    error!("{}: {:#}", file.display(), e);
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            bail!("{} of {} file(s) could not be demuxed.", failed, files.len());
        }

        Ok(())
    }

    fn demux(&self, demuxer: &Demuxer, file: &Path) -> Result<DemuxOutput> {
        let directory = match (self.split, file.file_stem()) {
            (true, Some(stem)) => self.output.join(stem),
            _ => self.output.clone(),
        };

        info!(
            "{} {} -> {}",
            "Demuxing".bold().cyan(),
            file.display(),
            directory.display()
        );

        let input = File::open(file).with_context(|| format!("cannot open {}", file.display()))?;
        Ok(demuxer.demux(BufReader::new(input), &directory)?)
    }
}

/// Expand glob patterns, keeping plain paths that match nothing so the open error is reported.
pub fn expand(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = vec![];

    for pattern in patterns {
        let mut matched = false;

        for file in glob::glob(pattern)? {
            files.push(file?);
            matched = true;
        }

        if !matched {
            files.push(PathBuf::from(pattern));
        }
    }

    Ok(files)
}
