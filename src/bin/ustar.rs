/*
MIT License

Copyright (c) 2023 Philipp Schuster

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/
//! `ustar`: list or extract USTAR archives.
//!
//! ```text
//! ustar -t -f archive.tar       # list the entries of a file
//! cat archive.tar | ustar -t    # list from a pipe, line based
//! ustar -x -f archive.tar -C out
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, ErrorKind, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use ustar_reader::{
    extract_all, ContentSpan, DecodeOptions, DirectorySink, EntryLister, ExtractOptions,
    ListSource, StreamLister, TarArchive,
};

/// ustar
#[derive(Debug, Parser)]
#[clap(name = "ustar", version)]
struct App {
    /// List archive contents to stdout.
    #[clap(short = 't', long, conflicts_with = "extract", required_unless_present = "extract")]
    list: bool,
    /// Extract to disk from archive.
    #[clap(short = 'x', long)]
    extract: bool,
    /// Read the archive from the specified file. Without it, the archive is read from
    /// standard input, which only supports listing.
    #[clap(short = 'f', long)]
    file: Option<PathBuf>,
    /// Extract into this directory.
    #[clap(short = 'C', long, default_value = ".")]
    directory: PathBuf,
    /// Maximum number of files written at the same time. Defaults to the number of CPUs.
    #[clap(short = 'j', long)]
    jobs: Option<NonZeroUsize>,
    /// Round content up to full blocks, as tar writes it, instead of the legacy span.
    #[clap(long)]
    block_aligned: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = App::parse();
    match run(&app) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("ustar: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every entry was processed.
fn run(app: &App) -> Result<bool> {
    let content_span = if app.block_aligned {
        ContentSpan::BlockAligned
    } else {
        ContentSpan::Legacy
    };
    let options = DecodeOptions::default().with_content_span(content_span);

    if app.list {
        let source = match &app.file {
            Some(path) => ListSource::Seekable(TarArchive::with_options(open_archive(path)?, options)),
            None => ListSource::Stream(StreamLister::new(io::stdin().lock())),
        };
        let names = source.list_names()?;
        let mut out = BufWriter::new(io::stdout().lock());
        for name in names {
            writeln!(out, "{name}")?;
        }
        out.flush()?;
        return Ok(true);
    }

    let Some(path) = &app.file else {
        bail!("extracting from standard input is not supported, pass the archive with -f");
    };
    let entries = TarArchive::with_options(open_archive(path)?, options)
        .entries()
        .with_context(|| format!("unable to decode {}", path.display()))?;

    let mut extract_options = ExtractOptions::default();
    if let Some(jobs) = app.jobs {
        extract_options = extract_options.with_concurrency(jobs);
    }
    let sink = DirectorySink::new(&app.directory);
    let results = extract_all(entries, &sink, &extract_options);

    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
        log::warn!("{failed} of {} entries could not be extracted", results.len());
    }
    Ok(failed == 0)
}

fn open_archive(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            anyhow!("tarball {} does not exist", path.display())
        } else {
            anyhow!(e).context(format!("there was an error opening file {}", path.display()))
        }
    })
}
