//! Compile a DTA text file into a DTB binary file.
//!
//! Usage:
//!   dta2dtb [OPTIONS] <INPUT> <OUTPUT>
//!
//! The source is parsed, every tree is numbered in pre-order starting at
//! `--start-id` (default 1), and the result is written as DTB. Nothing is written
//! when the source fails to parse.

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Compile DTA text into DTB binary")]
struct Cli {
    /// DTA source file
    input: PathBuf,
    /// Destination file
    output: PathBuf,
    /// Node id given to the top-level tree
    #[arg(long, default_value_t = 1)]
    start_id: u32,
    /// Format marker written as the first byte
    #[arg(long, default_value_t = 0)]
    marker: u8,
    /// Print the parsed tree to stdout before writing
    #[arg(long)]
    print: bool,
    /// Write the host-native persistence format instead of DTB
    #[arg(long)]
    native: bool,
    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .filter_level(cli.verbose.log_level_filter())
        .init();

    let src = std::fs::read(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    log::info!("read {} bytes from {}", src.len(), cli.input.display());

    let mut doc = dtbc::parse(&src).with_context(|| format!("parsing {}", cli.input.display()))?;
    doc.byte_zero = cli.marker;
    let next = doc.renumber_from(cli.start_id);
    log::info!("numbered {} trees", next.wrapping_sub(cli.start_id));

    if cli.print {
        println!("{}", dtbc::dump::document_to_text(&doc));
    }

    let bytes = if cli.native {
        dtbc::native::to_bytes(&doc)?
    } else {
        dtbc::encode(&doc)?
    };
    std::fs::write(&cli.output, &bytes)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    log::info!("wrote {} bytes to {}", bytes.len(), cli.output.display());
    Ok(())
}
