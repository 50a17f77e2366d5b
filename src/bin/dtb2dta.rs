//! Print a DTB file back as DTA-like text.
//!
//! Usage:
//!   dtb2dta [OPTIONS] <INPUT>
//!
//! Output is the debug rendering (see `dtbc::dump`), so comments and formatting of
//! the original source are not recovered. With `--outline`, only the tree structure
//! and node ids are printed.

use anyhow::Context;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Render DTB binary as text")]
struct Cli {
    /// DTB file
    input: PathBuf,
    /// Write the text here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print node ids and tree shape instead of the contents
    #[arg(long)]
    outline: bool,
    /// Read the host-native persistence format instead of DTB
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

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let doc = if cli.native {
        dtbc::native::from_bytes(&bytes)
    } else {
        dtbc::decode(&bytes)
    }
    .with_context(|| format!("decoding {}", cli.input.display()))?;
    log::info!(
        "marker {:#04x}, {} trees",
        doc.byte_zero,
        doc.tree.node_count()
    );

    let text = if cli.outline {
        dtbc::dump::outline(&doc.tree)
    } else {
        dtbc::dump::document_to_text(&doc) + "\n"
    };
    match &cli.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => std::io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}
