use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use pnganno::cli::{self, Mode, ModeSelector};
use pnganno::{PngFile, ReadMode};

#[derive(Parser)]
#[command(name = "pnganno")]
#[command(about = "Add, retrieve or delete text comments in PNG files")]
#[command(long_about = "Add, retrieve or delete text comments in PNG files.\n\n\
    With no options, the keys of all text comments are listed one per line. \
    Adding or deleting comments writes a new PNG to standard output, to the \
    file given with -o, or back to the input with -O.")]
struct Cli {
    /// Path to input PNG file
    input: PathBuf,

    /// Add comment KEY,TEXT; an existing key is overwritten (repeatable)
    #[arg(short = 'a', long = "add", value_name = "KEY,TEXT")]
    add: Vec<String>,

    /// Add comments from a tab-delimited file with key and text columns
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: Option<PathBuf>,

    /// Print the text of comma-separated keys, as #key followed by the text (repeatable)
    #[arg(short = 'r', long = "retrieve", value_name = "KEYS")]
    retrieve: Vec<String>,

    /// Delete the comments with comma-separated keys (repeatable)
    #[arg(short = 'd', long = "delete", value_name = "KEYS")]
    delete: Vec<String>,

    /// List tag and length of every chunk
    #[arg(short = 'D', long = "dump")]
    dump: bool,

    /// Write output to this file instead of standard output
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Overwrite the input PNG when adding or deleting comments
    #[arg(short = 'O', long = "overwrite")]
    overwrite: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Resolve the requested mode before any file is touched
    fn mode(&self) -> pnganno::PngannoResult<Option<Mode>> {
        let mut selector = ModeSelector::new();
        if !self.add.is_empty() {
            selector.select(Mode::Add)?;
        }
        if self.file.is_some() {
            selector.select(Mode::AddFile)?;
        }
        if !self.retrieve.is_empty() {
            selector.select(Mode::Retrieve)?;
        }
        if !self.delete.is_empty() {
            selector.select(Mode::Delete)?;
        }
        if self.dump {
            selector.select(Mode::Dump)?;
        }
        Ok(selector.finish())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries PNG data or comments
    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mode = cli.mode()?;

    // Nothing to do without an input; not treated as a failure
    if !cli.input.is_file() {
        warn!("PNG file {} does not exist", cli.input.display());
        return Ok(());
    }

    if cli.overwrite && !mode.is_some_and(Mode::writes_png) {
        warn!("-O only applies when adding or deleting comments");
    }

    match mode {
        None => {
            let png = open_png(&cli.input, ReadMode::TextOnly)?;
            let mut out = open_output(cli.output.as_deref())?;
            cli::write_keys(&mut out, &png.text_keys())?;
            out.flush()?;
        }
        Some(Mode::Dump) => {
            let png = open_png(&cli.input, ReadMode::Skip)?;
            let mut out = open_output(cli.output.as_deref())?;
            cli::write_summary(&mut out, &png.chunk_summary())?;
            out.flush()?;
        }
        Some(Mode::Retrieve) => {
            let keys = cli::split_keys(&cli.retrieve);
            let png = open_png(&cli.input, ReadMode::TextOnly)?;
            let entries = png.get_by_keys(&keys);
            for key in keys.iter().filter(|k| !entries.iter().any(|e| e.key == k.as_bytes())) {
                warn!("Key {} not found", key);
            }
            let mut out = open_output(cli.output.as_deref())?;
            cli::write_entries(&mut out, &entries)?;
            out.flush()?;
        }
        Some(Mode::Add) => {
            let comments = cli::parse_comment_args(&cli.add);
            add_comments(cli, &comments)?;
        }
        Some(Mode::AddFile) => {
            let path = cli.file.as_deref().context("Missing comments file")?;
            let comments = cli::read_comments_file(path)
                .with_context(|| format!("Failed to read comments file {}", path.display()))?;
            add_comments(cli, &comments)?;
        }
        Some(Mode::Delete) => {
            let keys = cli::split_keys(&cli.delete);
            let mut png = open_png(&cli.input, ReadMode::Full)?;
            png.delete_by_keys(&keys);
            save_png(cli, &png)?;
        }
    }

    Ok(())
}

fn open_png(path: &Path, mode: ReadMode) -> Result<PngFile> {
    PngFile::from_file(path, mode)
        .with_context(|| format!("File {} is not a valid PNG file", path.display()))
}

fn add_comments(cli: &Cli, comments: &[(String, String)]) -> Result<()> {
    let mut png = open_png(&cli.input, ReadMode::Full)?;
    for (key, text) in comments {
        info!("{} => {}", key, text);
        png.set_text(key.as_bytes(), text.as_bytes())?;
    }
    save_png(cli, &png)
}

fn save_png(cli: &Cli, png: &PngFile) -> Result<()> {
    let target = if cli.overwrite { Some(cli.input.as_path()) } else { cli.output.as_deref() };
    match target {
        Some(path) => png
            .write_to_file(path)
            .with_context(|| format!("Failed to write PNG file {}", path.display())),
        None => {
            info!("Writing image to standard output");
            let mut out = BufWriter::new(io::stdout().lock());
            png.save(&mut out).context("Failed to write PNG to standard output")
        }
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use tempfile::TempDir;

    #[test]
    fn test_missing_input_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("missing.png");
        let output = dir.path().join("out.png");

        let cli = Cli::try_parse_from([
            OsStr::new("pnganno"),
            OsStr::new("-a"),
            OsStr::new("Author,Jane"),
            OsStr::new("-o"),
            output.as_os_str(),
            input.as_os_str(),
        ])
        .unwrap();
        assert!(run(&cli).is_ok());
        assert!(!output.exists());
    }

    #[test]
    fn test_conflicting_modes_checked_before_input() {
        let cli = Cli::try_parse_from(["pnganno", "-a", "k,v", "-r", "k", "/nonexistent/x.png"]).unwrap();
        let err = run(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<pnganno::PngannoError>(),
            Some(pnganno::PngannoError::ConflictingModes { .. })
        ));
    }
}
