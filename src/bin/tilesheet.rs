use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use tilesheet::{Color, GapSize, Size, TileSheet, TileSheetBuilder};

/// Lays out labeled cells and packed image assets onto fixed-size pages.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack `count,asset` manifest rows onto pages written as `<prefix><n>.png`
    Pack {
        manifest: PathBuf,
        prefix: String,
        /// Page width in pixels
        page_width: Option<u32>,
        /// Page height in pixels
        page_height: Option<u32>,
        /// Border gap added around every asset, in pixels
        #[arg(long, default_value = "4")]
        gap: u32,
        /// Skip rows whose asset cannot be read instead of stopping
        #[arg(long)]
        skip_missing: bool,
        /// Render pages on the rayon thread pool
        #[arg(long)]
        parallel: bool,
        /// Directory relative asset paths resolve against
        #[arg(long)]
        asset_root: Option<PathBuf>,
        #[command(flatten)]
        logs: LogArgs,
    },
    /// Draw one framed, labeled cell per manifest field
    Table {
        manifest: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        label: LabelArgs,
    },
    /// Draw `count - 1` numbered cells around the canvas edge
    Grid {
        count: usize,
        output: PathBuf,
        #[command(flatten)]
        label: LabelArgs,
    },
}

#[derive(Args, Debug)]
struct LabelArgs {
    /// TrueType font used for labels; a system font is used when omitted
    #[arg(long)]
    font: Option<PathBuf>,
    /// Label height in pixels
    #[arg(long, default_value = "64")]
    size: f32,
    #[arg(long, default_value = "3034")]
    width: u32,
    #[arg(long, default_value = "2135")]
    height: u32,
    /// Frame thickness in pixels
    #[arg(long, default_value = "5")]
    border: u32,
    /// `#RRGGBB`, `#RRGGBBAA` or a packed `0xAABBGGRR` literal
    #[arg(long, value_parser = parse_color)]
    foreground: Option<Color>,
    #[arg(long, value_parser = parse_color)]
    background: Option<Color>,
    #[command(flatten)]
    logs: LogArgs,
}

#[derive(Args, Debug)]
struct LogArgs {
    /// Write a JSONL trace of layout events
    #[arg(long)]
    debug_log: Option<PathBuf>,
    /// Write JSONL timing spans
    #[arg(long)]
    perf_log: Option<PathBuf>,
}

fn parse_color(raw: &str) -> Result<Color, String> {
    Color::parse(raw).ok_or_else(|| format!("not a color: {raw}"))
}

impl LogArgs {
    fn apply(&self, mut builder: TileSheetBuilder) -> TileSheetBuilder {
        if let Some(path) = &self.debug_log {
            builder = builder.debug_path(path);
        }
        if let Some(path) = &self.perf_log {
            builder = builder.perf_path(path);
        }
        builder
    }
}

impl LabelArgs {
    fn build(&self) -> Result<TileSheet> {
        let mut builder = TileSheet::builder()
            .canvas_size(Size::new(self.width, self.height))
            .font_pixel_size(self.size)
            .border_size(self.border);
        let font = self
            .font
            .clone()
            .or_else(|| tilesheet::find_default_font(&tilesheet::system_font_dirs()));
        match font {
            Some(font) => {
                info!("labels use {}", font.display());
                builder = builder.font(font, self.size);
            }
            None => warn!("no font given and none found in system font directories"),
        }
        if let Some(color) = self.foreground {
            builder = builder.foreground(color);
        }
        if let Some(color) = self.background {
            builder = builder.background(color);
        }
        self.logs
            .apply(builder)
            .build()
            .context("invalid label settings")
    }
}

/// Errors that only mean some positionals were left off. Those print usage
/// and exit cleanly.
fn is_missing_input(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::MissingRequiredArgument
            | ErrorKind::MissingSubcommand
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
    )
}

/// `Ok(None)` when arguments were missing and usage has been printed.
fn parse_args<I, T>(args: I) -> Result<Option<Cli>, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) if is_missing_input(&err) => {
            let _ = err.print();
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match parse_args(std::env::args_os()) {
        Ok(Some(cli)) => cli,
        Ok(None) => return Ok(()),
        Err(err) => err.exit(),
    };

    match cli.command {
        Command::Pack {
            manifest,
            prefix,
            page_width,
            page_height,
            gap,
            skip_missing,
            parallel,
            asset_root,
            logs,
        } => {
            let default_page = Size::a4_300dpi();
            let page = Size::new(
                page_width.unwrap_or(default_page.width),
                page_height.unwrap_or(default_page.height),
            );
            let mut builder = TileSheet::builder()
                .page_size(page)
                .border_gap(GapSize::uniform(gap))
                .skip_missing_assets(skip_missing)
                .parallel_pages(parallel);
            if let Some(root) = asset_root {
                builder = builder.asset_root(root);
            }
            let sheet = logs.apply(builder).build().context("invalid pack settings")?;
            let metrics = sheet
                .pack_manifest_file(&manifest, &prefix)
                .with_context(|| format!("packing {}", manifest.display()))?;
            info!(
                "packed {} items onto {} pages in {:.1} ms ({} rows skipped)",
                metrics.items,
                metrics.page_count(),
                metrics.total_ms,
                metrics.skipped_rows.len()
            );
        }
        Command::Table {
            manifest,
            output,
            label,
        } => {
            let metrics = label
                .build()?
                .write_table(&manifest, &output)
                .with_context(|| format!("rendering {}", manifest.display()))?;
            info!("drew {} cells in {:.1} ms", metrics.cells, metrics.render_ms);
        }
        Command::Grid {
            count,
            output,
            label,
        } => {
            let metrics = label
                .build()?
                .write_perimeter(count, &output)
                .with_context(|| format!("rendering {count} cells to {}", output.display()))?;
            info!("drew {} cells in {:.1} ms", metrics.cells, metrics.render_ms);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_positionals_are_not_an_error() {
        assert!(parse_args(["tilesheet", "pack", "m.csv"]).expect("lenient").is_none());
        assert!(parse_args(["tilesheet"]).expect("lenient").is_none());
        assert!(parse_args(["tilesheet", "grid"]).expect("lenient").is_none());
    }

    #[test]
    fn malformed_values_still_fail() {
        let err = parse_args(["tilesheet", "pack", "m.csv", "out_", "--gap", "abc"])
            .expect_err("bad gap");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        let err = parse_args(["tilesheet", "grid", "five", "out.png"]).expect_err("bad count");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn full_pack_command_parses() {
        let cli = parse_args(["tilesheet", "pack", "m.csv", "out_", "1000", "800", "--parallel"])
            .expect("parse")
            .expect("complete");
        match cli.command {
            Command::Pack {
                page_width,
                page_height,
                gap,
                parallel,
                ..
            } => {
                assert_eq!((page_width, page_height), (Some(1000), Some(800)));
                assert_eq!(gap, 4);
                assert!(parallel);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
