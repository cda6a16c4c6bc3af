//! Tablespan CLI - Detect and rewrite repeated PDF table titles
//!
//! A command-line interface over the tablespan engine: `analyze` reports
//! which table titles repeat on consecutive pages, `apply` rewrites them
//! with their `(i/n)` position suffix and saves a new document.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tablespan_backend::LopdfBackend;
use tablespan_core::{constants, AnalysisResult, FormatInfo};
use tablespan_engine::{ApplyOptions, ProgressSink, Rule, TableTitleRule};

#[derive(Parser)]
#[command(
    name = "tablespan",
    version,
    about = "Rewrites table titles repeated across consecutive PDF pages with (i/n) suffixes"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect repeated table titles without modifying the document
    Analyze {
        /// Input PDF file
        input: PathBuf,

        /// Emit the full analysis as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Rewrite repeated table titles and save a modified copy
    Apply {
        /// Input PDF file
        input: PathBuf,

        /// Where to write the modified document
        #[arg(short, long)]
        output: PathBuf,

        /// Replace the output file if it already exists
        #[arg(long)]
        overwrite: bool,

        /// Font family override for the rewritten titles
        #[arg(long)]
        font: Option<String>,

        /// Font size override in points
        #[arg(long)]
        font_size: Option<f32>,

        /// Render rewritten titles bold
        #[arg(long)]
        bold: bool,

        /// Render rewritten titles italic
        #[arg(long)]
        italic: bool,
    },
}

/// Progress sink rendering phase and percentage on an indicatif bar.
struct BarProgress(ProgressBar);

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{msg:>8} [{bar:40.cyan/blue}] {pos:>3}%")
                .expect("progress template is valid")
                .progress_chars("=> "),
        );
        Self(bar)
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, phase: &str, percent: Option<u8>) {
        self.0.set_message(phase.to_string());
        if let Some(percent) = percent {
            self.0.set_position(u64::from(percent));
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli.command) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    let rule = TableTitleRule::new(LopdfBackend::new());
    match command {
        Commands::Analyze { input, json } => cmd_analyze(&rule, &input, json),
        Commands::Apply {
            input,
            output,
            overwrite,
            font,
            font_size,
            bold,
            italic,
        } => {
            let format_override = build_format_override(font, font_size, bold, italic)?;
            let options = ApplyOptions {
                overwrite,
                format_override,
            };
            cmd_apply(&rule, &input, &output, &options)
        }
    }
}

fn build_format_override(
    font: Option<String>,
    font_size: Option<f32>,
    bold: bool,
    italic: bool,
) -> Result<Option<FormatInfo>> {
    if font.is_none() && font_size.is_none() && !bold && !italic {
        return Ok(None);
    }
    let format = FormatInfo::new(
        font.unwrap_or_else(|| constants::DEFAULT_FONT_NAME.to_string()),
        font_size.unwrap_or(constants::DEFAULT_FONT_SIZE),
        bold,
        italic,
        constants::DEFAULT_COLOR,
    )
    .context("invalid format override")?;
    Ok(Some(format))
}

fn cmd_analyze(rule: &TableTitleRule<LopdfBackend>, input: &PathBuf, json: bool) -> Result<()> {
    if json {
        let analysis = rule
            .analyze(input)
            .with_context(|| format!("failed to analyze {}", input.display()))?;
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    let progress = BarProgress::new();
    let analysis = rule
        .analyze_with_progress(input, &progress)
        .with_context(|| format!("failed to analyze {}", input.display()))?;
    progress.0.finish_and_clear();

    println!("{} {}", "Analyzed".green().bold(), input.display());
    print_summary(&analysis);

    let rewrites: Vec<_> = analysis
        .modifications
        .iter()
        .filter(|m| m.needs_modification())
        .collect();
    if !rewrites.is_empty() {
        println!();
        for m in rewrites {
            println!(
                "  page {:>4}  {} -> {}",
                m.page,
                m.original_title,
                m.modified_title.bold()
            );
        }
    }
    Ok(())
}

fn cmd_apply(
    rule: &TableTitleRule<LopdfBackend>,
    input: &PathBuf,
    output: &PathBuf,
    options: &ApplyOptions,
) -> Result<()> {
    let progress = BarProgress::new();
    let summary = rule
        .apply_with_progress(input, output, options, &progress)
        .with_context(|| format!("failed to process {}", input.display()))?;
    progress.0.finish_and_clear();

    println!(
        "{} rewrote {} of {} repeated titles",
        "Done:".green().bold(),
        summary.outcome.modified,
        summary.analysis.titles_to_modify()
    );
    if summary.outcome.failed > 0 {
        println!(
            "{} {} titles could not be rewritten",
            "warning:".yellow().bold(),
            summary.outcome.failed
        );
    }
    print_summary(&summary.analysis);
    println!("  output:         {}", summary.output_path.display());
    Ok(())
}

fn print_summary(analysis: &AnalysisResult) {
    println!("  titles found:   {}", analysis.total_titles());
    println!("  to rewrite:     {}", analysis.titles_to_modify());
    println!(
        "  format uniform: {}",
        if analysis.format_uniform {
            "yes".green()
        } else {
            "no".yellow()
        }
    );
    if let Some(format) = &analysis.format_info {
        let mut style = String::new();
        if format.is_bold {
            style.push_str(" bold");
        }
        if format.is_italic {
            style.push_str(" italic");
        }
        println!(
            "  common format:  {} {:.1}pt{style}",
            format.font_name, format.font_size
        );
    }
}
