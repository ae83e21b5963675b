//! CLI interface module
//!
//! Provides command-line interface using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use crate::answer_key::AnswerKeyLayout;
use crate::config::CliOverrides;

/// Exit codes for the CLI
///
/// These codes follow standard Unix conventions and provide
/// specific error categories for scripting and automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful completion
    Success = 0,
    /// General error
    GeneralError = 1,
    /// Argument error
    InvalidArgs = 2,
    /// Input file not found
    InputNotFound = 3,
    /// Output error (write permission etc.)
    OutputError = 4,
    /// Document parse or layout failure
    RenderFailed = 5,
}

impl ExitCode {
    /// Convert to process exit code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Get human-readable description
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::InvalidArgs => "Invalid arguments",
            ExitCode::InputNotFound => "Input file not found",
            ExitCode::OutputError => "Output error (permission denied, disk full, etc.)",
            ExitCode::RenderFailed => "Document parse or layout failure",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.code()
    }
}

/// Two-column exam booklet layout engine
#[derive(Parser, Debug)]
#[command(name = "exambook-pdf")]
#[command(author = "exambook-pdf Contributors")]
#[command(version)]
#[command(about = "Two-column exam booklet layout engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render an exam document into a paginated booklet layout
    Render(RenderArgs),
    /// Show system information and defaults
    Info,
}

/// Answer-key layout choice on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnswerKeyArg {
    /// All sections share one trailing page
    Shared,
    /// One dedicated page per section
    PerSection,
}

impl From<AnswerKeyArg> for AnswerKeyLayout {
    fn from(arg: AnswerKeyArg) -> Self {
        match arg {
            AnswerKeyArg::Shared => AnswerKeyLayout::SharedPage,
            AnswerKeyArg::PerSection => AnswerKeyLayout::PerSection,
        }
    }
}

/// Arguments for the render command
#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Input exam document (JSON)
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Disable whitespace cropping of question images
    #[arg(long = "no-crop")]
    pub no_crop: bool,

    /// Crop padding in pixels
    #[arg(long)]
    pub padding: Option<u32>,

    /// Viewport width to fit pages to after layout
    #[arg(long)]
    pub viewport_width: Option<f32>,

    /// Whether cover pages consume page numbers
    #[arg(long, action = clap::ArgAction::Set)]
    pub covers_numbered: Option<bool>,

    /// Answer-key page layout
    #[arg(long, value_enum)]
    pub answer_key: Option<AnswerKeyArg>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,

    /// Show execution plan without rendering
    #[arg(long)]
    pub dry_run: bool,
}

impl RenderArgs {
    /// Collect the CLI-level option overrides.
    pub fn cli_overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides::new();
        if self.no_crop {
            overrides.crop_enabled = Some(false);
        }
        overrides.padding = self.padding;
        overrides.viewport_width = self.viewport_width;
        overrides.covers_numbered = self.covers_numbered;
        overrides.answer_key_layout = self.answer_key.map(Into::into);
        overrides
    }
}

/// Create a styled progress bar for question placement
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb
}

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb
}
