//! exambook-pdf - Two-column exam booklet layout engine
//!
//! CLI entry point

use clap::Parser;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::Path;

use exambook_pdf::{
    collect_cropped_images, create_progress_bar, format_duration, Cli, Commands, Config,
    ExamDocument, ExitCode, LayoutManifest, RenderArgs, RenderCallback, RenderError,
    RenderOptions, RenderSession, SilentCallback,
};

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Render(args) => run_render(&args),
        Commands::Info => run_info(),
    };

    std::process::exit(code.code());
}

// ============ Progress Callback Implementation ============

/// Progress-bar callback for CLI output
struct ProgressReporter {
    bar: ProgressBar,
    verbose: u8,
}

impl ProgressReporter {
    fn new(total_questions: u64, verbose: u8) -> Self {
        Self {
            bar: create_progress_bar(total_questions),
            verbose,
        }
    }
}

impl RenderCallback for ProgressReporter {
    fn on_render_started(&self, document: &ExamDocument) {
        if self.verbose > 0 {
            self.bar
                .println(format!("Rendering {} section(s)", document.tests.len()));
        }
    }

    fn on_section_start(&self, section_name: &str) {
        self.bar.set_message(section_name.to_string());
    }

    fn on_page_created(&self, page_index: usize, kind: &str) {
        if self.verbose > 0 {
            self.bar
                .println(format!("  page {} ({})", page_index + 1, kind));
        }
    }

    fn on_question_placed(
        &self,
        _section_name: &str,
        _question_number: Option<u32>,
        _page_index: usize,
        _column: exambook_pdf::ColumnSide,
    ) {
        self.bar.inc(1);
    }

    fn on_render_complete(&self, page_count: usize) {
        self.bar
            .finish_with_message(format!("{} pages laid out", page_count));
    }

    fn on_render_error(&self, _error: &RenderError) {
        self.bar.abandon();
    }

    fn on_debug(&self, message: &str) {
        if self.verbose > 1 {
            self.bar.println(format!("  [DEBUG] {}", message));
        }
    }
}

// ============ Render Command ============

fn run_render(args: &RenderArgs) -> ExitCode {
    if !args.input.exists() {
        eprintln!("Error: Input path does not exist: {}", args.input.display());
        return ExitCode::InputNotFound;
    }

    let json = match std::fs::read_to_string(&args.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", args.input.display(), e);
            return ExitCode::GeneralError;
        }
    };

    let document = match ExamDocument::from_json(&json) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: failed to parse exam document: {}", e);
            return ExitCode::RenderFailed;
        }
    };

    // Load config file if specified, otherwise use the search path
    let file_config = match &args.config {
        Some(config_path) => match Config::load_from_path(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                Config::default()
            }
        },
        None => Config::load().unwrap_or_default(),
    };

    let mut options = file_config.merge_with_cli(&args.cli_overrides());
    options.asset_root = args
        .input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    if args.dry_run {
        print_plan(args, &document, &options);
        return ExitCode::Success;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::GeneralError;
        }
    };

    let session = RenderSession::new(options);
    let result = if args.quiet {
        runtime.block_on(session.render(&document, &SilentCallback))
    } else {
        let reporter = ProgressReporter::new(document.question_count() as u64, args.verbose);
        runtime.block_on(session.render(&document, &reporter))
    };

    let booklet = match result {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::RenderFailed;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&args.output) {
        eprintln!(
            "Error: cannot create output directory {}: {}",
            args.output.display(),
            e
        );
        return ExitCode::OutputError;
    }

    // Write cropped question images next to the manifest
    let images = collect_cropped_images(&booklet);
    let write_errors: Vec<String> = images
        .par_iter()
        .filter_map(|img| {
            std::fs::write(args.output.join(&img.file_name), img.bytes.as_slice())
                .err()
                .map(|e| format!("{}: {}", img.file_name, e))
        })
        .collect();
    for err in &write_errors {
        eprintln!("Warning: failed to write image {}", err);
    }

    let manifest = LayoutManifest::new(&document, &booklet);
    let manifest_json = match manifest.to_json_pretty() {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error: failed to serialize manifest: {}", e);
            return ExitCode::GeneralError;
        }
    };
    if let Err(e) = std::fs::write(args.output.join("layout.json"), manifest_json) {
        eprintln!("Error: failed to write layout.json: {}", e);
        return ExitCode::OutputError;
    }

    println!(
        "Completed: {} pages, {} questions, {} cropped images in {}",
        booklet.page_count(),
        booklet.question_count,
        images.len(),
        format_duration(booklet.elapsed)
    );

    ExitCode::Success
}

fn print_plan(args: &RenderArgs, document: &ExamDocument, options: &RenderOptions) {
    println!("=== Dry Run - Execution Plan ===");
    println!("Input: {}", args.input.display());
    println!("Output: {}", args.output.display());
    println!("Sections: {}", document.tests.len());
    for section in &document.tests {
        println!(
            "  - {}: {} questions, {} answers, {} answer slots",
            section.name,
            section.questions.len(),
            section.answers.len(),
            exambook_pdf::total_slots(section)
        );
    }
    println!("Questions: {}", document.question_count());
    println!(
        "Cover pages: {}",
        if document.has_valid_test_type() {
            "2"
        } else {
            "none"
        }
    );
    println!(
        "Cropping: {}",
        if options.crop.enabled {
            "ENABLED"
        } else {
            "DISABLED"
        }
    );
    println!(
        "Covers numbered: {}",
        if options.covers_numbered { "YES" } else { "NO" }
    );
    println!("Answer key layout: {:?}", options.answer_key_layout);
    println!("Verbose: {}", args.verbose);
}

// ============ Info Command ============

fn run_info() -> ExitCode {
    let metrics = exambook_pdf::PageMetrics::default();

    println!("exambook-pdf v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("=== System Information ===");
    println!(
        "Platform: {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!();
    println!("=== Layout Defaults ===");
    println!(
        "Page size: {}x{} layout units (A4 @ 96 px/inch)",
        metrics.page_width, metrics.page_height
    );
    println!("Column width: {}", metrics.column_width());
    println!(
        "Column capacity: {} (section first) / {} (continuation)",
        metrics.column_capacity(true),
        metrics.column_capacity(false)
    );
    println!();
    println!("=== Config Search Paths ===");
    for path in Config::search_paths() {
        println!("  {}", path.display());
    }

    ExitCode::Success
}
