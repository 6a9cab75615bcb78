//! bookmarker CLI - rule-based PDF bookmark tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use bookmarker::{
    page_lines, BuildOptions, LayoutProvider, LopdfProvider, Outline, OutlineBuilder, RuleConfig,
};

const SAMPLE_CONFIG: &str = r#"{
  "exclusion": {
    "max_line_length": 40,
    "exclude_chars": ["。", "，", "；", "...."],
    "min_y_coord": 0,
    "max_y_coord": 9999
  },
  "level1": {
    "regex": "第[一二三四五六七八九十百]+章",
    "font_contains": [],
    "font_size": 15,
    "is_bold": true
  },
  "level2": {
    "regex": "\\d+\\.\\d+\\s",
    "font_size": [13.5, 14.5]
  },
  "level3": {
    "regex": "\\d+\\.\\d+\\.\\d+\\s",
    "font_size": [11.5, 12.5]
  }
}
"#;

#[derive(Parser)]
#[command(name = "bookmarker")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Generate PDF bookmarks from heading rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a bookmarked copy of a PDF
    Apply {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Rule configuration (JSON)
        #[arg(short, long, value_name = "CONFIG", env = "BOOKMARKER_CONFIG")]
        config: PathBuf,

        /// Output file (defaults to <stem>_bookmarked.pdf)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Treat unreadable pages as empty
        #[arg(long)]
        lenient: bool,

        /// Do not compress streams in the output
        #[arg(long)]
        no_compress: bool,
    },

    /// Show the headings the rules would produce, without writing
    Scan {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Rule configuration (JSON)
        #[arg(short, long, value_name = "CONFIG", env = "BOOKMARKER_CONFIG")]
        config: PathBuf,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// List every text line with its font facts, for writing rules
    Lines {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Only this page (1-based)
        #[arg(short, long)]
        page: Option<usize>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a sample rule configuration
    Init {
        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            input,
            config,
            output,
            lenient,
            no_compress,
        } => {
            let mut options = BuildOptions::new().with_compression(!no_compress);
            if lenient {
                options = options.lenient();
            }
            cmd_apply(&input, &config, output.as_deref(), options)
        }
        Commands::Scan {
            input,
            config,
            json,
        } => cmd_scan(&input, &config, json),
        Commands::Lines { input, page, json } => cmd_lines(&input, page, json),
        Commands::Init { output } => cmd_init(output.as_deref()),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        if let Some(hint) = e
            .downcast_ref::<bookmarker::Error>()
            .and_then(bookmarker::Error::hint)
        {
            eprintln!("{}: {}", "Hint".yellow().bold(), hint);
        }
        std::process::exit(1);
    }
}

fn cmd_apply(input: &Path, config: &Path, output: Option<&Path>, options: BuildOptions) -> CliResult {
    let rules = RuleConfig::from_json_file(config)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input));

    let mut provider = LopdfProvider::load_file(input)?;
    log::debug!(
        "Loaded {} (PDF {}, {} pages)",
        input.display(),
        provider.version(),
        provider.page_count()
    );
    let pb = page_progress(provider.page_count())?;

    let result = {
        let total = provider.page_count();
        let mut builder = OutlineBuilder::new(&rules)
            .with_options(options)
            .on_progress(|fraction| {
                let done = (fraction * total as f32).round() as u64;
                pb.set_position(done);
                pb.set_message(format!("Scanning page {}/{}", done, total));
            });
        builder.build(&mut provider)
    };
    pb.finish_and_clear();
    let result = result?;

    fs::write(&output, &result.data)?;

    println!(
        "{} {} bookmarks (max depth {})",
        "Added".green().bold(),
        result.entry_count(),
        result.outline.max_depth()
    );
    println!("{} {}", "Saved to".green(), output.display());
    Ok(())
}

fn cmd_scan(input: &Path, config: &Path, json: bool) -> CliResult {
    let rules = RuleConfig::from_json_file(config)?;
    let provider = LopdfProvider::load_file(input)?;
    let outline = OutlineBuilder::new(&rules).scan(&provider)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outline)?);
    } else {
        print_outline(&outline);
    }

    if let Err(e) = outline.validate() {
        eprintln!("{}: {}", "Warning".yellow().bold(), e);
        if let Some(hint) = e.hint() {
            eprintln!("{}: {}", "Hint".yellow().bold(), hint);
        }
    }
    Ok(())
}

fn cmd_lines(input: &Path, page: Option<usize>, json: bool) -> CliResult {
    let provider = LopdfProvider::load_file(input)?;
    let total = provider.page_count();

    let pages: Vec<usize> = match page {
        Some(p) if p == 0 || p > total => {
            return Err(format!("page {} is out of range (document has {} pages)", p, total).into())
        }
        Some(p) => vec![p - 1],
        None => (0..total).collect(),
    };

    let mut records = Vec::new();
    for page_index in pages {
        records.extend(page_lines(provider.get_lines(page_index)?, page_index));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:>4}  {:>6}  {:>4}  {:>7}  {:>7}  {:<24}  {}",
            "Page", "Size", "Bold", "x0", "y0", "Font", "Text"
        )
        .cyan()
        .bold()
    );
    println!("{}", "─".repeat(80).dimmed());
    for r in &records {
        println!(
            "{:>4}  {:>6.2}  {:>4}  {:>7.1}  {:>7.1}  {:<24}  {}",
            r.page_index + 1,
            r.font_size,
            if r.is_bold { "yes" } else { "" },
            r.x0,
            r.y0,
            truncate(&r.font_name, 24),
            r.text
        );
    }
    println!("\n{} lines", records.len());
    Ok(())
}

fn cmd_init(output: Option<&Path>) -> CliResult {
    if let Some(path) = output {
        fs::write(path, SAMPLE_CONFIG)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        print!("{}", SAMPLE_CONFIG);
    }
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "bookmarker".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Rule-based PDF bookmark tool");
    println!();
    println!("License: MIT");
}

fn print_outline(outline: &Outline) {
    println!("{}", "Outline".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for entry in outline {
        let indent = "  ".repeat(entry.level.saturating_sub(1) as usize);
        println!(
            "{}{} {}",
            indent,
            entry.title,
            format!("p.{}", entry.page_number).dimmed()
        );
    }
    println!("\n{} headings", outline.len());
}

fn page_progress(total: usize) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{}_bookmarked.pdf", stem))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max - 1).collect();
        out.push('…');
        out
    }
}
