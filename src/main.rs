use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use diffnote::{
    patch_from_texts, Account, CommentNotification, CompareDiff, HighlightOptions, LineKind,
    LineTable, DEFAULT_CONTEXT,
};
use env_logger::Builder;
use log::{info, Level, LevelFilter};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const DEFAULT_UNIFIED: usize = 3;

// --- Main Application Entry Point ---

fn main() {
    let args = Args::parse();
    setup_logging(args.verbose);

    if let Err(e) = run(args) {
        // {:?} prints the full `anyhow` context chain.
        eprintln!("{} {:?}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Contains the primary logic of the application.
fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Show { patch_file, target } => {
            let patch = read_input(&patch_file)?;
            let table = LineTable::build(&patch);
            info!(
                "Read {} line(s) in {} hunk(s) from '{}'.",
                table.len(),
                table.hunk_count(),
                patch_file.display()
            );
            print_excerpt(&table, &target)
        }
        Command::Compare {
            old_file,
            new_file,
            unified,
            target,
        } => {
            let old_text = read_input(&old_file)?;
            let new_text = read_input(&new_file)?;
            let patch = patch_from_texts(&old_text, &new_text, unified);
            if patch.is_empty() {
                return Err(anyhow!(
                    "'{}' and '{}' are identical; there is nothing to highlight.",
                    old_file.display(),
                    new_file.display()
                ));
            }
            let table = LineTable::build(&patch);
            info!(
                "Generated {} line(s) in {} hunk(s).",
                table.len(),
                table.hunk_count()
            );
            print_excerpt(&table, &target)
        }
        Command::Message {
            compare_file,
            file,
            text,
            reviewer_name,
            reviewer_avatar,
            target,
        } => {
            let diff = CompareDiff::from_path(&compare_file)?;
            let reviewer = Account {
                login: reviewer_name,
                name: None,
                avatar_url: reviewer_avatar,
            };
            let notification =
                CommentNotification::for_file(&reviewer, &diff, &file, target.line, &text)?;
            let message = notification
                .to_message(&target.options())
                .with_context(|| format!("Failed to compose the message for '{}'", file))?;
            println!("{}", serde_json::to_string_pretty(&message)?);
            Ok(())
        }
    }
}

// --- Helper Structs and Functions ---

/// Prints the excerpt around the target line, colored by line kind.
fn print_excerpt(table: &LineTable, target: &TargetArgs) -> Result<()> {
    let window = table
        .window(target.line, target.context)
        .with_context(|| format!("Cannot highlight line {}", target.line))?;
    for line in window {
        let selected = line.index == target.line;
        let row = line.format_row(selected);
        let row = match line.kind() {
            LineKind::Deletion => row.red(),
            LineKind::Addition => row.green(),
            LineKind::Context => row.normal(),
        };
        if selected {
            println!("{}", row.bold());
        } else {
            println!("{}", row);
        }
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file '{}'", path.display()))
}

/// Defines the command-line arguments for the application.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Show a unified-diff line with its base/head line numbers and surrounding context.",
    long_about = "Annotates patch lines with the line numbers they have in the base and head version, and renders the excerpt a review-comment notification would show. Line indices are 0-based positions in the patch text, hunk headers included."
)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Increase logging verbosity. Can be used multiple times.
    /// -v for info, -vv for debug, -vvv for trace.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Highlight a line of a patch file.
    Show {
        /// Path to a file holding the patch hunks.
        patch_file: PathBuf,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Diff two files and highlight a line of the resulting patch.
    Compare {
        /// The base version.
        old_file: PathBuf,
        /// The head version.
        new_file: PathBuf,
        /// Number of unchanged lines around each change in the generated patch.
        #[arg(short = 'U', long, default_value_t = DEFAULT_UNIFIED)]
        unified: usize,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Print the chat notification for a comment on a line of a compared file.
    Message {
        /// Path to a compare API response (JSON).
        compare_file: PathBuf,
        /// Name of the commented file, as listed in the comparison.
        #[arg(short, long)]
        file: String,
        /// The comment text.
        #[arg(short, long)]
        text: String,
        /// Name shown for the commenter.
        #[arg(long)]
        reviewer_name: String,
        /// Avatar URL of the commenter.
        #[arg(long)]
        reviewer_avatar: Option<String>,
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// 0-based index of the line to highlight.
    #[arg(short, long)]
    line: usize,
    /// Number of lines to reach on each side of the highlighted line.
    #[arg(short, long, env = "DIFFNOTE_CONTEXT", default_value_t = DEFAULT_CONTEXT)]
    context: usize,
}

impl TargetArgs {
    fn options(&self) -> HighlightOptions {
        HighlightOptions::builder().context(self.context).build()
    }
}

/// Sets up the global logger with a colored level prefix.
fn setup_logging(verbose: u8) {
    let log_level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| match record.level() {
            Level::Error => writeln!(buf, "{} {}", "error:".red().bold(), record.args()),
            Level::Warn => writeln!(buf, "{} {}", "warning:".yellow().bold(), record.args()),
            Level::Info => writeln!(buf, "{}", record.args()),
            Level::Debug => writeln!(buf, "{} {}", "debug:".blue().bold(), record.args()),
            Level::Trace => writeln!(buf, "{} {}", "trace:".cyan().bold(), record.args()),
        })
        .init();
}
