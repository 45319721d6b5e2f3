use anyhow::{Context, Result};
use api_rewriter::config::{load_for_workspace, load_from_path, RewriteConfig};
use api_rewriter::{run, webgpu_rules, FileChange, LengthStyle, RunOptions, RunSummary};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "api-rewriter")]
#[command(about = "Rewrite WebGPU C API call sites to the current header revision", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite matching files in place
    Apply {
        #[command(flatten)]
        selection: Selection,

        /// Dry run - report what would change without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Fail if any file would be rewritten (nothing is modified)
    Check {
        #[command(flatten)]
        selection: Selection,

        /// Show unified diff of pending changes
        #[arg(short, long)]
        diff: bool,
    },

    /// List the built-in rules in application order
    Rules {
        /// Length style used by the descriptor rules
        #[arg(long, value_enum, default_value_t = LengthArg::Literal)]
        length: LengthArg,
    },
}

#[derive(Args)]
struct Selection {
    /// Workspace root (defaults to $API_REWRITER_WORKSPACE, then the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Config file (defaults to <workspace>/api-rewriter.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to scan, relative to the workspace (repeatable; overrides config)
    #[arg(short, long = "root")]
    roots: Vec<PathBuf>,

    /// File-name suffix to select (repeatable; overrides config)
    #[arg(short, long = "suffix")]
    suffixes: Vec<String>,

    /// Length style for string-view descriptors (overrides config)
    #[arg(long, value_enum)]
    length: Option<LengthArg>,

    /// Print the run summary as JSON instead of text
    #[arg(long)]
    json: bool,

    /// List unchanged files and per-rule hit counts
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LengthArg {
    Literal,
    Strlen,
}

impl From<LengthArg> for LengthStyle {
    fn from(arg: LengthArg) -> Self {
        match arg {
            LengthArg::Literal => LengthStyle::Literal,
            LengthArg::Strlen => LengthStyle::Strlen,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            selection,
            dry_run,
            diff,
        } => cmd_apply(selection, dry_run, diff),

        Commands::Check { selection, diff } => cmd_check(selection, diff),

        Commands::Rules { length } => cmd_rules(length.into()),
    }
}

/// Resolve workspace path
///
/// Priority order:
/// 1. Explicit --workspace flag
/// 2. API_REWRITER_WORKSPACE environment variable
/// 3. Current directory
fn resolve_workspace(cli_workspace: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_workspace {
        return path
            .canonicalize()
            .with_context(|| format!("workspace not found: {}", path.display()));
    }

    if let Ok(env_path) = env::var("API_REWRITER_WORKSPACE") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        eprintln!(
            "{}",
            format!(
                "Warning: API_REWRITER_WORKSPACE is set but path doesn't exist: {}",
                env_path
            )
            .yellow()
        );
    }

    Ok(env::current_dir()?)
}

/// Load the config and apply command-line overrides.
fn resolve_config(selection: &Selection, workspace: &Path) -> Result<RewriteConfig> {
    let mut config = match &selection.config {
        Some(path) => load_from_path(path)?,
        None => load_for_workspace(workspace)?,
    };

    if !selection.roots.is_empty() {
        config.scan.roots = selection.roots.clone();
    }
    if !selection.suffixes.is_empty() {
        config.scan.suffixes = selection.suffixes.clone();
    }
    if let Some(length) = selection.length {
        config.rewrite.length = length.into();
    }

    Ok(config)
}

fn execute(selection: &Selection, options: RunOptions) -> Result<RunSummary> {
    let workspace = resolve_workspace(selection.workspace.clone())?;
    let config = resolve_config(selection, &workspace)?;
    let rules = config.rule_set()?;

    if !selection.json {
        println!("Workspace: {}", workspace.display());
        println!(
            "Roots: {}",
            config
                .scan
                .roots
                .iter()
                .map(|r| r.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("Rules: {}", rules.len());
        println!();
    }

    Ok(run(&config.scan, &workspace, &rules, options)?)
}

/// Helper: Show unified diff between original and rewritten content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn report_change(change: &FileChange, verb: &str, verbose: bool, show_diff: bool) {
    println!("{} {} {}", "✓".green(), verb, change.path.display());
    if verbose {
        for hit in &change.hits {
            println!("    {} x{}", hit.rule.dimmed(), hit.count);
        }
    }
    if show_diff {
        if let (Some(before), Some(after)) = (&change.before, &change.after) {
            display_diff(&change.path, before, after);
        }
    }
}

fn print_json(summary: &RunSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

fn cmd_apply(selection: Selection, dry_run: bool, show_diff: bool) -> Result<()> {
    let options = if dry_run {
        RunOptions::dry_run()
    } else {
        RunOptions::default()
    }
    .with_diff(show_diff);

    let summary = execute(&selection, options)?;

    if selection.json {
        return print_json(&summary);
    }

    if dry_run {
        println!("{}", "[DRY RUN - no files are written]".cyan());
    }

    let verb = if dry_run { "Would rewrite" } else { "Rewrote" };
    for change in &summary.changes {
        report_change(change, verb, selection.verbose, show_diff);
    }
    if selection.verbose {
        for path in &summary.unchanged {
            println!("{} Unchanged {}", "⊙".yellow(), path.display());
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} scanned", summary.scanned);
    if dry_run {
        println!(
            "{}",
            format!("Would modify {} file(s)", summary.modified()).green()
        );
    } else {
        println!(
            "{}",
            format!("Modified {} file(s)", summary.modified()).green()
        );
    }

    Ok(())
}

fn cmd_check(selection: Selection, show_diff: bool) -> Result<()> {
    let summary = execute(&selection, RunOptions::dry_run().with_diff(show_diff))?;

    if selection.json {
        print_json(&summary)?;
    } else {
        for change in &summary.changes {
            eprintln!("{} {}: needs rewrite", "✗".red(), change.path.display());
            if selection.verbose {
                for hit in &change.hits {
                    eprintln!("    {} x{}", hit.rule.dimmed(), hit.count);
                }
            }
            if show_diff {
                if let (Some(before), Some(after)) = (&change.before, &change.after) {
                    display_diff(&change.path, before, after);
                }
            }
        }
        if selection.verbose {
            for path in &summary.unchanged {
                println!("{} Up to date {}", "⊙".yellow(), path.display());
            }
        }

        println!();
        println!("{}", "Summary:".bold());
        println!("  {} scanned", summary.scanned);
        println!(
            "{}",
            format!("  {} need rewrite", summary.modified()).red()
        );
    }

    if summary.modified() > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_rules(length: LengthStyle) -> Result<()> {
    println!("{} (length style: {})", "Built-in rules".bold(), length);
    for (idx, rule) in webgpu_rules(length).iter().enumerate() {
        println!("{:>3}. {}", idx + 1, rule.name.green());
        println!("     {}", rule.description.dimmed());
    }
    Ok(())
}
