//! besc - compile Bes scripts into workbook named formulas

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bescript_compiler::{compile_file, publish, Diagnostics, FormulaTable, PublishOptions};
use bescript_xlsx::FormulaBook;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "besc")]
#[command(author, version, about = "Compile Bes scripts into workbook named formulas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a script and publish its formulas into a workbook
    Compile {
        /// The Bes script to compile
        script: PathBuf,

        /// Existing workbook to publish into (a fresh one is created if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output workbook (defaults to the input path, or BesBook.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        backup: BackupArgs,

        /// Keep definitions from earlier compiles instead of clearing them
        #[arg(long)]
        no_clear: bool,

        /// Overwrite names not created by this compiler
        #[arg(long)]
        overwrite: bool,
    },

    /// Remove the definitions this compiler previously created
    ClearOwn {
        /// The workbook to clean
        #[arg(short, long)]
        input: PathBuf,

        /// Output workbook (defaults to the input path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        backup: BackupArgs,
    },

    /// Remove every defined name from the workbook
    ClearNames {
        /// The workbook to clean
        #[arg(short, long)]
        input: PathBuf,

        /// Output workbook (defaults to the input path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        backup: BackupArgs,
    },

    /// Print the workbook's defined names
    PrintNames {
        /// The workbook to inspect
        input: PathBuf,

        /// Also print each name's comment
        #[arg(long)]
        full: bool,
    },

    /// Delete the backup directory and everything in it
    DeleteBackups {
        /// The backup directory to delete
        #[arg(short = 'b', long, default_value = "./backups")]
        backup_dir: PathBuf,
    },
}

#[derive(Args)]
struct BackupArgs {
    /// Directory for timestamped copies of modified workbooks
    #[arg(short = 'b', long, default_value = "./backups")]
    backup_dir: PathBuf,

    /// Do not back up the input workbook before overwriting
    #[arg(long)]
    no_backup: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            script,
            input,
            output,
            backup,
            no_clear,
            overwrite,
        } => compile(
            &script,
            input.as_deref(),
            output.as_deref(),
            &backup,
            no_clear,
            overwrite,
        ),
        Commands::ClearOwn {
            input,
            output,
            backup,
        } => clear_own(&input, output.as_deref(), &backup),
        Commands::ClearNames {
            input,
            output,
            backup,
        } => clear_names(&input, output.as_deref(), &backup),
        Commands::PrintNames { input, full } => print_names(&input, full),
        Commands::DeleteBackups { backup_dir } => {
            fs::remove_dir_all(&backup_dir)
                .with_context(|| format!("Failed to delete '{}'", backup_dir.display()))
        }
    }
}

fn compile(
    script: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
    backup: &BackupArgs,
    no_clear: bool,
    overwrite: bool,
) -> Result<()> {
    let output_path = output_path(input, output);
    if let Some(input) = input {
        ensure_xlsx(input)?;
    }
    ensure_xlsx(&output_path)?;

    let result = compile_file(script)
        .with_context(|| format!("Failed to compile '{}'", script.display()))?;
    let mut diagnostics = result.diagnostics;

    report(diagnostics.iter());
    if !diagnostics.is_clean() {
        bail!(
            "Unable to compile due to {} errors",
            diagnostics.error_count()
        );
    }

    let mut book = open_book(input, backup)?;
    let reported = diagnostics.len();
    publish(
        &result.table,
        &mut book,
        PublishOptions {
            clear_previous: !no_clear,
            overwrite,
        },
        &mut diagnostics,
    );
    report(diagnostics.iter().skip(reported));
    if !diagnostics.is_clean() {
        bail!(
            "Unable to save '{}' because of {} errors",
            output_path.display(),
            diagnostics.error_count()
        );
    }

    save_book(&book, &output_path)?;
    println!(
        "Wrote {} definitions to '{}'",
        result.table.len(),
        output_path.display()
    );
    Ok(())
}

fn clear_own(input: &Path, output: Option<&Path>, backup: &BackupArgs) -> Result<()> {
    let output_path = output_path(Some(input), output);
    ensure_xlsx(input)?;
    ensure_xlsx(&output_path)?;

    let mut book = open_book(Some(input), backup)?;
    // Publishing an empty table clears our own names and nothing else
    let mut diagnostics = Diagnostics::new();
    publish(
        &FormulaTable::new(),
        &mut book,
        PublishOptions::default(),
        &mut diagnostics,
    );
    save_book(&book, &output_path)
}

fn clear_names(input: &Path, output: Option<&Path>, backup: &BackupArgs) -> Result<()> {
    use bescript_compiler::NamedFormulaStore;

    let output_path = output_path(Some(input), output);
    ensure_xlsx(input)?;
    ensure_xlsx(&output_path)?;

    let mut book = open_book(Some(input), backup)?;
    for name in book.names() {
        book.remove(&name);
    }
    save_book(&book, &output_path)
}

fn print_names(input: &Path, full: bool) -> Result<()> {
    ensure_xlsx(input)?;
    let book =
        FormulaBook::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;

    for def in book.defined_names() {
        if full {
            println!("{}:", def.name);
            if let Some(comment) = &def.comment {
                println!("\tComment: {comment}");
            }
            println!("\tValue: {}", def.formula);
        } else {
            println!("{}: {}", def.name, def.formula);
        }
    }
    Ok(())
}

fn output_path(input: Option<&Path>, output: Option<&Path>) -> PathBuf {
    match (output, input) {
        (Some(output), _) => output.to_path_buf(),
        (None, Some(input)) => input.to_path_buf(),
        (None, None) => PathBuf::from("BesBook.xlsx"),
    }
}

/// Open the input workbook, backing it up first, or start a fresh one
fn open_book(input: Option<&Path>, backup: &BackupArgs) -> Result<FormulaBook> {
    match input {
        Some(input) => {
            if !backup.no_backup {
                backup_file(input, &backup.backup_dir)?;
            }
            FormulaBook::open(input)
                .with_context(|| format!("Failed to open '{}'", input.display()))
        }
        None => Ok(FormulaBook::new()),
    }
}

fn save_book(book: &FormulaBook, path: &Path) -> Result<()> {
    book.save(path)
        .with_context(|| format!("Failed to save '{}'", path.display()))
}

/// Copy `path` into the backup directory under a timestamped name
fn backup_file(path: &Path, backup_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(backup_dir)
        .with_context(|| format!("Failed to create '{}'", backup_dir.display()))?;
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("workbook");
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let target = backup_dir.join(format!("{stem}_{timestamp}.xlsx"));
    fs::copy(path, &target)
        .with_context(|| format!("Failed to back up '{}'", path.display()))?;
    Ok(target)
}

fn ensure_xlsx(path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx") => Ok(()),
        _ => bail!("'{}' is not an .xlsx file", path.display()),
    }
}

fn report<'a, I: Iterator<Item = &'a bescript_compiler::Diagnostic>>(diagnostics: I) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}
