//! zipu CLI - fix unreadable file names inside zip files
//!
//! # Examples
//!
//! ```bash
//! # Show corrected names and the default destination
//! zipu archive.zip
//!
//! # Try a specific encoding
//! zipu archive.zip -e cp932
//!
//! # Extract with corrected names
//! zipu archive.zip -x
//! zipu archive.zip /tmp/out -x -p secret
//!
//! # Write archive_fixed.zip with UTF-8 names
//! zipu archive.zip -f
//!
//! # Generate shell completions
//! zipu --completions bash > ~/.bash_completion.d/zipu
//! ```

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use zip_unicode::{Error, ExtractOptions, ZipHandler};

#[derive(Parser)]
#[command(
    name = "zipu",
    about = "Fix filename encoding error inside a zip file",
    version,
    after_help = "EXAMPLES:
    zipu archive.zip
    zipu archive.zip -e shift_jis
    zipu archive.zip /tmp/out -x
    zipu archive.zip -f -p secret"
)]
struct Cli {
    /// Path to zip file
    #[arg(required_unless_present = "completions")]
    archive: Option<PathBuf>,

    /// Folder path to extract zip file
    destination: Option<PathBuf>,

    /// Extract the zip file to the destination
    #[arg(short = 'x', long)]
    extract: bool,

    /// Create a new zip file with UTF-8 file names
    #[arg(short, long, conflicts_with = "extract")]
    fix: bool,

    /// Encoding used by the zip file: shift_jis, cp932, gbk, euc-kr...
    #[arg(short, long, visible_alias = "enc", value_name = "ENCODING")]
    encoding: Option<String>,

    /// Password to extract the zip file
    #[arg(short, long, visible_alias = "pwd", value_name = "SECRET")]
    password: Option<String>,

    /// Generate shell completions for the specified shell
    #[arg(long, value_enum)]
    completions: Option<Shell>,

    /// Quiet mode - only show warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - show each file extracted
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Handle completions generation
    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "zipu", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    init_logging(&cli);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = format!("warn,zip_unicode={level},zipu={level}");

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn run(cli: Cli) -> Result<(), Error> {
    let archive = cli.archive.as_ref().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "archive is required",
        ))
    })?;

    let mut zip = ZipHandler::open(archive)?.analyze(cli.encoding.as_deref())?;

    let mut options = ExtractOptions::new();
    if let Some(password) = &cli.password {
        options = options.with_password(password);
    }

    if cli.extract {
        if let Some(destination) = &cli.destination {
            options = options.with_destination(destination);
        }
        let report = zip.extract_all(&options)?;
        if !cli.quiet {
            println!(
                "Extracted {} files ({} bytes) to {}",
                report.files_extracted,
                report.bytes_written,
                options
                    .destination()
                    .unwrap_or(zip.default_destination())
                    .display()
            );
        }
    } else if cli.fix {
        let fixed = zip.fix_it(&options)?;
        if !cli.quiet {
            println!("Fixed archive written to {}", fixed.display());
        }
    } else {
        println!("{}", zip.summary());
    }

    Ok(())
}
