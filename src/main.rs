use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use sdkgen::output::{WriteReport, write_generated};
use sdkgen::{Config, InputFormat, Result, SdkGenError};

#[derive(Debug, Parser)]
#[command(
    name = "sdkgen",
    version,
    about = "Generate a Saloon PHP SDK from an OpenAPI document, Postman collection or HAR file"
)]
struct Cli {
    /// API description to read
    input: PathBuf,

    /// Input format (openapi, postman, har)
    #[arg(long = "type", value_name = "TYPE", default_value = "openapi")]
    input_type: InputFormat,

    /// Generator configuration (.json or .toml)
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,

    /// Directory to write into, overriding `outputDir` from the configuration
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    sdkgen::init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("❌ {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<WriteReport> {
    let config = load_config(&cli.config)?;
    let source = read_file(&cli.input)?;
    debug!(input = %cli.input.display(), format = %cli.input_type, "Read input.");

    let code = sdkgen::generate_from_source(cli.input_type, &source, &config)?;
    if !code.collisions.is_empty() {
        debug!(count = code.collisions.len(), "Resolved method name collisions.");
    }

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));
    write_generated(&code, &config.namespace(), &output_dir, cli.force || config.force)
}

fn load_config(path: &Path) -> Result<Config> {
    let source = read_file(path)?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        Config::from_toml_str(&source)
    } else {
        Config::from_json_str(&source)
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| SdkGenError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn print_summary(report: &WriteReport) {
    println!("✅ Wrote {} file(s)", report.written.len());
    for path in &report.written {
        println!("  {}", path.display());
    }
    if !report.skipped.is_empty() {
        println!("Skipped {} existing file(s), use --force to overwrite:", report.skipped.len());
        for path in &report.skipped {
            println!("  {}", path.display());
        }
    }
}
