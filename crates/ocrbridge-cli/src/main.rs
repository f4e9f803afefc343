//! ocrbridge command-line interface.
//!
//! ```text
//! ocrbridge process scan.png --dpi 300 --lang spa
//! ocrbridge process report.pdf --output report.txt
//! ocrbridge batch page1.png page2.png --format json
//! ocrbridge supported
//! ocrbridge config
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ocrbridge::{OcrRequest, OcrResult, OcrService, ProcessConfig, process_batch};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ocrbridge", version, about = "Run OCR on images and PDFs through an external engine", long_about = None)]
struct Cli {
    /// Configuration file (.toml, .yaml, .yml or .json). Defaults to a discovered ocrbridge.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize the text in one image or PDF
    Process {
        /// Path to the image or PDF
        file: PathBuf,

        /// Rendering resolution passed to the engine
        #[arg(long)]
        dpi: Option<u32>,

        /// Language code(s), e.g. spa, eng or spa+eng
        #[arg(long)]
        lang: Option<String>,

        /// Write the result to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Recognize several files concurrently
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        dpi: Option<u32>,

        #[arg(long)]
        lang: Option<String>,

        /// Maximum number of engine processes running at once (defaults to CPU count)
        #[arg(long)]
        max_concurrent: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List supported file extensions and languages
    Supported {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = ProcessConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::debug!(
        executable = %config.executable_path.display(),
        script = %config.script_path.display(),
        "Loaded configuration"
    );

    match cli.command {
        Commands::Process {
            file,
            dpi,
            lang,
            output,
            format,
        } => {
            let service = OcrService::new(config)?;
            process_one(&service, file, dpi, lang, output.as_deref(), format).await
        }
        Commands::Batch {
            files,
            dpi,
            lang,
            max_concurrent,
            format,
        } => {
            let service = OcrService::new(config)?;
            process_many(&service, files, dpi, lang, max_concurrent, format).await
        }
        Commands::Supported { format } => {
            print_supported(&config, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            let rendered = config.to_toml_string().context("Failed to serialize configuration")?;
            print!("{}", rendered);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn process_one(
    service: &OcrService,
    file: PathBuf,
    dpi: Option<u32>,
    lang: Option<String>,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let file = resolve(file)?;
    let request = build_request(&file, dpi, lang.as_deref());

    if format == OutputFormat::Json {
        let result = service.process(request).await;
        let rendered = serde_json::to_string_pretty(&result.to_json_with_file(&file)?)?;
        emit(&rendered, output)?;
        return Ok(exit_code(result.is_success()));
    }

    println!("Processing file: {}", file.display());
    if let Some(dpi) = dpi {
        println!("DPI: {}", dpi);
    }
    if let Some(lang) = &lang {
        println!("Language: {}", lang);
    }
    println!();

    let result = service.process(request).await;

    let Some(text) = result.text() else {
        eprintln!("Error: {}", result.error().unwrap_or_default());
        return Ok(ExitCode::FAILURE);
    };

    println!("Pages processed: {}", result.pages());
    println!("Processing time: {:.2} seconds", result.processing_time_secs());
    println!("Characters extracted: {}", text.chars().count());
    println!();

    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Result saved to: {}", path.display());
        }
        None => {
            println!("--- Extracted text ---");
            println!();
            println!("{}", text);
            println!();
            println!("--- End of text ---");
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn process_many(
    service: &OcrService,
    files: Vec<PathBuf>,
    dpi: Option<u32>,
    lang: Option<String>,
    max_concurrent: Option<usize>,
    format: OutputFormat,
) -> Result<ExitCode> {
    let files = files.into_iter().map(resolve).collect::<Result<Vec<_>>>()?;
    let requests = files
        .iter()
        .map(|file| build_request(file, dpi, lang.as_deref()))
        .collect();

    let results = process_batch(service, requests, max_concurrent).await;
    let all_succeeded = results.iter().all(OcrResult::is_success);

    match format {
        OutputFormat::Json => {
            let records = files
                .iter()
                .zip(&results)
                .map(|(file, result)| result.to_json_with_file(file))
                .collect::<ocrbridge::Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Text => {
            for (file, result) in files.iter().zip(&results) {
                match result.text() {
                    Some(text) => println!(
                        "{}: OK ({} pages, {} characters, {:.2} seconds)",
                        file.display(),
                        result.pages(),
                        text.chars().count(),
                        result.processing_time_secs()
                    ),
                    None => println!("{}: Error: {}", file.display(), result.error().unwrap_or_default()),
                }
            }
        }
    }

    Ok(exit_code(all_succeeded))
}

fn print_supported(config: &ProcessConfig, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "extensions": config.supported_extensions,
                "languages": config.supported_languages,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("Extensions: {}", config.supported_extensions.join(", "));
            println!("Languages: {}", config.supported_languages.join(", "));
        }
    }
    Ok(())
}

/// Relative paths are taken relative to the current directory.
fn resolve(file: PathBuf) -> Result<PathBuf> {
    if file.is_absolute() {
        return Ok(file);
    }
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    Ok(cwd.join(file))
}

fn build_request(file: &Path, dpi: Option<u32>, lang: Option<&str>) -> OcrRequest {
    let mut request = OcrRequest::new(file);
    if let Some(dpi) = dpi {
        request = request.with_dpi(dpi);
    }
    if let Some(lang) = lang {
        request = request.with_lang(lang);
    }
    request
}

fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, rendered).with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", rendered);
            Ok(())
        }
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}
