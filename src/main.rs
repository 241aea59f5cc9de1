use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use receipt_verifier::{
    ReceiptAnalyzer, VerifierConfig,
    batch::BatchProcessor,
    ocr::{FixtureRecognizer, OcrSpaceClient, RecognizerWrapper},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::signal;

/// Receipt verifier - authenticity checks for payment receipt screenshots
#[derive(Parser, Debug)]
#[command(name = "receipt_verifier")]
#[command(about = "Checks payment receipt images for signs of tampering", long_about = None)]
struct Args {
    /// JSON configuration file (defaults are used when missing)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score the recognized words against the known receipt templates
    Text {
        image: PathBuf,
        /// Replay recognized words from a JSON file instead of calling the service
        #[arg(short = 'w', long)]
        words: Option<PathBuf>,
    },
    /// Compare the brand mark position with the reference receipts
    Logo { image: PathBuf },
    /// Extract amount, receiver, date and the other fields from the receipt text
    Fields {
        image: PathBuf,
        #[arg(short = 'w', long)]
        words: Option<PathBuf>,
    },
    /// Run the color gate and the sharpness estimate
    Prefilter { image: PathBuf },
    /// Run the logo check over every image of a directory
    Batch { dir: PathBuf },
}

fn recognizer(words: Option<&Path>, config: &VerifierConfig) -> Result<RecognizerWrapper> {
    Ok(match words {
        Some(path) => RecognizerWrapper::Fixture(
            FixtureRecognizer::from_file(path)
                .with_context(|| format!("Failed to load words from {}", path.display()))?,
        ),
        None => RecognizerWrapper::OcrSpace(OcrSpaceClient::new(&config.ocr, config.api_key()?)?),
    })
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        anyhow::bail!("Image {} does not exist", path.display());
    }
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Await a recognition-backed check, giving up when Ctrl-C arrives first.
async fn until_interrupted<T>(
    check: impl Future<Output = receipt_verifier::Result<T>>,
) -> Result<T> {
    tokio::select! {
        result = check => Ok(result?),
        result = signal::ctrl_c() => {
            result?;
            anyhow::bail!("Interrupted before the recognition service answered");
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter(None, log::LevelFilter::Info)
        .filter(Some("receipt_verifier"), log::LevelFilter::Debug)
        .init();

    let args = Args::parse();
    let config = VerifierConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Text { image, words } => {
            let bytes = read_image(&image)?;
            let recognizer = recognizer(words.as_deref(), &config)?;
            let analyzer = ReceiptAnalyzer::new(config, recognizer);
            print_json(&until_interrupted(analyzer.verify_text(&bytes)).await?)?;
        }
        Command::Logo { image } => {
            let bytes = read_image(&image)?;
            let analyzer =
                ReceiptAnalyzer::new(config, RecognizerWrapper::Fixture(FixtureRecognizer::default()))
                    .load_logo_verifier()?;
            print_json(&analyzer.verify_logo(&bytes)?)?;
        }
        Command::Fields { image, words } => {
            let bytes = read_image(&image)?;
            let recognizer = recognizer(words.as_deref(), &config)?;
            let analyzer = ReceiptAnalyzer::new(config, recognizer);
            print_json(&until_interrupted(analyzer.extract_fields(&bytes)).await?)?;
        }
        Command::Prefilter { image } => {
            let bytes = read_image(&image)?;
            let analyzer =
                ReceiptAnalyzer::new(config, RecognizerWrapper::Fixture(FixtureRecognizer::default()));
            print_json(&analyzer.prefilter(&bytes)?)?;
        }
        Command::Batch { dir } => {
            if !dir.is_dir() {
                anyhow::bail!("{} is not a directory", dir.display());
            }
            let analyzer =
                ReceiptAnalyzer::new(config, RecognizerWrapper::Fixture(FixtureRecognizer::default()))
                    .load_logo_verifier()?;
            let summary = BatchProcessor::new(&analyzer).process_dir(&dir)?;
            print_json(&summary)?;
        }
    }

    info!("Done");
    Ok(())
}
