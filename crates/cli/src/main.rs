//! CLI tool for translating PowerPoint decks into Traditional Chinese.

mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use deck_core::Progress;
use deck_llm::{AzureConfig, AzureSettings, AzureTranslator, RetryPolicy};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use pipeline::SlideCount;

/// Translate every text run and table cell of a .pptx deck through an
/// Azure OpenAI deployment.
#[derive(Parser, Debug)]
#[command(name = "deck-translate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file (.pptx)
    input: PathBuf,

    /// Output directory for translated.pptx (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Azure OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Azure OpenAI endpoint, e.g. https://<resource>.openai.azure.com
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// Azure OpenAI API version
    #[arg(long, env = "OPENAI_API_VERSION")]
    api_version: Option<String>,

    /// API flavour; only "azure" is supported
    #[arg(long, env = "OPENAI_API_TYPE")]
    api_type: Option<String>,

    /// Model deployment name
    #[arg(short, long, env = "DEPLOYMENT_NAME")]
    deployment: Option<String>,

    /// Sampling temperature
    #[arg(long, default_value_t = deck_llm::config::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Maximum tokens per completion
    #[arg(long, default_value_t = deck_llm::config::DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Attempts per text before giving up on rate limits
    #[arg(long, default_value = "10")]
    max_attempts: u32,

    /// Count translatable units per slide and exit without calling the API
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    // Must run before parsing so `.env` values reach the env fallbacks
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }
    if let Ok(path) = &dotenv {
        log::debug!("Loaded environment from {}", path.display());
    }

    if args.dry_run {
        let bytes = read_input(&args.input)?;
        let counts = pipeline::count_report(&bytes)?;
        print_count_report(&args.input, &counts);
        return Ok(());
    }

    // Configuration problems are fatal before any input is read
    let config = AzureConfig::from_settings(azure_settings(&args))
        .context("Invalid Azure OpenAI configuration")?;
    log::debug!(
        "Using deployment '{}' at {}",
        config.deployment,
        config.endpoint
    );
    let mut translator = AzureTranslator::new(config)
        .context("Failed to create HTTP client")?
        .with_retry_policy(RetryPolicy::default().with_max_attempts(args.max_attempts));

    if args.verbose {
        eprintln!("Processing: {}", args.input.display());
    }
    let bytes = read_input(&args.input)?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} units ({percent}%)")?
            .progress_chars("=>-"),
    );
    let mut observer = |progress: Progress| {
        bar.set_length(progress.total as u64);
        bar.set_position(progress.processed as u64);
    };

    let (deck, report) = match pipeline::translate_deck(&bytes, &mut translator, &mut observer) {
        Ok(done) => done,
        Err(e) => {
            bar.abandon();
            return Err(e);
        }
    };
    bar.finish_with_message("Translation complete!");

    let output_path = get_output_path(&args.input, args.output.as_ref(), &deck.file_name)?;
    fs::write(&output_path, &deck.data)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    eprintln!(
        "Translated {} of {} units ({} empty, {} non-text)",
        report.translated, report.total, report.skipped_empty, report.opaque
    );
    eprintln!("Written to: {}", output_path.display());
    if args.verbose {
        eprintln!("  {} bytes, {}", deck.data.len(), deck.mime_type);
    }

    Ok(())
}

fn azure_settings(args: &Args) -> AzureSettings {
    AzureSettings {
        api_type: args.api_type.clone(),
        api_key: args.api_key.clone(),
        api_base: args.api_base.clone(),
        api_version: args.api_version.clone(),
        deployment: args.deployment.clone(),
        temperature: Some(args.temperature),
        max_tokens: Some(args.max_tokens),
        timeout: None,
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Determine where the translated deck goes.
fn get_output_path(input_path: &Path, output_dir: Option<&PathBuf>, file_name: &str) -> Result<PathBuf> {
    let output_path = match output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(file_name)
        }
        None => match input_path.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        },
    };

    Ok(output_path)
}

fn print_count_report(input_path: &Path, counts: &[SlideCount]) {
    println!("{}", input_path.display());

    let mut total = 0;
    let mut translatable = 0;
    for slide in counts {
        println!(
            "  slide {:>3} ({}): {} units, {} runs, {} cells, {} non-text, {} empty",
            slide.number,
            slide.part,
            slide.count.total(),
            slide.count.runs,
            slide.count.cells,
            slide.count.opaque,
            slide.count.empty
        );
        total += slide.count.total();
        translatable += slide.count.translatable();
    }

    println!(
        "  {} slides, {} units, {} translation requests",
        counts.len(),
        total,
        translatable
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_next_to_input() {
        let path = get_output_path(Path::new("decks/q3.pptx"), None, "translated.pptx").unwrap();
        assert_eq!(path, PathBuf::from("decks/translated.pptx"));
    }

    #[test]
    fn test_args_from_flags() {
        let args = Args::try_parse_from([
            "deck-translate",
            "deck.pptx",
            "--api-key",
            "k",
            "--api-base",
            "contoso.openai.azure.com",
            "--deployment",
            "gpt-4",
            "--max-attempts",
            "3",
        ])
        .unwrap();

        assert_eq!(args.max_attempts, 3);
        assert_eq!(args.temperature, 0.2);
        assert_eq!(args.max_tokens, 2048);

        let config = AzureConfig::from_settings(azure_settings(&args)).unwrap();
        assert_eq!(config.deployment, "gpt-4");
        assert_eq!(config.endpoint.as_str(), "https://contoso.openai.azure.com/");
    }
}
