use anyhow::{Context, Result};
use ayah_reel::{generate_video, print_summary, AyahRange, Config, PipelineConfig, VideoRequest};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "ayah-reel")]
#[command(version, about = "Vertical recitation videos with synchronized verse captions")]
#[command(long_about = "Render a range of verses word-synchronized with a reciter's audio over a background clip, with a translation caption and chapter watermark.")]
struct Cli {
    /// Reciter id (audio and timings are read from data/audio/<reciter>/)
    #[arg(short, long)]
    reciter: u32,

    /// Sura number
    #[arg(short, long)]
    sura: u32,

    /// Ayah number or inclusive range (e.g. 5 or 1-7)
    #[arg(short, long)]
    ayah: String,

    /// Background video file
    #[arg(short, long)]
    background: PathBuf,

    /// Output video file (defaults to sura_<sura>_<ayah>.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of verses rendered concurrently (overrides config)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn derive_output_path(range: &AyahRange) -> PathBuf {
    PathBuf::from(format!("sura_{}_{}.mp4", range.sura, range.label()))
}

fn ensure_parent_dir(output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if !cli.background.exists() {
        error!("Background file not found: {}", cli.background.display());
        std::process::exit(1);
    }

    let range = AyahRange::parse(cli.sura, &cli.ayah).context("Invalid ayah range")?;
    let output = cli.output.unwrap_or_else(|| derive_output_path(&range));
    ensure_parent_dir(&output)?;

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    config
        .validate()
        .context("Configuration validation failed")?;

    info!("Reciter:    {}", cli.reciter);
    info!("Verses:     {}", range);
    info!("Background: {}", cli.background.display());
    info!("Output:     {}", output.display());
    info!("Data:       {}", config.data_dir.display());

    let request = VideoRequest {
        reciter: cli.reciter,
        range,
        background: cli.background,
        output,
    };

    let result = generate_video(&request, &config, PipelineConfig::from_config(&config))
        .await
        .context("Video generation failed")?;

    print_summary(&result);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_path() {
        let single = AyahRange::new(2, 255, 255).unwrap();
        assert_eq!(derive_output_path(&single), PathBuf::from("sura_2_255.mp4"));

        let range = AyahRange::new(1, 1, 7).unwrap();
        assert_eq!(derive_output_path(&range), PathBuf::from("sura_1_1-7.mp4"));
    }

    #[test]
    fn test_ensure_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("nested/deeper/out.mp4");
        ensure_parent_dir(&output).unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());

        ensure_parent_dir(Path::new("out.mp4")).unwrap();
    }

    #[test]
    fn test_cli_parses_short_flags() {
        let cli = Cli::parse_from([
            "ayah-reel", "-r", "7", "-s", "1", "-a", "1-7", "-b", "bg.mp4", "-c", "2", "-v",
        ]);
        assert_eq!(cli.reciter, 7);
        assert_eq!(cli.ayah, "1-7");
        assert_eq!(cli.concurrency, Some(2));
        assert!(cli.verbose);
        assert!(cli.output.is_none());
    }
}
