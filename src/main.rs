//! # mdpdf CLI
//!
//! Usage:
//!   mdpdf notes.md -o notes.pdf
//!   cat notes.md | mdpdf -o notes.pdf
//!   mdpdf data.json --format json -o out.pdf
//!   mdpdf --example > sample.md

use anyhow::{Context, Result};
use base64::Engine as _;
use clap::{Parser, ValueEnum};
use mdpdf::model::FontEntry;
use mdpdf::{HttpImageFetcher, PageGeometry, PageSize, RenderOptions};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// Markdown (GFM tables, task lists).
    Md,
    /// Plain text in a monospaced font.
    Txt,
    /// A document in the engine's JSON model.
    Json,
}

/// Render Markdown to a paginated PDF.
#[derive(Parser, Debug)]
#[command(name = "mdpdf", version, about)]
struct Cli {
    /// Input file. Reads stdin when omitted.
    input: Option<PathBuf>,

    /// Where to write the PDF.
    #[arg(short, long, default_value = "output.pdf")]
    output: PathBuf,

    /// Input format. Guessed from the file extension when omitted.
    #[arg(long, value_enum)]
    format: Option<InputFormat>,

    /// JSON file with render options.
    #[arg(long)]
    config: Option<PathBuf>,

    /// A4, A3, A5, Letter, Legal, Tabloid, or WIDTHxHEIGHT in points.
    #[arg(long)]
    page_size: Option<String>,

    /// Margin on all four sides, in points.
    #[arg(long)]
    margin: Option<f64>,

    /// TrueType font used for body text (needed for non-Latin scripts).
    /// Also used for code unless --mono-font is given.
    #[arg(long)]
    font: Option<PathBuf>,

    /// TrueType font used for code blocks and plain text.
    #[arg(long)]
    mono_font: Option<PathBuf>,

    /// Document title, used when the input sets none.
    #[arg(long)]
    title: Option<String>,

    /// Seconds to wait for each remote image.
    #[arg(long, env = "MDPDF_IMAGE_TIMEOUT")]
    image_timeout: Option<u64>,

    /// Fail instead of producing more pages than this.
    #[arg(long)]
    max_pages: Option<usize>,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Print a sample Markdown document and exit.
    #[arg(long)]
    example: bool,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.example {
        print!("{}", EXAMPLE_MARKDOWN);
        return Ok(());
    }

    let options = build_options(&cli)?;

    let bytes = match &cli.input {
        Some(path) => {
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    let text = mdpdf::source::decode_text(&bytes);

    let format = cli.format.unwrap_or_else(|| guess_format(cli.input.as_ref()));
    let fetcher = HttpImageFetcher::new(&options.images)?;
    let result = match format {
        InputFormat::Md => mdpdf::render_markdown(&text, &options, &fetcher).await,
        InputFormat::Txt => mdpdf::render_plain_text(&text, &options, &fetcher).await,
        InputFormat::Json => mdpdf::render_json(&text, &options, &fetcher).await,
    }
    .context("Failed to render document")?;

    fs::write(&cli.output, &result.pdf)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    eprintln!(
        "✓ Written {} bytes ({} pages) to {}",
        result.pdf.len(),
        result.page_count,
        cli.output.display()
    );
    for placeholder in &result.placeholders {
        eprintln!(
            "  ! block {}: {}",
            placeholder.block_index + 1,
            placeholder.error
        );
    }

    Ok(())
}

/// Config file first, then flags on top.
fn build_options(cli: &Cli) -> Result<RenderOptions> {
    let mut options = match &cli.config {
        Some(path) => RenderOptions::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RenderOptions::default(),
    };

    if let Some(size) = &cli.page_size {
        options.geometry.page_size = size
            .parse::<PageSize>()
            .map_err(anyhow::Error::msg)
            .context("Invalid --page-size")?;
    }
    if let Some(margin) = cli.margin {
        options.geometry = PageGeometry::with_margins(options.geometry.page_size, margin);
    }
    if let Some(path) = &cli.font {
        register_font_file(&mut options, path, CUSTOM_FAMILY)?;
        options.theme.body_family = CUSTOM_FAMILY.to_string();
        options.theme.mono_family = CUSTOM_FAMILY.to_string();
    }
    if let Some(path) = &cli.mono_font {
        register_font_file(&mut options, path, CUSTOM_MONO_FAMILY)?;
        options.theme.mono_family = CUSTOM_MONO_FAMILY.to_string();
    }
    if let Some(title) = &cli.title {
        options.metadata.title = Some(title.clone());
    }
    if let Some(secs) = cli.image_timeout {
        options.images.fetch_timeout_secs = secs;
    }
    if cli.max_pages.is_some() {
        options.max_pages = cli.max_pages;
    }

    Ok(options)
}

const CUSTOM_FAMILY: &str = "Custom";
const CUSTOM_MONO_FAMILY: &str = "CustomMono";

fn register_font_file(options: &mut RenderOptions, path: &Path, family: &str) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))?;
    let src = base64::engine::general_purpose::STANDARD.encode(&data);
    // One face serves both weights; headings fall back to it too.
    for weight in [400, 700] {
        options.fonts.push(FontEntry {
            family: family.to_string(),
            src: src.clone(),
            weight,
            italic: false,
        });
    }
    Ok(())
}

fn guess_format(input: Option<&PathBuf>) -> InputFormat {
    let ext = input
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("txt") | Some("text") | Some("log") => InputFormat::Txt,
        Some("json") => InputFormat::Json,
        _ => InputFormat::Md,
    }
}

const EXAMPLE_MARKDOWN: &str = r#"# Quarterly Report

This report covers **revenue**, *hiring* and `infrastructure` for the quarter.
Line breaks inside a paragraph are kept.

## Highlights

- Revenue grew 18% over the previous quarter
- Two new regions launched
- Support response time halved

1. Finalize the budget
2. Hire the platform team

> Numbers in this report are unaudited.

## Regional Revenue

| Region | Q1 | Q2 | Change |
|--------|----|----|--------|
| North | 1.2M | 1.4M | +16% |
| South | 0.8M | 1.0M | +25% |
| East | 2.1M | 2.3M | +9% |
| West | 1.5M | 1.8M | +20% |

---

## Deployment

```bash
cargo build --release
./target/release/server --config prod.toml
```

![Architecture diagram](https://example.com/architecture.png)
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn font_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mdpdf-{}-{}.ttf", name, std::process::id()));
        fs::write(&path, b"not parsed until render").unwrap();
        path
    }

    #[test]
    fn test_font_applies_to_body_and_code() {
        let path = font_file("body");
        let cli = Cli::parse_from(["mdpdf", "--font", path.to_str().unwrap()]);
        let options = build_options(&cli).unwrap();
        assert_eq!(options.theme.body_family, "Custom");
        assert_eq!(options.theme.mono_family, "Custom");
        assert_eq!(options.fonts.len(), 2);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_mono_font_overrides_code_family() {
        let body = font_file("body2");
        let mono = font_file("mono");
        let cli = Cli::parse_from([
            "mdpdf",
            "--font",
            body.to_str().unwrap(),
            "--mono-font",
            mono.to_str().unwrap(),
        ]);
        let options = build_options(&cli).unwrap();
        assert_eq!(options.theme.body_family, "Custom");
        assert_eq!(options.theme.mono_family, "CustomMono");
        assert!(options.fonts.iter().any(|f| f.family == "CustomMono" && f.weight == 700));
        let _ = fs::remove_file(body);
        let _ = fs::remove_file(mono);
    }

    #[test]
    fn test_defaults_keep_standard_fonts() {
        let cli = Cli::parse_from(["mdpdf"]);
        let options = build_options(&cli).unwrap();
        assert_eq!(options.theme.body_family, "Helvetica");
        assert_eq!(options.theme.mono_family, "Courier");
        assert!(options.fonts.is_empty());
    }

    #[test]
    fn test_guess_format() {
        assert_eq!(guess_format(Some(&PathBuf::from("a.TXT"))), InputFormat::Txt);
        assert_eq!(guess_format(Some(&PathBuf::from("a.json"))), InputFormat::Json);
        assert_eq!(guess_format(Some(&PathBuf::from("a.md"))), InputFormat::Md);
        assert_eq!(guess_format(None), InputFormat::Md);
    }
}
