//! Integration tests for the mdpdf rendering pipeline.
//!
//! These tests exercise the full path from input to PDF output.
//! They verify:
//! - Blocks are drawn in document order on the expected pages
//! - Page breaks happen at the right places
//! - Table header repetition works
//! - Images degrade to placeholders without failing the render
//! - PDF output is structurally valid

use mdpdf::canvas::{Canvas, DrawCommand, LayoutPage, PageRecorder};
use mdpdf::font::FontContext;
use mdpdf::layout::{LayoutEngine, LayoutReport};
use mdpdf::model::*;
use mdpdf::{BlockError, ImageFetcher, MdPdfError, RenderOptions};
use std::time::Duration;

// ─── Fetchers ───────────────────────────────────────────────────

/// Every fetch fails, as if the network were down.
struct Offline;

impl ImageFetcher for Offline {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BlockError> {
        Err(BlockError::ImageFetchFailed {
            url: url.to_string(),
            reason: "offline".to_string(),
        })
    }
}

/// Never answers within any reasonable timeout.
struct Stalled;

impl ImageFetcher for Stalled {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, BlockError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
}

/// Serves the same bytes for every URL.
struct Fixed(Vec<u8>);

impl ImageFetcher for Fixed {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, BlockError> {
        Ok(self.0.clone())
    }
}

// ─── Helpers ────────────────────────────────────────────────────

fn heading(level: u8, text: &str) -> Block {
    Block::Heading {
        level,
        text: text.to_string(),
    }
}

fn table(header: &[&str], rows: Vec<Vec<String>>) -> Block {
    Block::Table {
        header: header.iter().map(|s| s.to_string()).collect(),
        rows,
    }
}

fn image_paragraph(src: &str, alt: &str) -> Block {
    Block::Paragraph {
        runs: vec![InlineRun::Image(ImageRef::new(src, alt))],
    }
}

fn options_with_page(width: f64, height: f64) -> RenderOptions {
    let mut options = RenderOptions::default();
    options.geometry = PageGeometry::with_margins(PageSize::Custom { width, height }, 50.0);
    options
}

async fn layout_with<F: ImageFetcher>(
    blocks: Vec<Block>,
    options: &RenderOptions,
    fetcher: &F,
) -> (Vec<LayoutPage>, LayoutReport) {
    let mut canvas = PageRecorder::new(FontContext::new());
    let report = LayoutEngine::new(options)
        .layout(&Document::new(blocks), &mut canvas, fetcher)
        .await
        .unwrap();
    (canvas.into_parts().0, report)
}

async fn layout_doc(blocks: Vec<Block>, options: &RenderOptions) -> Vec<LayoutPage> {
    layout_with(blocks, options, &Offline).await.0
}

fn page_texts(page: &LayoutPage) -> Vec<String> {
    page.elements
        .iter()
        .filter_map(|e| match &e.draw {
            DrawCommand::Text { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 120, 200]));
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    image::ImageEncoder::write_image(encoder, img.as_raw(), width, height, image::ColorType::Rgb8)
        .unwrap();
    buf
}

fn data_uri(bytes: &[u8]) -> String {
    use base64::Engine as _;
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(
        bytes.windows(5).any(|w| w == b"%%EOF"),
        "Missing %%EOF marker"
    );
    assert!(bytes.windows(4).any(|w| w == b"xref"), "Missing xref table");
    assert!(bytes.windows(7).any(|w| w == b"trailer"), "Missing trailer");
}

// ─── Basic Layout ───────────────────────────────────────────────

#[tokio::test]
async fn test_empty_document_is_one_blank_page() {
    let pages = layout_doc(vec![], &RenderOptions::default()).await;
    assert_eq!(pages.len(), 1);
    assert!(pages[0].elements.is_empty());
}

#[tokio::test]
async fn test_heading_paragraph_table_in_order() {
    let blocks = vec![
        heading(1, "Title"),
        Block::text("Hello world"),
        table(&["A", "B"], vec![vec!["1".to_string(), "2".to_string()]]),
    ];
    let pages = layout_doc(blocks, &RenderOptions::default()).await;

    assert_eq!(pages.len(), 1);
    assert_eq!(page_texts(&pages[0]), vec!["Title", "Hello world", "A", "B", "1", "2"]);

    let rects = pages[0]
        .elements
        .iter()
        .filter(|e| matches!(e.draw, DrawCommand::Rect { .. }))
        .count();
    assert_eq!(rects, 4, "one rect per table cell");
}

#[tokio::test]
async fn test_heading_sizes_by_level() {
    let blocks = (1..=7).map(|l| heading(l, &format!("H{}", l))).collect();
    let pages = layout_doc(blocks, &RenderOptions::default()).await;
    let sizes: Vec<f64> = pages[0]
        .elements
        .iter()
        .filter_map(|e| match &e.draw {
            DrawCommand::Text { size, font, .. } => {
                assert_eq!(font.weight, 700);
                Some(*size)
            }
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![24.0, 20.0, 18.0, 16.0, 14.0, 12.0, 12.0]);
}

#[tokio::test]
async fn test_inline_markup_is_stripped() {
    let pages = layout_doc(
        vec![Block::text("**Bold** and *it* and `code` and [link](http://x)")],
        &RenderOptions::default(),
    )
    .await;
    assert_eq!(page_texts(&pages[0]), vec!["Bold and it and code and link"]);
}

#[tokio::test]
async fn test_elements_stay_inside_content_area() {
    let mut blocks = Vec::new();
    for i in 0..40 {
        blocks.push(heading(2, &format!("Section {}", i)));
        blocks.push(Block::text(
            "The quick brown fox jumps over the lazy dog. ".repeat(6),
        ));
        blocks.push(Block::List {
            ordered: i % 2 == 0,
            items: vec!["first".to_string(), "second".to_string()],
        });
        blocks.push(Block::CodeBlock {
            text: (0..6).map(|n| format!("let x{} = {};", n, n)).collect::<Vec<_>>().join("\n"),
        });
    }
    let options = RenderOptions::default();
    let pages = layout_doc(blocks, &options).await;
    let threshold = options.geometry.overflow_threshold(0.0);

    assert!(pages.len() > 5);
    for (i, page) in pages.iter().enumerate() {
        assert!(!page.elements.is_empty(), "page {} is blank", i + 1);
        for e in &page.elements {
            assert!(e.y >= options.geometry.margin_top - 1e-6);
            assert!(
                e.y + e.height <= threshold + 1e-6,
                "element on page {} ends at {} past {}",
                i + 1,
                e.y + e.height,
                threshold
            );
        }
    }
}

#[tokio::test]
async fn test_layout_is_deterministic() {
    let markdown = "# Report\n\nSome text.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```\ncode\n```\n";
    let options = RenderOptions::default();
    let first = mdpdf::render_markdown(markdown, &options, &Offline).await.unwrap();
    let second = mdpdf::render_markdown(markdown, &options, &Offline).await.unwrap();
    assert_eq!(first.pdf, second.pdf);
    assert_eq!(first.page_count, second.page_count);
    assert!(first.placeholders.is_empty());
}

// ─── Tables ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_table_header_repeats_on_every_page() {
    let rows = (1..=30)
        .map(|i| vec![format!("row {}", i), "x".to_string()])
        .collect();
    let options = options_with_page(400.0, 430.0);
    let pages = layout_doc(vec![table(&["Col A", "Col B"], rows)], &options).await;

    assert_eq!(pages.len(), 3);

    let first = page_texts(&pages[0]);
    assert_eq!(&first[..4], &["Col A", "Col B", "row 1", "x"]);
    assert!(first.contains(&"row 10".to_string()));
    assert!(!first.contains(&"row 11".to_string()));

    let second = page_texts(&pages[1]);
    assert_eq!(&second[..4], &["Col A", "Col B", "row 11", "x"]);
    assert!(second.contains(&"row 20".to_string()));

    let third = page_texts(&pages[2]);
    assert_eq!(&third[..3], &["Col A", "Col B", "row 21"]);
    assert_eq!(third[third.len() - 2], "row 30");

    // The header row starts at the top margin on continuation pages.
    assert!((pages[1].elements[0].y - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_malformed_table_becomes_placeholder() {
    let rows = vec![vec!["1".to_string(), "2".to_string(), "3".to_string()]];
    let (pages, report) = layout_with(
        vec![table(&["A"], rows), Block::text("after")],
        &RenderOptions::default(),
        &Offline,
    )
    .await;

    assert_eq!(page_texts(&pages[0]), vec!["[table render failed]", "after"]);
    assert_eq!(report.placeholders.len(), 1);
    assert!(matches!(
        report.placeholders[0].error,
        BlockError::TableParseError(_)
    ));
}

#[tokio::test]
async fn test_long_cell_is_ellipsized() {
    let rows = vec![vec!["word ".repeat(80), "short".to_string()]];
    let pages = layout_doc(vec![table(&["A", "B"], rows)], &RenderOptions::default()).await;
    let texts = page_texts(&pages[0]);
    assert!(texts[2].ends_with('…'));
    assert_eq!(texts[3], "short");
}

// ─── Images ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_file_uri_renders_placeholder() {
    let (pages, report) = layout_with(
        vec![image_paragraph("file:///tmp/diagram.png", "diagram")],
        &RenderOptions::default(),
        &Offline,
    )
    .await;

    assert_eq!(page_texts(&pages[0]), vec!["[image load failed: diagram]"]);
    assert!(matches!(
        report.placeholders[0].error,
        BlockError::UnsupportedImageSource { .. }
    ));
}

#[tokio::test]
async fn test_unreachable_image_keeps_rest_of_document() {
    let blocks = vec![
        Block::text("before"),
        image_paragraph("https://example.invalid/a.png", ""),
        Block::text("after"),
    ];
    let (pages, report) = layout_with(blocks, &RenderOptions::default(), &Offline).await;

    assert_eq!(
        page_texts(&pages[0]),
        vec!["before", "[image load failed: image]", "after"]
    );
    assert_eq!(report.placeholders.len(), 1);
    assert_eq!(report.placeholders[0].block_index, 1);
}

#[tokio::test]
async fn test_slow_image_times_out() {
    let mut options = RenderOptions::default();
    options.images.fetch_timeout_secs = 1;
    let (pages, report) = layout_with(
        vec![image_paragraph("https://example.com/slow.png", "slow")],
        &options,
        &Stalled,
    )
    .await;

    assert_eq!(page_texts(&pages[0]), vec!["[image load failed: slow]"]);
    assert_eq!(
        report.placeholders[0].error,
        BlockError::ImageFetchTimeout {
            url: "https://example.com/slow.png".to_string(),
            secs: 1
        }
    );
}

#[tokio::test]
async fn test_undecodable_image_is_error_placeholder() {
    let (pages, report) = layout_with(
        vec![image_paragraph("https://example.com/x.png", "broken")],
        &RenderOptions::default(),
        &Fixed(b"definitely not an image".to_vec()),
    )
    .await;

    assert_eq!(page_texts(&pages[0]), vec!["[image error: broken]"]);
    assert!(matches!(
        report.placeholders[0].error,
        BlockError::ImageDecode(_)
    ));
}

#[tokio::test]
async fn test_wide_data_uri_image_fits_content_width() {
    let src = data_uri(&png_bytes(1000, 500));
    let (pages, report) = layout_with(
        vec![image_paragraph(&src, "Wide chart")],
        &RenderOptions::default(),
        &Offline,
    )
    .await;

    assert!(report.placeholders.is_empty());
    let image = pages[0]
        .elements
        .iter()
        .find(|e| matches!(e.draw, DrawCommand::Image { .. }))
        .expect("image element");
    let content_width = 595.28 - 100.0;
    assert!((image.width - content_width).abs() < 1e-6);
    assert!((image.height - content_width / 2.0).abs() < 1e-6);
    assert!((image.x - 50.0).abs() < 1e-6);

    // Downsampled to at most twice the display size.
    if let DrawCommand::Image { image: loaded } = &image.draw {
        assert!(loaded.width_px <= (content_width * 2.0).ceil() as u32);
    }

    // Caption below the image, centered on its measured width.
    assert_eq!(page_texts(&pages[0]), vec!["Wide chart"]);
    let caption = pages[0]
        .elements
        .iter()
        .find(|e| matches!(e.draw, DrawCommand::Text { .. }))
        .unwrap();
    let style = mdpdf::style::TextStyle::new("Helvetica", 10.0, mdpdf::style::Color::BLACK);
    let width = FontContext::new().measure_string("Wide chart", &style);
    assert!((caption.x - (50.0 + (content_width - width) / 2.0)).abs() < 1e-6);
    assert!(caption.y > image.y + image.height);
}

#[tokio::test]
async fn test_small_fetched_image_is_centered_without_caption() {
    let (pages, _) = layout_with(
        vec![image_paragraph("https://example.com/icon.png", "image")],
        &RenderOptions::default(),
        &Fixed(png_bytes(100, 40)),
    )
    .await;

    let image = &pages[0].elements[0];
    assert!(matches!(image.draw, DrawCommand::Image { .. }));
    assert!((image.width - 100.0).abs() < 1e-9);
    assert!((image.x - (50.0 + (495.28 - 100.0) / 2.0)).abs() < 1e-6);
    assert!(page_texts(&pages[0]).is_empty(), "default alt gets no caption");
}

#[tokio::test]
async fn test_tall_image_fits_small_page() {
    let options = options_with_page(300.0, 300.0);
    let (pages, report) = layout_with(
        vec![
            Block::text("above"),
            image_paragraph(&data_uri(&png_bytes(100, 1000)), ""),
        ],
        &options,
        &Offline,
    )
    .await;

    assert!(report.placeholders.is_empty());
    let threshold = options.geometry.overflow_threshold(0.0);
    let image = pages
        .iter()
        .flat_map(|p| p.elements.iter())
        .find(|e| matches!(e.draw, DrawCommand::Image { .. }))
        .expect("image element");
    assert!((image.height - 200.0).abs() < 1e-6);
    assert!((image.width - 20.0).abs() < 1e-6);
    assert!(image.y >= 50.0 - 1e-6);
    assert!(image.y + image.height <= threshold + 1e-6);
    assert_eq!(pages.len(), 2, "image moves below the paragraph's page");
}

// ─── Markdown ───────────────────────────────────────────────────

fn kinds(page: &LayoutPage) -> Vec<&'static str> {
    page.elements
        .iter()
        .map(|e| match &e.draw {
            DrawCommand::Text { .. } => "text",
            DrawCommand::Image { .. } => "image",
            DrawCommand::Rect { .. } => "rect",
            _ => "other",
        })
        .collect()
}

#[tokio::test]
async fn test_markdown_table_is_drawn() {
    let markdown = "# Title\n\nHello world\n\n| A | B |\n|---|---|\n| 1 | 2 |\n";

    let result = mdpdf::render_markdown(markdown, &RenderOptions::default(), &Offline)
        .await
        .unwrap();
    assert!(result.placeholders.is_empty(), "{:?}", result.placeholders);
    assert_eq!(result.page_count, 1);

    let doc = mdpdf::source::markdown::parse(markdown);
    let pages = layout_doc(doc.blocks, &RenderOptions::default()).await;
    assert_eq!(pages.len(), 1);
    assert_eq!(page_texts(&pages[0]), vec!["Title", "Hello world", "A", "B", "1", "2"]);
    let rects = kinds(&pages[0]).iter().filter(|k| **k == "rect").count();
    assert_eq!(rects, 4);
}

#[tokio::test]
async fn test_markdown_table_with_inline_markup_in_cells() {
    let markdown = "| **Name** | `Value` |\n|---|---|\n| *alpha* | [beta](http://x) |\n";
    let doc = mdpdf::source::markdown::parse(markdown);
    let (pages, report) = layout_with(doc.blocks, &RenderOptions::default(), &Offline).await;
    assert!(report.placeholders.is_empty());
    assert_eq!(page_texts(&pages[0]), vec!["Name", "Value", "alpha", "beta"]);
}

#[tokio::test]
async fn test_markdown_inline_image_between_text() {
    let doc = mdpdf::source::markdown::parse("before ![](https://example.com/dot.png) after");
    let (pages, report) =
        layout_with(doc.blocks, &RenderOptions::default(), &Fixed(png_bytes(100, 40))).await;

    assert!(report.placeholders.is_empty());
    assert_eq!(kinds(&pages[0]), vec!["text", "image", "text"]);
    let texts: Vec<String> = page_texts(&pages[0]).iter().map(|t| t.trim().to_string()).collect();
    assert_eq!(texts, vec!["before", "after"]);

    let ys: Vec<f64> = pages[0].elements.iter().map(|e| e.y).collect();
    assert!(ys.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_markdown_nested_list_lines() {
    let doc = mdpdf::source::markdown::parse("- parent\n  - child\n- next\n");
    let pages = layout_doc(doc.blocks, &RenderOptions::default()).await;
    let texts: Vec<String> = page_texts(&pages[0]).iter().map(|t| t.trim().to_string()).collect();
    assert_eq!(texts, vec!["\u{2022} parent", "child", "\u{2022} next"]);
}

#[tokio::test]
async fn test_markdown_table_header_repeats() {
    let mut markdown = String::from("| Key | Value |\n|---|---|\n");
    for i in 0..30 {
        markdown.push_str(&format!("| k{} | v{} |\n", i, i));
    }
    let result = mdpdf::render_markdown(&markdown, &options_with_page(300.0, 400.0), &Offline)
        .await
        .unwrap();
    assert!(result.placeholders.is_empty());
    assert!(result.page_count > 1);

    let doc = mdpdf::source::markdown::parse(&markdown);
    let pages = layout_doc(doc.blocks, &options_with_page(300.0, 400.0)).await;
    for page in &pages {
        assert_eq!(&page_texts(page)[..2], ["Key", "Value"]);
    }
}

// ─── Full Pipeline ──────────────────────────────────────────────

#[tokio::test]
async fn test_markdown_renders_valid_pdf() {
    let markdown = "# Notes\n\n- one\n- two\n\n> quoted\n\n---\n\n```\nfn main() {}\n```\n";
    let result = mdpdf::render_markdown(markdown, &RenderOptions::default(), &Offline)
        .await
        .unwrap();

    assert_valid_pdf(&result.pdf);
    assert_eq!(result.page_count, 1);
    assert!(result.placeholders.is_empty());

    let text = String::from_utf8_lossy(&result.pdf);
    assert!(text.contains("/Title (Notes)"));
    assert!(text.contains("/BaseFont /Courier"));
}

#[tokio::test]
async fn test_options_metadata_fills_gaps() {
    let mut options = RenderOptions::default();
    options.metadata.title = Some("Fallback".to_string());
    options.metadata.author = Some("Ops".to_string());

    let result = mdpdf::render_markdown("# From Doc\n\ntext", &options, &Offline)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&result.pdf);
    assert!(text.contains("/Title (From Doc)"));
    assert!(text.contains("/Author (Ops)"));
}

#[tokio::test]
async fn test_plain_text_uses_monospace() {
    let result = mdpdf::render_plain_text("col1  col2\nval1  val2", &RenderOptions::default(), &Offline)
        .await
        .unwrap();
    assert_valid_pdf(&result.pdf);
    let text = String::from_utf8_lossy(&result.pdf);
    assert!(text.contains("/BaseFont /Courier "));
}

#[tokio::test]
async fn test_json_document() {
    let json = r#"{
        "blocks": [
            { "type": "heading", "level": 2, "text": "From JSON" },
            { "type": "paragraph", "runs": ["text ", { "sourceUrl": "file:///x.png", "altText": "x" }] },
            { "type": "horizontalRule" }
        ],
        "metadata": { "title": "Json" }
    }"#;
    let result = mdpdf::render_json(json, &RenderOptions::default(), &Offline)
        .await
        .unwrap();
    assert_valid_pdf(&result.pdf);
    assert_eq!(result.placeholders.len(), 1);
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let err = mdpdf::render_json("{ not json", &RenderOptions::default(), &Offline)
        .await
        .unwrap_err();
    assert!(matches!(err, MdPdfError::ParseError { .. }));
    assert!(err.to_string().contains("Hint"));
}

#[tokio::test]
async fn test_max_pages_aborts_render() {
    let mut options = options_with_page(300.0, 300.0);
    options.max_pages = Some(2);
    let blocks = (0..100).map(|i| Block::text(format!("line {}", i))).collect();
    let err = mdpdf::render(&Document::new(blocks), &options, &Offline)
        .await
        .unwrap_err();
    assert!(matches!(err, MdPdfError::RenderError(_)));
}

#[tokio::test]
async fn test_page_count_matches_pdf() {
    let options = options_with_page(300.0, 300.0);
    let blocks: Vec<Block> = (0..60).map(|i| Block::text(format!("line {}", i))).collect();

    let mut canvas = PageRecorder::new(FontContext::new());
    LayoutEngine::new(&options)
        .layout(&Document::new(blocks.clone()), &mut canvas, &Offline)
        .await
        .unwrap();
    let expected = canvas.page_count();

    let result = mdpdf::render(&Document::new(blocks), &options, &Offline)
        .await
        .unwrap();
    assert_eq!(result.page_count, expected);
    let text = String::from_utf8_lossy(&result.pdf);
    assert!(text.contains(&format!("/Count {}", expected)));
}
