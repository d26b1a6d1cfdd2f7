//! # Image Loading and Decoding
//!
//! Resolves an image reference to bytes (HTTP fetch or data URI), decodes
//! just enough to know its pixel size, and prepares it for PDF embedding.
//! JPEG images pass through without re-encoding (DCTDecode). PNG and WebP
//! are decoded to RGB pixels with a separate alpha channel for SMask
//! transparency. Images much larger than their drawn size are downsampled.

use crate::config::ImageOptions;
use crate::error::{BlockError, MdPdfError};
use base64::Engine as _;
use image::imageops::FilterType;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Where an image reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Http(&'a str),
    DataUri(&'a str),
    /// Local paths, `file://`, and every other scheme.
    Unsupported,
}

pub fn classify_source(src: &str) -> ImageSource<'_> {
    let src = src.trim();
    let lower = src.get(..11).unwrap_or(src).to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        ImageSource::Http(src)
    } else if lower.starts_with("data:image/") {
        ImageSource::DataUri(src)
    } else {
        ImageSource::Unsupported
    }
}

/// Capability to fetch image bytes over the network.
///
/// Implementations need not enforce a timeout; the layout engine wraps every
/// call in one.
#[allow(async_fn_in_trait)]
pub trait ImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BlockError>;
}

/// Fetches images over HTTP(S) with a fixed User-Agent.
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpImageFetcher {
    pub fn new(options: &ImageOptions) -> Result<Self, MdPdfError> {
        let client = reqwest::Client::builder()
            .user_agent(options.user_agent.clone())
            .timeout(Duration::from_secs(options.fetch_timeout_secs))
            .build()
            .map_err(|e| MdPdfError::RenderError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            timeout_secs: options.fetch_timeout_secs,
        })
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, BlockError> {
        debug!("Fetching image: {}", url);
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                BlockError::ImageFetchTimeout {
                    url: url.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                BlockError::ImageFetchFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self.client.get(url).send().await.map_err(map_err)?;
        if !response.status().is_success() {
            return Err(BlockError::ImageFetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }
        let bytes = response.bytes().await.map_err(map_err)?;
        Ok(bytes.to_vec())
    }
}

/// Shortened form of a source for error messages; data URIs can be huge.
pub fn display_source(src: &str) -> String {
    const MAX: usize = 48;
    if src.chars().count() <= MAX {
        src.to_string()
    } else {
        let head: String = src.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

/// Decode a `data:image/...;base64,...` URI to raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, BlockError> {
    let fail = |reason: &str| BlockError::ImageFetchFailed {
        url: display_source(uri),
        reason: reason.to_string(),
    };

    let (header, payload) = uri.split_once(',').ok_or_else(|| fail("data URI has no payload"))?;
    if !header.to_ascii_lowercase().ends_with(";base64") {
        return Err(fail("only base64 data URIs are supported"));
    }
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned)
        .map_err(|e| fail(&format!("base64 decode error: {}", e)))
}

/// Detect image format from magic bytes and decode accordingly.
pub fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, BlockError> {
    if data.len() < 4 {
        return Err(BlockError::ImageDecode("image data too short".to_string()));
    }

    if is_jpeg(data) {
        decode_jpeg(data)
    } else {
        decode_to_rgb(data)
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

/// JPEG: read dimensions and color space without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, BlockError> {
    let (width, height) = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BlockError::ImageDecode(format!("JPEG format detection error: {}", e)))?
        .into_dimensions()
        .map_err(|e| BlockError::ImageDecode(format!("failed to read JPEG dimensions: {}", e)))?;

    if width == 0 || height == 0 {
        return Err(BlockError::ImageDecode("JPEG has zero size".to_string()));
    }

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Scan JPEG markers to find the SOF (Start of Frame) segment and read
/// the number of components to determine color space.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2; // skip SOI
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            break;
        }
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            // length(2) + precision(1) + height(2) + width(2) + components(1)
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        if i + 3 < data.len() {
            let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            i += 2 + seg_len;
        } else {
            break;
        }
    }
    JpegColorSpace::DeviceRGB
}

/// PNG, WebP and anything else the image crate recognizes: decode to RGBA,
/// split into RGB + alpha.
fn decode_to_rgb(data: &[u8]) -> Result<LoadedImage, BlockError> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BlockError::ImageDecode(format!("format detection error: {}", e)))?
        .decode()
        .map_err(|e| BlockError::ImageDecode(e.to_string()))?;
    Ok(from_dynamic(&img))
}

fn from_dynamic(img: &image::DynamicImage) -> LoadedImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixel_count = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        if pixel[3] != 255 {
            has_transparency = true;
        }
    }

    LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: if has_transparency { Some(alpha) } else { None },
        },
        width_px: width,
        height_px: height,
    }
}

/// Scale `(width, height)` down to fit `max_width` first, then `max_height`,
/// preserving aspect ratio. Never scales up.
pub fn fit_image(width: f64, height: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    let (mut w, mut h) = (width, height);
    if w > max_width && w > 0.0 {
        h *= max_width / w;
        w = max_width;
    }
    if h > max_height && h > 0.0 {
        w *= max_height / h;
        h = max_height;
    }
    (w, h)
}

/// Downsample so neither side exceeds the given pixel bounds.
///
/// Images already within bounds are returned unchanged (JPEGs stay JPEG).
pub fn resize_to(image: LoadedImage, max_w_px: u32, max_h_px: u32) -> Result<LoadedImage, BlockError> {
    let max_w_px = max_w_px.max(1);
    let max_h_px = max_h_px.max(1);
    if image.width_px <= max_w_px && image.height_px <= max_h_px {
        return Ok(image);
    }

    let scale = f64::min(
        max_w_px as f64 / image.width_px as f64,
        max_h_px as f64 / image.height_px as f64,
    );
    let new_w = ((image.width_px as f64 * scale).round() as u32).max(1);
    let new_h = ((image.height_px as f64 * scale).round() as u32).max(1);

    let dynamic = match &image.pixel_data {
        ImagePixelData::Jpeg { data, .. } => image::load_from_memory(data)
            .map_err(|e| BlockError::ImageDecode(e.to_string()))?,
        ImagePixelData::Decoded { rgb, alpha } => {
            let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
            for (i, px) in rgb.chunks_exact(3).enumerate() {
                rgba.extend_from_slice(px);
                rgba.push(alpha.as_ref().and_then(|a| a.get(i).copied()).unwrap_or(255));
            }
            let buf = image::RgbaImage::from_raw(image.width_px, image.height_px, rgba)
                .ok_or_else(|| BlockError::ImageDecode("pixel buffer size mismatch".to_string()))?;
            image::DynamicImage::ImageRgba8(buf)
        }
    };

    debug!(
        "Downsampling image {}x{} -> {}x{}",
        image.width_px, image.height_px, new_w, new_h
    );
    let resized = dynamic.resize_exact(new_w, new_h, FilterType::Triangle);
    Ok(from_dynamic(&resized))
}
