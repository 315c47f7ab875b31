use std::{path::Path, sync::Arc};

use image::DynamicImage;

use crate::{AppResult, ErrType};

/// Upload limit announced to the user, enforced by the service only
pub const DECLARED_MAX_BYTES: u64 = 16 * 1024 * 1024;
/// Resolution the service normalizes both inputs to
pub const TARGET_RESOLUTION: (u32, u32) = (480, 800);
pub const DECLARED_FORMATS: &[&str] = &["PNG", "JPG", "GIF", "BMP", "TIFF"];

pub const INVALID_IMAGE_MESSAGE: &str = "please select a valid image file";

const IMAGE_MIME_PREFIX: &str = "image/";
const OCTET_STREAM: &str = "application/octet-stream";
const PREVIEW_HEIGHT: u32 = 256;
const PREVIEW_QUALITY: u8 = 80;

/// A user supplied binary together with its declared content type.
///
/// The bytes are shared, cloning a blob never copies the image.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    file_name: String,
    content_type: String,
    data: Arc<[u8]>,
}

impl ImageBlob {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Build a blob whose content type is detected from magic bytes,
    /// falling back to the file extension.
    pub fn sniffed(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = infer::get(&data)
            .map(|kind| kind.mime_type())
            .or_else(|| {
                Path::new(&file_name).extension().and_then(|ext| ext.to_str()).and_then(get_mime_from_extension)
            })
            .unwrap_or(OCTET_STREAM)
            .to_owned();

        Self::new(file_name, content_type, data)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| ErrType::FsError.err(err, format!("Failed to read {}", path.display())))?;
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.to_owned())
            .ok_or(ErrType::FsError.msg(format!("Invalid file name: {}", path.display())))?;

        Ok(Self::sniffed(file_name, data))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_image(&self) -> bool {
        self.content_type.trim().to_ascii_lowercase().starts_with(IMAGE_MIME_PREFIX)
    }

    /// Same bytes, same allocation
    pub fn shares_data(&self, other: &ImageBlob) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Accept only blobs declaring an `image/*` media type
pub fn validate_image(blob: &ImageBlob) -> AppResult<()> {
    if !blob.is_image() {
        return Err(ErrType::InvalidInput.msg(INVALID_IMAGE_MESSAGE));
    }
    Ok(())
}

/// Get image mime type based on `ext` extension
fn get_mime_from_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "webp" => Some("image/webp"),

        // unknown
        _ => None,
    }
}

/// Display rendition of a slot image.
///
/// Normally a downscaled JPEG. Bytes that cannot be decoded locally are
/// passed through untouched under the blob's own content type, with
/// unknown (zero) dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub width: u32,
    pub height: u32,
    pub source_width: u32,
    pub source_height: u32,
    pub content_type: String,
    pub buf: Vec<u8>,
}
impl Preview {
    pub fn passthrough(blob: &ImageBlob) -> Self {
        Self {
            width: 0,
            height: 0,
            source_width: 0,
            source_height: 0,
            content_type: blob.content_type().to_owned(),
            buf: blob.data().to_vec(),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.source_width == 0
    }
}

pub fn decode_preview(bytes: &[u8]) -> AppResult<Preview> {
    let img =
        image::load_from_memory(bytes).map_err(|err| ErrType::MediaError.err(err, "Failed to decode image preview"))?;
    process_image(img, PREVIEW_HEIGHT, PREVIEW_QUALITY)
}

/// Decode off the async runtime
pub async fn decode_preview_async(blob: ImageBlob) -> AppResult<Preview> {
    tokio::task::spawn_blocking(move || decode_preview(blob.data()))
        .await
        .map_err(|err| ErrType::MediaError.err(err, "Preview decode task failed"))?
}

/// Preview that always exists: the decoded rendition, or the raw bytes
/// when decoding fails.
pub async fn preview_or_passthrough(blob: ImageBlob) -> Preview {
    match decode_preview_async(blob.clone()).await {
        Ok(preview) => preview,
        Err(err) => {
            err.trace();
            Preview::passthrough(&blob)
        }
    }
}

fn process_image(img: DynamicImage, height: u32, quality: u8) -> AppResult<Preview> {
    let (source_width, source_height) = (img.width(), img.height());
    if source_width == 0 || source_height == 0 {
        return Err(ErrType::MediaError.msg("Image has no pixels"));
    }

    // never upscale, keep the aspect ratio
    let height = height.min(source_height);
    let hratio = f64::from(height) / f64::from(source_height);
    let width = ((f64::from(source_width) * hratio).round() as u32).max(1);

    let p_image = img.resize_exact(width, height, image::imageops::FilterType::Lanczos3);
    drop(img);
    let p_image = DynamicImage::ImageRgb8(p_image.to_rgb8());

    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);

    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
    p_image
        .write_with_encoder(encoder)
        .map_err(|err| ErrType::MediaError.err(err, "Failed to write preview to buffer"))?;

    Ok(Preview {
        width: p_image.width(),
        height: p_image.height(),
        source_width,
        source_height,
        content_type: "image/jpeg".into(),
        buf: buffer,
    })
}
