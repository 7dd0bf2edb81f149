//! Conversion of uploaded raster images to lossless WebP.
//!
//! PNG, JPEG and TIFF uploads are re-encoded as lossless WebP so every stored
//! image shares one canonical format. Embedded EXIF and ICC metadata is carried
//! over when the source container exposes it. A failed conversion leaves the
//! original payload in place; the caller keeps storing the file as uploaded.

use crate::models::object::ObjectId;
use crate::services::content_store::{ContentStore, StoreError};
use bytes::Bytes;
use image::{ColorType, DynamicImage, codecs::webp::WebPEncoder};
use img_parts::{DynImage, ImageEXIF, ImageICC, webp::WebP};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

/// MIME types that are converted on upload.
pub const CONVERTIBLE_MIME_TYPES: [&str; 4] =
    ["image/png", "image/jpeg", "image/tiff", "image/pjpeg"];

pub const CANONICAL_MIME_TYPE: &str = "image/webp";
pub const CANONICAL_EXTENSION: &str = ".webp";

/// Extensions stripped from converted filenames. Longest first, so `.tiff`
/// is not reduced to a stray `f` by the `.tif` pass.
const SOURCE_EXTENSIONS: [&str; 7] = [".pjpeg", ".jpeg", ".tiff", ".pjpg", ".jpg", ".png", ".tif"];

#[derive(Debug, Error)]
pub enum ConversionFailure {
    #[error("content store error: {0}")]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("metadata error: {0}")]
    Metadata(#[from] img_parts::Error),
    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Filename, MIME type, size and MD5 of a stored payload, after any
/// conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFile {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub etag: String,
}

/// Converts whitelisted raster payloads in a [`ContentStore`].
#[derive(Clone, Debug)]
pub struct ImageNormalizer {
    store: ContentStore,
}

impl ImageNormalizer {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    /// Whether uploads of this MIME type are converted.
    pub fn accepts(mime_type: &str) -> bool {
        CONVERTIBLE_MIME_TYPES.contains(&mime_type)
    }

    /// Convert the payload of `id` in place.
    ///
    /// The original bytes are backed up first and only replaced once encoding
    /// succeeded. On failure the payload is untouched; a backup is left behind
    /// only when the final write itself failed.
    pub async fn normalize(
        &self,
        id: &ObjectId,
        filename: &str,
    ) -> Result<NormalizedFile, ConversionFailure> {
        let backup = self.store.backup_for_conversion(id).await?;

        let encoded = match self.encode_backup(&backup).await {
            Ok(encoded) => encoded,
            Err(err) => {
                if let Err(cleanup) = self.store.discard_backup(id).await {
                    debug!(object_id = %id, error = %cleanup, "could not discard conversion backup");
                }
                return Err(err);
            }
        };

        self.store.commit_conversion(id, &encoded).await?;

        let normalized = NormalizedFile {
            filename: canonical_filename(filename),
            mime_type: CANONICAL_MIME_TYPE.to_string(),
            size: encoded.len() as u64,
            etag: format!("{:x}", md5::compute(&encoded)),
        };
        debug!(
            object_id = %id,
            filename = %normalized.filename,
            size_bytes = normalized.size,
            "converted image to lossless webp"
        );
        Ok(normalized)
    }

    async fn encode_backup(&self, backup: &std::path::Path) -> Result<Vec<u8>, ConversionFailure> {
        let source = fs::read(backup).await?;
        tokio::task::spawn_blocking(move || encode_lossless_webp(&source)).await?
    }
}

/// Re-encode any decodable raster image as lossless WebP, keeping EXIF and ICC
/// data when the source carries it.
pub fn encode_lossless_webp(source: &[u8]) -> Result<Vec<u8>, ConversionFailure> {
    let decoded = image::load_from_memory(source)?;
    let decoded = to_encodable(decoded);

    let mut encoded = Vec::new();
    decoded.write_with_encoder(WebPEncoder::new_lossless(&mut encoded))?;

    let (exif, icc) = source_metadata(source);
    if exif.is_none() && icc.is_none() {
        return Ok(encoded);
    }

    let mut webp = WebP::from_bytes(Bytes::from(encoded))?;
    webp.set_icc_profile(icc);
    webp.set_exif(exif);
    Ok(webp.encoder().bytes().to_vec())
}

/// The lossless encoder only takes 8-bit luma or RGB(A) buffers.
fn to_encodable(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 | ColorType::La8 | ColorType::Rgb8 | ColorType::Rgba8 => image,
        color if color.has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// EXIF and ICC chunks of a JPEG, PNG or WebP source. Other containers (TIFF)
/// and unparsable chunk layouts report none.
fn source_metadata(source: &[u8]) -> (Option<Bytes>, Option<Bytes>) {
    match DynImage::from_bytes(Bytes::copy_from_slice(source)) {
        Ok(Some(image)) => (image.exif(), image.icc_profile()),
        _ => (None, None),
    }
}

/// Strip every known source extension, in any case, and append `.webp`.
///
/// Passes repeat until nothing changes, since a removal can join its
/// neighbours into a new extension (`a.p.pngng`).
pub fn canonical_filename(filename: &str) -> String {
    let mut name = filename.to_string();
    loop {
        let stripped = SOURCE_EXTENSIONS
            .iter()
            .fold(name.clone(), |acc, extension| {
                remove_all_ignore_ascii_case(&acc, extension)
            });
        if stripped == name {
            break;
        }
        name = stripped;
    }
    name.push_str(CANONICAL_EXTENSION);
    name
}

fn remove_all_ignore_ascii_case(haystack: &str, needle: &str) -> String {
    // ASCII lowercasing keeps byte offsets aligned with the original string.
    let lowered = haystack.to_ascii_lowercase();
    let mut result = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(found) = lowered[cursor..].find(needle) {
        let start = cursor + found;
        result.push_str(&haystack[cursor..start]);
        cursor = start + needle.len();
    }
    result.push_str(&haystack[cursor..]);
    result
}
