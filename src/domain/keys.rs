//! Object naming for published frames.

/// Raster format every frame is stored as.
pub const IMAGE_EXTENSION: &str = "png";
pub const IMAGE_CONTENT_TYPE: &str = "image/png";

/// Ensures the prefix ends with exactly one `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    format!("{}/", prefix.trim_end_matches('/'))
}

/// `<prefix>/<sequence>.png`. `prefix` must already be normalized.
pub fn object_key(prefix: &str, sequence: u64) -> String {
    format!("{}{}.{}", prefix, sequence, IMAGE_EXTENSION)
}
