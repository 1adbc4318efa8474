//! Generated artifacts handed to object storage

use bytes::Bytes;

/// Product segment used in filenames when the request names no product
pub const NO_PRODUCT: &str = "no-product";

pub const PNG_MIME: &str = "image/png";

/// Encoded output of one pipeline stage, ready for upload
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Bytes,
    pub filename: String,
    pub mime_type: &'static str,
}

impl Artifact {
    /// PNG artifact named `{role}-{product}-{timestamp}.png`
    pub fn png(role: &str, product_id: Option<&str>, timestamp_ms: i64, bytes: Bytes) -> Self {
        Artifact {
            bytes,
            filename: artifact_filename(role, product_id, timestamp_ms, "png"),
            mime_type: PNG_MIME,
        }
    }
}

pub fn artifact_filename(role: &str, product_id: Option<&str>, timestamp_ms: i64, extension: &str) -> String {
    let product = product_id
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(NO_PRODUCT);
    format!("{}-{}-{}.{}", role, product, timestamp_ms, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_uses_product_and_timestamp() {
        assert_eq!(
            artifact_filename("design", Some("8123"), 1_700_000_000_000, "png"),
            "design-8123-1700000000000.png"
        );
        assert_eq!(
            artifact_filename("gift-mockup", None, 42, "png"),
            "gift-mockup-no-product-42.png"
        );
        assert_eq!(artifact_filename("mockup", Some(" "), 42, "png"), "mockup-no-product-42.png");
    }

    #[test]
    fn test_roles_keep_names_unique_within_a_request() {
        let ts = 1_700_000_000_000;
        let names: Vec<String> = ["design", "mockup", "gift-mockup"]
            .iter()
            .map(|role| Artifact::png(role, Some("p1"), ts, Bytes::new()).filename)
            .collect();

        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
    }
}
