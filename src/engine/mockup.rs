//! Mockup base selection
//!
//! Sources are tried in order: caller supplied URL, local template for the
//! variant type, then the customer's own garment photo. A failing custom URL
//! aborts; a failing template only falls through to the garment photo.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AssetSettings;
use crate::domain::{non_blank, truncate, SourceSpec};
use super::asset::ImageAsset;
use super::fetcher::{FetchError, ImageFetcher};

/// Fetch label for the caller supplied mockup base
pub const CUSTOM_MOCKUP_LABEL: &str = "customMockupUrl";

const TEMPLATE_LABEL: &str = "mockupTemplate";

/// Variant type rendered on the base template itself
pub const DEFAULT_VARIANT_TYPE: &str = "sweatshirt";

/// Mockup base errors
#[derive(Debug, Error)]
pub enum MockupError {
    #[error("Custom mockup URL is not usable: {0}")]
    CustomUrl(#[source] FetchError),
}

/// Which source a mockup base came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseOrigin {
    CustomUrl,
    Template,
    Jersey,
}

impl fmt::Display for BaseOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseOrigin::CustomUrl => write!(f, "custom_url"),
            BaseOrigin::Template => write!(f, "template"),
            BaseOrigin::Jersey => write!(f, "jersey"),
        }
    }
}

/// A selected mockup base
#[derive(Debug, Clone)]
pub struct ResolvedBase {
    pub asset: ImageAsset,
    pub origin: BaseOrigin,
}

/// Optional base sources, in precedence order
enum BaseTier<'a> {
    CustomUrl(&'a str),
    Template(PathBuf),
}

/// Chooses the base image for each mockup variant
#[derive(Clone)]
pub struct MockupResolver {
    fetcher: ImageFetcher,
    template_path: PathBuf,
    use_template: bool,
}

impl MockupResolver {
    pub fn new(fetcher: ImageFetcher, assets: &AssetSettings) -> Self {
        MockupResolver {
            fetcher,
            template_path: assets.mockup_template_path.clone(),
            use_template: assets.use_mockup_template,
        }
    }

    fn tiers<'a>(&self, variant_type: Option<&str>, custom_url: Option<&'a str>) -> Vec<BaseTier<'a>> {
        let mut tiers = Vec::with_capacity(2);
        if let Some(url) = non_blank(custom_url) {
            tiers.push(BaseTier::CustomUrl(url));
        }
        if self.use_template {
            tiers.push(BaseTier::Template(template_path_for(variant_type, &self.template_path)));
        }
        tiers
    }

    /// Pick the base for one variant; `jersey` is the last resort
    pub async fn resolve_base(
        &self,
        variant_type: Option<&str>,
        custom_url: Option<&str>,
        jersey: &ImageAsset,
    ) -> Result<ResolvedBase, MockupError> {
        for tier in self.tiers(variant_type, custom_url) {
            match tier {
                BaseTier::CustomUrl(url) => {
                    let asset = self
                        .fetcher
                        .fetch(&SourceSpec::Remote(url.to_string()), CUSTOM_MOCKUP_LABEL)
                        .await
                        .map_err(MockupError::CustomUrl)?;
                    info!(
                        origin = %BaseOrigin::CustomUrl,
                        url = truncate(url, 120),
                        "Mockup base resolved"
                    );
                    return Ok(ResolvedBase { asset, origin: BaseOrigin::CustomUrl });
                }
                BaseTier::Template(path) => {
                    match self.fetcher.fetch(&SourceSpec::Local(path.clone()), TEMPLATE_LABEL).await {
                        Ok(asset) => {
                            info!(
                                origin = %BaseOrigin::Template,
                                template = %path.display(),
                                variant_type = variant_type.unwrap_or(""),
                                "Mockup base resolved"
                            );
                            return Ok(ResolvedBase { asset, origin: BaseOrigin::Template });
                        }
                        Err(e) => {
                            warn!(
                                template = %path.display(),
                                error = %e,
                                "Mockup template not loadable, falling back to customer jersey"
                            );
                        }
                    }
                }
            }
        }

        info!(
            origin = %BaseOrigin::Jersey,
            variant_type = variant_type.unwrap_or(""),
            "Mockup base resolved"
        );
        Ok(ResolvedBase {
            asset: jersey.clone(),
            origin: BaseOrigin::Jersey,
        })
    }
}

/// Template type for a requested variant; `None` means the base template
///
/// Names are lower-cased; `tasse` is the German alias of `mug`. Anything
/// outside `[a-z0-9_-]` is not a template name.
fn normalize_variant_type(variant_type: Option<&str>) -> Option<String> {
    let name = non_blank(variant_type)?.to_lowercase();
    if name == DEFAULT_VARIANT_TYPE {
        return None;
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return None;
    }
    if name == "tasse" {
        return Some("mug".to_string());
    }
    Some(name)
}

/// Template file for a variant: `<dir>/<stem>-<type>.<ext>` next to the base template
pub fn template_path_for(variant_type: Option<&str>, base_template: &Path) -> PathBuf {
    let Some(kind) = normalize_variant_type(variant_type) else {
        return base_template.to_path_buf();
    };

    let stem = base_template
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("mockup-template");
    let file_name = match base_template.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}", stem, kind, ext),
        None => format!("{}-{}", stem, kind),
    };
    base_template.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchSettings;
    use crate::test_helpers::{png_bytes, rgba_asset, write_png};

    fn resolver(template_path: PathBuf, use_template: bool) -> MockupResolver {
        let fetcher = ImageFetcher::new(&FetchSettings::default()).unwrap();
        MockupResolver::new(
            fetcher,
            &AssetSettings {
                mockup_template_path: template_path,
                use_mockup_template: use_template,
                ..AssetSettings::default()
            },
        )
    }

    #[test]
    fn test_template_path_mapping() {
        let base = Path::new("./assets/mockup-template.png");

        assert_eq!(template_path_for(None, base), base);
        assert_eq!(template_path_for(Some(""), base), base);
        assert_eq!(template_path_for(Some("Sweatshirt"), base), base);
        assert_eq!(
            template_path_for(Some("hoodie"), base),
            Path::new("./assets/mockup-template-hoodie.png")
        );
        assert_eq!(
            template_path_for(Some(" Tasse "), base),
            Path::new("./assets/mockup-template-mug.png")
        );
        assert_eq!(template_path_for(Some("../../etc/passwd"), base), base);
    }

    #[tokio::test]
    async fn test_custom_url_wins_over_loadable_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_png(dir.path(), "mockup-template.png", 30, 30, [0, 255, 0, 255]);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/base.png")
            .with_status(200)
            .with_body(png_bytes(77, 55, [0, 0, 255, 255]))
            .expect(1)
            .create_async()
            .await;

        let jersey = rgba_asset(10, 10, [255, 0, 0, 255]);
        let url = format!("{}/base.png", server.url());
        let resolved = resolver(template, true)
            .resolve_base(None, Some(&url), &jersey)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(resolved.origin, BaseOrigin::CustomUrl);
        assert_eq!(resolved.asset.dimensions(), (77, 55));
    }

    #[test]
    fn test_tier_order() {
        let template = PathBuf::from("./assets/mockup-template.png");
        let url = "https://cdn.example.com/base.png";

        let with_templates = resolver(template.clone(), true);
        let tiers = with_templates.tiers(Some("tasse"), Some(url));
        assert_eq!(tiers.len(), 2);
        assert!(matches!(tiers[0], BaseTier::CustomUrl(u) if u == url));
        assert!(matches!(
            &tiers[1],
            BaseTier::Template(path) if path.as_path() == Path::new("./assets/mockup-template-mug.png")
        ));

        let tiers = with_templates.tiers(None, Some("   "));
        assert!(matches!(&tiers[..], [BaseTier::Template(path)] if *path == template));

        let without_templates = resolver(template, false);
        let tiers = without_templates.tiers(None, Some(url));
        assert!(matches!(&tiers[..], [BaseTier::CustomUrl(_)]));
    }

    #[tokio::test]
    async fn test_custom_url_bypasses_broken_template() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("mockup-template.png");
        std::fs::write(&template, b"not an image").unwrap();

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/base.png")
            .with_status(200)
            .with_body(png_bytes(77, 55, [0, 0, 255, 255]))
            .create_async()
            .await;

        let jersey = rgba_asset(10, 10, [255, 0, 0, 255]);
        let url = format!("{}/base.png", server.url());
        let resolver = resolver(template.clone(), true);

        let resolved = resolver.resolve_base(None, Some(&url), &jersey).await.unwrap();
        assert_eq!(resolved.origin, BaseOrigin::CustomUrl);
        assert_eq!(resolved.asset.dimensions(), (77, 55));

        // Without the URL the same template is consulted and rejected
        let fallback = resolver.resolve_base(None, None, &jersey).await.unwrap();
        assert_eq!(fallback.origin, BaseOrigin::Jersey);
    }

    #[tokio::test]
    async fn test_failing_custom_url_never_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_png(dir.path(), "mockup-template.png", 30, 30, [0, 255, 0, 255]);

        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/gone.png").with_status(404).create_async().await;

        let jersey = rgba_asset(10, 10, [255, 0, 0, 255]);
        let url = format!("{}/gone.png", server.url());
        let err = resolver(template, true)
            .resolve_base(None, Some(&url), &jersey)
            .await
            .unwrap_err();

        let MockupError::CustomUrl(source) = err;
        assert_eq!(source.label(), CUSTOM_MOCKUP_LABEL);
    }

    #[tokio::test]
    async fn test_template_for_variant_type() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_png(dir.path(), "mockup-template.png", 30, 30, [0, 255, 0, 255]);
        write_png(dir.path(), "mockup-template-mug.png", 40, 20, [0, 255, 0, 255]);

        let jersey = rgba_asset(10, 10, [255, 0, 0, 255]);
        let resolver = resolver(template, true);

        let sweatshirt = resolver.resolve_base(Some("sweatshirt"), None, &jersey).await.unwrap();
        assert_eq!(sweatshirt.origin, BaseOrigin::Template);
        assert_eq!(sweatshirt.asset.dimensions(), (30, 30));

        let mug = resolver.resolve_base(Some("tasse"), Some("  "), &jersey).await.unwrap();
        assert_eq!(mug.origin, BaseOrigin::Template);
        assert_eq!(mug.asset.dimensions(), (40, 20));
    }

    #[tokio::test]
    async fn test_unreadable_template_falls_back_to_jersey() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.png");

        let jersey = rgba_asset(12, 34, [255, 0, 0, 255]);
        let resolved = resolver(missing, true).resolve_base(None, None, &jersey).await.unwrap();

        assert_eq!(resolved.origin, BaseOrigin::Jersey);
        assert_eq!(resolved.asset.png_bytes(), jersey.png_bytes());
    }

    #[tokio::test]
    async fn test_templates_disabled_uses_jersey() {
        let dir = tempfile::tempdir().unwrap();
        let template = write_png(dir.path(), "mockup-template.png", 30, 30, [0, 255, 0, 255]);

        let jersey = rgba_asset(12, 34, [255, 0, 0, 255]);
        let resolved = resolver(template, false).resolve_base(None, None, &jersey).await.unwrap();

        assert_eq!(resolved.origin, BaseOrigin::Jersey);
        assert_eq!(resolved.asset.dimensions(), (12, 34));
    }
}
