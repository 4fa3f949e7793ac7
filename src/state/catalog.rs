use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use walkdir::WalkDir;

use super::data::{ImageRef, Product};

/// Errors raised while reading the catalog directory
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A catalog file holds either one product or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Many(Vec<Product>),
    One(Box<Product>),
}

/// The Catalog is the storefront's data source.
/// It reads product records from JSON files on disk.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    skipped_files: usize,
}

impl Catalog {
    /// Build a catalog from records already in memory
    pub fn from_products(products: Vec<Product>) -> Self {
        Self {
            products,
            skipped_files: 0,
        }
    }

    /// Load every `*.json` file below `dir`.
    ///
    /// Malformed files are logged and skipped so one broken record
    /// doesn't take the whole storefront down.
    pub fn load_dir(dir: &Path) -> Result<Self, CatalogError> {
        if !dir.is_dir() {
            return Err(CatalogError::MissingDirectory(dir.to_path_buf()));
        }

        log::info!("Scanning catalog: {}", dir.display());

        let mut products = Vec::new();
        let mut skipped_files = 0;

        // Walk the directory tree recursively
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if !path.is_file() || !is_json(path) {
                continue;
            }

            match load_file(path) {
                Ok(mut loaded) => {
                    log::debug!("Loaded {} products from {}", loaded.len(), path.display());
                    products.append(&mut loaded);
                }
                Err(e) => {
                    log::warn!("Skipping catalog file: {}", e);
                    skipped_files += 1;
                }
            }
        }

        log::info!(
            "Catalog ready: {} products, {} files skipped",
            products.len(),
            skipped_files
        );

        Ok(Self {
            skipped_files,
            ..Self::from_products(products)
        })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Number of files that failed to parse during the last load
    pub fn skipped_files(&self) -> usize {
        self.skipped_files
    }

    /// Newest products first
    pub fn featured(&self, limit: usize) -> Vec<Product> {
        let mut products = self.products.clone();
        products.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        products.truncate(limit);
        products
    }

    /// Case-insensitive match on title or vendor
    pub fn search(&self, query: &str) -> Vec<Product> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        self.products
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&query) || p.vendor.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Parse one catalog file and anchor its image paths to the file's folder
fn load_file(path: &Path) -> Result<Vec<Product>, CatalogError> {
    let contents = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let file: CatalogFile =
        serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut products = match file {
        CatalogFile::Many(products) => products,
        CatalogFile::One(product) => vec![*product],
    };

    if let Some(base) = path.parent() {
        for product in &mut products {
            resolve_images(product, base);
        }
    }

    Ok(products)
}

fn resolve_images(product: &mut Product, base: &Path) {
    for image in &mut product.images {
        resolve_image(image, base);
    }
    if let Some(variants) = product.variants.as_mut() {
        for image in variants.iter_mut().filter_map(|v| v.image.as_mut()) {
            resolve_image(image, base);
        }
    }
}

fn resolve_image(image: &mut ImageRef, base: &Path) {
    let path = Path::new(&image.url);
    if path.is_relative() {
        image.url = base.join(path).to_string_lossy().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "storefront-catalog-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn product_json(id: &str, title: &str, published_at: &str) -> String {
        format!(
            r#"{{
                "id": "{id}", "title": "{title}", "handle": "{id}", "vendor": "Aroma",
                "publishedAt": "{published_at}",
                "images": [{{ "url": "img/{id}.jpg" }}],
                "variants": [{{ "id": "{id}-v", "title": "Default",
                    "price": {{ "amount": "10.0", "currencyCode": "USD" }} }}]
            }}"#
        )
    }

    #[test]
    fn test_load_dir_reads_single_and_list_files() {
        let dir = scratch_dir("load");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(
            dir.join("shirt.json"),
            product_json("shirt", "Linen Shirt", "2024-01-01T00:00:00Z"),
        )
        .unwrap();
        fs::write(
            dir.join("nested/more.json"),
            format!(
                "[{}, {}]",
                product_json("dress", "Silk Dress", "2024-03-01T00:00:00Z"),
                product_json("brush", "Hair Brush", "2024-02-01T00:00:00Z")
            ),
        )
        .unwrap();
        fs::write(dir.join("broken.json"), "{ not json").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let catalog = Catalog::load_dir(&dir).unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.skipped_files(), 1);

        let featured = catalog.featured(2);
        assert_eq!(featured.len(), 2);
        assert_eq!(featured[0].id, "dress");
        assert_eq!(featured[1].id, "brush");

        // Relative image paths are anchored to the file's folder
        let dress = catalog.search("silk").remove(0);
        assert!(Path::new(&dress.images[0].url).starts_with(dir.join("nested")));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let dir = std::env::temp_dir().join("storefront-catalog-does-not-exist");
        assert!(matches!(
            Catalog::load_dir(&dir),
            Err(CatalogError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_search_matches_title_and_vendor() {
        let products: Vec<Product> = [
            product_json("shirt", "Linen Shirt", "2024-01-01T00:00:00Z"),
            product_json("dress", "Silk Dress", "2024-03-01T00:00:00Z"),
        ]
        .iter()
        .map(|json| serde_json::from_str(json).unwrap())
        .collect();
        let catalog = Catalog::from_products(products);

        assert_eq!(catalog.search("SILK").len(), 1);
        assert_eq!(catalog.search("aroma").len(), 2);
        assert!(catalog.search("   ").is_empty());
    }
}
