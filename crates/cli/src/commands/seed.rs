//! Seed the catalog from a YAML file.
//!
//! Categories and products are matched by slug. Existing rows are left
//! untouched, so the command can be re-run after adding entries.

use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use hearth_core::{CategoryId, Slug};
use hearth_storefront::db::categories::CategoryInput;
use hearth_storefront::db::products::{ProductImageInput, ProductInput};
use hearth_storefront::db::{CategoryRepository, ProductRepository};

use super::connect;

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub name: String,
    pub slug: Option<String>,
    /// Slug of a category defined in the same file or already in the database.
    pub category: Option<String>,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub images: Vec<ProductImageInput>,
}

const fn default_active() -> bool {
    true
}

fn resolve_slug(slug: Option<&str>, name: &str) -> Result<Slug, String> {
    match slug {
        Some(s) => Slug::parse(s).map_err(|e| format!("{name}: invalid slug {s:?}: {e}")),
        None => Slug::from_title(name).ok_or_else(|| format!("{name}: cannot derive a slug")),
    }
}

/// Check the file before touching the database. Returns every problem found.
pub fn validate(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();
    let mut category_slugs = Vec::new();
    let mut product_slugs = Vec::new();

    for category in &seed.categories {
        if category.name.trim().is_empty() {
            errors.push("category with empty name".to_string());
            continue;
        }
        match resolve_slug(category.slug.as_deref(), &category.name) {
            Ok(slug) if category_slugs.contains(&slug) => {
                errors.push(format!("duplicate category slug: {slug}"));
            }
            Ok(slug) => category_slugs.push(slug),
            Err(e) => errors.push(e),
        }
    }

    for product in &seed.products {
        if product.name.trim().is_empty() {
            errors.push("product with empty name".to_string());
            continue;
        }
        match resolve_slug(product.slug.as_deref(), &product.name) {
            Ok(slug) if product_slugs.contains(&slug) => {
                errors.push(format!("duplicate product slug: {slug}"));
            }
            Ok(slug) => product_slugs.push(slug),
            Err(e) => errors.push(e),
        }
        if product.price.is_sign_negative() || product.price.scale() > 2 {
            errors.push(format!("{}: invalid price {}", product.name, product.price));
        }
        if product.stock < 0 {
            errors.push(format!("{}: stock must not be negative", product.name));
        }
        if let Some(category) = &product.category
            && let Err(e) = Slug::parse(category)
        {
            errors.push(format!("{}: invalid category {category:?}: {e}", product.name));
        }
    }

    errors
}

/// Seed categories and products from `file_path`.
///
/// # Errors
///
/// Returns an error if the file can't be read or is invalid, or a database
/// operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog seed");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = connect().await?;
    let categories = CategoryRepository::new(&pool);
    let products = ProductRepository::new(&pool);

    let mut category_ids: HashMap<Slug, CategoryId> = HashMap::new();
    let (mut created, mut skipped) = (0usize, 0usize);

    for category in seed.categories {
        let slug = resolve_slug(category.slug.as_deref(), &category.name)?;
        if let Some(existing) = categories.get_by_slug(&slug).await? {
            category_ids.insert(slug, existing.id);
            skipped += 1;
            continue;
        }

        let row = categories
            .create(&CategoryInput {
                name: category.name.trim().to_string(),
                slug: slug.clone(),
                description: category.description,
            })
            .await?;
        category_ids.insert(slug, row.id);
        created += 1;
    }
    info!(created, skipped, "Categories seeded");

    let (mut created, mut skipped) = (0usize, 0usize);
    for product in seed.products {
        let slug = resolve_slug(product.slug.as_deref(), &product.name)?;
        if products.get_by_slug(&slug).await?.is_some() {
            skipped += 1;
            continue;
        }

        let category_id = match product.category.as_deref() {
            Some(category) => {
                let category = Slug::parse(category)?;
                match category_ids.get(&category) {
                    Some(id) => Some(*id),
                    None => Some(
                        categories
                            .get_by_slug(&category)
                            .await?
                            .ok_or_else(|| format!("{}: unknown category {category}", product.name))?
                            .id,
                    ),
                }
            }
            None => None,
        };

        products
            .create(&ProductInput {
                category_id,
                name: product.name.trim().to_string(),
                slug,
                description: product.description,
                price: product.price,
                stock: product.stock,
                is_active: product.active,
                images: product.images,
            })
            .await?;
        created += 1;
    }
    info!(created, skipped, "Products seeded");

    info!("Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_seed_is_valid() {
        let content = include_str!("../../seed/catalog.yaml");
        let seed: CatalogSeed = serde_yaml::from_str(content).unwrap();

        assert!(!seed.categories.is_empty());
        assert!(!seed.products.is_empty());
        assert!(validate(&seed).is_empty(), "{:?}", validate(&seed));
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r"
categories:
  - name: Kitchen
  - name: Kitchen
products:
  - name: Mug
    price: '-1.00'
  - name: Bowl
    price: '12.005'
    stock: -2
    category: Not A Slug
",
        )
        .unwrap();

        let errors = validate(&seed);
        assert!(errors.iter().any(|e| e.contains("duplicate category slug")));
        assert!(errors.iter().any(|e| e.starts_with("Mug: invalid price")));
        assert!(errors.iter().any(|e| e.starts_with("Bowl: invalid price")));
        assert!(errors.iter().any(|e| e.contains("stock must not be negative")));
        assert!(errors.iter().any(|e| e.contains("invalid category")));
    }
}
