//! Load a demo catalog.

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use storeline_commerce::catalog::{child_path, Category, ProductInput, ProductStatus, VariantInput};
use storeline_commerce::ids::TagId;
use storeline_commerce::promotion::CouponInput;
use storeline_commerce::repository::{CategoryInput, Store};
use storeline_commerce::slug::slugify;

use crate::context::Context;

/// (name, parent name)
const CATEGORIES: &[(&str, Option<&str>)] = &[
    ("Apparel", None),
    ("Shirts", Some("Apparel")),
    ("Outerwear", Some("Apparel")),
    ("Home", None),
    ("Kitchen", Some("Home")),
];

const TAGS: &[&str] = &["New", "Organic", "Bestseller"];

struct DemoProduct {
    name: &'static str,
    description: &'static str,
    category: &'static str,
    tags: &'static [&'static str],
    featured: bool,
    /// (sku, size, price in cents, inventory)
    variants: &'static [(&'static str, Option<&'static str>, i64, i64)],
}

const PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        name: "Linen Shirt",
        description: "Breathable washed linen with a relaxed fit.",
        category: "Shirts",
        tags: &["New", "Organic"],
        featured: true,
        variants: &[
            ("LINEN-S", Some("S"), 5400, 12),
            ("LINEN-M", Some("M"), 5400, 20),
            ("LINEN-L", Some("L"), 5400, 4),
        ],
    },
    DemoProduct {
        name: "Oxford Shirt",
        description: "Heavy cotton oxford cloth, button-down collar.",
        category: "Shirts",
        tags: &["Bestseller"],
        featured: false,
        variants: &[("OXF-M", Some("M"), 4800, 30), ("OXF-L", Some("L"), 4800, 18)],
    },
    DemoProduct {
        name: "Waxed Jacket",
        description: "Water-resistant waxed cotton with a corduroy collar.",
        category: "Outerwear",
        tags: &["New"],
        featured: true,
        variants: &[("WAX-M", Some("M"), 18900, 6), ("WAX-L", Some("L"), 18900, 3)],
    },
    DemoProduct {
        name: "Stoneware Mug",
        description: "Hand-glazed, holds 350 ml.",
        category: "Kitchen",
        tags: &["Bestseller"],
        featured: false,
        variants: &[("MUG-SAND", None, 1800, 40)],
    },
    DemoProduct {
        name: "Olive Wood Board",
        description: "Serving board cut from a single piece of olive wood.",
        category: "Kitchen",
        tags: &["Organic"],
        featured: false,
        variants: &[("BOARD-OLV", None, 3600, 9)],
    },
];

/// What a seed run created. Anything already present is skipped.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub tags: usize,
    pub products: usize,
    pub coupons: usize,
}

impl SeedSummary {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Run the seed command.
pub async fn run(ctx: &Context) -> Result<()> {
    let state = ctx.connect().await?;

    ctx.output.header("Seeding demo catalog");
    let total = (CATEGORIES.len() + TAGS.len() + PRODUCTS.len() + 1) as u64;
    let progress = ctx.output.progress(total, "Seeding");
    let summary = seed_catalog(&state.store, &progress).await;
    progress.finish_and_clear();
    let summary = summary?;

    if ctx.output.is_json() {
        ctx.output.json(&summary);
        return Ok(());
    }

    if summary.is_empty() {
        ctx.output.info("Demo catalog already present, nothing to do.");
        return Ok(());
    }
    ctx.output.kv("Categories", &summary.categories.to_string());
    ctx.output.kv("Tags", &summary.tags.to_string());
    ctx.output.kv("Products", &summary.products.to_string());
    ctx.output.kv("Coupons", &summary.coupons.to_string());
    ctx.output.success("Demo catalog loaded. Try the WELCOME10 coupon.");
    Ok(())
}

/// Create the demo categories, tags, products and coupon.
pub async fn seed_catalog(store: &Store, progress: &ProgressBar) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    let mut categories: HashMap<&str, Category> = HashMap::new();
    for &(name, parent) in CATEGORIES {
        let parent = parent.and_then(|p| categories.get(p));
        let path = child_path(parent.map(|p| p.path.as_str()), &slugify(name));
        let category = match store.categories.get_by_path(&path).await {
            Ok(existing) => existing,
            Err(e) if e.is_not_found() => {
                summary.categories += 1;
                store
                    .categories
                    .create(CategoryInput {
                        name: name.to_string(),
                        parent_id: parent.map(|p| p.id.clone()),
                        ..Default::default()
                    })
                    .await
                    .with_context(|| format!("Failed to create category {}", name))?
            }
            Err(e) => return Err(e.into()),
        };
        categories.insert(name, category);
        progress.inc(1);
    }

    let existing_tags = store.tags.list().await?;
    let mut tags: HashMap<&str, TagId> = HashMap::new();
    for &name in TAGS {
        let tag = match existing_tags.iter().find(|t| t.slug == slugify(name)) {
            Some(tag) => tag.clone(),
            None => {
                summary.tags += 1;
                store
                    .tags
                    .create(name)
                    .await
                    .with_context(|| format!("Failed to create tag {}", name))?
            }
        };
        tags.insert(name, tag.id);
        progress.inc(1);
    }

    for demo in PRODUCTS {
        progress.set_message(demo.name);
        progress.inc(1);
        match store.products.get_by_slug(&slugify(demo.name)).await {
            Ok(_) => continue,
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e.into()),
        }

        let input = ProductInput {
            name: demo.name.to_string(),
            description: Some(demo.description.to_string()),
            status: ProductStatus::Active,
            category_id: categories.get(demo.category).map(|c| c.id.clone()),
            featured: demo.featured,
            tag_ids: demo
                .tags
                .iter()
                .filter_map(|t| tags.get(t).cloned())
                .collect(),
            variants: demo
                .variants
                .iter()
                .map(|(sku, size, price_cents, inventory)| VariantInput {
                    sku: sku.to_string(),
                    size: size.map(str::to_string),
                    price_cents: *price_cents,
                    inventory: *inventory,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        store
            .products
            .create(input)
            .await
            .with_context(|| format!("Failed to create product {}", demo.name))?;
        summary.products += 1;
    }

    progress.inc(1);
    if store.coupons.find_by_code("WELCOME10").await?.is_none() {
        store
            .coupons
            .create(CouponInput {
                code: "WELCOME10".to_string(),
                description: Some("10% off a first order".to_string()),
                kind: "percentage".to_string(),
                percent_off: Some(10),
                per_customer_limit: Some(1),
                ..Default::default()
            })
            .await
            .context("Failed to create coupon WELCOME10")?;
        summary.coupons += 1;
    }

    Ok(summary)
}
