//! Product catalog: categories, products, variants and tags.

mod category;
mod product;
mod tag;
mod tree;

pub use category::{
    breadcrumb, child_path, is_path_within, rebase_path, Category, PATH_SEPARATOR,
};
pub use product::{
    reconcile_variants, Product, ProductInput, ProductStatus, ProductVariant, VariantChanges,
    VariantInput,
};
pub use tag::Tag;
pub use tree::{descendant_ids, CategoryNode, CategoryTree, FlatCategory};
