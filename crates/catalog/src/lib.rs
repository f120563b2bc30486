//! Catalog domain module.
//!
//! Products, the bouquet manifest format, composition pricing and bouquet naming.
//! Pure domain logic (no IO, no storage).

pub mod composition;
pub mod line;
pub mod manifest;
pub mod naming;
pub mod product;
pub mod seed;

pub use composition::{Composition, DEFAULT_PACKAGING_FEE};
pub use line::{LineItem, lines_total};
pub use manifest::{
    BouquetManifest, Component, ManifestEntry, ManifestError, Packaging, TextManifest,
    validate_product_name,
};
pub use naming::{BouquetNamer, RandomBouquetNamer, bouquet_name, retry_suffix};
pub use product::{NewProduct, Product, ProductKind};
