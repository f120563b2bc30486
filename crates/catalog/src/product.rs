use serde::{Deserialize, Serialize};

use bloomcart_core::{DomainError, DomainResult, ProductId};

use crate::manifest::validate_product_name;

/// Product kind.
///
/// Composed bouquets are only ever created by packing a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    SingleFlower,
    FixedBouquet,
    ComposedBouquet,
}

impl ProductKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductKind::SingleFlower => "single_flower",
            ProductKind::FixedBouquet => "fixed_bouquet",
            ProductKind::ComposedBouquet => "composed_bouquet",
        }
    }
}

impl core::fmt::Display for ProductKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ProductKind {
    type Err = DomainError;

    /// Accepts the legacy shop labels (`lonely`, `bouquet`, `created_bouquet`) too, so
    /// rows written by the old bot still load.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_flower" | "lonely" => Ok(ProductKind::SingleFlower),
            "fixed_bouquet" | "bouquet" => Ok(ProductKind::FixedBouquet),
            "composed_bouquet" | "created_bouquet" => Ok(ProductKind::ComposedBouquet),
            other => Err(DomainError::validation(format!("unknown product kind: {other}"))),
        }
    }
}

/// A catalog product as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price in whole currency units.
    pub price: u64,
    pub description: String,
    pub kind: ProductKind,
    pub image: Option<String>,
}

impl Product {
    pub fn is_composed_bouquet(&self) -> bool {
        self.kind == ProductKind::ComposedBouquet
    }
}

/// A product that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: u64,
    pub description: String,
    pub kind: ProductKind,
    pub image: Option<String>,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: u64, kind: ProductKind) -> Self {
        Self {
            name: name.into(),
            price,
            description: String::new(),
            kind,
            image: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_product_name(&self.name)
    }

    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            description: self.description,
            kind: self.kind,
            image: self.image,
        }
    }
}
