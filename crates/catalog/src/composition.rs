//! Pricing and manifest construction for a bouquet about to be packed or saved.

use serde::{Deserialize, Serialize};

use bloomcart_core::{DomainError, DomainResult};

use crate::line::{LineItem, lines_total};
use crate::manifest::{BouquetManifest, Component, ManifestEntry, Packaging, TextManifest};

/// Packaging fee used when no other value is configured.
pub const DEFAULT_PACKAGING_FEE: u64 = 15;

/// The priced contents of a bouquet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    lines: Vec<LineItem>,
    packaging: Packaging,
    base_total: u64,
    fee: u64,
    total: u64,
}

impl Composition {
    /// Prices `lines`; the fee is only charged for wrapped bouquets.
    ///
    /// An empty line list is an empty draft.
    pub fn new(lines: Vec<LineItem>, packaging: Packaging, packaging_fee: u64) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::EmptyDraft);
        }
        if let Some(zero) = lines.iter().find(|l| l.quantity == 0) {
            return Err(DomainError::invariant(format!(
                "draft line for product {} has zero quantity",
                zero.product_id
            )));
        }

        let base_total = lines_total(&lines);
        let fee = if packaging.is_wrapped() { packaging_fee } else { 0 };
        let total = base_total
            .checked_add(fee)
            .ok_or_else(|| DomainError::invariant("bouquet total overflows"))?;

        Ok(Self {
            lines,
            packaging,
            base_total,
            fee,
            total,
        })
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn packaging(&self) -> Packaging {
        self.packaging
    }

    pub fn base_total(&self) -> u64 {
        self.base_total
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn text_manifest(&self) -> TextManifest {
        TextManifest {
            entries: self
                .lines
                .iter()
                .map(|l| ManifestEntry::new(l.name.clone(), l.quantity))
                .collect(),
            packaging: Some(self.packaging),
        }
    }

    /// The description stored on the composed bouquet.
    pub fn description(&self) -> String {
        self.text_manifest().render()
    }

    pub fn manifest(&self) -> BouquetManifest {
        BouquetManifest {
            components: self
                .lines
                .iter()
                .map(|l| Component {
                    product_id: l.product_id,
                    quantity: l.quantity,
                })
                .collect(),
            packaging: self.packaging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductKind;
    use bloomcart_core::ProductId;

    fn line(id: i64, name: &str, price: u64, quantity: u32) -> LineItem {
        LineItem {
            product_id: ProductId::new(id),
            name: name.to_string(),
            unit_price: price,
            quantity,
            kind: ProductKind::SingleFlower,
            description: String::new(),
        }
    }

    fn roses_and_tulips() -> Vec<LineItem> {
        vec![line(1, "Розы", 220, 3), line(2, "Тюльпаны", 180, 2)]
    }

    #[test]
    fn wrapped_bouquet_adds_the_fee() {
        let c = Composition::new(roses_and_tulips(), Packaging::Wrapped, DEFAULT_PACKAGING_FEE)
            .unwrap();
        assert_eq!(c.base_total(), 1020);
        assert_eq!(c.fee(), 15);
        assert_eq!(c.total(), 1035);
        assert_eq!(c.description(), "Состав: Розы (3), Тюльпаны (2). В упаковке.");
    }

    #[test]
    fn unwrapped_bouquet_is_charged_base_total() {
        let c = Composition::new(roses_and_tulips(), Packaging::Unwrapped, DEFAULT_PACKAGING_FEE)
            .unwrap();
        assert_eq!(c.fee(), 0);
        assert_eq!(c.total(), 1020);
        assert_eq!(c.description(), "Состав: Розы (3), Тюльпаны (2). Без упаковки.");
    }

    #[test]
    fn structured_manifest_follows_line_order() {
        let c = Composition::new(roses_and_tulips(), Packaging::Wrapped, 15).unwrap();
        let manifest = c.manifest();
        assert_eq!(
            manifest.components,
            vec![
                Component { product_id: ProductId::new(1), quantity: 3 },
                Component { product_id: ProductId::new(2), quantity: 2 },
            ]
        );
        assert_eq!(manifest.packaging, Packaging::Wrapped);
    }

    #[test]
    fn empty_lines_are_an_empty_draft() {
        let err = Composition::new(vec![], Packaging::Wrapped, 15).unwrap_err();
        assert_eq!(err, DomainError::EmptyDraft);
    }
}
