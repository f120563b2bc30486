//! Bouquet manifests.
//!
//! A composed bouquet records what it is made of twice:
//!
//! - [`BouquetManifest`]: structured `(product_id, quantity)` components plus the
//!   packaging flag. Stores keep it in its own relation and it is what re-opening a
//!   bouquet reads first.
//! - [`TextManifest`]: the human-readable line kept in the product description, e.g.
//!   `Состав: Розы (3), Тюльпаны (2). В упаковке.` Bouquets packed by older versions
//!   only have this form, so it must parse back exactly.
//!
//! Text grammar (writer side):
//!
//! ```text
//! manifest  = "Состав: " entry *( "), " entry-body ) ")" [ ". " packaging ] "."
//! entry     = name " (" quantity ")"
//! packaging = "В упаковке" | "Без упаковки"
//! ```
//!
//! The parser splits entries on `"), "` and each entry at its last `" ("`, so it is the
//! exact inverse of the writer for every name accepted by [`validate_product_name`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use bloomcart_core::{DomainError, DomainResult, ProductId};

pub const MANIFEST_PREFIX: &str = "Состав: ";
pub const ENTRY_SEPARATOR: &str = "), ";

const WRAPPED_LABEL: &str = "В упаковке";
const UNWRAPPED_LABEL: &str = "Без упаковки";

/// Whether a bouquet is sold wrapped (and charged the packaging fee).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Packaging {
    Wrapped,
    Unwrapped,
}

impl Packaging {
    pub fn from_flag(wrapped: bool) -> Self {
        if wrapped {
            Packaging::Wrapped
        } else {
            Packaging::Unwrapped
        }
    }

    pub fn is_wrapped(self) -> bool {
        self == Packaging::Wrapped
    }

    pub fn label(self) -> &'static str {
        match self {
            Packaging::Wrapped => WRAPPED_LABEL,
            Packaging::Unwrapped => UNWRAPPED_LABEL,
        }
    }
}

/// Product names end up inside text manifests, so they may not contain anything that
/// would make the entry separator ambiguous.
pub fn validate_product_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("product name cannot be empty"));
    }
    if name.trim() != name {
        return Err(DomainError::validation(
            "product name cannot start or end with whitespace",
        ));
    }
    if name.contains(ENTRY_SEPARATOR) || name.ends_with("),") {
        return Err(DomainError::validation(format!(
            "product name cannot contain {ENTRY_SEPARATOR:?}"
        )));
    }
    Ok(())
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("manifest lists no entries")]
    Empty,
    #[error("malformed manifest entry: {0:?}")]
    MalformedEntry(String),
    #[error("invalid quantity in manifest entry: {0:?}")]
    InvalidQuantity(String),
}

/// One `name (quantity)` pair of a text manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub quantity: u32,
}

impl ManifestEntry {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
        }
    }
}

/// Text form of a manifest, as stored in a composed bouquet's description.
///
/// `packaging` is `None` for legacy descriptions written without the packaging note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextManifest {
    pub entries: Vec<ManifestEntry>,
    pub packaging: Option<Packaging>,
}

impl TextManifest {
    pub fn render(&self) -> String {
        let entries = self
            .entries
            .iter()
            .map(|e| format!("{} ({})", e.name, e.quantity))
            .collect::<Vec<_>>()
            .join(", ");

        match self.packaging {
            Some(packaging) => format!("{MANIFEST_PREFIX}{entries}. {}.", packaging.label()),
            None => format!("{MANIFEST_PREFIX}{entries}."),
        }
    }

    pub fn parse(input: &str) -> Result<Self, ManifestError> {
        let body = input.trim();
        let body = body.strip_prefix(MANIFEST_PREFIX).unwrap_or(body);

        let (body, packaging) = if let Some(rest) = body.strip_suffix(&format!(". {WRAPPED_LABEL}.")) {
            (rest, Some(Packaging::Wrapped))
        } else if let Some(rest) = body.strip_suffix(&format!(". {UNWRAPPED_LABEL}.")) {
            (rest, Some(Packaging::Unwrapped))
        } else if let Some(rest) = body.strip_suffix('.') {
            (rest, None)
        } else {
            (body, None)
        };

        if body.trim().is_empty() {
            return Err(ManifestError::Empty);
        }

        let inner = body
            .strip_suffix(')')
            .ok_or_else(|| ManifestError::MalformedEntry(body.to_string()))?;

        let entries = inner
            .split(ENTRY_SEPARATOR)
            .map(parse_entry)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { entries, packaging })
    }
}

/// Parses `name (quantity` (the closing parenthesis is consumed by the separator).
fn parse_entry(piece: &str) -> Result<ManifestEntry, ManifestError> {
    let (name, quantity) = piece
        .rsplit_once(" (")
        .ok_or_else(|| ManifestError::MalformedEntry(piece.to_string()))?;

    if name.trim().is_empty() {
        return Err(ManifestError::MalformedEntry(piece.to_string()));
    }
    if quantity.is_empty() || !quantity.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ManifestError::InvalidQuantity(piece.to_string()));
    }
    let quantity: u32 = quantity
        .parse()
        .map_err(|_| ManifestError::InvalidQuantity(piece.to_string()))?;
    if quantity == 0 {
        return Err(ManifestError::InvalidQuantity(piece.to_string()));
    }

    Ok(ManifestEntry::new(name, quantity))
}

impl core::fmt::Display for TextManifest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.render())
    }
}

impl core::str::FromStr for TextManifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One constituent of a composed bouquet, referenced by product id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Structured manifest of a composed bouquet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BouquetManifest {
    pub components: Vec<Component>,
    pub packaging: Packaging,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(manifest: &TextManifest) -> Vec<(&str, u32)> {
        manifest
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e.quantity))
            .collect()
    }

    #[test]
    fn renders_the_shop_format() {
        let manifest = TextManifest {
            entries: vec![ManifestEntry::new("Розы", 3), ManifestEntry::new("Тюльпаны", 2)],
            packaging: Some(Packaging::Wrapped),
        };
        assert_eq!(manifest.render(), "Состав: Розы (3), Тюльпаны (2). В упаковке.");

        let unwrapped = TextManifest {
            packaging: Some(Packaging::Unwrapped),
            ..manifest.clone()
        };
        assert_eq!(unwrapped.render(), "Состав: Розы (3), Тюльпаны (2). Без упаковки.");

        let legacy = TextManifest {
            packaging: None,
            ..manifest
        };
        assert_eq!(legacy.render(), "Состав: Розы (3), Тюльпаны (2).");
    }

    #[test]
    fn parses_bare_entry_list() {
        let manifest = TextManifest::parse("Розы (3), Тюльпаны (2)").unwrap();
        assert_eq!(entries(&manifest), vec![("Розы", 3), ("Тюльпаны", 2)]);
        assert_eq!(manifest.packaging, None);
    }

    #[test]
    fn parses_full_description_with_packaging() {
        let manifest =
            TextManifest::parse("Состав: Белые розы (5), Лилии (1). Без упаковки.").unwrap();
        assert_eq!(entries(&manifest), vec![("Белые розы", 5), ("Лилии", 1)]);
        assert_eq!(manifest.packaging, Some(Packaging::Unwrapped));
    }

    #[test]
    fn names_with_parentheses_and_dots_survive() {
        let manifest = TextManifest {
            entries: vec![
                ManifestEntry::new("Роза (красная)", 7),
                ManifestEntry::new("Эвкалипт, ветка", 1),
                ManifestEntry::new("Пион д.м.", 2),
            ],
            packaging: Some(Packaging::Wrapped),
        };
        let parsed = TextManifest::parse(&manifest.render()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(TextManifest::parse(""), Err(ManifestError::Empty));
        assert_eq!(TextManifest::parse("Состав: . В упаковке."), Err(ManifestError::Empty));
        assert!(matches!(
            TextManifest::parse("Классический букет из 10 красных роз."),
            Err(ManifestError::MalformedEntry(_))
        ));
        assert!(matches!(
            TextManifest::parse("Розы (три)"),
            Err(ManifestError::InvalidQuantity(_))
        ));
        assert!(matches!(
            TextManifest::parse("Розы (0)"),
            Err(ManifestError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn name_rule_rejects_separator() {
        assert!(validate_product_name("Розы").is_ok());
        assert!(validate_product_name("Роза (красная)").is_ok());
        assert!(validate_product_name("A), B").is_err());
        assert!(validate_product_name("A),").is_err());
        assert!(validate_product_name(" Розы").is_err());
        assert!(validate_product_name("").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn valid_name() -> impl Strategy<Value = String> {
            "[A-Za-zА-Яа-я][A-Za-zА-Яа-я0-9 (),.]{0,24}"
                .prop_filter("name must satisfy the product-name rule", |n| {
                    validate_product_name(n).is_ok()
                })
        }

        fn packaging() -> impl Strategy<Value = Option<Packaging>> {
            prop_oneof![
                Just(None),
                Just(Some(Packaging::Wrapped)),
                Just(Some(Packaging::Unwrapped)),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: the parser inverts the writer for every valid name.
            #[test]
            fn parse_inverts_render(
                lines in proptest::collection::vec((valid_name(), 1u32..10_000), 1..8),
                packaging in packaging(),
            ) {
                let manifest = TextManifest {
                    entries: lines
                        .into_iter()
                        .map(|(name, qty)| ManifestEntry::new(name, qty))
                        .collect(),
                    packaging,
                };
                let parsed = TextManifest::parse(&manifest.render());
                prop_assert_eq!(parsed, Ok(manifest));
            }
        }
    }
}
