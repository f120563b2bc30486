//! Catalog seeding.

use tracing::{debug, info};

use bloomcart_catalog::NewProduct;

use crate::store::{Catalog, StoreError, StoreResult};

/// Creates every product whose name is not taken yet; returns how many were created.
///
/// Safe to run on every start.
pub async fn seed_catalog<C>(catalog: &C, products: Vec<NewProduct>) -> StoreResult<usize>
where
    C: Catalog + ?Sized,
{
    let mut created = 0;
    for product in products {
        match catalog.create(product).await {
            Ok(product) => {
                debug!(product_id = %product.id, name = %product.name, "seeded product");
                created += 1;
            }
            Err(StoreError::NameCollision(name)) => {
                debug!(%name, "product already present");
            }
            Err(err) => return Err(err),
        }
    }
    info!(created, "catalog seeded");
    Ok(created)
}
