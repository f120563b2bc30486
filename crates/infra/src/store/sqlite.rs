//! SQLite-backed shop store.
//!
//! ## Schema
//!
//! | table | key | contents |
//! |-------|-----|----------|
//! | `products` | `id` (autoincrement) | name (unique), price, description, kind, image |
//! | `cart` | `(user_id, product_id)` | quantity > 0 |
//! | `bouquet_draft` | `(user_id, product_id)` | quantity > 0 |
//! | `bouquet_manifests` | `product_id` | packaging flag |
//! | `bouquet_components` | `(product_id, position)` | component product id, quantity |
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | unique violation on `products.name` | `NameCollision` |
//! | anything else | `Backend` |
//!
//! Every commit runs in one transaction; an error drops the transaction, which rolls
//! it back.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Row, Sqlite, SqlitePool, Transaction};
use tracing::instrument;

use bloomcart_basket::{BasketEvent, BasketSnapshot};
use bloomcart_catalog::{
    BouquetManifest, Component, LineItem, NewProduct, Packaging, Product, ProductKind,
};
use bloomcart_core::{ProductId, ShopperId};

use super::{BasketStore, Catalog, CommitReceipt, StoreError, StoreResult};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT    NOT NULL UNIQUE,
        price       INTEGER NOT NULL CHECK (price >= 0),
        description TEXT    NOT NULL DEFAULT '',
        kind        TEXT    NOT NULL,
        image       TEXT    NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cart (
        user_id    INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        quantity   INTEGER NOT NULL CHECK (quantity > 0),
        PRIMARY KEY (user_id, product_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bouquet_draft (
        user_id    INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        quantity   INTEGER NOT NULL CHECK (quantity > 0),
        PRIMARY KEY (user_id, product_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bouquet_manifests (
        product_id INTEGER PRIMARY KEY,
        packaged   INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bouquet_components (
        product_id   INTEGER NOT NULL,
        position     INTEGER NOT NULL,
        component_id INTEGER NOT NULL,
        quantity     INTEGER NOT NULL CHECK (quantity > 0),
        PRIMARY KEY (product_id, position)
    )
    "#,
];

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: i64,
    description: String,
    kind: String,
    image: Option<String>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: ProductId::new(row.id),
            name: row.name,
            price: to_u64(row.price)?,
            description: row.description,
            kind: row
                .kind
                .parse::<ProductKind>()
                .map_err(|e| StoreError::Invalid(e.to_string()))?,
            image: row.image,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    quantity: i64,
    #[sqlx(flatten)]
    product: ProductRow,
}

/// `sqlx` SQLite shop store.
#[derive(Debug, Clone)]
pub struct SqliteShopStore {
    pool: SqlitePool,
}

impl SqliteShopStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `url` (e.g. `sqlite://bloomcart.db?mode=rwc`) and creates the schema.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database. One connection, since every SQLite in-memory
    /// connection opens its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn lines(&self, table: LineTable, shopper: ShopperId) -> StoreResult<Vec<LineItem>> {
        let sql = format!(
            r#"
            SELECT l.quantity, p.id, p.name, p.price, p.description, p.kind, p.image
            FROM {table} l
            JOIN products p ON p.id = l.product_id
            WHERE l.user_id = ?1
            ORDER BY p.id ASC
            "#,
            table = table.name()
        );
        let rows = sqlx::query_as::<_, LineRow>(&sql)
            .bind(shopper.get())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let quantity = to_u32(row.quantity)?;
                let product = Product::try_from(row.product)?;
                Ok(LineItem::from_product(&product, quantity))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum LineTable {
    Draft,
    Cart,
}

impl LineTable {
    fn name(self) -> &'static str {
        match self {
            LineTable::Draft => "bouquet_draft",
            LineTable::Cart => "cart",
        }
    }
}

fn to_u64(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::Invalid(format!("negative amount {value}")))
}

fn to_u32(value: i64) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Invalid(format!("quantity out of range: {value}")))
}

fn to_i64(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Invalid(format!("amount too large: {value}")))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

async fn insert_product(
    tx: &mut Transaction<'_, Sqlite>,
    product: &NewProduct,
) -> StoreResult<Product> {
    product
        .validate()
        .map_err(|e| StoreError::Invalid(e.to_string()))?;

    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        INSERT INTO products (name, price, description, kind, image)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING id, name, price, description, kind, image
        "#,
    )
    .bind(&product.name)
    .bind(to_i64(product.price)?)
    .bind(&product.description)
    .bind(product.kind.as_str())
    .bind(product.image.as_deref())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::NameCollision(product.name.clone())
        } else {
            StoreError::from(e)
        }
    })?;

    Product::try_from(row)
}

async fn update_product(
    tx: &mut Transaction<'_, Sqlite>,
    id: ProductId,
    price: u64,
    description: &str,
) -> StoreResult<Product> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        UPDATE products SET price = ?2, description = ?3
        WHERE id = ?1
        RETURNING id, name, price, description, kind, image
        "#,
    )
    .bind(id.get())
    .bind(to_i64(price)?)
    .bind(description)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::NotFound(id))?;

    Product::try_from(row)
}

async fn replace_manifest(
    tx: &mut Transaction<'_, Sqlite>,
    id: ProductId,
    manifest: &BouquetManifest,
) -> StoreResult<()> {
    delete_manifest(tx, id).await?;

    sqlx::query("INSERT INTO bouquet_manifests (product_id, packaged) VALUES (?1, ?2)")
        .bind(id.get())
        .bind(manifest.packaging.is_wrapped())
        .execute(&mut **tx)
        .await?;

    for (position, component) in manifest.components.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO bouquet_components (product_id, position, component_id, quantity)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(id.get())
        .bind(position as i64)
        .bind(component.product_id.get())
        .bind(i64::from(component.quantity))
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn delete_manifest(tx: &mut Transaction<'_, Sqlite>, id: ProductId) -> StoreResult<()> {
    sqlx::query("DELETE FROM bouquet_components WHERE product_id = ?1")
        .bind(id.get())
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM bouquet_manifests WHERE product_id = ?1")
        .bind(id.get())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn set_line(
    tx: &mut Transaction<'_, Sqlite>,
    table: LineTable,
    shopper: ShopperId,
    product_id: ProductId,
    quantity: u32,
) -> StoreResult<()> {
    if quantity == 0 {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = ?1 AND product_id = ?2",
            table.name()
        );
        sqlx::query(&sql)
            .bind(shopper.get())
            .bind(product_id.get())
            .execute(&mut **tx)
            .await?;
        return Ok(());
    }

    let sql = format!(
        r#"
        INSERT INTO {} (user_id, product_id, quantity) VALUES (?1, ?2, ?3)
        ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = excluded.quantity
        "#,
        table.name()
    );
    sqlx::query(&sql)
        .bind(shopper.get())
        .bind(product_id.get())
        .bind(i64::from(quantity))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn clear_lines(
    tx: &mut Transaction<'_, Sqlite>,
    table: LineTable,
    shopper: ShopperId,
) -> StoreResult<()> {
    let sql = format!("DELETE FROM {} WHERE user_id = ?1", table.name());
    sqlx::query(&sql)
        .bind(shopper.get())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn apply_event(
    tx: &mut Transaction<'_, Sqlite>,
    shopper: ShopperId,
    event: &BasketEvent,
) -> StoreResult<Option<ProductId>> {
    match event {
        BasketEvent::DraftLineSet {
            product_id,
            quantity,
        } => set_line(tx, LineTable::Draft, shopper, *product_id, *quantity).await?,
        BasketEvent::DraftCleared => clear_lines(tx, LineTable::Draft, shopper).await?,
        BasketEvent::CartLineSet {
            product_id,
            quantity,
        } => set_line(tx, LineTable::Cart, shopper, *product_id, *quantity).await?,
        BasketEvent::CartCleared => clear_lines(tx, LineTable::Cart, shopper).await?,
        BasketEvent::BouquetPacked {
            bouquet,
            manifest,
            replaces,
        } => {
            let product = insert_product(tx, bouquet).await?;
            replace_manifest(tx, product.id, manifest).await?;
            set_line(tx, LineTable::Cart, shopper, product.id, 1).await?;
            if let Some(old) = replaces {
                set_line(tx, LineTable::Cart, shopper, *old, 0).await?;
            }
            return Ok(Some(product.id));
        }
        BasketEvent::BouquetRevised {
            product_id,
            price,
            description,
            manifest,
        } => {
            update_product(tx, *product_id, *price, description).await?;
            replace_manifest(tx, *product_id, manifest).await?;
        }
        BasketEvent::EditStarted(_) | BasketEvent::EditEnded => {}
    }
    Ok(None)
}

#[async_trait]
impl Catalog for SqliteShopStore {
    async fn lookup_by_id(&self, id: ProductId) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, description, kind, image FROM products WHERE id = ?1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    async fn lookup_by_name(&self, name: &str) -> StoreResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, description, kind, image FROM products WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .map(Product::try_from)
        .transpose()
    }

    #[instrument(skip(self, product), fields(name = %product.name), err)]
    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;
        let created = insert_product(&mut tx, &product).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, id: ProductId, price: u64, description: &str) -> StoreResult<Product> {
        let mut tx = self.pool.begin().await?;
        let updated = update_product(&mut tx, id, price, description).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, price, description, kind, image FROM products ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Product::try_from)
        .collect()
    }

    async fn manifest(&self, id: ProductId) -> StoreResult<Option<BouquetManifest>> {
        let Some(header) =
            sqlx::query("SELECT packaged FROM bouquet_manifests WHERE product_id = ?1")
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };
        let packaged: bool = header.try_get("packaged")?;

        let rows = sqlx::query(
            r#"
            SELECT component_id, quantity
            FROM bouquet_components
            WHERE product_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;

        let components = rows
            .iter()
            .map(|row| {
                Ok(Component {
                    product_id: ProductId::new(row.try_get("component_id")?),
                    quantity: to_u32(row.try_get("quantity")?)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Some(BouquetManifest {
            components,
            packaging: Packaging::from_flag(packaged),
        }))
    }
}

#[async_trait]
impl BasketStore for SqliteShopStore {
    async fn load_basket(&self, shopper: ShopperId) -> StoreResult<BasketSnapshot> {
        let mut snapshot = BasketSnapshot::default();

        for table in [LineTable::Draft, LineTable::Cart] {
            let sql = format!(
                "SELECT product_id, quantity FROM {} WHERE user_id = ?1",
                table.name()
            );
            let rows = sqlx::query(&sql)
                .bind(shopper.get())
                .fetch_all(&self.pool)
                .await?;
            let lines = match table {
                LineTable::Draft => &mut snapshot.draft,
                LineTable::Cart => &mut snapshot.cart,
            };
            for row in rows {
                let product_id = ProductId::new(row.try_get("product_id")?);
                lines.insert(product_id, to_u32(row.try_get("quantity")?)?);
            }
        }
        Ok(snapshot)
    }

    async fn draft_lines(&self, shopper: ShopperId) -> StoreResult<Vec<LineItem>> {
        self.lines(LineTable::Draft, shopper).await
    }

    async fn cart_lines(&self, shopper: ShopperId) -> StoreResult<Vec<LineItem>> {
        self.lines(LineTable::Cart, shopper).await
    }

    #[instrument(skip(self, events), fields(shopper_id = %shopper, event_count = events.len()), err)]
    async fn commit(
        &self,
        shopper: ShopperId,
        events: &[BasketEvent],
    ) -> StoreResult<CommitReceipt> {
        let mut tx = self.pool.begin().await?;
        let mut receipt = CommitReceipt::default();

        for event in events {
            if let Some(id) = apply_event(&mut tx, shopper, event).await? {
                receipt.created = Some(id);
            }
        }

        tx.commit().await?;
        Ok(receipt)
    }

    #[instrument(skip(self, protected), err)]
    async fn purge_orphaned_bouquets(
        &self,
        protected: &[ProductId],
    ) -> StoreResult<Vec<ProductId>> {
        let mut tx = self.pool.begin().await?;

        let candidates = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM products
            WHERE kind IN ('composed_bouquet', 'created_bouquet')
              AND id NOT IN (SELECT product_id FROM cart)
              AND id NOT IN (SELECT product_id FROM bouquet_draft)
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let orphans: Vec<ProductId> = candidates
            .into_iter()
            .map(ProductId::new)
            .filter(|id| !protected.contains(id))
            .collect();

        for id in &orphans {
            delete_manifest(&mut tx, *id).await?;
            sqlx::query("DELETE FROM products WHERE id = ?1")
                .bind(id.get())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(orphans)
    }
}
