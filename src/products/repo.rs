use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::dashboard::queries::DashboardQueries;
use crate::error::{StoreContext, StoreError};
use crate::products::repo_types::{Category, NewProduct, Product};

/// Catalog access over the `products` table.
#[derive(Clone)]
pub struct ProductRepo {
    db: PgPool,
    dashboard: DashboardQueries,
}

impl ProductRepo {
    pub fn new(db: PgPool) -> Self {
        let dashboard = DashboardQueries::new(db.clone());
        Self { db, dashboard }
    }

    pub async fn list(&self) -> Result<Vec<Product>, StoreError> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, category
              FROM products
             ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.db)
        .await
        .store_context(|| "list products")
    }

    pub async fn get(&self, id: i64) -> Result<Product, StoreError> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, category
              FROM products
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await
        .store_context(|| format!("get product {id}"))
    }

    pub async fn create(&self, product: &NewProduct) -> Result<Product, StoreError> {
        let context = || format!("create product {:?}", product.name);
        if product.name.trim().is_empty() {
            return Err(StoreError::validation(context(), "name must not be empty"));
        }
        if product.price < Decimal::ZERO {
            return Err(StoreError::validation(context(), "price must not be negative"));
        }

        let created = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, price, category)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, category
            "#,
        )
        .bind(product.name.trim())
        .bind(product.price)
        .bind(product.category)
        .fetch_one(&self.db)
        .await
        .store_context(context)?;

        info!(product_id = created.id, name = %created.name, "product created");
        Ok(created)
    }

    /// Returns the deleted row, or `None` when no product had this id.
    ///
    /// Products still referenced by a line item are refused by the store and
    /// surface as a conflict.
    pub async fn delete(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let deleted = sqlx::query_as::<_, Product>(
            r#"
            DELETE FROM products
             WHERE id = $1
            RETURNING id, name, price, category
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .store_context(|| format!("delete product {id}"))?;

        match &deleted {
            Some(p) => info!(product_id = p.id, "product deleted"),
            None => warn!(product_id = id, "delete of unknown product"),
        }
        Ok(deleted)
    }

    pub async fn by_category(&self, category: Category) -> Result<Vec<Product>, StoreError> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price, category
              FROM products
             WHERE category = $1
             ORDER BY id ASC
            "#,
        )
        .bind(category)
        .fetch_all(&self.db)
        .await
        .store_context(|| format!("list products in category {category}"))
    }

    /// Like [`Self::by_category`] but for untrusted input: names that are not a
    /// known category simply match nothing.
    pub async fn by_category_name(&self, name: &str) -> Result<Vec<Product>, StoreError> {
        match name.parse::<Category>() {
            Ok(category) => self.by_category(category).await,
            Err(_) => Ok(Vec::new()),
        }
    }

    pub async fn most_popular(&self, count: i64) -> Result<Vec<Product>, StoreError> {
        let ranked = self.dashboard.most_popular(count).await?;
        Ok(ranked.into_iter().map(Product::from).collect())
    }
}


/// Store-backed checks; run with `cargo test -- --ignored` and `DATABASE_URL`.
#[cfg(test)]
mod pg_tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::error::Error as _;

    fn new_product(name: &str, category: Category) -> NewProduct {
        NewProduct {
            name: name.into(),
            price: Decimal::new(1250, 2),
            category,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn duplicate_name_conflicts(db: PgPool) {
        let repo = ProductRepo::new(db);
        repo.create(&new_product("Kettle", Category::Household))
            .await
            .expect("create");

        let err = repo
            .create(&new_product("Kettle", Category::Electronics))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("product name is already taken"), "{err}");
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn referenced_product_cannot_be_deleted(db: PgPool) {
        let repo = ProductRepo::new(db.clone());
        let product = repo
            .create(&new_product("Toaster", Category::Electronics))
            .await
            .expect("create");

        let user_id: i64 = sqlx::query_scalar(
            "INSERT INTO users (first_name, last_name, username, password_digest)
             VALUES ('Test', 'User', 'shopper', 'digest') RETURNING id",
        )
        .fetch_one(&db)
        .await
        .expect("insert user");
        let order_id: i64 = sqlx::query_scalar("INSERT INTO orders (user_id) VALUES ($1) RETURNING id")
            .bind(user_id)
            .fetch_one(&db)
            .await
            .expect("insert order");
        sqlx::query("INSERT INTO order_products (order_id, product_id, quantity) VALUES ($1, $2, 1)")
            .bind(order_id)
            .bind(product.id)
            .execute(&db)
            .await
            .expect("insert line item");

        let err = repo.delete(product.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.source().is_some());
        assert_eq!(repo.get(product.id).await.expect("still there"), product);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn unknown_id_lookups(db: PgPool) {
        let repo = ProductRepo::new(db);
        let product = repo
            .create(&new_product("Lamp", Category::Household))
            .await
            .expect("create");

        assert_eq!(repo.delete(product.id).await.expect("delete"), Some(product.clone()));
        assert_eq!(repo.delete(product.id).await.expect("delete again"), None);
        assert_eq!(repo.get(product.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn by_category_keeps_matching_rows_in_id_order(db: PgPool) {
        let repo = ProductRepo::new(db);
        let mut books = Vec::new();
        for (name, category) in [
            ("Atlas", Category::Books),
            ("Bread", Category::Food),
            ("Codex", Category::Books),
            ("Drill", Category::Household),
            ("Epic", Category::Books),
        ] {
            let created = repo.create(&new_product(name, category)).await.expect("create");
            if category == Category::Books {
                books.push(created);
            }
        }

        assert_eq!(repo.by_category(Category::Books).await.expect("books"), books);
        assert_eq!(repo.by_category_name("BOOKS").await.expect("books"), books);
        assert!(repo.by_category(Category::Other).await.expect("other").is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn check_violation_keeps_its_cause(db: PgPool) {
        let err = sqlx::query("INSERT INTO products (name, price, category) VALUES ('Refund', -1, 'other')")
            .execute(&db)
            .await
            .store_context(|| "insert product \"Refund\"")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.source().is_some());
    }
}
