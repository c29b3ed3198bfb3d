pub mod handlers;
pub mod queries;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::dashboard_routes()
}

/// Store-backed ranking checks; run with `cargo test -- --ignored` and `DATABASE_URL`.
#[cfg(test)]
mod pg_tests {
    use sqlx::PgPool;

    use super::queries::DashboardQueries;
    use crate::products::repo::ProductRepo;

    async fn seed_product(db: &PgPool, name: &str) -> i64 {
        sqlx::query_scalar(
            "INSERT INTO products (name, price, category) VALUES ($1, 1.00, 'other') RETURNING id",
        )
        .bind(name)
        .fetch_one(db)
        .await
        .expect("product")
    }

    /// One order per line item, so a product can appear several times.
    async fn seed_line_items(db: &PgPool, product_id: i64, times: usize, quantity: i32) {
        for n in 0..times {
            let user_id: i64 = sqlx::query_scalar(
                "INSERT INTO users (first_name, last_name, username, password_digest)
                 VALUES ('F', 'L', $1, 'digest') RETURNING id",
            )
            .bind(format!("buyer-{product_id}-{n}"))
            .fetch_one(db)
            .await
            .expect("user");
            let order_id: i64 = sqlx::query_scalar(
                "INSERT INTO orders (user_id, is_completed) VALUES ($1, $2) RETURNING id",
            )
            .bind(user_id)
            .bind(n % 2 == 0)
            .fetch_one(db)
            .await
            .expect("order");
            sqlx::query("INSERT INTO order_products (order_id, product_id, quantity) VALUES ($1, $2, $3)")
                .bind(order_id)
                .bind(product_id)
                .bind(quantity)
                .execute(db)
                .await
                .expect("line item");
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn ranking_breaks_ties_by_product_id(db: PgPool) {
        let mut ids = Vec::new();
        for name in ["P1", "P2", "P3", "P4", "P5"] {
            ids.push(seed_product(&db, name).await);
        }
        for (pid, times) in ids.iter().zip([3, 5, 5, 1, 0]) {
            seed_line_items(&db, *pid, times, 1).await;
        }

        let top: Vec<i64> = ProductRepo::new(db.clone())
            .most_popular(3)
            .await
            .expect("ranking")
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(top, vec![ids[1], ids[2], ids[0]]);

        let all = DashboardQueries::new(db).most_popular(10).await.expect("ranking");
        assert_eq!(all.len(), 4, "never-ordered products are not ranked");
        assert_eq!(all[0].line_item_count, 5);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires Postgres (DATABASE_URL)"]
    async fn quantity_does_not_weigh_the_ranking(db: PgPool) {
        let bulk = seed_product(&db, "bulk").await;
        let frequent = seed_product(&db, "frequent").await;
        seed_line_items(&db, bulk, 1, 500).await;
        seed_line_items(&db, frequent, 2, 1).await;

        let ranked = DashboardQueries::new(db).most_popular(2).await.expect("ranking");
        assert_eq!(ranked[0].id, frequent);
        assert_eq!(ranked[1].id, bulk);
    }
}
