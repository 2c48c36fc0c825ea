use chrono::Utc;
use sqlx::PgPool;

use crate::models::product::{Product, ProductRequest};

const PRODUCT_COLUMNS: &str = "product_id, name, price, image, created_by, created_at";

pub struct ProductService;

impl ProductService {
    /// Names are stored upper-cased so search is case-insensitive.
    pub async fn insert(pool: &PgPool, body: &ProductRequest, created_by: &str) -> sqlx::Result<i64> {
        sqlx::query_scalar(
            "INSERT INTO products (name, price, created_by, created_at)
             VALUES ($1, $2, $3, $4) RETURNING product_id",
        )
        .bind(body.name.trim().to_uppercase())
        .bind(body.price)
        .bind(created_by)
        .bind(Utc::now().timestamp())
        .fetch_one(pool)
        .await
    }

    pub async fn get(pool: &PgPool, product_id: i64) -> sqlx::Result<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1"
        ))
        .bind(product_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find(pool: &PgPool, search: Option<&str>) -> sqlx::Result<Vec<Product>> {
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(term) => {
                sqlx::query_as::<_, Product>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products
                     WHERE name LIKE '%' || $1 || '%'
                     ORDER BY product_id"
                ))
                .bind(escape_like(&term.to_uppercase()))
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Product>(&format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY product_id"
                ))
                .fetch_all(pool)
                .await
            }
        }
    }

    pub async fn edit(pool: &PgPool, product_id: i64, body: &ProductRequest) -> sqlx::Result<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET name = $2, price = $3
             WHERE product_id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id)
        .bind(body.name.trim().to_uppercase())
        .bind(body.price)
        .fetch_one(pool)
        .await
    }

    pub async fn set_image(pool: &PgPool, product_id: i64, image: &str) -> sqlx::Result<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET image = $2 WHERE product_id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product_id)
        .bind(image)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, product_id: i64) -> sqlx::Result<()> {
        let res = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(product_id)
            .execute(pool)
            .await?;
        if res.rows_affected() != 1 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("KOPI"), "KOPI");
        assert_eq!(escape_like("50%_OFF"), "50\\%\\_OFF");
        assert_eq!(escape_like("A\\B"), "A\\\\B");
    }
}
