use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: i64,
    pub name: String,
    pub price: i64,
    /// Relative path under the static root, e.g. `image/product/7.png`.
    pub image: Option<String>,
    pub created_by: String,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub price: i64,
}

impl ProductRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".into());
        }
        if self.price < 0 {
            return Err("price must not be negative".into());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_validation() {
        let ok = ProductRequest { name: "kopi".into(), price: 0 };
        assert!(ok.validate().is_ok());

        let blank = ProductRequest { name: "  ".into(), price: 10 };
        assert!(blank.validate().is_err());

        let negative = ProductRequest { name: "kopi".into(), price: -1 };
        assert!(negative.validate().is_err());
    }
}
