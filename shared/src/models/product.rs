//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
///
/// 菜单商品。`GET /api/products` 返回启用的商品，
/// POS 下单时只传商品 ID 的明细由此补全名称和价格。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl Product {
    pub fn new(id: i64, name: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            category: None,
            is_active: true,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_defaults() {
        let product: Product = serde_json::from_str(r#"{"id":1,"name":"Tacos","price":4.5}"#)
            .unwrap();
        assert!(product.is_active);
        assert!(product.category.is_none());
    }
}
