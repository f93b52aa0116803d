//! 商品目录
//!
//! 启动时从 `PRODUCTS_FILE` (JSON 数组) 加载，运行期只读。
//! 未配置文件时目录为空，POS 下单必须自带名称和单价。

use std::collections::HashMap;
use std::path::Path;

use shared::{AppError, AppResult, CreateOrderItem, OrderItem, Product};

#[derive(Debug, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
    index: HashMap<i64, usize>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        let index = products
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
        Self { products, index }
    }

    /// 从 JSON 文件加载
    pub fn load_from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read products file {}: {}", path.display(), e))
        })?;
        let products: Vec<Product> = serde_json::from_str(&content).map_err(|e| {
            AppError::config(format!("Invalid products file {}: {}", path.display(), e))
        })?;
        tracing::info!(count = products.len(), path = %path.display(), "Product catalog loaded");
        Ok(Self::new(products))
    }

    pub fn get(&self, id: i64) -> Option<&Product> {
        self.index.get(&id).map(|&i| &self.products[i])
    }

    /// 启用的商品
    pub fn active(&self) -> Vec<Product> {
        self.products.iter().filter(|p| p.is_active).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// 补全下单明细
    ///
    /// 请求里带了名称/单价时优先使用请求的值；缺失时查目录，
    /// 目录里没有该商品则返回 `ProductNotFound`。
    pub fn resolve_item(&self, input: &CreateOrderItem) -> AppResult<OrderItem> {
        let (name, unit_price) = match (&input.name, input.unit_price) {
            (Some(name), Some(price)) => (name.clone(), price),
            (name, price) => {
                let product = self
                    .get(input.product_id)
                    .ok_or_else(|| AppError::product_not_found(input.product_id))?;
                (
                    name.clone().unwrap_or_else(|| product.name.clone()),
                    price.unwrap_or(product.price),
                )
            }
        };

        Ok(OrderItem {
            product_id: input.product_id,
            name,
            quantity: input.quantity,
            unit_price,
            modifiers: input.modifiers.clone(),
            notes: input.notes.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorCode;
    use std::io::Write;

    fn catalog() -> ProductCatalog {
        ProductCatalog::new(vec![
            Product::new(1, "Tinto", 2.5).with_category("Bebidas"),
            Product {
                is_active: false,
                ..Product::new(2, "Retired", 1.0)
            },
        ])
    }

    #[test]
    fn test_active_filter() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 2);
        let active = catalog.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Tinto");
    }

    #[test]
    fn test_resolve_item_fills_from_catalog() {
        let catalog = catalog();
        let item = catalog.resolve_item(&CreateOrderItem::new(1, 2)).unwrap();
        assert_eq!(item.name, "Tinto");
        assert_eq!(item.unit_price, 2.5);
        assert_eq!(item.quantity, 2);

        // explicit values win
        let mut input = CreateOrderItem::new(1, 1);
        input.unit_price = Some(3.0);
        assert_eq!(catalog.resolve_item(&input).unwrap().unit_price, 3.0);

        // unknown product is fine when the request is complete
        let mut input = CreateOrderItem::new(99, 1);
        input.name = Some("Special".into());
        input.unit_price = Some(10.0);
        assert_eq!(catalog.resolve_item(&input).unwrap().name, "Special");
    }

    #[test]
    fn test_resolve_unknown_product() {
        let err = catalog().resolve_item(&CreateOrderItem::new(99, 1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotFound);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id":7,"name":"Arepa","price":4.0}}]"#).unwrap();

        let catalog = ProductCatalog::load_from_file(file.path()).unwrap();
        assert_eq!(catalog.get(7).unwrap().name, "Arepa");

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "not json").unwrap();
        let err = ProductCatalog::load_from_file(bad.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
