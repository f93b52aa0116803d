//! Money calculation and order validation
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for serialization.

use rust_decimal::prelude::*;

use super::types::{Order, OrderItem, OrderType};
use crate::error::{AppError, ErrorCode};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("{} must be a finite number, got {}", field_name, value),
        ));
    }
    Ok(())
}

/// Validate a single order item
pub fn validate_item(item: &OrderItem) -> Result<(), AppError> {
    require_finite(item.unit_price, "unit_price")?;
    if item.unit_price < 0.0 || item.unit_price > MAX_PRICE {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            format!(
                "unit_price must be between 0 and {}, got {}",
                MAX_PRICE, item.unit_price
            ),
        )
        .with_detail("product_id", item.product_id));
    }

    if item.quantity <= 0 || item.quantity > MAX_QUANTITY {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!(
                "quantity must be between 1 and {}, got {}",
                MAX_QUANTITY, item.quantity
            ),
        )
        .with_detail("product_id", item.product_id));
    }

    for modifier in &item.modifiers {
        require_finite(modifier.price_delta, "modifier price_delta")?;
        if modifier.price_delta.abs() > MAX_PRICE {
            return Err(AppError::with_message(
                ErrorCode::ValueOutOfRange,
                format!(
                    "modifier price_delta exceeds maximum allowed, got {}",
                    modifier.price_delta
                ),
            ));
        }
    }

    Ok(())
}

/// Validate a whole order before it is stored or sent
pub fn validate_order(order: &Order) -> Result<(), AppError> {
    if order.items.is_empty() {
        return Err(AppError::new(ErrorCode::OrderEmpty).with_detail("order_id", order.id.clone()));
    }
    if order.order_type == OrderType::DineIn && order.table_number.is_none() {
        return Err(AppError::new(ErrorCode::OrderTableRequired)
            .with_detail("order_id", order.id.clone()));
    }
    order.items.iter().try_for_each(validate_item)
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

fn line_total_decimal(item: &OrderItem) -> Decimal {
    let unit: Decimal = to_decimal(item.unit_price)
        + item
            .modifiers
            .iter()
            .map(|m| to_decimal(m.price_delta))
            .sum::<Decimal>();
    unit * Decimal::from(item.quantity)
}

impl OrderItem {
    /// (单价 + 加料差价) × 数量
    pub fn line_total(&self) -> f64 {
        to_f64(line_total_decimal(self))
    }
}

impl Order {
    /// 订单合计
    pub fn total(&self) -> f64 {
        to_f64(self.items.iter().map(line_total_decimal).sum())
    }

    /// 校验订单, 见 [`validate_order`]
    pub fn validate(&self) -> Result<(), AppError> {
        validate_order(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Modifier;

    fn burger() -> OrderItem {
        OrderItem::new(1, "Burger", 2, 10.10)
            .with_modifier(Modifier::new("Extra cheese", 1.25))
            .with_modifier(Modifier::new("No pickles", 0.0))
    }

    #[test]
    fn test_line_total_includes_modifiers() {
        // (10.10 + 1.25) * 2 = 22.70
        assert_eq!(burger().line_total(), 22.70);
    }

    #[test]
    fn test_order_total_no_float_drift() {
        let items = vec![
            OrderItem::new(2, "Soda", 3, 0.1),
            OrderItem::new(3, "Water", 3, 0.2),
        ];
        let order = Order::new(OrderType::Takeout, items);
        assert_eq!(order.total(), 0.9);
    }

    #[test]
    fn test_negative_modifier() {
        let item = OrderItem::new(4, "Salad", 1, 8.0).with_modifier(Modifier::new("No egg", -1.5));
        assert_eq!(item.line_total(), 6.5);
    }

    #[test]
    fn test_validate_empty_order() {
        let order = Order::new(OrderType::Takeout, vec![]);
        let err = order.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);
    }

    #[test]
    fn test_validate_dine_in_requires_table() {
        let order = Order::new(OrderType::DineIn, vec![burger()]);
        assert_eq!(
            order.validate().unwrap_err().code,
            ErrorCode::OrderTableRequired
        );
        assert!(order.with_table(4).validate().is_ok());
    }

    #[test]
    fn test_validate_item_bounds() {
        let zero_qty = OrderItem::new(1, "Burger", 0, 5.0);
        assert_eq!(
            validate_item(&zero_qty).unwrap_err().code,
            ErrorCode::ValueOutOfRange
        );

        let bad_price = OrderItem::new(1, "Burger", 1, -1.0);
        assert_eq!(
            validate_item(&bad_price).unwrap_err().code,
            ErrorCode::ProductInvalidPrice
        );

        let nan_modifier =
            OrderItem::new(1, "Burger", 1, 5.0).with_modifier(Modifier::new("x", f64::NAN));
        assert!(validate_item(&nan_modifier).is_err());
    }
}
