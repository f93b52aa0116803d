//! Shared types for the POS order relay
//!
//! Types used by both `relay-server` and `relay-client`: the WebSocket
//! envelope, order and product models, the unified error type and a few
//! utilities.

pub mod error;
pub mod message;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use message::{ClientRole, Envelope, MessageType, StatusUpdate};
pub use models::{ConnectionCounts, HealthResponse, Product};
pub use order::{
    CreateOrderItem, CreateOrderRequest, Modifier, Order, OrderItem, OrderStatus, OrderType,
    UpdateStatusRequest,
};
