//! POS Order Relay Server - 餐厅本地订单同步中继
//!
//! # 架构概述
//!
//! POS、厨房看板和点餐端都连接到本地中继：
//!
//! - **中继** (`relay`): WebSocket Hub，按角色 (kitchen / waiter) 把消息转发给互补角色
//! - **订单簿** (`orders`): 旁路记录经过中继的订单，供 HTTP 客户端重连后拉取
//! - **商品目录** (`catalog`): 从 JSON 文件加载，POS 下单时补全明细
//! - **HTTP API** (`api`): 健康检查、商品、下单、改状态、WebSocket 入口
//!
//! # 模块结构
//!
//! ```text
//! relay-server/src/
//! ├── core/          # 配置、状态、服务器、后台任务
//! ├── api/           # HTTP 路由和处理器
//! ├── relay/         # WebSocket 中继
//! ├── orders/        # 内存订单簿
//! ├── catalog/       # 商品目录
//! └── utils/         # 日志、错误类型
//! ```

pub mod api;
pub mod catalog;
pub mod core;
pub mod orders;
pub mod relay;
pub mod utils;

// Re-export 公共类型
pub use catalog::ProductCatalog;
pub use core::{Config, Server, ServerError, ServerState};
pub use orders::OrderBook;
pub use relay::Relay;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env，创建工作目录，初始化日志
pub fn setup_environment() -> Result<Config, ServerError> {
    // .env 不存在时忽略
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir).map_err(|e| {
        ServerError::Config(format!("Failed to create work dir {}: {}", config.work_dir, e))
    })?;

    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
    ____  ____  _____    ____       __
   / __ \/ __ \/ ___/   / __ \___  / /___ ___  __
  / /_/ / / / /\__ \   / /_/ / _ \/ / __ `/ / / /
 / ____/ /_/ /___/ /  / _, _/  __/ / /_/ / /_/ /
/_/    \____//____/  /_/ |_|\___/_/\__,_/\__, /
                                        /____/
    "#
    );
}
