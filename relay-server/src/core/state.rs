use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::catalog::ProductCatalog;
use crate::core::Config;
use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::orders::{OrderBook, OrderBookProcessor};
use crate::relay::{ConnectionSettings, MessageHandler, Relay};
use shared::AppResult;

/// 失效连接清理间隔
const SWEEP_INTERVAL_SECS: u64 = 60;

/// 服务器状态 - 持有所有组件的共享引用
///
/// 使用 Arc 实现浅拷贝，作为 axum 的 State 在处理器之间共享。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | relay | Relay | WebSocket 中继 |
/// | orders | Arc<OrderBook> | 内存订单簿 |
/// | catalog | Arc<ProductCatalog> | 商品目录 |
/// | shutdown | CancellationToken | 关闭信号 (连接任务和后台任务共用) |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub relay: Relay,
    pub orders: Arc<OrderBook>,
    pub catalog: Arc<ProductCatalog>,
    pub shutdown: CancellationToken,
    started_at: Instant,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 配置了 `PRODUCTS_FILE` 但加载失败时返回错误。
    pub fn initialize(config: &Config) -> AppResult<Self> {
        let catalog = match &config.products_file {
            Some(path) => ProductCatalog::load_from_file(path)?,
            None => {
                tracing::info!("PRODUCTS_FILE not set, product catalog is empty");
                ProductCatalog::default()
            }
        };
        Ok(Self::with_catalog(config, catalog))
    }

    /// 使用给定的商品目录创建状态
    pub fn with_catalog(config: &Config, catalog: ProductCatalog) -> Self {
        Self {
            config: config.clone(),
            relay: Relay::new(config.connection_queue_capacity),
            orders: Arc::new(OrderBook::new(config.history_limit)),
            catalog: Arc::new(catalog),
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            ping_interval: self.config.ws_ping_interval(),
            idle_timeout: self.config.ws_idle_timeout(),
        }
    }

    /// 启动后台任务: 订单簿监听 + 失效连接清理
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new(self.shutdown.child_token());

        let handler = MessageHandler::new(self.relay.subscribe())
            .register_processor(Arc::new(OrderBookProcessor::new(self.orders.clone())));
        let token = tasks.shutdown_token();
        tasks.spawn("order_book_tap", TaskKind::Listener, async move {
            handler.run(token).await;
        });

        let relay = self.relay.clone();
        let token = tasks.shutdown_token();
        tasks.spawn("connection_sweeper", TaskKind::Periodic, async move {
            let period = Duration::from_secs(SWEEP_INTERVAL_SECS);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let removed = relay.sweep_closed();
                        if removed > 0 {
                            tracing::info!(removed, "Swept stale connections");
                        }
                    }
                }
            }
        });

        tasks.log_summary();
        tasks
    }
}
