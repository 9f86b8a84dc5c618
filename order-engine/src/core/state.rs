use std::sync::Arc;

use crate::core::{Config, EngineResult};
use crate::export::ExportCoordinator;
use crate::numbering::NumberAllocator;
use crate::orders::{DestinationPrompt, OrderService, OrderStorage};

/// 引擎状态 - 持有存储与服务的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | storage | Arc<OrderStorage> | redb 存储 (订单、模板、设置、序号) |
/// | service | OrderService | 保存与导出流程 |
///
/// 同一个 `OrderStorage` 同时充当记录存储、设置、模板与序号源。
#[derive(Clone, Debug)]
pub struct EngineState {
    pub config: Config,
    pub storage: Arc<OrderStorage>,
    pub service: OrderService,
}

impl EngineState {
    /// 打开数据库并组装服务
    ///
    /// 会先创建工作目录。
    pub fn initialize(config: &Config, prompt: Arc<dyn DestinationPrompt>) -> EngineResult<Self> {
        std::fs::create_dir_all(&config.work_dir)?;
        let storage = Arc::new(OrderStorage::open(config.db_path())?);
        tracing::info!(db = %config.db_path().display(), "Order storage opened");
        Ok(Self::with_storage(config.clone(), storage, prompt))
    }

    /// 使用已打开的存储组装服务 (测试使用内存数据库)
    pub fn with_storage(
        config: Config,
        storage: Arc<OrderStorage>,
        prompt: Arc<dyn DestinationPrompt>,
    ) -> Self {
        let exporter = ExportCoordinator::new(storage.clone(), storage.clone(), prompt);
        let service = OrderService::new(
            storage.clone(),
            storage.clone(),
            NumberAllocator::new(storage.clone()),
            exporter,
        );
        Self {
            config,
            storage,
            service,
        }
    }
}
