//! QuickSales Order Engine - 销售单草稿、编号与 Excel 导出
//!
//! # 架构概述
//!
//! - **草稿** (`drafts`): 最多 4 个并行编辑的订单标签页，带淘汰策略
//! - **编号** (`numbering`): 订单号模式渲染与按桶原子递增
//! - **模板** (`template`): 字段 → 单元格映射、校验、写入 xlsx 模板
//! - **导出** (`export`): 单张/批量导出、文件名生成、目标路径
//! - **订单** (`orders`): redb 存储、协作 trait、保存流程
//!
//! # 模块结构
//!
//! ```text
//! order-engine/src/
//! ├── core/          # 配置、错误、状态
//! ├── drafts/        # DraftArena
//! ├── numbering/     # NumberAllocator
//! ├── template/      # TemplateBinder
//! ├── export/        # ExportCoordinator
//! ├── orders/        # 存储、trait、OrderService
//! ├── order_money/   # 金额计算 (rust_decimal)
//! └── utils/         # 日志
//! ```

pub mod core;
pub mod drafts;
pub mod export;
pub mod numbering;
pub mod order_money;
pub mod orders;
pub mod template;
pub mod utils;

// Re-export 公共类型
pub use core::{
    ArenaError, Config, EngineError, EngineResult, EngineState, ValidationErrors, ValidationIssue,
};
pub use drafts::{DraftArena, EvictionPolicy};
pub use export::{ExportCoordinator, ExportOutcome};
pub use numbering::NumberAllocator;
pub use orders::{OrderService, OrderStorage};
pub use template::TemplateBinder;

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
