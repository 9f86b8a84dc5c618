use std::path::PathBuf;

/// 引擎配置 - 进程级配置项
///
/// 业务设置 (编号格式、导出目录、默认模板等) 保存在数据库的
/// `AppSettings` 中，这里只放启动时需要的路径与日志参数。
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./quicksales-data | 工作目录 |
/// | DB_FILE | quicksales.redb | 数据库文件 (相对 WORK_DIR) |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | (无) | 日志目录，设置后按天滚动写入文件 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/quicksales LOG_LEVEL=debug quicksales orders
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存放数据库、日志等文件
    pub work_dir: String,
    /// 数据库文件名或绝对路径
    pub db_file: String,
    /// 日志级别: trace | debug | info | warn | error
    pub log_level: String,
    /// 是否输出 JSON 日志
    pub log_json: bool,
    /// 日志目录
    pub log_dir: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./quicksales-data".into()),
            db_file: std::env::var("DB_FILE").unwrap_or_else(|_| "quicksales.redb".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, db_file: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.db_file = db_file.into();
        config
    }

    /// 数据库完整路径 (绝对路径的 DB_FILE 不拼接工作目录)
    pub fn db_path(&self) -> PathBuf {
        let file = PathBuf::from(&self.db_file);
        if file.is_absolute() {
            file
        } else {
            PathBuf::from(&self.work_dir).join(file)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
