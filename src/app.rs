//! 应用程序容器
//!
//! 负责依赖注入和生命周期管理

use crate::application::services::ReconciliationController;
use crate::config::AppConfig;
use crate::domain::repositories::SystemEnvironmentGateway;
use crate::infrastructure::memory::InMemoryGateway;
use crate::infrastructure::privilege;
use crate::infrastructure::registry::RegistryGateway;
use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};
use tracing::info;

/// 应用程序容器
pub struct Application {
    pub config: AppConfig,
    /// 差异协调控制器
    pub controller: Arc<ReconciliationController>,
    elevated: OnceLock<bool>,
}

impl Application {
    /// 创建应用程序实例
    ///
    /// dry-run 时从注册表读取一次，之后的提交只写入内存网关
    pub async fn new(config: AppConfig) -> Result<Self> {
        let registry: Arc<dyn SystemEnvironmentGateway> = Arc::new(RegistryGateway::new());

        let gateway: Arc<dyn SystemEnvironmentGateway> = if config.dry_run {
            let entries = registry
                .read_all()
                .await
                .context("dry-run 初始化时读取系统环境变量失败")?;
            info!(count = entries.len(), "dry-run: 使用内存网关");
            Arc::new(InMemoryGateway::new(entries))
        } else {
            registry
        };

        Ok(Self::with_gateway(config, gateway))
    }

    /// 使用指定网关创建（测试时注入内存网关）
    pub fn with_gateway(config: AppConfig, gateway: Arc<dyn SystemEnvironmentGateway>) -> Self {
        let controller = Arc::new(ReconciliationController::new(gateway));
        Self {
            config,
            controller,
            elevated: OnceLock::new(),
        }
    }

    /// 当前进程是否具有管理员权限（首次调用时检测）
    pub fn is_elevated(&self) -> bool {
        *self.elevated.get_or_init(privilege::is_elevated)
    }
}
