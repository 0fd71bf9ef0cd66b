//! 批量会话处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量答题脚本的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、按需连接浏览器、创建考试服务客户端
//! 2. **批量加载**：扫描并加载所有待处理的答题脚本
//! 3. **并发控制**：使用 Semaphore 限制并发数量；监考模式强制串行
//! 4. **分批处理**：脚本分批执行，每批完成后再开始下一批
//! 5. **资源管理**：唯一持有 Browser 与 JsExecutor，确保生命周期正确
//! 6. **全局统计**：汇总所有会话的处理结果

use std::sync::Arc;

use anyhow::Result;
use chromiumoxide::Browser;
use tokio::sync::Semaphore;
use tracing::{error, warn};

use crate::browser;
use crate::clients::{ExamClient, ExamService};
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::models::{load_all_scripts, AttemptScript};
use crate::orchestrator::attempt_processor::{self, ProcessResult};
use crate::services::{BrowserSurface, FocusSurface, NoopSurface};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    service: Arc<dyn ExamService>,
    _browser: Option<Browser>,
    executor: Option<JsExecutor>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(&config);

        // 只有监考模式需要浏览器
        let (browser, executor) = if config.proctoring_enabled {
            let (browser, page) =
                browser::connect_to_exam_page(config.browser_debug_port, &config.exam_page_url)
                    .await?;
            (Some(browser), Some(JsExecutor::new(page)))
        } else {
            (None, None)
        };

        let service: Arc<dyn ExamService> = Arc::new(ExamClient::new(&config));

        Ok(Self { config, service, _browser: browser, executor })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let scripts = self.load_scripts().await?;

        if scripts.is_empty() {
            warn!("⚠️ 没有找到待处理的答题脚本，程序结束");
            return Ok(());
        }

        let total = scripts.len();
        // 监考模式共用一个页面，只能一场一场考
        let max_concurrent = if self.config.proctoring_enabled {
            1
        } else {
            self.config.max_concurrent_attempts.max(1)
        };
        logging::log_scripts_loaded(total, max_concurrent);

        let stats = self.process_all_attempts(scripts, max_concurrent).await?;

        logging::print_final_stats(
            stats.completed,
            stats.skipped,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );

        Ok(())
    }

    /// 加载答题脚本
    async fn load_scripts(&self) -> Result<Vec<AttemptScript>> {
        tracing::info!("\n📁 正在扫描待处理的答题脚本...");
        load_all_scripts(&self.config.script_folder).await
    }

    /// 处理所有脚本
    async fn process_all_attempts(
        &self,
        scripts: Vec<AttemptScript>,
        max_concurrent: usize,
    ) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = scripts.len();
        let mut stats = ProcessingStats { total, ..Default::default() };

        // 分批处理
        for batch_start in (0..total).step_by(max_concurrent) {
            let batch_end = (batch_start + max_concurrent).min(total);
            let batch_scripts = &scripts[batch_start..batch_end];
            let batch_num = (batch_start / max_concurrent) + 1;
            let total_batches = total.div_ceil(max_concurrent);

            logging::log_batch_start(batch_num, total_batches, batch_start + 1, batch_end, total);

            let batch_result =
                self.process_batch(batch_scripts, batch_start, semaphore.clone()).await?;

            stats.completed += batch_result.completed;
            stats.skipped += batch_result.skipped;
            stats.failed += batch_result.failed;

            logging::log_batch_complete(
                batch_num,
                batch_result.completed,
                batch_end - batch_start,
            );
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch_scripts: &[AttemptScript],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut batch_handles = Vec::new();

        for (idx, script) in batch_scripts.iter().enumerate() {
            let attempt_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;

            let service = self.service.clone();
            // 监考模式下各会话共享同一个页面（Page 内部是 Arc，可安全克隆）
            let surface: Box<dyn FocusSurface> = match &self.executor {
                Some(executor) => Box::new(BrowserSurface::new(executor.clone())),
                None => Box::new(NoopSurface),
            };
            let script_clone = script.clone();
            let config_clone = self.config.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                attempt_processor::process_attempt(
                    service,
                    surface,
                    script_clone,
                    attempt_index,
                    &config_clone,
                )
                .await
            });
            batch_handles.push((attempt_index, handle));
        }

        // 等待本批所有会话完成
        let mut result = BatchResult::default();

        for (attempt_index, handle) in batch_handles {
            match handle.await {
                Ok(Ok(ProcessResult::Completed)) => {
                    result.completed += 1;
                }
                Ok(Ok(ProcessResult::Skipped)) => {
                    result.skipped += 1;
                }
                Ok(Err(e)) => {
                    error!("[会话 {}] ❌ 处理过程中发生错误: {}", attempt_index, e);
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[会话 {}] 任务执行失败: {}", attempt_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    completed: usize,
    skipped: usize,
    failed: usize,
    total: usize,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    completed: usize,
    skipped: usize,
    failed: usize,
}
