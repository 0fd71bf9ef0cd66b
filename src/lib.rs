//! # Take Exam Submit
//!
//! 一个用于自动化答题并提交考试的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个模块只管一件事
//! - `AnswerStore` - 会话内答案的唯一权威仓库
//! - `AutosaveScheduler` - 防抖自动保存（可取消的延时任务）
//! - `AnswerCache` - 按会话落盘的答案缓存，崩溃后可恢复
//! - `ExamTimer` - 由服务端开始时刻推导的考试计时
//! - `FullscreenGuard` - 全屏监考守卫（浏览器 / 空实现可换）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次会话"的完整生命周期
//! - `AttemptCtx` - 上下文封装（attempt_id + exam_id）
//! - `SubmissionCoordinator` - 整卷提交协调（防重入 + 到时闩锁）
//! - `AttemptFlow` - 流程编排（开始 → 恢复 → 作答 → 提交）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量脚本处理器，管理资源和并发
//! - `orchestrator/attempt_processor` - 单个会话处理器
//!
//! ## 模块结构

pub mod browser;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_exam_page;
pub use clients::{ExamClient, ExamService};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::JsExecutor;
pub use models::{Answer, AttemptScript, ExamAttempt, Question};
pub use orchestrator::{process_attempt, App};
pub use services::{AnswerCache, AnswerStore, AutosaveScheduler, ExamTimer, FullscreenGuard};
pub use workflow::{AttemptCtx, AttemptFlow, SubmissionCoordinator};
