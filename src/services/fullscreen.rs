//! 全屏监考守卫 - 业务能力层
//!
//! 全屏是浏览器才有的能力，这里抽象成"专注面"接口：
//! 浏览器实现走 CDP 执行 Fullscreen API，无浏览器环境用空实现。

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::infrastructure::JsExecutor;

/// 专注面能力
///
/// enter 返回 false 表示环境拒绝（如浏览器未授权），调用方静默接受
#[async_trait]
pub trait FocusSurface: Send + Sync {
    async fn enter(&self) -> Result<bool>;
    async fn exit(&self) -> Result<()>;
    async fn is_active(&self) -> Result<bool>;
}

/// 浏览器全屏实现
///
/// 通过 JsExecutor 在考试页面上调用 Fullscreen API
pub struct BrowserSurface {
    executor: JsExecutor,
}

impl BrowserSurface {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl FocusSurface for BrowserSurface {
    async fn enter(&self) -> Result<bool> {
        let js_code = r#"
            (async () => {
                try {
                    await document.documentElement.requestFullscreen();
                    return true;
                } catch (err) {
                    console.warn("requestFullscreen 被拒绝:", err);
                    return false;
                }
            })()
        "#;
        self.executor.eval_bool(js_code).await
    }

    async fn exit(&self) -> Result<()> {
        let js_code = r#"
            (async () => {
                if (document.fullscreenElement) {
                    await document.exitFullscreen();
                }
                return true;
            })()
        "#;
        self.executor.eval(js_code).await?;
        Ok(())
    }

    async fn is_active(&self) -> Result<bool> {
        self.executor.eval_bool("document.fullscreenElement !== null").await
    }
}

/// 空实现：无浏览器环境下全屏不可用
pub struct NoopSurface;

#[async_trait]
impl FocusSurface for NoopSurface {
    async fn enter(&self) -> Result<bool> {
        Ok(false)
    }

    async fn exit(&self) -> Result<()> {
        Ok(())
    }

    async fn is_active(&self) -> Result<bool> {
        Ok(false)
    }
}

/// 守卫状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// 未进入全屏
    NotFullscreen,
    /// 全屏中
    Fullscreen,
    /// 检测到非自愿退出，等待确认
    ExitPendingConfirmation,
}

/// 全屏监考守卫
///
/// 职责：
/// - 题目就绪后自动尝试进入全屏，整场只尝试一次，被拒不重试
/// - 轮询检测非自愿退出（ESC / 外部切换），转入待确认状态
/// - 会话完成后主动退出；收尾时无条件释放
pub struct FullscreenGuard {
    surface: Box<dyn FocusSurface>,
    state: GuardState,
    entry_attempted: bool,
}

impl FullscreenGuard {
    pub fn new(surface: Box<dyn FocusSurface>) -> Self {
        Self { surface, state: GuardState::NotFullscreen, entry_attempted: false }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// 首次尝试进入全屏
    ///
    /// 只在第一次调用时真正执行；拒绝与失败都静默接受
    pub async fn enter_once(&mut self) {
        if self.entry_attempted {
            return;
        }
        self.entry_attempted = true;

        match self.surface.enter().await {
            Ok(true) => {
                info!("✓ 已进入全屏模式");
                self.state = GuardState::Fullscreen;
            }
            Ok(false) => {
                debug!("环境未授权全屏，继续无全屏作答");
            }
            Err(e) => {
                warn!("进入全屏失败: {}，继续无全屏作答", e);
            }
        }
    }

    /// 轮询检测非自愿退出
    ///
    /// 全屏中发现实际已退出时转入待确认状态
    pub async fn check(&mut self) -> GuardState {
        if self.state == GuardState::Fullscreen {
            match self.surface.is_active().await {
                Ok(true) => {}
                Ok(false) => {
                    warn!("⚠️ 检测到退出全屏，等待确认");
                    self.state = GuardState::ExitPendingConfirmation;
                }
                Err(e) => {
                    debug!("全屏状态检测失败: {}", e);
                }
            }
        }
        self.state
    }

    /// 处理待确认的退出
    ///
    /// confirm 为 true 表示确认离开（保持退出状态）；
    /// false 表示取消离开，重新进入全屏
    pub async fn resolve_exit(&mut self, confirm: bool) {
        if self.state != GuardState::ExitPendingConfirmation {
            return;
        }

        if confirm {
            info!("已确认离开全屏");
            self.state = GuardState::NotFullscreen;
            return;
        }

        match self.surface.enter().await {
            Ok(true) => {
                info!("✓ 已重新进入全屏");
                self.state = GuardState::Fullscreen;
            }
            Ok(false) | Err(_) => {
                debug!("重新进入全屏未成功");
                self.state = GuardState::NotFullscreen;
            }
        }
    }

    /// 会话完成，主动退出全屏（无需确认）
    pub async fn complete(&mut self) {
        if self.state != GuardState::NotFullscreen {
            if let Err(e) = self.surface.exit().await {
                debug!("退出全屏失败: {}", e);
            }
            self.state = GuardState::NotFullscreen;
        }
    }

    /// 收尾：无论处于什么状态都释放全屏
    pub async fn release(&mut self) {
        if let Err(e) = self.surface.exit().await {
            debug!("释放全屏失败: {}", e);
        }
        self.state = GuardState::NotFullscreen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 可编排的专注面桩实现
    #[derive(Clone, Default)]
    struct MockSurface {
        inner: Arc<MockInner>,
    }

    #[derive(Default)]
    struct MockInner {
        enters: AtomicUsize,
        exits: AtomicUsize,
        deny_enter: AtomicBool,
        active: AtomicBool,
    }

    impl MockSurface {
        fn deny_enter(&self) {
            self.inner.deny_enter.store(true, Ordering::SeqCst);
        }

        fn force_inactive(&self) {
            self.inner.active.store(false, Ordering::SeqCst);
        }

        fn enters(&self) -> usize {
            self.inner.enters.load(Ordering::SeqCst)
        }

        fn exits(&self) -> usize {
            self.inner.exits.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FocusSurface for MockSurface {
        async fn enter(&self) -> Result<bool> {
            self.inner.enters.fetch_add(1, Ordering::SeqCst);
            if self.inner.deny_enter.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.inner.active.store(true, Ordering::SeqCst);
            Ok(true)
        }

        async fn exit(&self) -> Result<()> {
            self.inner.exits.fetch_add(1, Ordering::SeqCst);
            self.inner.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn is_active(&self) -> Result<bool> {
            Ok(self.inner.active.load(Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn entry_is_attempted_only_once() {
        let surface = MockSurface::default();
        let mut guard = FullscreenGuard::new(Box::new(surface.clone()));

        guard.enter_once().await;
        guard.enter_once().await;
        guard.enter_once().await;

        assert_eq!(surface.enters(), 1);
        assert_eq!(guard.state(), GuardState::Fullscreen);
    }

    #[tokio::test]
    async fn denial_is_tolerated() {
        let surface = MockSurface::default();
        surface.deny_enter();
        let mut guard = FullscreenGuard::new(Box::new(surface.clone()));

        guard.enter_once().await;

        assert_eq!(guard.state(), GuardState::NotFullscreen);
        // 被拒后不重试
        guard.enter_once().await;
        assert_eq!(surface.enters(), 1);
    }

    #[tokio::test]
    async fn involuntary_exit_waits_for_confirmation() {
        let surface = MockSurface::default();
        let mut guard = FullscreenGuard::new(Box::new(surface.clone()));
        guard.enter_once().await;

        // 模拟 ESC 退出
        surface.force_inactive();
        assert_eq!(guard.check().await, GuardState::ExitPendingConfirmation);

        // 取消离开 → 重新进入全屏
        guard.resolve_exit(false).await;
        assert_eq!(guard.state(), GuardState::Fullscreen);
        assert_eq!(surface.enters(), 2);

        // 再次退出并确认离开 → 保持退出
        surface.force_inactive();
        guard.check().await;
        guard.resolve_exit(true).await;
        assert_eq!(guard.state(), GuardState::NotFullscreen);
        assert_eq!(surface.enters(), 2);
    }

    #[tokio::test]
    async fn completion_exits_without_confirmation() {
        let surface = MockSurface::default();
        let mut guard = FullscreenGuard::new(Box::new(surface.clone()));
        guard.enter_once().await;

        guard.complete().await;

        assert_eq!(guard.state(), GuardState::NotFullscreen);
        assert_eq!(surface.exits(), 1);
    }

    #[tokio::test]
    async fn release_exits_even_while_pending_confirmation() {
        let surface = MockSurface::default();
        let mut guard = FullscreenGuard::new(Box::new(surface.clone()));
        guard.enter_once().await;

        surface.force_inactive();
        guard.check().await;
        assert_eq!(guard.state(), GuardState::ExitPendingConfirmation);

        guard.release().await;
        assert_eq!(guard.state(), GuardState::NotFullscreen);
        assert_eq!(surface.exits(), 1);
    }
}
