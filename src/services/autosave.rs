//! 自动保存调度器 - 业务能力层
//!
//! 尾沿防抖：每次写入把落盘顺延一个静默间隔，输入不停则一直不保存。
//! 两个一等操作：touch（顺延）与 force_save（取消延时立即落盘）。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::models::SharedAttempt;
use crate::services::answer_cache::AnswerCache;
use crate::services::answer_store::SharedAnswerStore;

enum Command {
    /// 仓库有新写入，重置防抖计时
    Touch,
    /// 取消防抖立即保存，回报是否成功
    Flush(oneshot::Sender<bool>),
    /// 最后保存一次后退出
    Shutdown(oneshot::Sender<()>),
}

/// 调度器操作句柄，可克隆给各组件
#[derive(Clone)]
pub struct AutosaveHandle {
    tx: mpsc::UnboundedSender<Command>,
    flushes: Arc<AtomicU64>,
}

impl AutosaveHandle {
    /// 标记仓库变脏，重置防抖计时
    pub fn touch(&self) {
        let _ = self.tx.send(Command::Touch);
    }

    /// 取消防抖立即落盘
    ///
    /// 返回本次保存是否成功；调度器已退出时返回 false
    pub async fn force_save(&self) -> bool {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.await.unwrap_or(false)
    }

    /// 累计成功落盘次数
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

/// 自动保存调度器
///
/// 职责：
/// - 持有防抖计时，合并连续写入为一次落盘
/// - 只在会话进行中保存；终态会话直接跳过
/// - 保存失败只告警，下个周期全量快照自愈
pub struct AutosaveScheduler {
    handle: AutosaveHandle,
    worker: JoinHandle<()>,
}

impl AutosaveScheduler {
    /// 启动调度器后台任务
    pub fn spawn(
        attempt_id: impl Into<String>,
        store: SharedAnswerStore,
        attempt: SharedAttempt,
        cache: AnswerCache,
        debounce: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let flushes = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            attempt_id: attempt_id.into(),
            store,
            attempt,
            cache,
            debounce,
            last_flushed_revision: 0,
            flushes: flushes.clone(),
        };
        let worker = tokio::spawn(worker.run(rx));

        Self { handle: AutosaveHandle { tx, flushes }, worker }
    }

    pub fn handle(&self) -> AutosaveHandle {
        self.handle.clone()
    }

    /// 最后保存一次并停止调度器
    pub async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.handle.tx.send(Command::Shutdown(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
        let _ = self.worker.await;
    }
}

struct Worker {
    attempt_id: String,
    store: SharedAnswerStore,
    attempt: SharedAttempt,
    cache: AnswerCache,
    debounce: Duration,
    last_flushed_revision: u64,
    flushes: Arc<AtomicU64>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let mut deadline: Option<Instant> = None;

        loop {
            // 复制到本地，避免 select 分支借用冲突
            let pending = deadline;

            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Touch) => {
                        deadline = Some(Instant::now() + self.debounce);
                    }
                    Some(Command::Flush(ack)) => {
                        deadline = None;
                        let ok = self.save().await;
                        let _ = ack.send(ok);
                    }
                    Some(Command::Shutdown(ack)) => {
                        deadline = None;
                        self.save().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => break,
                },
                _ = async { sleep_until(pending.unwrap_or_else(Instant::now)).await }, if pending.is_some() => {
                    deadline = None;
                    self.save().await;
                }
            }
        }
    }

    /// 落盘一次，返回是否成功
    ///
    /// 快照未变化或会话非进行中时跳过（视为成功）
    async fn save(&mut self) -> bool {
        let in_progress = {
            let attempt = self.attempt.lock().unwrap_or_else(|e| e.into_inner());
            attempt.is_in_progress()
        };
        if !in_progress {
            debug!("会话已结束，跳过自动保存");
            return true;
        }

        let (revision, snapshot) = {
            let store = self.store.lock().unwrap_or_else(|e| e.into_inner());
            (store.revision(), store.snapshot())
        };

        if revision == self.last_flushed_revision {
            debug!("答案无变化，跳过自动保存");
            return true;
        }

        match self.cache.save(&self.attempt_id, &snapshot).await {
            Ok(()) => {
                self.last_flushed_revision = revision;
                self.flushes.fetch_add(1, Ordering::Relaxed);
                debug!("自动保存完成 ({} 条答案)", snapshot.len());
                true
            }
            Err(e) => {
                warn!("⚠️ 自动保存失败: {}，清理历史缓存后重试", e);

                // 自救：清掉其他会话的缓存再试一次
                if let Err(purge_err) = self.cache.purge_others(&self.attempt_id).await {
                    warn!("清理历史缓存失败: {}", purge_err);
                }

                match self.cache.save(&self.attempt_id, &snapshot).await {
                    Ok(()) => {
                        self.last_flushed_revision = revision;
                        self.flushes.fetch_add(1, Ordering::Relaxed);
                        true
                    }
                    Err(retry_err) => {
                        // 不更新修订号，下个防抖周期自动重试
                        warn!("⚠️ 重试保存仍失败: {}", retry_err);
                        false
                    }
                }
            }
        }
    }
}
