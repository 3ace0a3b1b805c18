//! 剪贴板所有权变化监听
//!
//! 基于 `clipboard-master` 在后台线程监听系统剪贴板，节流后把
//! `Selection::Clipboard` 事件送入 tokio 通道。
//!
//! - 节流：两次转发间隔不小于 `clipboard-event-min-interval-ms`，
//!   间隔内的变化由尾沿补发线程合并为一次。
//! - 重启：`Master` 退出或创建失败时按指数退避重启。
//! - 停止：置位停止标志后，监听线程在下一次回调时返回 `CallbackResult::Stop`。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use clipboard_master::{CallbackResult, ClipboardHandler, Master};
use tokio::sync::mpsc;

use super::backend::Selection;

pub const CLIPBOARD_EVENT_MIN_INTERVAL_DEFAULT_MS: u64 = 80;
const CLIPBOARD_EVENT_MIN_INTERVAL_MIN_MS: u64 = 20;
const CLIPBOARD_EVENT_MIN_INTERVAL_MAX_MS: u64 = 5_000;
const MONITOR_RESTART_BASE_DELAY_MS: u64 = 100;
const MONITOR_RESTART_MAX_DELAY_MS: u64 = 5_000;

pub fn normalize_clipboard_event_min_interval_ms(value_ms: u64) -> u64 {
    value_ms.clamp(
        CLIPBOARD_EVENT_MIN_INTERVAL_MIN_MS,
        CLIPBOARD_EVENT_MIN_INTERVAL_MAX_MS,
    )
}

fn compute_restart_backoff_ms(restart_attempt: u32) -> u64 {
    let exp = 1_u64 << restart_attempt.saturating_sub(1).min(6);
    MONITOR_RESTART_BASE_DELAY_MS
        .saturating_mul(exp)
        .min(MONITOR_RESTART_MAX_DELAY_MS)
}

fn debounce_remaining(elapsed: Duration, min_interval: Duration) -> Option<Duration> {
    if elapsed >= min_interval {
        None
    } else {
        Some(min_interval - elapsed)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum DebounceDecision {
    EmitNow,
    Throttle {
        remaining: Duration,
        start_tail_worker: bool,
    },
}

fn decide_debounce_action(
    elapsed: Duration,
    min_interval: Duration,
    tail_worker_running: bool,
) -> DebounceDecision {
    match debounce_remaining(elapsed, min_interval) {
        Some(remaining) => DebounceDecision::Throttle {
            remaining,
            start_tail_worker: !tail_worker_running,
        },
        None => DebounceDecision::EmitNow,
    }
}

#[derive(Debug, Default)]
struct DebounceState {
    last_emit_at: Option<Instant>,
    pending_change: bool,
    tail_worker_running: bool,
}

/// 监听线程与各尾沿线程共享的状态
struct Shared {
    tx: mpsc::UnboundedSender<Selection>,
    stop: Arc<AtomicBool>,
    min_interval_ms: AtomicU64,
    debounce: Mutex<DebounceState>,
}

impl Shared {
    fn debounce(&self) -> MutexGuard<'_, DebounceState> {
        match self.debounce.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("剪贴板节流状态锁中毒，继续使用恢复数据");
                poisoned.into_inner()
            }
        }
    }

    fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms.load(Ordering::Relaxed))
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// 转发一次所有权变化；接收端已关闭时置位停止标志
    fn emit(&self) {
        if self.tx.send(Selection::Clipboard).is_err() {
            log::debug!("📋 事件接收端已关闭，监听将停止");
            self.stop.store(true, Ordering::SeqCst);
        }
    }
}

/// 剪贴板事件处理器（内部实现）
struct Handler {
    shared: Arc<Shared>,
}

impl Handler {
    fn spawn_tail_worker(&self, initial_wait: Duration) {
        let shared = Arc::clone(&self.shared);

        thread::spawn(move || {
            let mut wait_for = initial_wait;

            loop {
                if !wait_for.is_zero() {
                    thread::sleep(wait_for);
                }

                let now = Instant::now();
                let min_interval = shared.min_interval();

                {
                    let mut state = shared.debounce();

                    if !state.pending_change || shared.stopped() {
                        state.tail_worker_running = false;
                        break;
                    }

                    let elapsed = state
                        .last_emit_at
                        .map(|last| now.saturating_duration_since(last))
                        .unwrap_or(min_interval);

                    if let Some(remaining) = debounce_remaining(elapsed, min_interval) {
                        wait_for = remaining;
                        continue;
                    }

                    state.pending_change = false;
                    state.last_emit_at = Some(now);
                    state.tail_worker_running = false;
                }

                shared.emit();
                break;
            }
        });
    }
}

impl ClipboardHandler for Handler {
    fn on_clipboard_change(&mut self) -> CallbackResult {
        if self.shared.stopped() {
            return CallbackResult::Stop;
        }

        let now = Instant::now();
        let min_interval = self.shared.min_interval();
        let mut emit_now = false;
        let mut schedule_tail_wait = None;

        {
            let mut state = self.shared.debounce();

            let elapsed = state
                .last_emit_at
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or(min_interval);

            match decide_debounce_action(elapsed, min_interval, state.tail_worker_running) {
                DebounceDecision::Throttle {
                    remaining,
                    start_tail_worker,
                } => {
                    state.pending_change = true;
                    if start_tail_worker {
                        state.tail_worker_running = true;
                        schedule_tail_wait = Some(remaining);
                    }
                    log::trace!(
                        "⏱️ 剪贴板变化事件节流：{}ms < {}ms（尾沿补发）",
                        elapsed.as_millis(),
                        min_interval.as_millis()
                    );
                }
                DebounceDecision::EmitNow => {
                    state.last_emit_at = Some(now);
                    state.pending_change = false;
                    emit_now = true;
                }
            }
        }

        if let Some(wait_for) = schedule_tail_wait {
            self.spawn_tail_worker(wait_for);
        }

        if emit_now {
            self.shared.emit();
        }

        if self.shared.stopped() {
            CallbackResult::Stop
        } else {
            CallbackResult::Next
        }
    }

    fn on_clipboard_error(&mut self, error: std::io::Error) -> CallbackResult {
        log::error!("剪贴板错误：{}", error);
        CallbackResult::Next
    }
}

/// 在后台线程启动剪贴板监听
///
/// # 参数
/// * `min_interval_ms` - 事件最小转发间隔，超出范围时被钳制
///
/// # 返回
/// 事件接收端与停止标志；置位标志后监听线程不再重启
pub fn start_monitoring(min_interval_ms: u64) -> (mpsc::UnboundedReceiver<Selection>, Arc<AtomicBool>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));
    let normalized = normalize_clipboard_event_min_interval_ms(min_interval_ms);
    log::debug!("📋 剪贴板监听节流间隔: {}ms", normalized);

    let shared = Arc::new(Shared {
        tx,
        stop: Arc::clone(&stop),
        min_interval_ms: AtomicU64::new(normalized),
        debounce: Mutex::new(DebounceState::default()),
    });

    thread::spawn(move || {
        let mut restart_attempt: u32 = 0;
        while !shared.stopped() {
            let handler = Handler {
                shared: Arc::clone(&shared),
            };
            match Master::new(handler) {
                Ok(mut master) => {
                    restart_attempt = 0;
                    log::info!("📋 剪贴板监听已启动");
                    let outcome = master.run();
                    if shared.stopped() {
                        break;
                    }
                    match outcome {
                        Ok(()) => log::warn!("📋 剪贴板监听已退出，将尝试重启"),
                        Err(err) => log::warn!("📋 剪贴板监听异常退出: {}，将尝试重启", err),
                    }
                }
                Err(err) => {
                    log::error!("📋 创建剪贴板监听失败: {}", err);
                }
            }

            restart_attempt = restart_attempt.saturating_add(1);
            let backoff_ms = compute_restart_backoff_ms(restart_attempt);
            log::warn!("📋 剪贴板监听 {}ms 后重试（attempt={}）", backoff_ms, restart_attempt);
            thread::sleep(Duration::from_millis(backoff_ms));
        }
        log::info!("📋 剪贴板监听已停止");
    });

    (rx, stop)
}
