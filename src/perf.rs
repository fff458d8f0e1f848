// ==========================================
// 库存分配引擎 - 性能统计
// ==========================================
// 职责: 记录单次操作耗时与处理条数，超过阈值时告警
// 开关:
// - `INVENTORY_ASSIGN_SLOW_OP_MS=200` 配置慢操作阈值（毫秒，0 关闭）
// ==========================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub const SLOW_OP_ENV: &str = "INVENTORY_ASSIGN_SLOW_OP_MS";

static SLOW_OP_THRESHOLD_MS: AtomicU64 = AtomicU64::new(0);

/// 从环境变量读取慢操作阈值
///
/// Debug 默认 50ms；Release 默认 200ms
pub fn configure_from_env() {
    let slow_ms = std::env::var(SLOW_OP_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
    set_slow_threshold_ms(slow_ms);
}

pub fn set_slow_threshold_ms(ms: u64) {
    SLOW_OP_THRESHOLD_MS.store(ms, Ordering::Relaxed);
}

/// 性能统计 Guard：记录 elapsed_ms + 处理条数
///
/// 使用方式：
/// ```ignore
/// let mut perf = inventory_assign::perf::PerfGuard::new("calculate_waterfall");
/// // do work...
/// perf.set_items(records.len());
/// ```
pub struct PerfGuard {
    op: &'static str,
    start: Instant,
    items: usize,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            start: Instant::now(),
            items: 0,
        }
    }

    pub fn set_items(&mut self, items: usize) {
        self.items = items;
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_millis() as u64;

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms,
            items = self.items,
            "done"
        );

        let threshold = SLOW_OP_THRESHOLD_MS.load(Ordering::Relaxed);
        if threshold > 0 && elapsed_ms >= threshold {
            tracing::warn!(
                target: "perf",
                op = self.op,
                elapsed_ms,
                threshold_ms = threshold,
                "slow op"
            );
        }
    }
}
