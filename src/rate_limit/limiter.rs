use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::models::{RateLimiterOptions, RequestRecord};
use crate::clock::{Clock, SystemClock};

/// 滑动窗口限流器
///
/// 每个标识（用户 ID、IP、API Key 摘要等）保存窗口内的请求记录。
/// 检查与记录在同一个分片锁内完成，同一标识的并发调用不会超发。
///
/// 过期记录在访问时清理，长期不访问的标识需要 [`RateLimiter::cleanup`]
/// 或 [`RateLimiter::spawn_cleanup_loop`] 定期回收。
pub struct RateLimiter<C: Clock = SystemClock> {
    options: RateLimiterOptions,
    clock: C,
    records: DashMap<String, Vec<RequestRecord>>,
}

impl RateLimiter<SystemClock> {
    pub fn new(options: RateLimiterOptions) -> Self {
        Self::with_clock(options, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(options: RateLimiterOptions, clock: C) -> Self {
        Self {
            options,
            clock,
            records: DashMap::new(),
        }
    }

    pub fn options(&self) -> &RateLimiterOptions {
        &self.options
    }

    fn window_ms(&self) -> i64 {
        i64::try_from(self.options.window_ms).unwrap_or(i64::MAX)
    }

    fn window_start(&self, now: i64) -> i64 {
        now.saturating_sub(self.window_ms())
    }

    /// 窗口内计入限额的请求数
    fn counted(&self, records: &[RequestRecord], window_start: i64) -> usize {
        records
            .iter()
            .filter(|r| r.timestamp > window_start && self.options.counts(r))
            .count()
    }

    /// 判断请求是否放行，放行时记录本次请求
    ///
    /// 超限时返回 `false` 且不记录本次尝试。
    pub fn is_allowed(&self, identifier: &str, is_success: bool) -> bool {
        self.acquire(identifier, is_success).is_some()
    }

    /// 等同于 `is_allowed(identifier, true)`
    pub fn check(&self, identifier: &str) -> bool {
        self.is_allowed(identifier, true)
    }

    /// 与 `check` 相同，放行时同时返回记录后的剩余次数
    ///
    /// 剩余次数与放行判断在同一把锁内计算，并发请求各自拿到不同的值。
    pub fn check_with_remaining(&self, identifier: &str) -> Option<u32> {
        self.acquire(identifier, true)
    }

    fn acquire(&self, identifier: &str, is_success: bool) -> Option<u32> {
        let now = self.clock.now_ms();
        let window_start = self.window_start(now);

        let mut history = self.records.entry(identifier.to_string()).or_default();
        history.retain(|r| r.timestamp > window_start);

        if self.counted(&history, window_start) >= self.options.max_requests as usize {
            return None;
        }

        history.push(RequestRecord {
            timestamp: now,
            success: is_success,
        });
        Some(self.remaining_of(&history, window_start))
    }

    fn remaining_of(&self, records: &[RequestRecord], window_start: i64) -> u32 {
        let used = self.counted(records, window_start);
        self.options
            .max_requests
            .saturating_sub(u32::try_from(used).unwrap_or(u32::MAX))
    }

    /// 窗口内剩余可用次数，不修改状态
    pub fn remaining_requests(&self, identifier: &str) -> u32 {
        let window_start = self.window_start(self.clock.now_ms());
        self.records
            .get(identifier)
            .map(|history| self.remaining_of(&history, window_start))
            .unwrap_or(self.options.max_requests)
    }

    /// 最早一条记录移出窗口的时间（Unix 毫秒）
    ///
    /// 没有任何记录时返回 `0`，表示“无历史”，不代表“已经重置”。
    pub fn reset_time(&self, identifier: &str) -> i64 {
        self.records
            .get(identifier)
            .and_then(|history| history.iter().map(|r| r.timestamp).min())
            .map(|oldest| oldest.saturating_add(self.window_ms()))
            .unwrap_or(0)
    }

    /// 距离 `reset_time` 还有多少毫秒，没有历史时为 0
    pub fn retry_after_ms(&self, identifier: &str) -> u64 {
        match self.reset_time(identifier) {
            0 => 0,
            reset_at => u64::try_from(reset_at.saturating_sub(self.clock.now_ms())).unwrap_or(0),
        }
    }

    /// 清除指定标识的记录，传 `None` 清除全部
    pub fn clear(&self, identifier: Option<&str>) {
        match identifier {
            Some(id) => {
                self.records.remove(id);
            }
            None => self.records.clear(),
        }
    }

    /// 清理窗口外的记录，并移除没有剩余记录的标识
    ///
    /// 返回被移除的标识数量。
    pub fn cleanup(&self) -> usize {
        let window_start = self.window_start(self.clock.now_ms());
        let mut removed = 0;

        self.records.retain(|_, history| {
            history.retain(|r| r.timestamp > window_start);
            if history.is_empty() {
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// 当前保存了记录的标识数量
    pub fn tracked_identifiers(&self) -> usize {
        self.records.len()
    }
}

impl<C: Clock + 'static> RateLimiter<C> {
    /// 启动定期清理任务
    ///
    /// 任务只持有弱引用，限流器被释放后自动退出。
    pub fn spawn_cleanup_loop(self: Arc<Self>, name: &'static str, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self);
        drop(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即返回
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    tracing::debug!("Rate limiter {} dropped, stopping cleanup loop", name);
                    break;
                };

                let removed = limiter.cleanup();
                if removed > 0 {
                    tracing::debug!(
                        "Rate limiter {} cleanup removed {} identifiers, {} remaining",
                        name,
                        removed,
                        limiter.tracked_identifiers()
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::clock::ManualClock;

    fn limiter(window_ms: u64, max: u32) -> (RateLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let limiter = RateLimiter::with_clock(RateLimiterOptions::new(window_ms, max), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn allows_exactly_max_requests_within_window() {
        let (limiter, clock) = limiter(60_000, 3);

        for _ in 0..3 {
            assert!(limiter.check("farmer-1"));
            clock.advance(10);
        }
        assert!(!limiter.check("farmer-1"));
        assert!(!limiter.check("farmer-1"));
    }

    #[test]
    fn rejected_attempts_are_not_recorded() {
        let (limiter, clock) = limiter(1_000, 1);

        assert!(limiter.check("ip"));
        clock.advance(500);
        assert!(!limiter.check("ip"));
        // 如果被拒绝的请求也被记录，这里 1001ms 后仍会被拒绝
        clock.advance(501);
        assert!(limiter.check("ip"));
    }

    #[test]
    fn exhausted_identifier_recovers_after_window() {
        let (limiter, clock) = limiter(1_000, 2);

        assert!(limiter.check("agent"));
        assert!(limiter.check("agent"));
        assert!(!limiter.check("agent"));

        clock.advance(1_000);
        assert!(limiter.check("agent"));
    }

    #[test]
    fn remaining_requests_decreases_by_one_and_never_negative() {
        let (limiter, _clock) = limiter(60_000, 3);

        assert_eq!(limiter.remaining_requests("u"), 3);
        assert!(limiter.check("u"));
        assert_eq!(limiter.remaining_requests("u"), 2);
        assert!(limiter.check("u"));
        assert_eq!(limiter.remaining_requests("u"), 1);
        assert!(limiter.check("u"));
        assert_eq!(limiter.remaining_requests("u"), 0);
        assert!(!limiter.check("u"));
        assert_eq!(limiter.remaining_requests("u"), 0);
    }

    #[test]
    fn remaining_requests_does_not_record() {
        let (limiter, _clock) = limiter(60_000, 1);

        for _ in 0..5 {
            assert_eq!(limiter.remaining_requests("u"), 1);
        }
        assert_eq!(limiter.tracked_identifiers(), 0);
        assert!(limiter.check("u"));
    }

    #[test]
    fn check_with_remaining_reports_quota_after_recording() {
        let (limiter, _clock) = limiter(60_000, 2);

        assert_eq!(limiter.check_with_remaining("u"), Some(1));
        assert_eq!(limiter.check_with_remaining("u"), Some(0));
        assert_eq!(limiter.check_with_remaining("u"), None);
        assert_eq!(limiter.remaining_requests("u"), 0);
    }

    #[test]
    fn concurrent_checks_on_one_identifier_never_exceed_limit() {
        let (limiter, _clock) = limiter(60_000, 50);
        let allowed = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        if limiter.check("x") {
                            allowed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(allowed.load(Ordering::SeqCst), 50);
        assert_eq!(limiter.remaining_requests("x"), 0);
    }

    #[test]
    fn concurrent_checks_each_see_a_distinct_remaining_count() {
        let (limiter, _clock) = limiter(60_000, 50);
        let limiter = &limiter;

        let mut seen: Vec<u32> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(move || {
                        (0..20)
                            .filter_map(|_| limiter.check_with_remaining("x"))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap())
                .collect()
        });

        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<u32>>());
    }

    #[test]
    fn unknown_identifier_has_full_quota() {
        let (limiter, _clock) = limiter(60_000, 5);

        assert_eq!(limiter.remaining_requests("nobody"), 5);
        assert_eq!(limiter.reset_time("nobody"), 0);
        assert!(limiter.check("nobody"));
    }

    #[test]
    fn identifiers_are_independent() {
        let (limiter, _clock) = limiter(60_000, 1);

        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        assert!(limiter.check("b"));
    }

    #[test]
    fn skip_successful_requests_only_counts_failures() {
        let clock = ManualClock::new(0);
        let options = RateLimiterOptions::new(60_000, 2).skip_successful_requests(true);
        let limiter = RateLimiter::with_clock(options, clock);

        for _ in 0..10 {
            assert!(limiter.is_allowed("login", true));
        }
        assert!(limiter.is_allowed("login", false));
        assert!(limiter.is_allowed("login", false));
        assert!(!limiter.is_allowed("login", true));
        assert_eq!(limiter.remaining_requests("login"), 0);
    }

    #[test]
    fn skip_failed_requests_only_counts_successes() {
        let clock = ManualClock::new(0);
        let options = RateLimiterOptions::new(60_000, 1).skip_failed_requests(true);
        let limiter = RateLimiter::with_clock(options, clock);

        assert!(limiter.is_allowed("upload", false));
        assert!(limiter.is_allowed("upload", false));
        assert_eq!(limiter.remaining_requests("upload"), 1);
        assert!(limiter.is_allowed("upload", true));
        assert!(!limiter.is_allowed("upload", false));
    }

    #[test]
    fn reset_time_tracks_oldest_record() {
        let (limiter, clock) = limiter(1_000, 5);

        assert!(limiter.check("u"));
        clock.advance(300);
        assert!(limiter.check("u"));

        assert_eq!(limiter.reset_time("u"), 1_000_000 + 1_000);
    }

    #[test]
    fn retry_after_counts_down_to_reset() {
        let (limiter, clock) = limiter(1_000, 1);

        assert_eq!(limiter.retry_after_ms("u"), 0);
        assert!(limiter.check("u"));
        clock.advance(400);
        assert_eq!(limiter.retry_after_ms("u"), 600);
        clock.advance(5_000);
        assert_eq!(limiter.retry_after_ms("u"), 0);
    }

    #[test]
    fn clear_one_or_all_identifiers() {
        let (limiter, _clock) = limiter(60_000, 1);

        assert!(limiter.check("a"));
        assert!(limiter.check("b"));

        limiter.clear(Some("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("b"));

        limiter.clear(None);
        assert_eq!(limiter.tracked_identifiers(), 0);
        assert!(limiter.check("b"));
    }

    #[test]
    fn cleanup_removes_only_stale_identifiers() {
        let (limiter, clock) = limiter(1_000, 10);

        assert!(limiter.check("stale"));
        clock.advance(800);
        assert!(limiter.check("active"));
        clock.advance(300);

        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.tracked_identifiers(), 1);
        assert_eq!(limiter.remaining_requests("active"), 9);
        assert_eq!(limiter.reset_time("stale"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_loop_sweeps_in_background() {
        let (limiter, clock) = limiter(1_000, 10);
        let limiter = Arc::new(limiter);

        assert!(limiter.check("a"));
        assert!(limiter.check("b"));
        let handle = limiter.clone().spawn_cleanup_loop("test", Duration::from_millis(50));

        clock.advance(2_000);
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert_eq!(limiter.tracked_identifiers(), 0);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_loop_stops_when_limiter_dropped() {
        let (limiter, _clock) = limiter(1_000, 10);
        let limiter = Arc::new(limiter);
        let handle = limiter.clone().spawn_cleanup_loop("test", Duration::from_millis(10));

        drop(limiter);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(handle.is_finished());
    }
}
