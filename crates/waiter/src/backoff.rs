//! 폴링 간격 스케줄
//!
//! `next = min(current * multiplier, max)` 규칙으로 증가하며,
//! 최대 간격을 넘지 않습니다.

use std::time::Duration;

/// 단조 증가하는 폴링 간격 스케줄
///
/// # 사용 예시
///
/// ```
/// use std::time::Duration;
/// use powerprobe_waiter::Backoff;
///
/// let delays: Vec<_> = Backoff::new(Duration::from_secs(5), 1.5, Duration::from_secs(10))
///     .take(3)
///     .collect();
/// assert_eq!(
///     delays,
///     vec![
///         Duration::from_secs(5),
///         Duration::from_millis(7500),
///         Duration::from_secs(10),
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    multiplier: f64,
    max: Duration,
}

impl Backoff {
    /// 새 스케줄을 생성합니다. 초기 간격도 `max`로 제한됩니다.
    pub fn new(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            multiplier,
            max,
        }
    }

    /// 다음 sleep에 사용할 간격
    pub fn current(&self) -> Duration {
        self.current
    }

    /// 현재 간격을 반환하고 다음 간격으로 진행합니다.
    pub fn advance(&mut self) -> Duration {
        let delay = self.current;
        if self.current < self.max {
            let grown = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
                .unwrap_or(self.max);
            // multiplier < 1.0이 들어와도 간격이 줄어들지 않음
            self.current = grown.max(self.current).min(self.max);
        }
        delay
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.advance())
    }
}
