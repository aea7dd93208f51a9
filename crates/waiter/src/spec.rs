//! 대기 명세 -- 어떤 리소스를, 어떤 상태까지, 얼마나 기다릴지 정의합니다.
//!
//! [`WaitSpec`]은 호출 한 번마다 만들어지고 한 번의 [`wait`](crate::wait)
//! 호출에서 소비됩니다. 상태 이름은 생성 시점에 소문자로 정규화되므로
//! 비교는 대소문자를 구분하지 않습니다.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::Backoff;
use crate::error::WaitError;

/// 기본 제한 시간
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// 기본 초기 폴링 간격
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
/// 기본 백오프 배수
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;
/// 기본 최대 폴링 간격
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(10);
/// 부재 대기의 기본 목표 상태
pub const ABSENT_STATE: &str = "deleted";

/// 대기 목적
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPurpose {
    /// 리소스가 목표 상태로 존재하기를 기다림
    Presence,
    /// 리소스가 사라지기를 기다림 (NotFound = 성공)
    Absence,
}

impl fmt::Display for WaitPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presence => write!(f, "presence"),
            Self::Absence => write!(f, "absence"),
        }
    }
}

/// 관측된 상태의 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    /// 목표 상태
    Target,
    /// 실패 상태
    Failure,
    /// 중간 상태 (계속 폴링)
    Pending,
}

/// 대기 명세
#[derive(Debug, Clone)]
pub struct WaitSpec {
    resource_id: String,
    purpose: WaitPurpose,
    target_states: BTreeSet<String>,
    failure_states: BTreeSet<String>,
    timeout: Duration,
    initial_interval: Duration,
    backoff_multiplier: f64,
    max_interval: Duration,
}

impl WaitSpec {
    /// 존재 대기용 빌더를 생성합니다. 목표 상태는 직접 지정해야 합니다.
    pub fn builder(resource_id: impl Into<String>) -> WaitSpecBuilder {
        WaitSpecBuilder::new(resource_id.into(), WaitPurpose::Presence)
    }

    /// 단일 목표 상태를 가진 존재 대기용 빌더를 생성합니다.
    pub fn presence(resource_id: impl Into<String>, target: impl Into<String>) -> WaitSpecBuilder {
        Self::builder(resource_id).target_state(target)
    }

    /// 부재 대기용 빌더를 생성합니다.
    ///
    /// 목표 상태는 `deleted`로 시작합니다. 리소스 조회가 NotFound를 반환해도
    /// 성공으로 처리됩니다.
    pub fn absence(resource_id: impl Into<String>) -> WaitSpecBuilder {
        WaitSpecBuilder::new(resource_id.into(), WaitPurpose::Absence).target_state(ABSENT_STATE)
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn purpose(&self) -> WaitPurpose {
        self.purpose
    }

    pub fn target_states(&self) -> &BTreeSet<String> {
        &self.target_states
    }

    pub fn failure_states(&self) -> &BTreeSet<String> {
        &self.failure_states
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// 관측된 상태를 분류합니다.
    ///
    /// 목표 상태 검사가 실패 상태 검사보다 먼저 수행됩니다.
    pub fn classify(&self, status: &str) -> StateClass {
        let status = normalize(status);
        if self.target_states.contains(&status) {
            StateClass::Target
        } else if self.failure_states.contains(&status) {
            StateClass::Failure
        } else {
            StateClass::Pending
        }
    }

    /// 이 명세의 폴링 간격 스케줄을 생성합니다.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            self.initial_interval,
            self.backoff_multiplier,
            self.max_interval,
        )
    }

    /// 명세의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), WaitError> {
        if self.resource_id.trim().is_empty() {
            return Err(WaitError::config("resource id must not be empty"));
        }

        if self.target_states.is_empty() {
            return Err(WaitError::config("target state set must not be empty"));
        }

        let overlap: Vec<&str> = self
            .target_states
            .intersection(&self.failure_states)
            .map(String::as_str)
            .collect();
        if !overlap.is_empty() {
            return Err(WaitError::config(format!(
                "states cannot be both target and failure: {}",
                overlap.join(", ")
            )));
        }

        if self.timeout.is_zero() {
            return Err(WaitError::config("timeout must be greater than 0"));
        }

        if self.initial_interval.is_zero() {
            return Err(WaitError::config("initial interval must be greater than 0"));
        }

        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(WaitError::config(format!(
                "backoff multiplier must be a finite value >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }

        if self.max_interval < self.initial_interval {
            return Err(WaitError::config(format!(
                "max interval ({:?}) must be >= initial interval ({:?})",
                self.max_interval, self.initial_interval
            )));
        }

        Ok(())
    }
}

/// [`WaitSpec`] 빌더
#[derive(Debug, Clone)]
pub struct WaitSpecBuilder {
    spec: WaitSpec,
}

impl WaitSpecBuilder {
    fn new(resource_id: String, purpose: WaitPurpose) -> Self {
        Self {
            spec: WaitSpec {
                resource_id,
                purpose,
                target_states: BTreeSet::new(),
                failure_states: BTreeSet::new(),
                timeout: DEFAULT_TIMEOUT,
                initial_interval: DEFAULT_INITIAL_INTERVAL,
                backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
                max_interval: DEFAULT_MAX_INTERVAL,
            },
        }
    }

    pub fn purpose(mut self, purpose: WaitPurpose) -> Self {
        self.spec.purpose = purpose;
        self
    }

    pub fn target_state(mut self, state: impl Into<String>) -> Self {
        self.spec.target_states.insert(normalize(&state.into()));
        self
    }

    pub fn target_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec
            .target_states
            .extend(states.into_iter().map(|s| normalize(&s.into())));
        self
    }

    pub fn failure_state(mut self, state: impl Into<String>) -> Self {
        self.spec.failure_states.insert(normalize(&state.into()));
        self
    }

    pub fn failure_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec
            .failure_states
            .extend(states.into_iter().map(|s| normalize(&s.into())));
        self
    }

    /// 목표 상태 집합을 비웁니다.
    pub fn clear_target_states(mut self) -> Self {
        self.spec.target_states.clear();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.spec.timeout = timeout;
        self
    }

    pub fn initial_interval(mut self, interval: Duration) -> Self {
        self.spec.initial_interval = interval;
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.spec.backoff_multiplier = multiplier;
        self
    }

    pub fn max_interval(mut self, interval: Duration) -> Self {
        self.spec.max_interval = interval;
        self
    }

    /// 명세를 검증하고 [`WaitSpec`]을 생성합니다.
    pub fn build(self) -> Result<WaitSpec, WaitError> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

fn normalize(state: &str) -> String {
    state.trim().to_lowercase()
}
