//! 시나리오 실행 컨텍스트와 검증 헬퍼

use std::fmt::Debug;

use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use powerprobe_core::config::PowerprobeConfig;

use crate::cleanup::{CleanupAction, CleanupStack};
use crate::error::ScenarioError;

/// 시나리오 한 번이 공유하는 상태
///
/// 클라이언트와 설정은 빌려 쓰고, 정리 작업과 관찰 기록은 컨텍스트가 소유합니다.
pub struct ScenarioContext<'a, C> {
    pub client: &'a C,
    pub config: &'a PowerprobeConfig,
    pub cancel: &'a CancellationToken,
    cleanup: CleanupStack,
    notes: Vec<String>,
}

impl<'a, C> ScenarioContext<'a, C> {
    pub fn new(client: &'a C, config: &'a PowerprobeConfig, cancel: &'a CancellationToken) -> Self {
        Self {
            client,
            config,
            cancel,
            cleanup: CleanupStack::new(),
            notes: Vec::new(),
        }
    }

    /// 시나리오가 끝난 뒤 실행할 정리 작업을 등록합니다.
    pub fn defer(&mut self, action: CleanupAction) {
        self.cleanup.push(action);
    }

    /// 보고서에 남길 관찰 내용을 기록합니다.
    pub fn note(&mut self, note: impl Into<String>) {
        let note = note.into();
        info!(note = %note, "scenario note");
        self.notes.push(note);
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn into_parts(self) -> (CleanupStack, Vec<String>) {
        (self.cleanup, self.notes)
    }
}

/// 테스트 리소스 이름. 같은 클라우드에서 반복 실행해도 충돌하지 않습니다.
pub fn unique_name(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &suffix[..8])
}

pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), ScenarioError> {
    if condition {
        Ok(())
    } else {
        Err(ScenarioError::Assertion(message()))
    }
}

pub fn ensure_eq<T, U>(what: &str, expected: &T, actual: &U) -> Result<(), ScenarioError>
where
    T: Debug + ?Sized,
    U: Debug + PartialEq<T> + ?Sized,
{
    ensure(actual == expected, || {
        format!("{what}: expected {expected:?}, got {actual:?}")
    })
}
