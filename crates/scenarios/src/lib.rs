#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`report`]: 시나리오 식별자와 결과 (`ScenarioKind`, `ScenarioOutcome`, `ScenarioReport`)
//! - [`context`]: 실행 컨텍스트와 검증 헬퍼
//! - [`cleanup`]: LIFO 정리 스택
//! - [`failover`], [`volume_type`], [`qos`], [`migration`]: 시나리오 본문
//! - [`runner`]: 실행기 (`run_scenario`, `run_all`)
//! - [`error`]: 에러 타입 (`ScenarioError`)

pub mod cleanup;
pub mod context;
pub mod error;
pub mod failover;
pub mod migration;
pub mod qos;
pub mod report;
pub mod runner;
pub mod volume_type;

pub use cleanup::{CleanupAction, CleanupStack};
pub use context::ScenarioContext;
pub use error::ScenarioError;
pub use failover::FailoverTarget;
pub use report::{ScenarioKind, ScenarioOutcome, ScenarioReport};
pub use runner::{run_all, run_scenario};
