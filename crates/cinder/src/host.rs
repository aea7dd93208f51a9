//! `host@backend#pool` 배치 문자열 파싱

use std::fmt;

use serde::Serialize;

/// Cinder 배치 문자열의 구성 요소
///
/// backend나 pool이 없는 문자열(`host`, `host@backend`)도 허용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostTarget {
    pub host: String,
    pub backend: Option<String>,
    pub pool: Option<String>,
}

impl HostTarget {
    pub fn parse(raw: &str) -> Self {
        let Some((host, rest)) = raw.split_once('@') else {
            return Self {
                host: raw.to_owned(),
                backend: None,
                pool: None,
            };
        };

        let (backend, pool) = match rest.split_once('#') {
            Some((backend, pool)) => (backend, Some(pool.to_owned())),
            None => (rest, None),
        };

        Self {
            host: host.to_owned(),
            backend: Some(backend.to_owned()),
            pool,
        }
    }

    /// 같은 backend를 가리키는지 확인합니다. 양쪽 모두 backend가 있어야 합니다.
    pub fn same_backend(&self, other: &Self) -> bool {
        matches!((&self.backend, &other.backend), (Some(a), Some(b)) if a == b)
    }
}

impl fmt::Display for HostTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.host)?;
        if let Some(backend) = &self.backend {
            write!(f, "@{backend}")?;
        }
        if let Some(pool) = &self.pool {
            write!(f, "#{pool}")?;
        }
        Ok(())
    }
}
