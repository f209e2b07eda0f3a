//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use std::sync::{Mutex, PoisonError};

use crate::domain::ids::JobId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はジョブ ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（同時 create から呼ばれる）
pub trait IdGenerator: Send + Sync {
    fn generate_job_id(&self) -> JobId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock の時刻を timestamp 部分に使い、残り 80 bit は乱数。
/// 同じミリ秒（または時計の巻き戻り）では直前の ID を +1 するので、
/// 生成順 = ソート順が常に成り立つ。
pub struct UlidGenerator<C> {
    clock: C,
    last: Mutex<Option<Ulid>>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last: Mutex::new(None),
        }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_job_id(&self) -> JobId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let ulid = match *last {
            Some(prev) if prev.timestamp_ms() >= timestamp_ms => prev
                .increment()
                .unwrap_or_else(|| Ulid::from_parts(timestamp_ms, rand::random())),
            _ => Ulid::from_parts(timestamp_ms, rand::random()),
        };
        *last = Some(ulid);
        JobId::from(ulid)
    }
}
