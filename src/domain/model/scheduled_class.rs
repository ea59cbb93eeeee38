use chrono::{DateTime, Duration, Utc};

use crate::domain::error::DomainError;
use crate::domain::model::{ClassId, ClassTypeId, InstructorId, LevelId, Price};

/// 所要時間と開始・終了時刻の差の許容誤差（秒）
const DURATION_TOLERANCE_SECONDS: i64 = 60;

/// 開催クラスの内容
/// スケジュール登録と永続化データからの再構築で共通に使う
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDetails {
    pub class_type_id: ClassTypeId,
    pub level_id: LevelId,
    pub instructor_id: Option<InstructorId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub max_capacity: u32,
    pub price: Price,
}

/// 開催クラス
/// 1回分のクラス開催を表し、定員と時間枠を持つ
/// 物理削除はせず、is_activeフラグで無効化する
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledClass {
    id: ClassId,
    details: ClassDetails,
    is_active: bool,
    is_cancelled: bool,
}

impl ScheduledClass {
    /// 新しいクラスをスケジュールする
    /// 事前条件:
    /// - 終了時刻が開始時刻より後
    /// - 所要時間が開始・終了時刻の差と1分以内で一致
    /// - 定員が1以上
    pub fn schedule(id: ClassId, details: ClassDetails) -> Result<Self, DomainError> {
        Self::validate(&details)?;
        Ok(Self {
            id,
            details,
            is_active: true,
            is_cancelled: false,
        })
    }

    /// データベースから取得したデータでクラスを再構築
    /// リポジトリでの使用を想定
    pub fn reconstruct(
        id: ClassId,
        details: ClassDetails,
        is_active: bool,
        is_cancelled: bool,
    ) -> Self {
        Self {
            id,
            details,
            is_active,
            is_cancelled,
        }
    }

    fn validate(details: &ClassDetails) -> Result<(), DomainError> {
        if details.end_time <= details.start_time {
            return Err(DomainError::InvalidSchedule(
                "終了時刻は開始時刻より後である必要があります".to_string(),
            ));
        }

        let window_seconds = (details.end_time - details.start_time).num_seconds();
        let duration_seconds = i64::from(details.duration_minutes) * 60;
        if (window_seconds - duration_seconds).abs() > DURATION_TOLERANCE_SECONDS {
            return Err(DomainError::InvalidSchedule(format!(
                "所要時間は開始・終了時刻から約{}分である必要があります",
                window_seconds / 60
            )));
        }

        if details.max_capacity == 0 {
            return Err(DomainError::InvalidSchedule(
                "定員は1以上である必要があります".to_string(),
            ));
        }

        Ok(())
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn details(&self) -> &ClassDetails {
        &self.details
    }

    pub fn class_type_id(&self) -> ClassTypeId {
        self.details.class_type_id
    }

    pub fn level_id(&self) -> LevelId {
        self.details.level_id
    }

    pub fn instructor_id(&self) -> Option<InstructorId> {
        self.details.instructor_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.details.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.details.end_time
    }

    pub fn duration_minutes(&self) -> u32 {
        self.details.duration_minutes
    }

    pub fn max_capacity(&self) -> u32 {
        self.details.max_capacity
    }

    pub fn price(&self) -> Price {
        self.details.price
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }

    /// まだ開始していないか
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.details.start_time > now
    }

    /// 既に終了したか
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.details.end_time < now
    }

    /// 開始時刻まで指定時間より多く残っているか
    pub fn starts_after(&self, now: DateTime<Utc>, lead: Duration) -> bool {
        self.details.start_time > now + lead
    }

    /// クラスを中止する
    pub fn cancel(&mut self) {
        self.is_cancelled = true;
    }

    /// インストラクターを割り当てる（既存の割り当ては置き換える）
    pub fn assign_instructor(&mut self, instructor_id: InstructorId) {
        self.details.instructor_id = Some(instructor_id);
    }

    /// クラスを無効化する（論理削除）
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}
