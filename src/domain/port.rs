// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::error::DomainError;
use crate::domain::model::{
    Booking, BookingId, ClassId, ClassListing, ClassType, ClassTypeId, Instructor, InstructorId,
    Level, LevelId, ScheduledClass, StatusCounts, UserId,
};
use crate::domain::service::CapacitySnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );
}

/// 現在時刻を提供するポート
/// 締め切り判定をテストで再現できるようにする
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    ConnectionFailed(String),
    /// 操作に失敗
    OperationFailed(String),
    /// データの取得に失敗
    FetchFailed(String),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RepositoryError::OperationFailed(msg) => write!(f, "Operation failed: {}", msg),
            RepositoryError::FetchFailed(msg) => write!(f, "Fetch failed: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// 予約ストアのアトミック操作のエラー
/// ドメインルールによる拒否と技術的な失敗を区別する
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// ドメインルールにより拒否された（トランザクションはロールバック済み）
    Rejected(DomainError),
    /// 対象のクラスが存在しない
    ClassNotFound(ClassId),
    /// 対象の予約が存在しない
    BookingNotFound(BookingId),
    /// 永続化に失敗
    Repository(RepositoryError),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Rejected(e) => write!(f, "{}", e),
            StoreError::ClassNotFound(id) => write!(f, "Class not found: {}", id),
            StoreError::BookingNotFound(id) => write!(f, "Booking not found: {}", id),
            StoreError::Repository(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<DomainError> for StoreError {
    fn from(error: DomainError) -> Self {
        StoreError::Rejected(error)
    }
}

impl From<RepositoryError> for StoreError {
    fn from(error: RepositoryError) -> Self {
        StoreError::Repository(error)
    }
}

/// ロック済みの予約に適用する状態遷移
/// 予約・クラス・その時点の空き状況を受け取り、予約を変更する
pub type BookingTransition = Box<
    dyn FnOnce(&mut Booking, &ScheduledClass, &CapacitySnapshot) -> Result<(), DomainError> + Send,
>;

/// ロック済みのクラスに適用する変更
pub type ClassChange = Box<dyn FnOnce(&mut ScheduledClass) + Send>;

/// 予約一覧の期間区分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTimeframe {
    /// すべて（予約日時の降順）
    All,
    /// 開始前のクラスの有効な予約（開始時刻の昇順）
    Upcoming,
    /// 開始済みのクラスの予約（開始時刻の降順）
    History,
}

/// 予約一覧の検索条件
#[derive(Debug, Clone, Copy)]
pub struct BookingQuery {
    /// 指定した場合はそのユーザーの予約のみ
    pub user_id: Option<UserId>,
    pub timeframe: BookingTimeframe,
    pub now: DateTime<Utc>,
}

/// クラス一覧の検索条件
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassQuery {
    pub class_type_id: Option<ClassTypeId>,
    pub level_id: Option<LevelId>,
    pub instructor_id: Option<InstructorId>,
    pub is_active: Option<bool>,
    /// Some(true)で開始前のみ、Some(false)で開始済みのみ
    pub is_upcoming: Option<bool>,
    pub now: Option<DateTime<Utc>>,
}

/// 予約リポジトリトレイト
/// 予約集約の永続化と、定員に関わるアトミック操作を抽象化する
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// 仮予約をアトミックに登録する
    /// クラスをロックしたうえで、受付可否・重複・定員を判定してから挿入する
    ///
    /// # Returns
    /// * `Ok(ScheduledClass)` - 登録成功（判定に使ったロック済みのクラス）
    /// * `Err(StoreError::Rejected)` - NotBookable / DuplicateBooking / CapacityExceeded
    /// * `Err(StoreError::ClassNotFound)` - クラスが存在しない
    async fn create_pending(&self, booking: &Booking) -> Result<ScheduledClass, StoreError>;

    /// クラス、予約の順にロックし、空き状況を再計算して状態遷移を適用する
    ///
    /// # Returns
    /// * `Ok((Booking, ScheduledClass))` - 遷移後の予約（ドメインイベント付き）とクラス
    /// * `Err(StoreError::Rejected)` - 遷移が拒否された（何も変更されない）
    async fn apply_transition(
        &self,
        booking_id: BookingId,
        now: DateTime<Utc>,
        transition: BookingTransition,
    ) -> Result<(Booking, ScheduledClass), StoreError>;

    /// 予約IDで予約を検索する
    async fn find_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, RepositoryError>;

    /// ユーザーとクラスの組で有効な予約（pending/confirmed）を検索する
    async fn find_active_by_user_and_class(
        &self,
        user_id: UserId,
        class_id: ClassId,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// クラスのステータス別予約件数を取得する
    async fn count_by_status(&self, class_id: ClassId) -> Result<StatusCounts, RepositoryError>;

    /// 条件に合う予約の一覧を取得する
    async fn list(&self, query: BookingQuery) -> Result<Vec<Booking>, RepositoryError>;

    /// 新しい一意の予約IDを生成する
    fn next_identity(&self) -> BookingId;
}

/// クラスカタログリポジトリトレイト
/// 開催クラスと、その参照先（種別・レベル・インストラクター）の永続化を抽象化する
#[async_trait]
pub trait ClassCatalogRepository: Send + Sync {
    /// 開催クラスを保存する（存在すれば更新）
    async fn save(&self, class: &ScheduledClass) -> Result<(), RepositoryError>;

    /// クラス行をロックして最新の状態に変更を適用し、変更した列だけを書き戻す
    ///
    /// # Returns
    /// * `Ok(ScheduledClass)` - 変更後のクラス
    /// * `Err(StoreError::ClassNotFound)` - クラスが存在しない
    async fn update_class(
        &self,
        class_id: ClassId,
        change: ClassChange,
    ) -> Result<ScheduledClass, StoreError>;

    async fn find_by_id(&self, class_id: ClassId) -> Result<Option<ScheduledClass>, RepositoryError>;

    /// 名称を解決したクラスを取得する
    async fn find_listing(&self, class_id: ClassId) -> Result<Option<ClassListing>, RepositoryError>;

    /// 条件に合うクラスを開始時刻の昇順で取得する
    async fn list_listings(&self, query: ClassQuery) -> Result<Vec<ClassListing>, RepositoryError>;

    async fn find_class_type(
        &self,
        class_type_id: ClassTypeId,
    ) -> Result<Option<ClassType>, RepositoryError>;

    async fn find_level(&self, level_id: LevelId) -> Result<Option<Level>, RepositoryError>;

    async fn find_instructor(
        &self,
        instructor_id: InstructorId,
    ) -> Result<Option<Instructor>, RepositoryError>;

    /// 新しい一意のクラスIDを生成する
    fn next_identity(&self) -> ClassId;
}

/// 通知の内容
/// 宛先の解決は通知アダプターの責務とし、ここではユーザーIDのみを持つ
#[derive(Debug, Clone, PartialEq)]
pub struct BookingNotice {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub class_id: ClassId,
    pub class_name: String,
    pub starts_at: DateTime<Utc>,
    /// 確認メールのみ
    pub confirmation_link: Option<String>,
}

/// 通知エラー
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Recipient could not be resolved: {0}")]
    UnknownRecipient(String),
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// 予約通知トレイト
/// コミット後にベストエフォートで呼ばれ、失敗しても予約は巻き戻さない
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    /// 予約確認メール（確認リンク付き）を送る
    async fn send_confirmation(&self, notice: &BookingNotice) -> Result<(), NotificationError>;

    /// キャンセル通知を送る
    async fn send_cancellation(&self, notice: &BookingNotice) -> Result<(), NotificationError>;
}
