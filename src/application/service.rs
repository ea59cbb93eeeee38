mod booking_query_service;
mod class_query_service;

pub use booking_query_service::BookingQueryService;
pub use class_query_service::{ClassFilter, ClassQueryService, ClassView};

use crate::application::{ApplicationError, ConfirmationLinkBuilder};
use crate::domain::error::DomainError;
use crate::domain::event::BookingEvent;
use crate::domain::model::{
    Actor, Booking, BookingId, ClassDetails, ClassId, ClassListing, ClassTypeId, InstructorId,
    LevelId, Price, ScheduledClass,
};
use crate::domain::port::{
    BookingNotice, BookingNotifier, BookingRepository, BookingTransition, ClassCatalogRepository,
    Clock, Logger, StoreError,
};
use crate::domain::service::CapacitySnapshot;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 確認メールを送れなかったときに利用者へ返す警告
pub const EMAIL_NOT_SENT_WARNING: &str = "Email not sent. Use confirmation link below.";

/// 予約と、その対象クラス（名称解決済み）
#[derive(Debug, Clone)]
pub struct BookingDetails {
    pub booking: Booking,
    pub class: ClassListing,
}

/// 確認メール送信の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub email_sent: bool,
    pub warning: Option<String>,
}

impl NotificationOutcome {
    fn sent() -> Self {
        Self {
            email_sent: true,
            warning: None,
        }
    }

    fn failed() -> Self {
        Self {
            email_sent: false,
            warning: Some(EMAIL_NOT_SENT_WARNING.to_string()),
        }
    }
}

/// 予約作成の結果
#[derive(Debug, Clone)]
pub struct BookingReceipt {
    pub details: BookingDetails,
    pub notification: NotificationOutcome,
}

/// 予約アプリケーションサービス
/// 予約のライフサイクル（作成・確定・キャンセル・出欠記録）を調整する
/// 状態遷移はストアのアトミック操作の中で行い、通知はコミット後に送る
pub struct BookingApplicationService {
    booking_repository: Arc<dyn BookingRepository>,
    class_repository: Arc<dyn ClassCatalogRepository>,
    notifier: Arc<dyn BookingNotifier>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    links: ConfirmationLinkBuilder,
}

impl BookingApplicationService {
    /// 新しいアプリケーションサービスを作成
    ///
    /// # Arguments
    /// * `booking_repository` - 予約リポジトリ
    /// * `class_repository` - クラスカタログリポジトリ
    /// * `notifier` - 予約通知
    /// * `clock` - 現在時刻
    /// * `logger` - ロガー
    /// * `links` - 確認リンクの生成
    pub fn new(
        booking_repository: Arc<dyn BookingRepository>,
        class_repository: Arc<dyn ClassCatalogRepository>,
        notifier: Arc<dyn BookingNotifier>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
        links: ConfirmationLinkBuilder,
    ) -> Self {
        Self {
            booking_repository,
            class_repository,
            notifier,
            clock,
            logger,
            links,
        }
    }

    /// 確認リンクを取得
    pub fn confirmation_link(&self, booking: &Booking) -> String {
        self.links.link_for(booking)
    }

    /// 仮予約を作成し、確認メールを送る
    ///
    /// # Arguments
    /// * `actor` - 予約する会員
    /// * `class_id` - 予約するクラス
    ///
    /// # Returns
    /// * `Ok(BookingReceipt)` - 作成された予約と確認メールの送信結果
    /// * `Err(ApplicationError)` - NotBookable / DuplicateBooking / CapacityExceeded など
    pub async fn create_booking(
        &self,
        actor: &Actor,
        class_id: ClassId,
    ) -> Result<BookingReceipt, ApplicationError> {
        let now = self.clock.now();
        let mut booking = Booking::request(
            self.booking_repository.next_identity(),
            actor.user_id(),
            class_id,
            now,
        );

        // 名称はストア操作の前に解決する（コミット後は失敗しうる処理を行わない）
        let listing = self.listing_for(class_id).await?;

        let class = match self.booking_repository.create_pending(&booking).await {
            Ok(class) => ClassListing { class, ..listing },
            Err(err) => {
                self.log_store_failure("create_booking", ("class_id", class_id.to_string()), None, &err);
                return Err(err.into());
            }
        };

        let mut context = HashMap::new();
        context.insert("class_id".to_string(), class_id.to_string());
        context.insert("user_id".to_string(), actor.user_id().to_string());
        self.logger.info(
            "BookingApplicationService",
            "Pending booking created",
            Some(booking.id().as_uuid()),
            Some(context),
        );

        let events = booking.take_events();
        let notification = self.dispatch_events(&booking, &class, events).await;

        Ok(BookingReceipt {
            details: BookingDetails { booking, class },
            notification: notification.unwrap_or_else(NotificationOutcome::sent),
        })
    }

    /// 確認トークンで予約を確定する
    /// 予約者本人またはスタッフ以外からは予約が見えない（NotFound）
    pub async fn confirm_booking(
        &self,
        actor: &Actor,
        booking_id: BookingId,
        token: Option<String>,
    ) -> Result<BookingDetails, ApplicationError> {
        let (booking, listing) = self.booking_context(booking_id).await?;
        if !actor.can_act_for(booking.user_id()) {
            return Err(booking_not_found(booking_id));
        }

        let now = self.clock.now();
        let transition: BookingTransition = Box::new(
            move |booking: &mut Booking, _class: &ScheduledClass, capacity: &CapacitySnapshot| {
                booking.confirm(token.as_deref(), capacity, now)
            },
        );
        self.transition("confirm_booking", booking_id, listing, now, transition)
            .await
    }

    /// 予約をキャンセルし、キャンセル通知を送る
    pub async fn cancel_booking(
        &self,
        actor: &Actor,
        booking_id: BookingId,
    ) -> Result<BookingDetails, ApplicationError> {
        let (_, listing) = self.booking_context(booking_id).await?;
        let now = self.clock.now();
        let actor = *actor;
        let transition: BookingTransition = Box::new(
            move |booking: &mut Booking, class: &ScheduledClass, _capacity: &CapacitySnapshot| {
                booking.cancel(&actor, class.start_time(), now)
            },
        );
        self.transition("cancel_booking", booking_id, listing, now, transition)
            .await
    }

    /// 出席済みにマーク（インストラクター・管理者）
    pub async fn mark_attended(
        &self,
        actor: &Actor,
        booking_id: BookingId,
    ) -> Result<BookingDetails, ApplicationError> {
        let (_, listing) = self.booking_context(booking_id).await?;
        let now = self.clock.now();
        let actor = *actor;
        let transition: BookingTransition = Box::new(
            move |booking: &mut Booking, _class: &ScheduledClass, _capacity: &CapacitySnapshot| {
                booking.mark_attended(&actor, now)
            },
        );
        self.transition("mark_attended", booking_id, listing, now, transition)
            .await
    }

    /// 無断欠席にマーク（インストラクター・管理者）
    pub async fn mark_no_show(
        &self,
        actor: &Actor,
        booking_id: BookingId,
    ) -> Result<BookingDetails, ApplicationError> {
        let (_, listing) = self.booking_context(booking_id).await?;
        let now = self.clock.now();
        let actor = *actor;
        let transition: BookingTransition = Box::new(
            move |booking: &mut Booking, _class: &ScheduledClass, _capacity: &CapacitySnapshot| {
                booking.mark_no_show(&actor, now)
            },
        );
        self.transition("mark_no_show", booking_id, listing, now, transition)
            .await
    }

    /// 状態遷移の対象予約と、そのクラスの名称解決済みの情報を取得する
    async fn booking_context(
        &self,
        booking_id: BookingId,
    ) -> Result<(Booking, ClassListing), ApplicationError> {
        let booking = self
            .booking_repository
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| booking_not_found(booking_id))?;
        let listing = self.listing_for(booking.class_id()).await?;
        Ok((booking, listing))
    }

    /// ストアで状態遷移をコミットし、コミット後にイベントを配信する
    /// `listing` はコミット前に解決した名称で、クラスの状態はコミット時のものに置き換える
    async fn transition(
        &self,
        operation: &str,
        booking_id: BookingId,
        listing: ClassListing,
        now: DateTime<Utc>,
        transition: BookingTransition,
    ) -> Result<BookingDetails, ApplicationError> {
        let (mut booking, class) = match self
            .booking_repository
            .apply_transition(booking_id, now, transition)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                self.log_store_failure(
                    operation,
                    ("booking_id", booking_id.to_string()),
                    Some(booking_id.as_uuid()),
                    &err,
                );
                return Err(err.into());
            }
        };

        let listing = ClassListing { class, ..listing };
        let events = booking.take_events();
        self.dispatch_events(&booking, &listing, events).await;

        Ok(BookingDetails {
            booking,
            class: listing,
        })
    }

    async fn listing_for(&self, class_id: ClassId) -> Result<ClassListing, ApplicationError> {
        self.class_repository
            .find_listing(class_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("クラスが見つかりません: {}", class_id)))
    }

    /// コミット済みのドメインイベントを通知とログに振り分ける
    /// 確認メールを送った場合はその結果を返す
    async fn dispatch_events(
        &self,
        booking: &Booking,
        class: &ClassListing,
        events: Vec<BookingEvent>,
    ) -> Option<NotificationOutcome> {
        let mut outcome = None;

        for event in events {
            let mut context = HashMap::new();
            context.insert("event_type".to_string(), event.event_type().to_string());
            context.insert("class_id".to_string(), class.class.id().to_string());
            self.logger.debug(
                "BookingApplicationService",
                "Dispatching booking event",
                Some(event.booking_id().as_uuid()),
                Some(context),
            );

            match event {
                BookingEvent::Requested(_) => {
                    let notice = self.notice(booking, class, Some(self.links.link_for(booking)));
                    outcome = Some(match self.notifier.send_confirmation(&notice).await {
                        Ok(()) => NotificationOutcome::sent(),
                        Err(err) => {
                            self.log_notification_failure("confirmation", booking, &err.to_string());
                            NotificationOutcome::failed()
                        }
                    });
                }
                BookingEvent::Cancelled(_) => {
                    let notice = self.notice(booking, class, None);
                    if let Err(err) = self.notifier.send_cancellation(&notice).await {
                        self.log_notification_failure("cancellation", booking, &err.to_string());
                    }
                }
                BookingEvent::Confirmed(_) | BookingEvent::AttendanceRecorded(_) => {}
            }
        }

        outcome
    }

    fn notice(
        &self,
        booking: &Booking,
        class: &ClassListing,
        confirmation_link: Option<String>,
    ) -> BookingNotice {
        BookingNotice {
            booking_id: booking.id(),
            user_id: booking.user_id(),
            class_id: booking.class_id(),
            class_name: class.class_type_name.clone(),
            starts_at: class.class.start_time(),
            confirmation_link,
        }
    }

    fn log_notification_failure(&self, kind: &str, booking: &Booking, error: &str) {
        let mut context = HashMap::new();
        context.insert("notification".to_string(), kind.to_string());
        context.insert("user_id".to_string(), booking.user_id().to_string());
        context.insert("error".to_string(), error.to_string());
        self.logger.warn(
            "BookingApplicationService",
            "Booking notification failed",
            Some(booking.id().as_uuid()),
            Some(context),
        );
    }

    fn log_store_failure(
        &self,
        operation: &str,
        subject: (&str, String),
        correlation_id: Option<Uuid>,
        error: &StoreError,
    ) {
        let mut context = HashMap::new();
        context.insert("operation".to_string(), operation.to_string());
        context.insert(subject.0.to_string(), subject.1);
        context.insert("error".to_string(), error.to_string());

        match error {
            StoreError::Repository(_) => self.logger.error(
                "BookingApplicationService",
                "Booking store operation failed",
                correlation_id,
                Some(context),
            ),
            _ => self.logger.debug(
                "BookingApplicationService",
                "Booking operation rejected",
                correlation_id,
                Some(context),
            ),
        }
    }
}

fn booking_not_found(booking_id: BookingId) -> ApplicationError {
    ApplicationError::NotFound(format!("予約が見つかりません: {}", booking_id))
}

/// クラス登録のコマンド
#[derive(Debug, Clone)]
pub struct ScheduleClassCommand {
    pub class_type_id: ClassTypeId,
    pub level_id: LevelId,
    pub instructor_id: Option<InstructorId>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub max_capacity: u32,
    pub price: Price,
}

/// クラススケジュールアプリケーションサービス
/// 管理者によるクラスの登録・中止・インストラクター割り当て
pub struct ClassScheduleApplicationService {
    class_repository: Arc<dyn ClassCatalogRepository>,
    logger: Arc<dyn Logger>,
}

impl ClassScheduleApplicationService {
    pub fn new(class_repository: Arc<dyn ClassCatalogRepository>, logger: Arc<dyn Logger>) -> Self {
        Self {
            class_repository,
            logger,
        }
    }

    /// クラスを登録する
    /// クラス種別が有効で、レベルとインストラクター（指定時）が存在することを確認する
    pub async fn schedule_class(
        &self,
        actor: &Actor,
        command: ScheduleClassCommand,
    ) -> Result<ClassListing, ApplicationError> {
        Self::require_admin(actor)?;

        let class_type = self
            .class_repository
            .find_class_type(command.class_type_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!(
                    "クラス種別が見つかりません: {}",
                    command.class_type_id
                ))
            })?;
        if !class_type.is_active {
            return Err(DomainError::InvalidSchedule(format!(
                "クラス種別 {} は無効です",
                class_type.name
            ))
            .into());
        }

        self.class_repository
            .find_level(command.level_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("レベルが見つかりません: {}", command.level_id))
            })?;

        if let Some(instructor_id) = command.instructor_id {
            self.active_instructor(instructor_id).await?;
        }

        let class = ScheduledClass::schedule(
            self.class_repository.next_identity(),
            ClassDetails {
                class_type_id: command.class_type_id,
                level_id: command.level_id,
                instructor_id: command.instructor_id,
                start_time: command.start_time,
                end_time: command.end_time,
                duration_minutes: command.duration_minutes,
                max_capacity: command.max_capacity,
                price: command.price,
            },
        )?;
        self.class_repository.save(&class).await?;

        let mut context = HashMap::new();
        context.insert("class_type".to_string(), class_type.name);
        context.insert("start_time".to_string(), class.start_time().to_rfc3339());
        self.logger.info(
            "ClassScheduleApplicationService",
            "Class scheduled",
            Some(class.id().as_uuid()),
            Some(context),
        );

        self.listing(class.id()).await
    }

    /// クラスを中止する
    /// 既存の予約はそのまま残り、新規予約だけが受け付けられなくなる
    pub async fn cancel_class(
        &self,
        actor: &Actor,
        class_id: ClassId,
    ) -> Result<ClassListing, ApplicationError> {
        Self::require_admin(actor)?;

        self.class_repository
            .update_class(class_id, Box::new(|class: &mut ScheduledClass| class.cancel()))
            .await?;

        self.logger.info(
            "ClassScheduleApplicationService",
            "Class cancelled",
            Some(class_id.as_uuid()),
            None,
        );

        self.listing(class_id).await
    }

    /// クラスを無効化する（論理削除）
    /// 一覧の `is_active` フィルターで除外でき、新規予約も受け付けなくなる
    pub async fn deactivate_class(
        &self,
        actor: &Actor,
        class_id: ClassId,
    ) -> Result<ClassListing, ApplicationError> {
        Self::require_admin(actor)?;

        self.class_repository
            .update_class(class_id, Box::new(|class: &mut ScheduledClass| class.deactivate()))
            .await?;

        self.logger.info(
            "ClassScheduleApplicationService",
            "Class deactivated",
            Some(class_id.as_uuid()),
            None,
        );

        self.listing(class_id).await
    }

    /// インストラクターを割り当てる（有効なインストラクターのみ）
    pub async fn assign_instructor(
        &self,
        actor: &Actor,
        class_id: ClassId,
        instructor_id: InstructorId,
    ) -> Result<ClassListing, ApplicationError> {
        Self::require_admin(actor)?;

        self.active_instructor(instructor_id).await?;
        self.class_repository
            .update_class(
                class_id,
                Box::new(move |class: &mut ScheduledClass| class.assign_instructor(instructor_id)),
            )
            .await?;

        let mut context = HashMap::new();
        context.insert("instructor_id".to_string(), instructor_id.to_string());
        self.logger.info(
            "ClassScheduleApplicationService",
            "Instructor assigned",
            Some(class_id.as_uuid()),
            Some(context),
        );

        self.listing(class_id).await
    }

    fn require_admin(actor: &Actor) -> Result<(), ApplicationError> {
        if actor.is_staff() {
            Ok(())
        } else {
            Err(DomainError::Forbidden("管理者のみ実行できます".to_string()).into())
        }
    }

    async fn active_instructor(&self, instructor_id: InstructorId) -> Result<(), ApplicationError> {
        match self.class_repository.find_instructor(instructor_id).await? {
            Some(instructor) if instructor.is_active => Ok(()),
            _ => Err(ApplicationError::NotFound(format!(
                "インストラクターが見つかりません: {}",
                instructor_id
            ))),
        }
    }

    async fn listing(&self, class_id: ClassId) -> Result<ClassListing, ApplicationError> {
        self.class_repository
            .find_listing(class_id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("クラスが見つかりません: {}", class_id)))
    }
}
