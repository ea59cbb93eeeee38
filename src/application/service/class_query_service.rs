use crate::application::ApplicationError;
use crate::domain::model::{
    Actor, ClassId, ClassListing, ClassTypeId, InstructorId, LevelId, StatusCounts,
};
use crate::domain::port::{BookingRepository, ClassCatalogRepository, ClassQuery, Clock};
use crate::domain::service::{CapacityEvaluator, CapacitySnapshot};
use std::sync::Arc;

/// クラス一覧の絞り込み条件
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFilter {
    pub class_type_id: Option<ClassTypeId>,
    pub level_id: Option<LevelId>,
    pub instructor_id: Option<InstructorId>,
    pub is_active: Option<bool>,
    pub is_upcoming: Option<bool>,
}

/// 空き状況付きのクラス
#[derive(Debug, Clone)]
pub struct ClassView {
    pub listing: ClassListing,
    pub counts: StatusCounts,
    pub capacity: CapacitySnapshot,
    pub is_upcoming: bool,
    pub is_past: bool,
    /// 参照したユーザーがこのクラスに有効な予約を持っているか
    pub user_has_booking: bool,
}

/// クラスクエリサービス
/// 読み取り専用のクラス操作を提供する
/// 空き状況は予約ストアの件数から毎回計算する
pub struct ClassQueryService {
    class_repository: Arc<dyn ClassCatalogRepository>,
    booking_repository: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
}

impl ClassQueryService {
    pub fn new(
        class_repository: Arc<dyn ClassCatalogRepository>,
        booking_repository: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            class_repository,
            booking_repository,
            clock,
        }
    }

    /// クラスIDでクラスを取得
    pub async fn get_class(
        &self,
        actor: &Actor,
        class_id: ClassId,
    ) -> Result<ClassView, ApplicationError> {
        let listing = self
            .class_repository
            .find_listing(class_id)
            .await?
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("クラスが見つかりません: {}", class_id))
            })?;
        self.view(actor, listing).await
    }

    /// 条件に合うクラスを開始時刻の昇順で取得
    pub async fn list_classes(
        &self,
        actor: &Actor,
        filter: ClassFilter,
    ) -> Result<Vec<ClassView>, ApplicationError> {
        let query = ClassQuery {
            class_type_id: filter.class_type_id,
            level_id: filter.level_id,
            instructor_id: filter.instructor_id,
            is_active: filter.is_active,
            is_upcoming: filter.is_upcoming,
            now: Some(self.clock.now()),
        };
        let listings = self.class_repository.list_listings(query).await?;

        let mut views = Vec::with_capacity(listings.len());
        for listing in listings {
            views.push(self.view(actor, listing).await?);
        }
        Ok(views)
    }

    /// 開始前で、公開中かつ中止されていないクラスを取得
    pub async fn upcoming_classes(&self, actor: &Actor) -> Result<Vec<ClassView>, ApplicationError> {
        let filter = ClassFilter {
            is_active: Some(true),
            is_upcoming: Some(true),
            ..ClassFilter::default()
        };
        let views = self.list_classes(actor, filter).await?;
        Ok(views
            .into_iter()
            .filter(|view| !view.listing.class.is_cancelled())
            .collect())
    }

    async fn view(&self, actor: &Actor, listing: ClassListing) -> Result<ClassView, ApplicationError> {
        let now = self.clock.now();
        let class_id = listing.class.id();

        let counts = self.booking_repository.count_by_status(class_id).await?;
        let capacity = CapacityEvaluator::evaluate(&listing.class, &counts, now);
        let user_has_booking = self
            .booking_repository
            .find_active_by_user_and_class(actor.user_id(), class_id)
            .await?
            .is_some();

        Ok(ClassView {
            is_upcoming: listing.class.is_upcoming(now),
            is_past: listing.class.is_past(now),
            listing,
            counts,
            capacity,
            user_has_booking,
        })
    }
}
