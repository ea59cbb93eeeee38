use crate::application::service::BookingDetails;
use crate::application::ApplicationError;
use crate::domain::model::{Actor, Booking, BookingId, ClassId, ClassListing};
use crate::domain::port::{
    BookingQuery, BookingRepository, BookingTimeframe, ClassCatalogRepository, Clock,
};
use std::collections::HashMap;
use std::sync::Arc;

/// 予約クエリサービス
/// 読み取り専用の予約操作を提供する
/// 会員は自分の予約のみ、スタッフはすべての予約を参照できる
pub struct BookingQueryService {
    booking_repository: Arc<dyn BookingRepository>,
    class_repository: Arc<dyn ClassCatalogRepository>,
    clock: Arc<dyn Clock>,
}

impl BookingQueryService {
    /// 新しい予約クエリサービスを作成
    ///
    /// # Arguments
    /// * `booking_repository` - 予約リポジトリ
    /// * `class_repository` - クラスカタログリポジトリ
    /// * `clock` - 現在時刻
    pub fn new(
        booking_repository: Arc<dyn BookingRepository>,
        class_repository: Arc<dyn ClassCatalogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            booking_repository,
            class_repository,
            clock,
        }
    }

    /// 予約IDで予約を取得
    /// 参照権限のない予約は存在しないものとして扱う
    ///
    /// # Returns
    /// * `Ok(BookingDetails)` - 予約が見つかった
    /// * `Err(ApplicationError::NotFound)` - 見つからない、または参照できない
    pub async fn get_booking(
        &self,
        actor: &Actor,
        booking_id: BookingId,
    ) -> Result<BookingDetails, ApplicationError> {
        let booking = self
            .booking_repository
            .find_by_id(booking_id)
            .await?
            .filter(|booking| actor.can_act_for(booking.user_id()))
            .ok_or_else(|| {
                ApplicationError::NotFound(format!("予約が見つかりません: {}", booking_id))
            })?;

        let mut listings = HashMap::new();
        self.attach_class(booking, &mut listings).await
    }

    /// 参照できるすべての予約を取得（予約日時の降順）
    pub async fn list_bookings(&self, actor: &Actor) -> Result<Vec<BookingDetails>, ApplicationError> {
        self.list(actor, BookingTimeframe::All).await
    }

    /// これから始まるクラスの有効な予約を取得（開始時刻の昇順）
    pub async fn upcoming_bookings(
        &self,
        actor: &Actor,
    ) -> Result<Vec<BookingDetails>, ApplicationError> {
        self.list(actor, BookingTimeframe::Upcoming).await
    }

    /// 開始済みのクラスの予約を取得（開始時刻の降順）
    pub async fn booking_history(
        &self,
        actor: &Actor,
    ) -> Result<Vec<BookingDetails>, ApplicationError> {
        self.list(actor, BookingTimeframe::History).await
    }

    async fn list(
        &self,
        actor: &Actor,
        timeframe: BookingTimeframe,
    ) -> Result<Vec<BookingDetails>, ApplicationError> {
        let query = BookingQuery {
            user_id: if actor.is_staff() {
                None
            } else {
                Some(actor.user_id())
            },
            timeframe,
            now: self.clock.now(),
        };
        let bookings = self.booking_repository.list(query).await?;

        let mut listings = HashMap::new();
        let mut details = Vec::with_capacity(bookings.len());
        for booking in bookings {
            details.push(self.attach_class(booking, &mut listings).await?);
        }
        Ok(details)
    }

    // 同じクラスの名称解決は一度だけ行う
    async fn attach_class(
        &self,
        booking: Booking,
        listings: &mut HashMap<ClassId, ClassListing>,
    ) -> Result<BookingDetails, ApplicationError> {
        let class_id = booking.class_id();
        let class = match listings.get(&class_id) {
            Some(listing) => listing.clone(),
            None => {
                let listing = self
                    .class_repository
                    .find_listing(class_id)
                    .await?
                    .ok_or_else(|| {
                        ApplicationError::NotFound(format!("クラスが見つかりません: {}", class_id))
                    })?;
                listings.insert(class_id, listing.clone());
                listing
            }
        };
        Ok(BookingDetails { booking, class })
    }
}
