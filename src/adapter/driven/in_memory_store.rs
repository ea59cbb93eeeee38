use crate::domain::model::{
    default_class_types, default_levels, Booking, BookingId, ClassId, ClassListing, ClassType,
    ClassTypeId, Instructor, InstructorId, Level, LevelId, ScheduledClass, StatusCounts, UserId,
};
use crate::domain::port::{
    BookingQuery, BookingRepository, BookingTimeframe, BookingTransition, ClassCatalogRepository,
    ClassChange, ClassQuery, RepositoryError, StoreError,
};
use crate::domain::service::{BookingPolicy, CapacityEvaluator};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct StoreState {
    class_types: HashMap<ClassTypeId, ClassType>,
    levels: HashMap<LevelId, Level>,
    instructors: HashMap<InstructorId, Instructor>,
    classes: HashMap<ClassId, ScheduledClass>,
    // 保存する予約はドメインイベントを取り出し済み
    bookings: HashMap<BookingId, Booking>,
}

impl StoreState {
    fn counts_for(&self, class_id: ClassId) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for booking in self.bookings.values().filter(|b| b.class_id() == class_id) {
            counts.add(booking.status(), 1);
        }
        counts
    }

    fn has_active_booking(&self, user_id: UserId, class_id: ClassId) -> bool {
        self.bookings.values().any(|b| {
            b.user_id() == user_id && b.class_id() == class_id && b.status().is_active()
        })
    }

    fn listing(&self, class: &ScheduledClass) -> Option<ClassListing> {
        let class_type = self.class_types.get(&class.class_type_id())?;
        let level = self.levels.get(&class.level_id())?;
        let instructor_name = class
            .instructor_id()
            .and_then(|id| self.instructors.get(&id))
            .map(|instructor| instructor.display_name.clone());

        Some(ClassListing {
            class: class.clone(),
            class_type_name: class_type.name.clone(),
            level_name: level.name.clone(),
            instructor_name,
        })
    }

    fn class_start(&self, class_id: ClassId) -> Option<DateTime<Utc>> {
        self.classes.get(&class_id).map(|class| class.start_time())
    }

    fn store_booking(&mut self, booking: &Booking) {
        let mut stored = booking.clone();
        stored.take_events();
        self.bookings.insert(stored.id(), stored);
    }
}

/// インメモリストア
/// 予約とクラスカタログの両方を1つの非同期Mutexの内側に保持する
/// Mutexを保持したまま判定と更新を行うため、MySQL実装のトランザクションと同じ原子性を持つ
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初期データ（クラス種別・レベル）を登録済みのストアを作成
    pub fn with_default_catalog() -> Self {
        let mut state = StoreState::default();
        for class_type in default_class_types() {
            state.class_types.insert(class_type.id, class_type);
        }
        for level in default_levels() {
            state.levels.insert(level.id, level);
        }
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn register_class_type(&self, class_type: ClassType) {
        self.state
            .lock()
            .await
            .class_types
            .insert(class_type.id, class_type);
    }

    pub async fn register_level(&self, level: Level) {
        self.state.lock().await.levels.insert(level.id, level);
    }

    pub async fn register_instructor(&self, instructor: Instructor) {
        self.state
            .lock()
            .await
            .instructors
            .insert(instructor.id, instructor);
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create_pending(&self, booking: &Booking) -> Result<ScheduledClass, StoreError> {
        let mut state = self.state.lock().await;
        let now = booking.booked_at();

        let class = state
            .classes
            .get(&booking.class_id())
            .cloned()
            .ok_or(StoreError::ClassNotFound(booking.class_id()))?;
        let counts = state.counts_for(class.id());
        let has_active = state.has_active_booking(booking.user_id(), class.id());

        let capacity = CapacityEvaluator::evaluate(&class, &counts, now);
        BookingPolicy::check_admission(&class, &capacity, has_active, now)?;

        state.store_booking(booking);
        Ok(class)
    }

    async fn apply_transition(
        &self,
        booking_id: BookingId,
        now: DateTime<Utc>,
        transition: BookingTransition,
    ) -> Result<(Booking, ScheduledClass), StoreError> {
        let mut state = self.state.lock().await;

        let mut booking = state
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or(StoreError::BookingNotFound(booking_id))?;
        let class = state
            .classes
            .get(&booking.class_id())
            .cloned()
            .ok_or(StoreError::ClassNotFound(booking.class_id()))?;

        let counts = state.counts_for(class.id());
        let capacity = CapacityEvaluator::evaluate(&class, &counts, now);
        transition(&mut booking, &class, &capacity)?;

        state.store_booking(&booking);
        Ok((booking, class))
    }

    async fn find_by_id(&self, booking_id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.state.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn find_active_by_user_and_class(
        &self,
        user_id: UserId,
        class_id: ClassId,
    ) -> Result<Option<Booking>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .bookings
            .values()
            .find(|b| b.user_id() == user_id && b.class_id() == class_id && b.status().is_active())
            .cloned())
    }

    async fn count_by_status(&self, class_id: ClassId) -> Result<StatusCounts, RepositoryError> {
        Ok(self.state.lock().await.counts_for(class_id))
    }

    async fn list(&self, query: BookingQuery) -> Result<Vec<Booking>, RepositoryError> {
        let state = self.state.lock().await;

        let mut entries: Vec<(DateTime<Utc>, Booking)> = state
            .bookings
            .values()
            .filter(|b| query.user_id.map_or(true, |user_id| b.user_id() == user_id))
            .filter_map(|b| state.class_start(b.class_id()).map(|start| (start, b.clone())))
            .filter(|(start, b)| match query.timeframe {
                BookingTimeframe::All => true,
                BookingTimeframe::Upcoming => *start > query.now && b.status().is_active(),
                BookingTimeframe::History => *start < query.now,
            })
            .collect();

        match query.timeframe {
            BookingTimeframe::All => entries.sort_by(|a, b| b.1.booked_at().cmp(&a.1.booked_at())),
            BookingTimeframe::Upcoming => entries.sort_by(|a, b| a.0.cmp(&b.0)),
            BookingTimeframe::History => entries.sort_by(|a, b| b.0.cmp(&a.0)),
        }

        Ok(entries.into_iter().map(|(_, booking)| booking).collect())
    }

    fn next_identity(&self) -> BookingId {
        BookingId::new()
    }
}

#[async_trait]
impl ClassCatalogRepository for InMemoryStore {
    async fn save(&self, class: &ScheduledClass) -> Result<(), RepositoryError> {
        self.state
            .lock()
            .await
            .classes
            .insert(class.id(), class.clone());
        Ok(())
    }

    async fn update_class(
        &self,
        class_id: ClassId,
        change: ClassChange,
    ) -> Result<ScheduledClass, StoreError> {
        let mut state = self.state.lock().await;
        let class = state
            .classes
            .get_mut(&class_id)
            .ok_or(StoreError::ClassNotFound(class_id))?;
        change(class);
        Ok(class.clone())
    }

    async fn find_by_id(&self, class_id: ClassId) -> Result<Option<ScheduledClass>, RepositoryError> {
        Ok(self.state.lock().await.classes.get(&class_id).cloned())
    }

    async fn find_listing(&self, class_id: ClassId) -> Result<Option<ClassListing>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .classes
            .get(&class_id)
            .and_then(|class| state.listing(class)))
    }

    async fn list_listings(&self, query: ClassQuery) -> Result<Vec<ClassListing>, RepositoryError> {
        let state = self.state.lock().await;

        let mut listings: Vec<ClassListing> = state
            .classes
            .values()
            .filter(|c| query.class_type_id.map_or(true, |id| c.class_type_id() == id))
            .filter(|c| query.level_id.map_or(true, |id| c.level_id() == id))
            .filter(|c| query.instructor_id.map_or(true, |id| c.instructor_id() == Some(id)))
            .filter(|c| query.is_active.map_or(true, |active| c.is_active() == active))
            .filter(|c| match (query.is_upcoming, query.now) {
                (Some(upcoming), Some(now)) => c.is_upcoming(now) == upcoming,
                _ => true,
            })
            .filter_map(|c| state.listing(c))
            .collect();

        listings.sort_by_key(|listing| listing.class.start_time());
        Ok(listings)
    }

    async fn find_class_type(
        &self,
        class_type_id: ClassTypeId,
    ) -> Result<Option<ClassType>, RepositoryError> {
        Ok(self.state.lock().await.class_types.get(&class_type_id).cloned())
    }

    async fn find_level(&self, level_id: LevelId) -> Result<Option<Level>, RepositoryError> {
        Ok(self.state.lock().await.levels.get(&level_id).cloned())
    }

    async fn find_instructor(
        &self,
        instructor_id: InstructorId,
    ) -> Result<Option<Instructor>, RepositoryError> {
        Ok(self.state.lock().await.instructors.get(&instructor_id).cloned())
    }

    fn next_identity(&self) -> ClassId {
        ClassId::new()
    }
}
