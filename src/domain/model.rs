// ドメインモデル（エンティティと値オブジェクト）

mod actor;
mod booking;
mod catalog;
mod confirmation_token;
mod scheduled_class;
mod value_objects;

pub use value_objects::{
    BookingId, ClassId, UserId,
    ClassTypeId, LevelId, InstructorId,
    Price,
    BookingStatus,
    StatusCounts,
};

pub use actor::{Actor, Role};
pub use booking::{Booking, BookingRecord};
pub use catalog::{default_class_types, default_levels, ClassListing, ClassType, Instructor, Level};
pub use confirmation_token::ConfirmationToken;
pub use scheduled_class::{ClassDetails, ScheduledClass};
