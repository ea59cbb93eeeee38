pub mod confirmation_link;
pub mod error;
pub mod service;

pub use confirmation_link::ConfirmationLinkBuilder;
pub use error::ApplicationError;
