//! Message construction and delivery.

pub mod announcements;
pub mod dispatcher;
pub mod messages;

pub use announcements::{announce, AnnouncementTemplate, TemplateStore};
pub use dispatcher::{DeliveryFailure, NotificationDispatcher};
