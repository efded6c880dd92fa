/// Generic building blocks shared by the renderer

pub mod storage;
pub mod event_sender;
pub mod transform;

pub use storage::{Id, Storage, NULL_ID};
pub use event_sender::{EventSender, SubscriptionId};
pub use transform::Transform;
