pub mod events;
pub mod watcher;

pub use events::InboxEvent;
pub use watcher::{is_image_file, setup_inbox_watcher};
