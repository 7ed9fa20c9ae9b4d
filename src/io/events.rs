use std::path::PathBuf;

#[derive(Debug)]
pub enum InboxEvent {
    NewImage(PathBuf),
    WatchError(String),
}
