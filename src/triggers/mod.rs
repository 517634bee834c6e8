/// File discovery, classification and change subscriptions
pub mod file_watcher;

pub use file_watcher::{
    change_event, classify, discover, ChangeKind, Discovery, FileChange, FileChangeWatcher,
    FileKind, WatchStats,
};
