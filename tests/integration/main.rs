#[path = "../common/mod.rs"]
mod common;

mod cli_entries;
mod watcher;
