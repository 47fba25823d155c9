//! Filesystem watcher for a wipman directory.
//!
//! Notifications from the OS are accumulated into bursts; once a burst has
//! been quiet for a while it is reduced to one event per path and handed to
//! a [`watcher::forward::Forward`] implementation.

pub mod config;
pub mod error;
pub mod inventory;
pub mod watcher;
