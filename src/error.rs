use std::path::PathBuf;

/// Errors raised while setting up or running the watcher.
///
/// Startup variants (`RootNotFound`, `RootNotADirectory`, `Backend`) are fatal.
/// The rest are scoped to a single event or path and get logged by the caller.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("watch root {0} does not exist")]
    RootNotFound(PathBuf),

    #[error("watch root {0} is a file, expected a directory")]
    RootNotADirectory(PathBuf),

    #[error("unknown operation kind {kind} for {path}")]
    UnknownOperationKind { kind: String, path: PathBuf },

    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to start filesystem watcher: {0}")]
    Backend(#[source] notify::Error),

    #[error("failed to listen for the interrupt signal: {0}")]
    Signal(#[source] std::io::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WatchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
