use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::trace::trace::TraceEvent;

struct TraceSink {
    path: PathBuf,
    file: Mutex<File>,
}

/// JSONL sink for fill traces, one `TraceEvent` per line. Without a sink
/// every event is dropped; callers skip building events when
/// `is_enabled` is false.
pub struct TraceLogger {
    sink: Option<TraceSink>,
}

impl TraceLogger {
    /// Append to `path`. An unopenable file leaves the logger disabled.
    pub fn new(path: &Path) -> Self {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                sink: Some(TraceSink {
                    path: path.to_path_buf(),
                    file: Mutex::new(file),
                }),
            },
            Err(e) => {
                warn!("trace disabled, cannot open '{}': {}", path.display(), e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(operation = %event.operation, "trace event not serializable: {}", e);
                return;
            }
        };

        let Ok(mut file) = sink.file.lock() else {
            warn!(path = %sink.path.display(), "trace file lock poisoned");
            return;
        };
        match writeln!(file, "{}", line) {
            Ok(()) => debug!(path = %sink.path.display(), operation = %event.operation, "trace written"),
            Err(e) => warn!(path = %sink.path.display(), "trace write failed: {}", e),
        }
    }
}
