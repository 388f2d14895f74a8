//! Collaborators consumed by the editor core: id generation, time, and the
//! notification sink that the UI drains into toasts.

use ulid::Ulid;

/// Source of globally unique ids
pub trait IdGenerator {
    fn next_id(&mut self, prefix: &str) -> String;
}

/// ULID-based ids, sortable by creation time
#[derive(Debug, Default, Clone, Copy)]
pub struct UlidIds;

impl IdGenerator for UlidIds {
    fn next_id(&mut self, prefix: &str) -> String {
        format!("{}_{}", prefix, Ulid::new().to_string().to_lowercase())
    }
}

/// Deterministic ids (`node_1`, `node_2`, ...)
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{}_{}", prefix, self.next)
    }
}

/// Current time in epoch milliseconds
pub trait Clock {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Queue of notices waiting to be shown
#[derive(Debug, Default, Clone)]
pub struct Notifications {
    pending: Vec<Notice>,
}

impl Notifications {
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => log::warn!("{}", message),
            _ => log::info!("{}", message),
        }
        self.pending.push(Notice { level, message });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Take every pending notice, oldest first
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }
}
