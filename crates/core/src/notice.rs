//! Transient user-facing notices ("Movie added successfully", ...).
//!
//! [`NoticeQueue`] is plain data with an explicit clock so it can be driven
//! in tests; [`NoticeBoard`] shares one queue across tasks and dismisses each
//! notice on its own timer.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Default lifetime of a notice.
pub const DEFAULT_AUTO_DISMISS: Duration = Duration::from_millis(6000);

pub const MOVIE_ADDED: &str = "Movie added successfully";
pub const MOVIE_ADD_FAILED: &str = "Failed to add movie";
pub const MOVIE_DELETED: &str = "Movie deleted successfully";
pub const MOVIE_DELETE_FAILED: &str = "Failed to delete movie";
pub const MOVIES_IMPORTED: &str = "Movies imported successfully";
pub const IMPORT_FAILED: &str = "Failed to import movies";
pub const IMPORT_FILE_EMPTY: &str = "The file is empty";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub raised_at: Instant,
}

/// FIFO of active notices.
#[derive(Debug)]
pub struct NoticeQueue {
    auto_dismiss: Duration,
    next_id: u64,
    notices: VecDeque<Notice>,
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_DISMISS)
    }
}

impl NoticeQueue {
    pub fn new(auto_dismiss: Duration) -> Self {
        Self {
            auto_dismiss,
            next_id: 0,
            notices: VecDeque::new(),
        }
    }

    pub fn auto_dismiss(&self) -> Duration {
        self.auto_dismiss
    }

    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, now: Instant) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.notices.push_back(Notice {
            id,
            level,
            message: message.into(),
            raised_at: now,
        });
        id
    }

    /// Remove a notice. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// Drop every notice that has outlived the auto-dismiss duration.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.notices.len();
        let ttl = self.auto_dismiss;
        self.notices
            .retain(|n| now.saturating_duration_since(n.raised_at) < ttl);
        before - self.notices.len()
    }

    pub fn active(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

/// Shared, self-dismissing notice queue.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    queue: Arc<RwLock<NoticeQueue>>,
}

impl NoticeBoard {
    pub fn new(auto_dismiss: Duration) -> Self {
        Self {
            queue: Arc::new(RwLock::new(NoticeQueue::new(auto_dismiss))),
        }
    }

    /// Post a notice and schedule its dismissal. Must be called from within
    /// a Tokio runtime.
    pub async fn post(&self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        let (id, ttl) = {
            let mut queue = self.queue.write().await;
            (queue.push(level, message.as_str(), Instant::now()), queue.auto_dismiss())
        };
        debug!(id, ?level, %message, "Notice posted");

        let queue = Arc::clone(&self.queue);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if queue.write().await.dismiss(id) {
                debug!(id, "Notice auto-dismissed");
            }
        });
        id
    }

    pub async fn success(&self, message: impl Into<String>) -> u64 {
        self.post(NoticeLevel::Success, message).await
    }

    pub async fn error(&self, message: impl Into<String>) -> u64 {
        self.post(NoticeLevel::Error, message).await
    }

    pub async fn dismiss(&self, id: u64) -> bool {
        self.queue.write().await.dismiss(id)
    }

    /// Notices currently on screen, oldest first.
    pub async fn snapshot(&self) -> Vec<Notice> {
        self.queue.read().await.active().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expire_uses_auto_dismiss_duration() {
        let mut queue = NoticeQueue::default();
        let start = Instant::now();
        queue.push(NoticeLevel::Success, MOVIE_ADDED, start);
        queue.push(NoticeLevel::Error, IMPORT_FAILED, start + Duration::from_millis(3000));

        assert_eq!(queue.expire(start + Duration::from_millis(5999)), 0);
        assert_eq!(queue.expire(start + Duration::from_millis(6000)), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.active().next().map(|n| n.message.as_str()), Some(IMPORT_FAILED));
    }

    #[tokio::test]
    async fn test_manual_dismiss() {
        let mut queue = NoticeQueue::default();
        let id = queue.push(NoticeLevel::Success, MOVIE_DELETED, Instant::now());
        assert!(queue.dismiss(id));
        assert!(!queue.dismiss(id));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_board_auto_dismisses() {
        let board = NoticeBoard::new(Duration::from_millis(20));
        board.success(MOVIES_IMPORTED).await;
        assert_eq!(board.snapshot().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(board.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_board_preserves_order_and_level() {
        let board = NoticeBoard::default();
        board.error(MOVIE_ADD_FAILED).await;
        board.success(MOVIE_ADDED).await;

        let notices = board.snapshot().await;
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[1].message, MOVIE_ADDED);
    }
}
