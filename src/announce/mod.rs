// src/announce/mod.rs
//! Announcement channel collaborator. Failures here never undo a publish.

pub mod discord;
pub mod twitter;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AnnouncementError;
use crate::publish::PublicationHandle;

pub use discord::DiscordAnnouncer;
pub use twitter::TwitterAnnouncer;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AnnouncementHandle {
    pub channel: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(
        &self,
        text: &str,
        publication: &PublicationHandle,
    ) -> Result<AnnouncementHandle, AnnouncementError>;

    fn channel(&self) -> &'static str;
}

/// `text` followed by a link line, shortened (with an ellipsis) so the whole
/// message fits in `limit` characters. The link is never cut.
pub fn compose_announcement(text: &str, url: &str, limit: usize) -> String {
    let suffix = format!("\n\nRead the full article: {url}");
    let text = text.trim();
    let room = limit.saturating_sub(suffix.chars().count());
    let body = if text.chars().count() <= room {
        text.to_string()
    } else if room <= 1 {
        String::new()
    } else {
        let cut: String = text.chars().take(room - 1).collect();
        format!("{}…", cut.trim_end())
    };
    format!("{body}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_kept_whole() {
        let s = compose_announcement(" Big news ", "https://x.test/1", 280);
        assert_eq!(s, "Big news\n\nRead the full article: https://x.test/1");
    }

    #[test]
    fn long_text_is_shortened_to_the_limit() {
        let text = "é".repeat(500);
        let s = compose_announcement(&text, "https://x.test/1", 280);
        assert_eq!(s.chars().count(), 280);
        assert!(s.ends_with("https://x.test/1"));
        assert!(s.contains('…'));
    }
}
