//! Deck data model shared by the assembler, publisher and exporter

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Text of one slide in blank-deck mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideContent {
    pub title: String,
    pub body: String,
}

impl SlideContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A presentation created by the assembler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckRef {
    pub presentation_id: String,
    pub title: String,
    /// Slide object ids in presentation order
    pub slide_ids: Vec<String>,
}

impl DeckRef {
    pub fn new(presentation_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            presentation_id: presentation_id.into(),
            title: title.into(),
            slide_ids: Vec::new(),
        }
    }

    pub fn edit_url(&self) -> String {
        format!(
            "https://docs.google.com/presentation/d/{}/edit",
            self.presentation_id
        )
    }
}

/// Public view link returned by the publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareLink {
    pub url: String,
}

/// Deck title from the content title, then the topic, then a timestamp
pub fn deck_title(content_title: Option<&str>, topic: Option<&str>, now: DateTime<Utc>) -> String {
    fn pick(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }

    match pick(content_title).or_else(|| pick(topic)) {
        Some(name) => format!("{} | {}", name, now.format("%Y-%m-%d")),
        None => format!("Lesson Deck - {}", now.format("%Y-%m-%d %H:%M:%S")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_deck_title_fallbacks() {
        assert_eq!(
            deck_title(Some(" Knowing Yourself "), Some("topic"), now()),
            "Knowing Yourself | 2026-03-09"
        );
        assert_eq!(
            deck_title(Some("  "), Some("Self awareness"), now()),
            "Self awareness | 2026-03-09"
        );
        assert_eq!(deck_title(None, None, now()), "Lesson Deck - 2026-03-09 14:05:07");
    }

    #[test]
    fn test_edit_url() {
        let deck = DeckRef::new("abc123", "Deck");
        assert_eq!(deck.edit_url(), "https://docs.google.com/presentation/d/abc123/edit");
        assert!(deck.slide_ids.is_empty());
    }
}
