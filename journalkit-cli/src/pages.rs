//! Journal page collection, serialized inside the encrypted payload.
//!
//! The vault core treats content as opaque bytes; page structure lives
//! entirely on this side of the seam. Payloads that predate the JSON format
//! (including the placeholder written at vault creation) decode as a single
//! legacy page, so older vaults still open.

use serde::{Deserialize, Serialize};

/// One journal page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalPage {
    /// Stable identifier, assigned when the page is created.
    pub id: String,
    /// Display title; unique within a book as far as this CLI is concerned.
    pub title: String,
    /// Page body text.
    pub body: String,
    /// Seconds since the Unix epoch of the last edit.
    pub updated_at: u64,
}

/// The full page collection plus a pointer to the active page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBook {
    /// Pages in creation order.
    pub pages: Vec<JournalPage>,
    /// Id of the page an editor should open first.
    pub active_page: Option<String>,
}

impl PageBook {
    /// Decodes a decrypted payload.
    ///
    /// Non-JSON payloads are wrapped as a single legacy page rather than
    /// rejected.
    #[must_use]
    pub fn decode(payload: &[u8]) -> Self {
        if let Ok(book) = serde_json::from_slice::<Self>(payload) {
            return book;
        }

        let body = String::from_utf8_lossy(payload).into_owned();
        Self {
            pages: vec![JournalPage {
                id: "page-1".to_string(),
                title: "Journal".to_string(),
                body,
                updated_at: 0,
            }],
            active_page: Some("page-1".to_string()),
        }
    }

    /// Encodes the book for encryption.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Looks up a page by title.
    #[must_use]
    pub fn page_by_title(&self, title: &str) -> Option<&JournalPage> {
        self.pages.iter().find(|page| page.title == title)
    }

    /// Returns the page the active pointer names, or the first page when no
    /// pointer is set.
    #[must_use]
    pub fn active(&self) -> Option<&JournalPage> {
        match &self.active_page {
            Some(id) => self.pages.iter().find(|page| &page.id == id),
            None => self.pages.first(),
        }
    }

    /// Creates or replaces the page with the given title and makes it active.
    pub fn upsert_page(&mut self, title: &str, body: &str) {
        let updated_at = unix_now();

        if let Some(page) = self.pages.iter_mut().find(|page| page.title == title) {
            page.body = body.to_string();
            page.updated_at = updated_at;
            let id = page.id.clone();
            self.active_page = Some(id);
            return;
        }

        let id = format!("page-{}", self.pages.len() + 1);
        self.pages.push(JournalPage {
            id: id.clone(),
            title: title.to_string(),
            body: body.to_string(),
            updated_at,
        });
        self.active_page = Some(id);
    }
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
