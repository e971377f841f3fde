//! Publisher: "anyone with the link can view" plus the share link

use crate::deck::ShareLink;
use crate::error::Result;
use crate::google::{DriveApi, Permission};
use std::sync::Arc;

pub struct Publisher {
    drive: Arc<dyn DriveApi>,
}

impl Publisher {
    pub fn new(drive: Arc<dyn DriveApi>) -> Self {
        Self { drive }
    }

    /// Make `deck_id` publicly viewable and return its `webViewLink`.
    ///
    /// The permission list is read first, so publishing twice creates the
    /// permission at most once.
    pub async fn publish(&self, deck_id: &str) -> Result<ShareLink> {
        let existing = self.drive.list_permissions(deck_id).await?;

        if existing.iter().any(Permission::grants_public_view) {
            tracing::debug!("{} is already viewable by anyone with the link", deck_id);
        } else {
            self.drive
                .create_permission(deck_id, &Permission::anyone_reader())
                .await?;
            tracing::info!("Shared {} with anyone with the link", deck_id);
        }

        let url = self.drive.web_view_link(deck_id).await?;
        Ok(ShareLink { url })
    }
}
