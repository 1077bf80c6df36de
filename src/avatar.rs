//! Avatar workflow
//!
//! Show, upload and clear the current user's avatar. The session is passed
//! in explicitly; the store never sees it.

use crate::session::{Session, AVATAR_PATH_KEY};
use crate::store::{AssetPath, AssetStore, Upload};
use serde::Serialize;
use std::sync::Arc;

/// View model for the avatar page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvatarView {
    pub avatar_path: String,
}

/// Avatar actions over a shared asset store
#[derive(Clone)]
pub struct AvatarService {
    store: Arc<dyn AssetStore>,
}

impl AvatarService {
    pub fn new(store: Arc<dyn AssetStore>) -> Self {
        Self { store }
    }

    /// Current avatar, or the default when the session has none
    pub fn show(&self, session: &dyn Session) -> AvatarView {
        let avatar_path = session
            .get(AVATAR_PATH_KEY)
            .unwrap_or_else(|| self.store.default_path().to_string());
        AvatarView { avatar_path }
    }

    /// Store an upload and remember it in the session.
    ///
    /// Without a usable upload, or when storing fails, the view shows the
    /// default avatar and the session keeps its previous value.
    pub fn upload(&self, session: &mut dyn Session, upload: Option<&Upload>) -> AvatarView {
        let path = self.store_upload(upload);
        self.remember(session, path)
    }

    /// Storage half of `upload`. Touches no session, so callers can run it
    /// without holding any session lock.
    pub fn store_upload(&self, upload: Option<&Upload>) -> AssetPath {
        match upload {
            Some(upload) => self.store.put(&upload.content, &upload.extension),
            None => AssetPath::Default(self.store.default_path().to_string()),
        }
    }

    /// Session half of `upload`: record a stored asset and build the view
    pub fn remember(&self, session: &mut dyn Session, path: AssetPath) -> AvatarView {
        if let AssetPath::Stored(asset) = &path {
            session.set(AVATAR_PATH_KEY, asset.public_path.clone());
        }

        AvatarView {
            avatar_path: path.into_string(),
        }
    }

    /// Reset the session to the default avatar
    pub fn clear(&self, session: &mut dyn Session) -> AvatarView {
        let default_path = self.store.clear();
        session.set(AVATAR_PATH_KEY, default_path.clone());
        AvatarView {
            avatar_path: default_path,
        }
    }
}
