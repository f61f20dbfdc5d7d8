pub mod api;
pub mod public;

use std::sync::Arc;

use crate::chat::backend::ChatBackend;
use crate::cms::{CmsGateway, ContentSource};
use crate::email::Mailer;
use crate::forms::ContactRelay;

/// Upstream services shared by every handler.
pub struct Services {
    pub cms: Arc<dyn ContentSource>,
    /// `None` when no completion API key is configured.
    pub chat: Option<Arc<dyn ChatBackend>>,
    pub mailer: Arc<dyn Mailer>,
    pub relay: ContactRelay,
}

impl Services {
    pub fn gateway(&self) -> CmsGateway<Arc<dyn ContentSource>> {
        CmsGateway::new(self.cms.clone())
    }
}
