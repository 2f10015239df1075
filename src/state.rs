use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let idle = Duration::from_secs(config.session.idle_minutes * 60);
        Self {
            config: Arc::new(config),
            sessions: SessionStore::new(idle),
        }
    }
}
