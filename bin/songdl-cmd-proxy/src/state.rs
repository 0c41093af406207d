use std::sync::Arc;

use crate::config::Config;
use crate::policy::CommandPolicy;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub policy: CommandPolicy,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let policy = CommandPolicy::new(config.allowed.clone());
        Self {
            config: Arc::new(config),
            policy,
        }
    }
}
