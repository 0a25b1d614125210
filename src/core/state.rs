use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::question_selector::SelectorConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    selector: SelectorConfig,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool) -> Self {
        let selector = SelectorConfig::from_settings(settings.adaptive());
        Self { inner: Arc::new(InnerState { settings, db, selector }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn selector(&self) -> &SelectorConfig {
        &self.inner.selector
    }
}
