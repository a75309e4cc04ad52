use std::sync::Arc;

use tracing::warn;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    Hub, IdentityProvider, LogNotifier, MovementService, Notifier, SeaOrmMovementService,
    SeaOrmUserService, TokenIdentity, UserService,
};

/// Long-lived services shared by every request handler.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub hub: Hub,

    pub identity: Arc<dyn IdentityProvider>,

    pub user_service: Arc<dyn UserService>,

    pub movement_service: Arc<dyn MovementService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let notifier = Arc::new(LogNotifier::new(&config.smtp));
        Self::with_notifier(config, notifier).await
    }

    pub async fn with_notifier(
        config: Config,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        Ok(Self::from_parts(config, store, notifier))
    }

    #[must_use]
    pub fn from_parts(config: Config, store: Store, notifier: Arc<dyn Notifier>) -> Self {
        if let Some(cache_url) = &config.auth.cache_url {
            warn!(
                cache_url = %cache_url,
                "External credential cache is not supported; credentials are kept in process"
            );
        }

        let hub = Hub::spawn(config.server.ws_client_buffer);
        let identity = Arc::new(TokenIdentity::new(store.clone(), &config.auth));
        let user_service = Arc::new(SeaOrmUserService::new(
            store.clone(),
            config.security.clone(),
            notifier,
        ));
        let movement_service = Arc::new(SeaOrmMovementService::new(store.clone()));

        Self {
            config: Arc::new(config),
            store,
            hub,
            identity,
            user_service,
            movement_service,
        }
    }
}
