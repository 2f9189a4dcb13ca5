use std::path::Path;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::info;

use crate::config::Config;
use crate::db::Store;
use crate::domain::events::UserEvent;
use crate::forms::{RequestPasswordFormFactory, UserFormDataProvider, UserFormFactory};
use crate::i18n::{MessageCatalog, Translator};
use crate::services::{
    AddressesUserDataProvider, Authenticator, LogService, Passwords, UserDataRegistry,
    UserManager, UsernameAuthenticator,
};

/// Everything the HTTP layer and the CLI need, wired once.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub passwords: Passwords,

    pub translator: Arc<dyn Translator>,

    pub event_bus: broadcast::Sender<UserEvent>,

    pub log_service: Arc<LogService>,

    pub user_manager: UserManager,

    pub authenticator: Arc<dyn Authenticator>,

    pub user_data: Arc<UserDataRegistry>,

    pub user_form_providers: Vec<Arc<dyn UserFormDataProvider>>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<UserEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let translator: Arc<dyn Translator> = match &config.i18n.catalog_path {
            Some(path) => {
                info!(path = %path, "Loading message catalog");
                Arc::new(MessageCatalog::load_with_overrides(Path::new(path))?)
            }
            None => Arc::new(MessageCatalog::with_defaults()),
        };

        let passwords = Passwords::new(&config.security);

        let log_service = Arc::new(LogService::new(store.clone(), event_bus.clone()));
        log_service.clone().start_listener();

        let user_manager = UserManager::new(
            store.clone(),
            event_bus.clone(),
            config.security.password_reset_token_ttl_minutes,
        );

        let authenticator = Arc::new(
            UsernameAuthenticator::new(
                store.clone(),
                passwords,
                user_manager.clone(),
                translator.clone(),
                event_bus.clone(),
            )
            .with_auto_rehash(config.security.auto_migrate_password_hashes),
        ) as Arc<dyn Authenticator>;

        let mut user_data = UserDataRegistry::new();
        user_data.register(Arc::new(AddressesUserDataProvider::new(
            store.clone(),
            event_bus.clone(),
        )));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            passwords,
            translator,
            event_bus,
            log_service,
            user_manager,
            authenticator,
            user_data: Arc::new(user_data),
            user_form_providers: Vec::new(),
        })
    }

    /// Register a field provider for the user profile form.
    #[must_use]
    pub fn with_user_form_provider(mut self, provider: Arc<dyn UserFormDataProvider>) -> Self {
        self.user_form_providers.push(provider);
        self
    }

    #[must_use]
    pub fn user_form_factory(&self) -> UserFormFactory {
        self.user_form_providers.iter().cloned().fold(
            UserFormFactory::new(
                self.store.clone(),
                self.passwords,
                self.translator.clone(),
                self.event_bus.clone(),
            ),
            UserFormFactory::with_provider,
        )
    }

    #[must_use]
    pub fn request_password_form_factory(&self) -> RequestPasswordFormFactory {
        RequestPasswordFormFactory::new(self.user_manager.clone(), self.translator.clone())
    }
}
