pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod media;
pub mod notifications;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::{
    auth::AuthService,
    config::AppConfig,
    events::EventSender,
    handlers::AppServices,
    media::MediaStore,
    notifications::{NoopNotifier, Notifier, TelegramNotifier},
    services::{
        carts::CartService, catalog::CatalogService, chat::ChatService,
        checkout::CheckoutService, customers::CustomerService, import::ImportService,
        orders::OrderService,
    },
};

/// Shared application state for handlers and extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
}

impl AppState {
    /// Wires services against a connected database.
    ///
    /// The notifier is picked from configuration: Telegram when credentials
    /// are present, a no-op otherwise.
    pub fn build(db: DatabaseConnection, config: AppConfig, event_sender: EventSender) -> Self {
        let notifier: Arc<dyn Notifier> = match TelegramNotifier::from_config(&config.telegram) {
            Some(notifier) => Arc::new(notifier),
            None => Arc::new(NoopNotifier),
        };
        Self::build_with_notifier(db, config, event_sender, notifier)
    }

    /// Same as [`AppState::build`] but with an explicit notifier; tests use
    /// this to observe notification traffic.
    pub fn build_with_notifier(
        db: DatabaseConnection,
        config: AppConfig,
        event_sender: EventSender,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let db = Arc::new(db);
        let config = Arc::new(config);
        let event_sender = Arc::new(event_sender);
        let auth = Arc::new(AuthService::new(
            config.jwt_secret.clone(),
            Duration::from_secs(config.jwt_expiration_secs),
        ));
        let media = MediaStore::new(config.media_root.clone());

        let services = AppServices {
            catalog: Arc::new(CatalogService::new(db.clone())),
            carts: Arc::new(CartService::new(db.clone(), event_sender.clone())),
            checkout: Arc::new(CheckoutService::new(
                db.clone(),
                event_sender.clone(),
                notifier.clone(),
                config.site_url.clone(),
            )),
            orders: Arc::new(OrderService::new(
                db.clone(),
                event_sender.clone(),
                notifier,
            )),
            customers: Arc::new(CustomerService::new(
                db.clone(),
                auth.clone(),
                event_sender.clone(),
            )),
            import: Arc::new(ImportService::new(
                db.clone(),
                media,
                event_sender.clone(),
            )),
            chat: Arc::new(ChatService::new(db.clone(), event_sender.clone())),
        };

        Self {
            db,
            config,
            auth,
            event_sender,
            services,
        }
    }
}
