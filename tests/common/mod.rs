#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

use storefront_api::{
    config::{AppConfig, TelegramConfig},
    db,
    entities::{category, customer, product, CategoryModel, CustomerModel, ProductModel},
    events,
    notifications::{NotificationError, Notifier},
    AppState,
};

/// Captures every notification instead of delivering it, so tests can
/// assert on traffic.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotificationError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Test harness: application state over a fresh file-backed SQLite database
/// in a temporary directory.
pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = dir.path().join("storefront_test.db");
        let media_root = dir.path().join("media");

        let cfg = AppConfig {
            database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
            host: "127.0.0.1".into(),
            port: 0,
            environment: "test".into(),
            log_level: "warn".into(),
            log_json: false,
            auto_migrate: true,
            jwt_secret: "test_secret_key_for_testing_purposes_only".into(),
            jwt_expiration_secs: 3600,
            media_root: media_root.display().to_string(),
            site_url: String::new(),
            telegram: TelegramConfig::default(),
        };

        let pool = db::establish_connection(&cfg.database_url)
            .await
            .expect("failed to create test database");
        db::create_schema(&pool)
            .await
            .expect("failed to create schema");

        let (event_sender, event_rx) = events::channel(64);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::build_with_notifier(pool, cfg, event_sender, notifier.clone());

        Self {
            state,
            notifier,
            _dir: dir,
            _event_task: event_task,
        }
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifier.messages()
    }

    pub async fn seed_category(&self, name: &str, slug: &str) -> CategoryModel {
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            description: Set(String::new()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed category")
    }

    pub async fn seed_product(
        &self,
        category_id: Uuid,
        name: &str,
        price: Decimal,
        quantity: i32,
    ) -> ProductModel {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(String::new()),
            short_description: Set(String::new()),
            price: Set(price),
            old_price: Set(None),
            quantity: Set(quantity),
            category_id: Set(category_id),
            image: Set(None),
            is_active: Set(true),
            is_featured: Set(false),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed product")
    }

    pub async fn seed_customer(&self, email: &str, phone: &str, staff: bool) -> CustomerModel {
        let password_hash = self
            .state
            .auth
            .hash_password("test-password")
            .expect("failed to hash password");
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.to_string()),
            phone: Set(phone.to_string()),
            first_name: Set("Иван".to_string()),
            last_name: Set("Иванов".to_string()),
            patronymic: Set(String::new()),
            address: Set(String::new()),
            password_hash: Set(password_hash),
            is_staff: Set(staff),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed customer")
    }

    pub async fn product_quantity(&self, product_id: Uuid) -> i32 {
        use sea_orm::EntityTrait;
        storefront_api::entities::Product::find_by_id(product_id)
            .one(&*self.state.db)
            .await
            .expect("product query failed")
            .expect("product not found")
            .quantity
    }
}
