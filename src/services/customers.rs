use crate::{
    auth::AuthService,
    entities::{customer, Customer, CustomerModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Registration form. Email is the login; phone is required and unique.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email(message = "invalid email"))]
    pub email: String,
    #[validate(length(min = 5, max = 20, message = "invalid phone number"))]
    pub phone: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(default)]
    pub patronymic: String,
    #[serde(default)]
    pub address: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    event_sender: Arc<EventSender>,
}

impl CustomerService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    /// Registers a new customer account.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<CustomerModel, ServiceError> {
        input.validate()?;

        let email_taken = Customer::find()
            .filter(customer::Column::Email.eq(&input.email))
            .one(&*self.db)
            .await?
            .is_some();
        if email_taken {
            return Err(ServiceError::Conflict(
                "email is already registered".to_string(),
            ));
        }

        let phone_taken = Customer::find()
            .filter(customer::Column::Phone.eq(&input.phone))
            .one(&*self.db)
            .await?
            .is_some();
        if phone_taken {
            return Err(ServiceError::Conflict(
                "phone number is already registered".to_string(),
            ));
        }

        let password_hash = self.auth.hash_password(&input.password)?;
        let customer_id = Uuid::new_v4();

        let model = customer::ActiveModel {
            id: Set(customer_id),
            email: Set(input.email),
            phone: Set(input.phone),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            patronymic: Set(input.patronymic),
            address: Set(input.address),
            password_hash: Set(password_hash),
            is_staff: Set(false),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CustomerRegistered(customer_id))
            .await;

        info!(customer_id = %customer_id, "customer registered");
        Ok(created)
    }

    /// Verifies credentials and issues a bearer token.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(CustomerModel, String), ServiceError> {
        let customer = Customer::find()
            .filter(customer::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("invalid email or password".to_string()))?;

        if !customer.is_active {
            return Err(ServiceError::AuthError("account is disabled".to_string()));
        }
        if !self.auth.verify_password(password, &customer.password_hash) {
            return Err(ServiceError::AuthError(
                "invalid email or password".to_string(),
            ));
        }

        let token = self.auth.issue_token(&customer)?;
        Ok((customer, token))
    }

    pub async fn get(&self, customer_id: Uuid) -> Result<CustomerModel, ServiceError> {
        Customer::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {customer_id} not found")))
    }
}
