//! Organisor signup.

use crm_core::error::{CrmError, CrmResult};
use crm_core::models::organisation::{CreateOrganisation, OrganisorAccount};
use crm_core::models::user::CreateUser;
use crm_core::repository::{Repositories, UserRepository};
use serde::Deserialize;
use tracing::info;

use crate::config::CrmConfig;
use crate::error::AccessError;

/// Input for registering a new organisor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Defaults to the username when blank.
    #[serde(default)]
    pub organisation_name: String,
}

pub struct AccountService<S> {
    store: S,
    config: CrmConfig,
}

impl<S> AccountService<S> {
    fn validate(&self, form: &SignupForm) -> Result<(), AccessError> {
        if form.username.trim().is_empty() {
            return Err(AccessError::MissingField("username"));
        }
        if form.email.trim().is_empty() {
            return Err(AccessError::MissingField("email"));
        }
        if form.password.chars().count() < self.config.min_password_length {
            return Err(AccessError::PasswordTooShort(
                self.config.min_password_length,
            ));
        }
        Ok(())
    }
}

impl<S: Repositories> AccountService<S> {
    pub fn new(store: S, config: CrmConfig) -> Self {
        Self { store, config }
    }

    /// Register a user as organisor of a new organisation.
    pub async fn signup_organisor(&self, form: SignupForm) -> CrmResult<OrganisorAccount> {
        // 1. Validate input
        self.validate(&form)?;
        let username = form.username.trim().to_string();

        // 2. Reject taken usernames up front; the unique index still
        //    guards against a concurrent signup.
        match self.store.users().get_by_username(&username).await {
            Ok(_) => {
                return Err(CrmError::AlreadyExists {
                    entity: "user".into(),
                });
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        // 3. Create user, organisation and profile in one transaction
        let organisation_name = match form.organisation_name.trim() {
            "" => username.clone(),
            name => name.to_string(),
        };
        let account = self
            .store
            .users()
            .create_organisor(
                CreateUser {
                    username,
                    email: form.email.trim().to_string(),
                    first_name: form.first_name.trim().to_string(),
                    last_name: form.last_name.trim().to_string(),
                    password: form.password,
                },
                CreateOrganisation {
                    name: organisation_name,
                },
            )
            .await?;

        info!(
            user_id = %account.user.id,
            organisation_id = %account.organisation.id,
            "Organisor signed up"
        );

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoStore;

    fn form(password: &str) -> SignupForm {
        SignupForm {
            username: "owner".into(),
            email: "owner@example.com".into(),
            password: password.into(),
            ..Default::default()
        }
    }

    #[test]
    fn short_passwords_are_rejected() {
        let config = CrmConfig::default();
        let min = config.min_password_length;
        let service = AccountService {
            store: NoStore,
            config,
        };
        assert_eq!(
            service.validate(&form("short")),
            Err(AccessError::PasswordTooShort(min))
        );
        assert!(service.validate(&form("long enough password")).is_ok());
    }
}
