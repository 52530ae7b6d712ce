use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_utils::jwt::issue_token;

use crate::models::{Account, AccountError, LoginResponse};

const TOKEN_TTL_HOURS: i64 = 24;

/// Account registration and login. Credentials are compared as stored;
/// hashing and lockout policy live outside this service's scope.
pub struct AccountService {
    supabase: SupabaseClient,
    jwt_secret: String,
}

impl AccountService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            jwt_secret: config.supabase_jwt_secret.clone(),
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<Account, AccountError> {
        debug!("Registering account for username {}", username);

        if username.is_empty() || password.is_empty() {
            return Err(AccountError::ValidationError(
                "Username and password are required".to_string(),
            ));
        }

        if self.find_by_username(username).await?.is_some() {
            warn!("Registration rejected, username {} already taken", username);
            return Err(AccountError::UsernameTaken);
        }

        let account_data = json!({
            "id": Uuid::new_v4(),
            "username": username,
            "password": password,
            "created_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/users",
                None,
                Some(account_data),
                Some(headers),
            )
            .await
            .map_err(|e| {
                // The unique constraint on username closes the lookup/insert
                // race; a conflict from the store is still a taken username.
                if e.to_string().contains("Conflict") {
                    AccountError::UsernameTaken
                } else {
                    AccountError::DatabaseError(e.to_string())
                }
            })?;

        let account: Account = result
            .into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AccountError::DatabaseError(format!("Failed to parse account: {}", e)))?
            .ok_or_else(|| AccountError::DatabaseError("Failed to create account".to_string()))?;

        info!("Account {} registered for username {}", account.id, username);
        Ok(account)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AccountError> {
        debug!("Login attempt for username {}", username);

        let account = self
            .find_by_username(username)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if account.password != password {
            warn!("Invalid password for username {}", username);
            return Err(AccountError::InvalidCredentials);
        }

        let token = issue_token(
            &account.id.to_string(),
            &account.username,
            &self.jwt_secret,
            TOKEN_TTL_HOURS,
        )
        .map_err(AccountError::DatabaseError)?;

        info!("Login successful for account {}", account.id);
        Ok(LoginResponse {
            token,
            user_id: account.id,
            username: account.username,
        })
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        let path = format!(
            "/rest/v1/users?username=eq.{}",
            urlencoding::encode(username)
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let account: Account = serde_json::from_value(row)
                    .map_err(|e| AccountError::DatabaseError(format!("Failed to parse account: {}", e)))?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }
}
