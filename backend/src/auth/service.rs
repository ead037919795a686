//! Core business logic for the authentication system.
//!
//! This service handles operations such as user creation, password hashing,
//! token issuance and validation, locking accounts and password reset. It
//! orchestrates interactions between resolvers, the user store and the mailer.

use std::sync::Arc;

use adapters::{Mailer, ResetPasswordMail};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, info};

use super::errors::AuthError;
use super::models::{Claims, LoginResponse};
use crate::database::models::{generate_id, now_millis, User, UserDraft};
use crate::database::queries::UserStore;
use crate::database::StoreError;
use crate::errors::AppError;

/// Access tokens stay valid for 30 days.
pub const TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;
pub const RESET_TOKEN_TTL_MS: i64 = 60 * 60 * 1000;

/// Exchanges a bearer token for the user it was issued to.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<User, AuthError>;
}

pub struct AuthService {
    secret: String,
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(secret: impl Into<String>, users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            secret: secret.into(),
            users,
            mailer,
            hash_cost: bcrypt::DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    /// Runs on the blocking pool; a bcrypt round takes hundreds of milliseconds
    /// at the default cost.
    pub async fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        let plain = plain.to_string();
        let cost = self.hash_cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .map_err(|err| AuthError::Blocking(err.to_string()))?
            .map_err(AuthError::from)
    }

    pub async fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, AuthError> {
        let plain = plain.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
            .await
            .map_err(|err| AuthError::Blocking(err.to_string()))?
            .map_err(AuthError::from)
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.clone(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| AuthError::InvalidToken(err.to_string()))
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| AuthError::InvalidToken(err.to_string()))
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if self.users.find_by_username(username).await?.is_some() {
            return Err(StoreError::Duplicate("username".to_string()).into());
        }
        if self.users.find_by_email(email).await?.is_some() {
            return Err(StoreError::Duplicate("email".to_string()).into());
        }

        let user = self
            .users
            .insert(UserDraft {
                username: username.to_string(),
                email: email.to_string(),
                password: self.hash_password(password).await?,
                role_id: None,
            })
            .await?;

        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.verify_password(password, &user.password).await? {
            return Err(AuthError::InvalidCredentials);
        }
        if user.is_locked {
            return Err(AuthError::Locked);
        }

        Ok(LoginResponse {
            token: self.issue_token(&user)?,
        })
    }

    /// Flips the lock state of a user, recording why.
    pub async fn toggle_lock(&self, id: &str, reason: &str) -> Result<User, AuthError> {
        let mut user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;

        user.is_locked = !user.is_locked;
        user.reason = Some(reason.to_string());

        let user = self.users.update(user).await?;
        info!(user_id = %user.id, locked = user.is_locked, "User lock state changed");
        Ok(user)
    }

    /// Stores a fresh reset token for the account and mails the reset link.
    pub async fn request_password_reset(&self, email: &str, host: &str) -> Result<(), AppError> {
        let mut user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user with email {email}")))?;

        let token = generate_id();
        user.reset_password_token = Some(token.clone());
        user.reset_password_expires = Some(now_millis() + RESET_TOKEN_TTL_MS);
        self.users.update(user).await?;

        self.mailer
            .send_reset_password(ResetPasswordMail {
                email: email.to_string(),
                host: host.to_string(),
                token,
            })
            .await?;

        Ok(())
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), AuthError> {
        let mut user = self
            .users
            .find_by_reset_token(token)
            .await?
            .ok_or(AuthError::InvalidResetToken)?;

        let expired = user
            .reset_password_expires
            .map_or(true, |expires| expires < now_millis());
        if expired {
            return Err(AuthError::InvalidResetToken);
        }

        user.password = self.hash_password(password).await?;
        user.reset_password_token = None;
        user.reset_password_expires = None;
        self.users.update(user).await?;

        Ok(())
    }
}

#[async_trait]
impl TokenVerifier for AuthService {
    async fn verify_token(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.decode_token(token)?;

        let user = self
            .users
            .find_by_id(&claims.sub)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        if user.is_locked {
            debug!(user_id = %user.id, "Rejected token of locked user");
            return Err(AuthError::Locked);
        }

        Ok(user)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use adapters::MailError;

    use super::*;
    use crate::database::memory::MemoryUserStore;

    #[derive(Default)]
    pub(crate) struct RecordingMailer {
        pub sent: Mutex<Vec<ResetPasswordMail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_reset_password(&self, mail: ResetPasswordMail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_reset_password(&self, _: ResetPasswordMail) -> Result<(), MailError> {
            Err(MailError::Delivery("connection refused".to_string()))
        }
    }

    pub(crate) fn service_with(mailer: Arc<dyn Mailer>) -> AuthService {
        AuthService::new("test-secret", Arc::new(MemoryUserStore::default()), mailer).with_hash_cost(4)
    }

    #[tokio::test]
    async fn issued_token_verifies_to_its_user() {
        let auth = service_with(Arc::new(RecordingMailer::default()));
        let user = auth.create_user("alice", "alice@example.com", "secret1").await.unwrap();

        let token = auth.issue_token(&user).unwrap();
        let verified = auth.verify_token(&token).await.unwrap();

        assert_eq!(verified.id, user.id);
    }

    #[tokio::test]
    async fn token_signed_with_another_secret_is_rejected() {
        let auth = service_with(Arc::new(RecordingMailer::default()));
        let user = auth.create_user("alice", "alice@example.com", "secret1").await.unwrap();

        let other = AuthService::new(
            "other-secret",
            Arc::new(MemoryUserStore::default()),
            Arc::new(RecordingMailer::default()),
        );
        let token = other.issue_token(&user).unwrap();

        assert!(matches!(
            auth.verify_token(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn login_checks_password_and_lock_state() {
        let auth = service_with(Arc::new(RecordingMailer::default()));
        let user = auth.create_user("alice", "alice@example.com", "secret1").await.unwrap();

        assert!(auth.login("alice", "secret1").await.is_ok());
        assert!(matches!(
            auth.login("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));

        auth.toggle_lock(&user.id, "abuse").await.unwrap();
        assert!(matches!(auth.login("alice", "secret1").await, Err(AuthError::Locked)));
    }

    #[tokio::test]
    async fn locked_user_tokens_no_longer_verify() {
        let auth = service_with(Arc::new(RecordingMailer::default()));
        let user = auth.create_user("alice", "alice@example.com", "secret1").await.unwrap();
        let token = auth.issue_token(&user).unwrap();

        auth.toggle_lock(&user.id, "abuse").await.unwrap();

        assert!(matches!(auth.verify_token(&token).await, Err(AuthError::Locked)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn hashing_does_not_hold_up_other_tasks() {
        let auth = service_with(Arc::new(RecordingMailer::default())).with_hash_cost(10);

        let (hashed_at, woke_at) = tokio::join!(
            async {
                let hash = auth.hash_password("secret1").await.unwrap();
                assert!(auth.verify_password("secret1", &hash).await.unwrap());
                std::time::Instant::now()
            },
            async {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                std::time::Instant::now()
            }
        );

        assert!(woke_at < hashed_at);
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let auth = service_with(Arc::new(RecordingMailer::default()));
        auth.create_user("alice", "alice@example.com", "secret1").await.unwrap();

        let err = auth
            .create_user("alice", "other@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(
            AppError::from(err),
            AppError::UserInput("username already exists".to_string())
        );
    }

    #[tokio::test]
    async fn password_reset_round_trip() {
        let mailer = Arc::new(RecordingMailer::default());
        let auth = service_with(mailer.clone());
        auth.create_user("alice", "alice@example.com", "secret1").await.unwrap();

        auth.request_password_reset("alice@example.com", "x.com").await.unwrap();

        let mail = mailer.sent.lock().unwrap().pop().expect("reset mail sent");
        assert_eq!(mail.email, "alice@example.com");
        assert_eq!(mail.host, "x.com");

        auth.reset_password(&mail.token, "newsecret").await.unwrap();
        assert!(auth.login("alice", "newsecret").await.is_ok());

        assert!(matches!(
            auth.reset_password(&mail.token, "again").await,
            Err(AuthError::InvalidResetToken)
        ));
    }

    #[tokio::test]
    async fn mail_failures_surface_as_delivery_errors() {
        let auth = service_with(Arc::new(FailingMailer));
        auth.create_user("alice", "alice@example.com", "secret1").await.unwrap();

        let err = auth
            .request_password_reset("alice@example.com", "x.com")
            .await
            .unwrap_err();
        assert_eq!(err, AppError::MailDelivery("connection refused".to_string()));
    }
}
