use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use adapters::{MailError, Mailer, ResetPasswordMail};
use backend::{
    api::{self, SchemaDeps},
    auth::AuthService,
    config::Config,
    database::Database,
    services::{
        gateway::{Gateway, GatewayOptions},
        pubsub::Broker,
        validation::{default_registry, ValidationPipe},
    },
    AppState,
};

struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_reset_password(&self, _: ResetPasswordMail) -> Result<(), MailError> {
        Ok(())
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub auth: Arc<AuthService>,
}

impl TestApp {
    /// Creates `username` and returns a token for it.
    #[allow(dead_code)]
    pub async fn token_for(&self, username: &str) -> String {
        let user = self
            .auth
            .create_user(username, &format!("{username}@example.com"), "secret1")
            .await
            .unwrap();
        self.auth.issue_token(&user).unwrap()
    }
}

pub fn app(env: &'static str) -> TestApp {
    let config = Config::from_lookup(|key| match key {
        "NODE_ENV" => Some(env.to_string()),
        "SECRET_KEY" => Some("integration-secret".to_string()),
        "FE_URL" => Some("https://app.example.com".to_string()),
        _ => None,
    })
    .unwrap();

    let database = Database::in_memory();
    let auth = Arc::new(
        AuthService::new(config.secret_key.clone(), database.users.clone(), Arc::new(NoopMailer))
            .with_hash_cost(4),
    );
    let options = GatewayOptions::from_config(&config);

    let schema = api::build_schema(
        SchemaDeps {
            database,
            auth: auth.clone(),
            pipe: ValidationPipe::new(default_registry()),
            persisted_queries: None,
        },
        &options,
    );
    let gateway = Arc::new(Gateway::new(options, auth.clone(), Broker::default()));
    let state = AppState { schema, gateway };

    TestApp {
        router: api::routes::router(state.clone()).unwrap(),
        state,
        auth,
    }
}
