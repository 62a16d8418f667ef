#![allow(dead_code)]

use std::sync::Arc;

use auth::PasswordHasher;
use auth::TokenSigner;
use identity_service::identity::models::LifecycleSettings;
use identity_service::identity::service::TokenLifecycleManager;
use identity_service::inbound::http::router::create_router;
use identity_service::repositories::InMemoryCredentialStore;
use serde_json::json;
use serde_json::Value;

pub const SESSION_SECRET: &[u8] = b"test-session-secret-for-jwt-signing-32-bytes";
pub const RESET_SECRET: &[u8] = b"test-reset-secret-for-jwt-signing-32-bytes!!";

pub type TestManager = TokenLifecycleManager<InMemoryCredentialStore>;

/// Token signer sharing the secrets of every test manager
pub fn signer() -> TokenSigner {
    TokenSigner::new(SESSION_SECRET, RESET_SECRET)
}

/// Lifecycle manager over a fresh in-memory store with a cheap hash cost
pub fn manager(settings: LifecycleSettings) -> TestManager {
    TokenLifecycleManager::new(
        Arc::new(InMemoryCredentialStore::new()),
        signer(),
        PasswordHasher::with_cost(1024, 1, 1).expect("Invalid test hash cost"),
        settings,
    )
}

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub signer: TokenSigner,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        Self::spawn_with(LifecycleSettings::default()).await
    }

    pub async fn spawn_with(settings: LifecycleSettings) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let router = create_router(Arc::new(manager(settings)), "api");

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::new(),
            signer: signer(),
        }
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Register an account and return the session `data` object
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .post("/api/register")
            .json(&json!({
                "name": name,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"].clone()
    }

    /// Send a login request
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/login")
            .json(&json!({
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
