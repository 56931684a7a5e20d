//! Common test utilities and helpers for integration tests.
//!
//! Integration tests need a Postgres database. Set `TEST_DATABASE_URL` to
//! run them; without it every test skips cleanly so the unit suite stays
//! usable on machines with no database.

#![allow(dead_code)]

use once_cell::sync::Lazy;
use reqwest::Client;
use serde_json::Value;
use uuid::Uuid;

use diesel::prelude::*;
use steward::{
    auth::jwt::JwtConfig, create_db_pool_with_url, create_router, models::NewProfile,
    rbac::Role, schema::{companies, profiles, user_roles}, AppState, Config, DbPool,
};

/// Pre-generated Ed25519 key pair shared by every test app.
pub static TEST_JWT_PRIVATE_KEY: Lazy<String> = Lazy::new(|| {
    let (private_key, _) = JwtConfig::generate_key_pair();
    private_key
});

/// A test application instance with its own HTTP client and base URL.
pub struct TestApp {
    pub client: Client,
    pub base_url: String,
    pub db_pool: DbPool,
    pub jwt: JwtConfig,
}

/// A seeded identity with a profile row and a signed token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestApp {
    /// Spawns a test application against `TEST_DATABASE_URL`, or returns
    /// `None` (skip) when no test database is configured.
    pub async fn try_spawn() -> Option<Self> {
        let db_url = std::env::var("TEST_DATABASE_URL").ok()?;

        std::env::set_var("JWT_PRIVATE_KEY", TEST_JWT_PRIVATE_KEY.as_str());

        let db_pool = create_db_pool_with_url(&db_url);
        {
            let mut conn = db_pool.get().expect("Failed to get test db connection");
            steward::run_migrations(&mut conn).expect("Failed to run migrations");
        }

        let config = Config::default_for_testing();
        let state = AppState::new(db_pool.clone(), None, &config);
        let jwt = state.jwt_config.as_ref().clone();
        let app = create_router(state, &config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
            )
            .await
            .unwrap();
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Some(Self {
            client: Client::new(),
            base_url: format!("http://127.0.0.1:{}", port),
            db_pool,
            jwt,
        })
    }

    pub fn unique_email() -> String {
        format!("test_{}@example.com", Uuid::new_v4())
    }

    pub fn unique_slug() -> String {
        format!("test-co-{}", Uuid::new_v4())
    }

    pub fn conn(
        &self,
    ) -> diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>
    {
        self.db_pool.get().expect("Failed to get test db connection")
    }

    /// Seeds a profile row and mints a token for it.
    pub fn seed_user(&self) -> TestUser {
        let id = Uuid::new_v4();
        let email = Self::unique_email();
        let mut conn = self.conn();

        diesel::insert_into(profiles::table)
            .values(&NewProfile {
                id,
                email: email.clone(),
                full_name: Some("Test User".to_string()),
            })
            .execute(&mut conn)
            .expect("Failed to seed profile");

        let token = self
            .jwt
            .generate_access_token(id, &email)
            .expect("Failed to mint test token");

        TestUser { id, email, token }
    }

    /// Mints a token for an identity with no profile row.
    pub fn token_without_profile(&self) -> String {
        self.jwt
            .generate_access_token(Uuid::new_v4(), &Self::unique_email())
            .expect("Failed to mint test token")
    }

    pub fn seed_company(&self) -> Uuid {
        let mut conn = self.conn();
        diesel::insert_into(companies::table)
            .values((
                companies::name.eq("Test Company"),
                companies::slug.eq(Self::unique_slug()),
            ))
            .returning(companies::id)
            .get_result(&mut conn)
            .expect("Failed to seed company")
    }

    pub fn grant_role(&self, profile_id: Uuid, company_id: Uuid, role: Role) {
        let mut conn = self.conn();
        diesel::insert_into(user_roles::table)
            .values((
                user_roles::profile_id.eq(profile_id),
                user_roles::company_id.eq(company_id),
                user_roles::role.eq(role.as_str()),
            ))
            .execute(&mut conn)
            .expect("Failed to seed role");
    }

    pub fn deactivate_membership(&self, profile_id: Uuid, company_id: Uuid) {
        let mut conn = self.conn();
        diesel::update(
            user_roles::table
                .filter(user_roles::profile_id.eq(profile_id))
                .filter(user_roles::company_id.eq(company_id)),
        )
        .set(user_roles::is_active.eq(false))
        .execute(&mut conn)
        .expect("Failed to deactivate membership");
    }

    pub fn set_active_company(&self, profile_id: Uuid, company_id: Uuid) {
        let mut conn = self.conn();
        diesel::update(profiles::table.find(profile_id))
            .set(profiles::active_company_id.eq(Some(company_id)))
            .execute(&mut conn)
            .expect("Failed to set active company");
    }

    pub fn set_manager(&self, profile_id: Uuid, manager_id: Uuid) {
        let mut conn = self.conn();
        diesel::update(profiles::table.find(profile_id))
            .set(profiles::manager_id.eq(Some(manager_id)))
            .execute(&mut conn)
            .expect("Failed to set manager");
    }

    /// Seeds a user with a profile, a fresh company, an active role in it
    /// and the company as the profile's active company.
    pub fn seed_member(&self, role: Role) -> (TestUser, Uuid) {
        let user = self.seed_user();
        let company_id = self.seed_company();
        self.grant_role(user.id, company_id, role);
        self.set_active_company(user.id, company_id);
        (user, company_id)
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get_with_company(
        &self,
        path: &str,
        token: &str,
        company_id: Uuid,
    ) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .header("x-company-id", company_id.to_string())
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn get_public(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn patch(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .patch(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Request failed")
    }
}

/// Skips the surrounding test when no test database is configured.
#[macro_export]
macro_rules! require_test_db {
    () => {
        match common::TestApp::try_spawn().await {
            Some(app) => app,
            None => {
                eprintln!("TEST_DATABASE_URL not set; skipping integration test");
                return;
            }
        }
    };
}
