use std::sync::Arc;

use async_trait::async_trait;
use bizdesk_api::app::{AppServices, build_app};
use bizdesk_auth::{AuthConfig, ExchangeError, ExternalIdentity, IdentityExchange};
use bizdesk_infra::RecordingNotifier;
use bizdesk_onboarding::Notification;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const ADMIN_EMAIL: &str = "root@bizdesk.tn";
const ADMIN_PASSWORD: &str = "rootPassword1";

struct TestServer {
    base_url: String,
    notifier: Arc<RecordingNotifier>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

struct FakeGoogle;

#[async_trait]
impl IdentityExchange for FakeGoogle {
    fn provider(&self) -> &str {
        "google"
    }

    async fn exchange(&self, code: &str) -> Result<ExternalIdentity, ExchangeError> {
        if code != "good-code" {
            return Err(ExchangeError::Rejected("invalid code".into()));
        }
        Ok(ExternalIdentity {
            provider: "google".into(),
            provider_id: "g-123".into(),
            email: ADMIN_EMAIL.to_uppercase(),
            display_name: "Root".into(),
            avatar_url: None,
        })
    }
}

impl TestServer {
    async fn spawn(config: AuthConfig) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let notifier = Arc::new(RecordingNotifier::new());
        let services = AppServices::with_notifier(config, notifier.clone()).with_identity_provider(Arc::new(FakeGoogle));
        services
            .directory
            .seed_platform_admin(ADMIN_EMAIL, "Root", ADMIN_PASSWORD)
            .expect("failed to seed admin");

        let app = build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            notifier,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap())
    }

    async fn token(&self, email: &str, password: &str) -> String {
        let (status, body) = self.login(email, password).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn submit_aziz(&self) -> String {
        let res = self
            .client
            .post(self.url("/registration-requests"))
            .json(&json!({
                "owner": { "name": "Aziz", "email": "Aziz@X.tn" },
                "company": { "name": "Acme", "category": "IT" }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "pending");
        assert_eq!(body["owner"]["email"], "aziz@x.tn");
        body["id"].as_str().unwrap().to_string()
    }

    /// Submit + approve; returns (tenant_id, temporary password).
    async fn onboard_aziz(&self, admin: &str) -> (String, String) {
        let id = self.submit_aziz().await;
        let res = self
            .client
            .post(self.url(&format!("/admin/registration-requests/{id}/approve")))
            .bearer_auth(admin)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let receipt: Value = res.json().await.unwrap();
        assert_eq!(receipt["request"]["status"], "approved");
        assert_eq!(receipt["notification_delivered"], true);

        let temporary = self
            .notifier
            .sent()
            .into_iter()
            .find_map(|n| match n {
                Notification::RegistrationApproved {
                    to, temporary_password, ..
                } if to == "aziz@x.tn" => Some(temporary_password),
                _ => None,
            })
            .expect("approval notification");
        (receipt["tenant_id"].as_str().unwrap().to_string(), temporary)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(AuthConfig::default()).await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/auth/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_authenticated");

    let res = srv
        .client
        .get(srv.url("/admin/registration-requests"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let srv = TestServer::spawn(AuthConfig::default()).await;
    let admin = srv.token(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let me: Value = srv
        .client
        .get(srv.url("/auth/me"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let now = Utc::now();
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &json!({
            "sub": me["id"],
            "role": "platform_admin",
            "must_change_password": false,
            "issued_at": now,
            "expires_at": now + ChronoDuration::minutes(10),
        }),
        &EncodingKey::from_secret(b"someone-elses-secret"),
    )
    .unwrap();

    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(forged).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn approved_owner_must_rotate_before_tenant_access() {
    let srv = TestServer::spawn(AuthConfig::default()).await;
    let admin = srv.token(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (tenant_id, temporary) = srv.onboard_aziz(&admin).await;

    let (status, body) = srv.login("aziz@x.tn", &temporary).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["must_change_password"], true);
    let temp_token = body["token"].as_str().unwrap().to_string();

    // Everything but the rotation is closed.
    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(&temp_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "password_change_required");

    let res = srv
        .client
        .get(srv.url("/business/whoami"))
        .bearer_auth(&temp_token)
        .header("X-Business-Id", &tenant_id)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .post(srv.url("/auth/first-login/password"))
        .bearer_auth(&temp_token)
        .json(&json!({ "new_password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/auth/first-login/password"))
        .bearer_auth(&temp_token)
        .json(&json!({ "new_password": temporary }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/auth/first-login/password"))
        .bearer_auth(&temp_token)
        .json(&json!({ "new_password": "newStrongPass1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rotated: Value = res.json().await.unwrap();
    assert_eq!(rotated["must_change_password"], false);
    let owner = rotated["token"].as_str().unwrap().to_string();

    // The temporary token does not survive the rotation.
    let res = srv.client.get(srv.url("/auth/me")).bearer_auth(&temp_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/business/whoami"))
        .bearer_auth(&owner)
        .header("X-Business-Id", &tenant_id)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["tenant_id"], tenant_id.as_str());
    assert_eq!(body["business_name"], "Acme");
    assert_eq!(body["role"], "business_owner");

    let res = srv.client.get(srv.url("/business/whoami")).bearer_auth(&owner).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_queue_enforces_states_and_roles() {
    let srv = TestServer::spawn(AuthConfig::default()).await;
    let admin = srv.token(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let id = srv.submit_aziz().await;

    let res = srv
        .client
        .post(srv.url(&format!("/admin/registration-requests/{id}/reject")))
        .bearer_auth(&admin)
        .json(&json!({ "reason": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let pending: Value = srv
        .client
        .get(srv.url("/admin/registration-requests?status=pending"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(pending["requests"].as_array().unwrap().len(), 1);

    let res = srv
        .client
        .post(srv.url(&format!("/admin/registration-requests/{id}/reject")))
        .bearer_auth(&admin)
        .json(&json!({ "reason": "Duplicate company" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rejected: Value = res.json().await.unwrap();
    assert_eq!(rejected["status"], "rejected");
    assert_eq!(rejected["rejection_reason"], "Duplicate company");

    let res = srv
        .client
        .post(srv.url(&format!("/admin/registration-requests/{id}/approve")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .get(srv.url("/admin/registration-requests/not-a-uuid"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .get(srv.url(&format!("/admin/registration-requests/{}", uuid::Uuid::new_v4())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url("/admin/registration-requests?status=archived"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owners_cannot_review_and_members_need_permissions() {
    let srv = TestServer::spawn(AuthConfig::default()).await;
    let admin = srv.token(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (tenant_id, temporary) = srv.onboard_aziz(&admin).await;

    let temp_token = srv.token("aziz@x.tn", &temporary).await;
    let rotated: Value = srv
        .client
        .post(srv.url("/auth/first-login/password"))
        .bearer_auth(&temp_token)
        .json(&json!({ "new_password": "newStrongPass1" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let owner = rotated["token"].as_str().unwrap().to_string();

    let res = srv
        .client
        .get(srv.url("/admin/registration-requests"))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .post(srv.url("/team/invites"))
        .bearer_auth(&owner)
        .json(&json!({
            "email": "sami@x.tn",
            "display_name": "Sami",
            "role": "team_member",
            "permissions": ["Invoices:View"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let invite: Value = res.json().await.unwrap();
    let invite_token = invite["invite_token"].as_str().unwrap().to_string();
    assert_eq!(invite["member"]["must_change_password"], true);

    let res = srv
        .client
        .post(srv.url("/auth/invites/accept"))
        .json(&json!({ "token": invite_token, "new_password": "samiPassword1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let grant: Value = res.json().await.unwrap();
    assert_eq!(grant["must_change_password"], false);
    let member = grant["token"].as_str().unwrap().to_string();

    let res = srv
        .client
        .post(srv.url("/auth/invites/accept"))
        .json(&json!({ "token": invite_token, "new_password": "samiPassword2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/team/invites"))
        .bearer_auth(&member)
        .json(&json!({ "email": "x@x.tn", "display_name": "X", "role": "client" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["missing"], json!(["team.invite"]));

    let explanation: Value = srv
        .client
        .post(srv.url("/authz/explain"))
        .bearer_auth(&member)
        .json(&json!({ "permissions": ["invoices.view", "invoices.create"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(explanation["granted"], false);
    assert_eq!(explanation["missing"], json!(["invoices.create"]));

    let res = srv
        .client
        .get(srv.url("/business/whoami"))
        .bearer_auth(&member)
        .header("X-Business-Id", &tenant_id)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn repeated_failures_lock_the_account() {
    let srv = TestServer::spawn(AuthConfig {
        max_failed_login_attempts: 3,
        ..AuthConfig::default()
    })
    .await;

    for _ in 0..2 {
        let (status, body) = srv.login(ADMIN_EMAIL, "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_credentials");
    }
    let (status, body) = srv.login(ADMIN_EMAIL, "wrong-password").await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(body["error"], "account_locked");

    let (status, _) = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::LOCKED);
}

#[tokio::test]
async fn bot_challenge_is_required_when_configured() {
    let srv = TestServer::spawn(AuthConfig {
        require_bot_challenge: true,
        ..AuthConfig::default()
    })
    .await;

    let (status, _) = srv.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD, "bot_challenge": "captcha-ok" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn external_sign_in_maps_to_existing_account() {
    let srv = TestServer::spawn(AuthConfig::default()).await;

    let res = srv
        .client
        .post(srv.url("/auth/external/Google"))
        .json(&json!({ "code": "good-code" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let grant: Value = res.json().await.unwrap();
    assert_eq!(grant["principal"]["role"], "platform_admin");

    let res = srv
        .client
        .post(srv.url("/auth/external/google"))
        .json(&json!({ "code": "bad-code" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url("/auth/external/github"))
        .json(&json!({ "code": "good-code" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
