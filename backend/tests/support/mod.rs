//! Shared helpers for the HTTP integration tests.
//!
//! Every test builds the production app over the in-memory store and the
//! fixture adapters, with a clock the test can move forward.

#![allow(dead_code, reason = "each test crate uses a subset of the helpers")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::cookie::{Cookie, Key, SameSite};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{test, web};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::{Value, json};

use voicepost_backend::domain::ports::{
    FixtureWebhooks, PublishRequest, PublishWebhook, WebhookError,
};
use voicepost_backend::domain::{
    GatewaySecret, PaymentSignatureVerifier, PostLifecycleConfig, PricePlanTable, PublishReceipt,
};
use voicepost_backend::inbound::http::health::HealthState;
use voicepost_backend::inbound::http::state::{CronSecret, HttpState};
use voicepost_backend::outbound::memory::InMemoryStore;
use voicepost_backend::server::{
    AppDependencies, FIXTURE_GATEWAY_SECRET, Repositories, ServiceAdapters, ServiceTunables,
    assemble_ports,
};

pub const CRON_SECRET: &str = "integration-cron-secret";
pub const SIGNUP_CREDITS: u32 = 3;
pub const ALICE: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
pub const BOB: &str = "9b2f4c1e-7a0d-4d8e-b1a3-5c6d7e8f9a0b";

/// Clock that only moves when told to.
pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for TestClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }
}

/// Publish webhook counting calls before delegating to the fixture.
#[derive(Default)]
pub struct CountingPublisher {
    calls: AtomicUsize,
}

impl CountingPublisher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublishWebhook for CountingPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, WebhookError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FixtureWebhooks.publish(request).await
    }
}

/// App wiring plus handles the tests inspect.
pub struct Harness {
    pub store: InMemoryStore,
    pub clock: Arc<TestClock>,
    pub publisher: Arc<CountingPublisher>,
    pub adapters: ServiceAdapters,
    pub signup_credits: u32,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(TestClock::starting_at(
            Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0)
                .single()
                .expect("valid timestamp"),
        ));
        let publisher = Arc::new(CountingPublisher::default());
        let mut adapters = ServiceAdapters::fixtures(clock.clone());
        adapters.publisher = publisher.clone();
        Self {
            store: InMemoryStore::new(),
            clock,
            publisher,
            adapters,
            signup_credits: SIGNUP_CREDITS,
        }
    }

    pub fn with_signup_credits(signup_credits: u32) -> Self {
        Self {
            signup_credits,
            ..Self::new()
        }
    }

    pub fn dependencies(&self) -> AppDependencies {
        let ports = assemble_ports(
            Repositories::in_memory(self.store.clone()),
            self.adapters.clone(),
            ServiceTunables {
                signup_credits: self.signup_credits,
                lifecycle: PostLifecycleConfig::default(),
                plans: PricePlanTable::default(),
            },
        );
        AppDependencies {
            health_state: web::Data::new(HealthState::new()),
            http_state: web::Data::new(HttpState::new(ports, CronSecret::new(CRON_SECRET))),
            key: Key::generate(),
            cookie_secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// Sign the checkout result the way the gateway would.
pub fn gateway_signature(order_id: &str, payment_id: &str) -> String {
    PaymentSignatureVerifier::new(GatewaySecret::new(FIXTURE_GATEWAY_SECRET))
        .sign(order_id, payment_id)
}

/// Exchange `user` as an access token and return the session cookie.
pub async fn sign_in<S>(app: &S, user: &str) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let response = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/session")
            .set_json(json!({ "accessToken": user }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "sign-in failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}

/// Send a JSON request with the session cookie and decode the reply.
pub async fn call_json<S>(
    app: &S,
    request: test::TestRequest,
    cookie: &Cookie<'static>,
) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let response = test::call_service(app, request.cookie(cookie.clone()).to_request()).await;
    let status = response.status();
    let body = test::read_body(response).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).expect("json body")
    };
    (status, value)
}

pub async fn available_credits<S>(app: &S, cookie: &Cookie<'static>) -> u64
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = call_json(app, test::TestRequest::get().uri("/api/v1/credits"), cookie).await;
    assert_eq!(status, StatusCode::OK);
    body["availableCredits"].as_u64().expect("availableCredits")
}

/// Create a draft and return its id.
pub async fn create_draft<S>(app: &S, cookie: &Cookie<'static>, content: &str) -> String
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let (status, body) = call_json(
        app,
        test::TestRequest::post()
            .uri("/api/v1/posts/drafts")
            .set_json(json!({ "content": content })),
        cookie,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "draft creation failed: {body}");
    body["id"].as_str().expect("post id").to_owned()
}

pub async fn publish<S>(app: &S, cookie: &Cookie<'static>, post_id: &str) -> (StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    call_json(
        app,
        test::TestRequest::post().uri(&format!("/api/v1/posts/{post_id}/publish")),
        cookie,
    )
    .await
}
