//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{HttpResponse, test, web};

use crate::domain::ports::{
    MockCreditsQuery, MockPaymentOrderCommand, MockPaymentVerificationCommand, MockPostCommand,
    MockPostQuery, MockSessionCommand, MockSweepCommand,
};
use crate::domain::{Error, UserId};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpStatePorts;

/// User id persisted by [`test_login`].
pub const TEST_USER_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Ports backed by mocks without expectations; any call fails the test.
pub fn unused_ports() -> HttpStatePorts {
    HttpStatePorts {
        session: Arc::new(MockSessionCommand::new()),
        credits: Arc::new(MockCreditsQuery::new()),
        payment_orders: Arc::new(MockPaymentOrderCommand::new()),
        payment_verification: Arc::new(MockPaymentVerificationCommand::new()),
        posts: Arc::new(MockPostCommand::new()),
        posts_query: Arc::new(MockPostQuery::new()),
        sweeps: Arc::new(MockSweepCommand::new()),
    }
}

async fn persist_test_user(session: SessionContext) -> Result<HttpResponse, Error> {
    let user_id = UserId::new(TEST_USER_ID)
        .map_err(|err| Error::internal(format!("invalid fixture user id: {err}")))?;
    session.persist_user(&user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Route that authenticates the caller as [`TEST_USER_ID`].
pub fn test_login(cfg: &mut web::ServiceConfig) {
    cfg.route("/test/login", web::post().to(persist_test_user));
}

/// Log in through [`test_login`] and return the session cookie.
pub async fn login_cookie<S>(app: &S) -> Cookie<'static>
where
    S: Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
{
    let response =
        test::call_service(app, test::TestRequest::post().uri("/test/login").to_request()).await;
    assert!(response.status().is_success(), "test login failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie")
        .into_owned()
}
