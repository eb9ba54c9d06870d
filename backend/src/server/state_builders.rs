//! Builders wiring repositories and adapters into HTTP state.
//!
//! In debug builds each outbound concern falls back to its fixture when the
//! settings leave it unconfigured, so a bare `cargo run` serves a working
//! local instance. Release builds refuse to start instead: the fixture
//! gateway signs with a published secret and the fixture identity provider
//! trusts any user id.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use crate::domain::ports::{
    ContentGenerationWebhook, CreditLedgerRepository, FixtureIdentityProvider,
    FixturePaymentGateway, FixtureWebhooks, IdentityProvider, IdentityProviderError,
    PaymentGateway, PaymentGatewayError, PaymentRepository, PostRepository, PublishWebhook,
};
use crate::domain::{
    CreditConsumptionGate, CreditLedgerService, CreditOverviewService, GatewaySecret,
    PaymentOrderService, PaymentSignatureVerifier, PaymentVerificationService,
    PostLifecycleConfig, PostLifecycleService, PricePlanTable, SessionService,
};
use crate::inbound::http::session_config::BuildMode;
use crate::inbound::http::state::{CronSecret, HttpState, HttpStatePorts};
use crate::outbound::identity::IdentityHttpProvider;
use crate::outbound::memory::InMemoryStore;
use crate::outbound::persistence::{
    DbPool, DieselCreditLedgerRepository, DieselPaymentRepository, DieselPostRepository,
    PoolConfig, PoolError, run_migrations,
};
use crate::outbound::razorpay::{RazorpayCredentials, RazorpayHttpGateway};
use crate::outbound::webhooks::AutomationHttpWebhooks;

use super::config::{AppSettings, SettingsError};

/// Key id reported to checkout clients when no gateway is configured.
pub const FIXTURE_GATEWAY_KEY_ID: &str = "rzp_test_fixture";
/// Signing secret paired with [`FixturePaymentGateway`].
pub const FIXTURE_GATEWAY_SECRET: &str = "voicepost-dev-secret";

/// Errors raised while assembling application state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("database setup failed: {0}")]
    Database(#[from] PoolError),
    #[error("payment gateway setup failed: {0}")]
    Gateway(#[from] PaymentGatewayError),
    #[error("identity provider setup failed: {0}")]
    Identity(#[from] IdentityProviderError),
    #[error("webhook client setup failed: {0}")]
    Webhooks(#[from] reqwest::Error),
    #[error("{setting} must be configured in release builds")]
    Unconfigured { setting: &'static str },
    #[error("razorpay_key_id and razorpay_key_secret must be set together")]
    PartialGatewayCredentials,
}

/// Repository handles shared by the services.
pub struct Repositories<L, P, R> {
    pub ledger: Arc<L>,
    pub payments: Arc<P>,
    pub posts: Arc<R>,
}

impl Repositories<InMemoryStore, InMemoryStore, InMemoryStore> {
    /// Back every repository port with one shared store.
    pub fn in_memory(store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            ledger: Arc::clone(&store),
            payments: Arc::clone(&store),
            posts: store,
        }
    }
}

/// Outbound adapters and the clock.
#[derive(Clone)]
pub struct ServiceAdapters {
    pub gateway: Arc<dyn PaymentGateway>,
    /// Key id handed to checkout clients.
    pub gateway_key_id: String,
    pub gateway_secret: GatewaySecret,
    pub identity: Arc<dyn IdentityProvider>,
    pub generator: Arc<dyn ContentGenerationWebhook>,
    pub publisher: Arc<dyn PublishWebhook>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceAdapters {
    /// Fixture adapters that never leave the process.
    pub fn fixtures(clock: Arc<dyn Clock>) -> Self {
        let webhooks = Arc::new(FixtureWebhooks);
        Self {
            gateway: Arc::new(FixturePaymentGateway),
            gateway_key_id: FIXTURE_GATEWAY_KEY_ID.to_owned(),
            gateway_secret: GatewaySecret::new(FIXTURE_GATEWAY_SECRET),
            identity: Arc::new(FixtureIdentityProvider),
            generator: webhooks.clone(),
            publisher: webhooks,
            clock,
        }
    }
}

/// Business tunables.
#[derive(Debug, Clone, Default)]
pub struct ServiceTunables {
    pub signup_credits: u32,
    pub lifecycle: PostLifecycleConfig,
    pub plans: PricePlanTable,
}

impl ServiceTunables {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            signup_credits: settings.free_signup_credits(),
            lifecycle: PostLifecycleConfig {
                stale_generation_after: settings.stale_generation_after(),
                scheduled_batch_limit: settings.scheduled_batch_limit(),
            },
            plans: PricePlanTable::default(),
        }
    }
}

/// Construct every domain service over the given repositories.
pub fn assemble_ports<L, P, R>(
    repositories: Repositories<L, P, R>,
    adapters: ServiceAdapters,
    tunables: ServiceTunables,
) -> HttpStatePorts
where
    L: CreditLedgerRepository + 'static,
    P: PaymentRepository + 'static,
    R: PostRepository + 'static,
{
    let Repositories {
        ledger,
        payments,
        posts,
    } = repositories;
    let ServiceAdapters {
        gateway,
        gateway_key_id,
        gateway_secret,
        identity,
        generator,
        publisher,
        clock,
    } = adapters;

    let ledger_service = CreditLedgerService::new(ledger, tunables.signup_credits);
    let lifecycle = Arc::new(PostLifecycleService::new(
        posts,
        CreditConsumptionGate::new(ledger_service.clone()),
        generator,
        publisher,
        Arc::clone(&clock),
        tunables.lifecycle,
    ));

    HttpStatePorts {
        session: Arc::new(SessionService::new(identity, ledger_service.clone())),
        credits: Arc::new(CreditOverviewService::new(
            ledger_service,
            Arc::clone(&payments),
        )),
        payment_orders: Arc::new(PaymentOrderService::new(
            gateway,
            Arc::clone(&payments),
            tunables.plans,
            gateway_key_id,
            Arc::clone(&clock),
        )),
        payment_verification: Arc::new(PaymentVerificationService::new(
            payments,
            PaymentSignatureVerifier::new(gateway_secret),
            clock,
        )),
        posts: lifecycle.clone(),
        posts_query: lifecycle.clone(),
        sweeps: lifecycle,
    }
}

/// Use `fixture` in debug builds; release builds fail naming `setting`.
fn fixture_or_refuse<T>(
    mode: BuildMode,
    setting: &'static str,
    fixture: impl FnOnce() -> T,
) -> Result<T, StartupError> {
    match mode {
        BuildMode::Debug => {
            warn!(setting, "not configured; using fixture adapter");
            Ok(fixture())
        }
        BuildMode::Release => Err(StartupError::Unconfigured { setting }),
    }
}

fn build_gateway(
    settings: &AppSettings,
    mode: BuildMode,
) -> Result<(Arc<dyn PaymentGateway>, String, GatewaySecret), StartupError> {
    match (&settings.razorpay_key_id, &settings.razorpay_key_secret) {
        (Some(key_id), Some(key_secret)) => {
            let key_secret = GatewaySecret::new(key_secret.as_str());
            let gateway = RazorpayHttpGateway::new(
                &settings.razorpay_api_base()?,
                RazorpayCredentials {
                    key_id: key_id.clone(),
                    key_secret: key_secret.clone(),
                },
                settings.http_timeout(),
            )?;
            let gateway: Arc<dyn PaymentGateway> = Arc::new(gateway);
            Ok((gateway, key_id.clone(), key_secret))
        }
        (None, None) => fixture_or_refuse(mode, "razorpay credentials", || {
            let gateway: Arc<dyn PaymentGateway> = Arc::new(FixturePaymentGateway);
            (
                gateway,
                FIXTURE_GATEWAY_KEY_ID.to_owned(),
                GatewaySecret::new(FIXTURE_GATEWAY_SECRET),
            )
        }),
        _ => Err(StartupError::PartialGatewayCredentials),
    }
}

fn build_identity(
    settings: &AppSettings,
    mode: BuildMode,
) -> Result<Arc<dyn IdentityProvider>, StartupError> {
    match settings.identity_api_base()? {
        Some(base) => {
            let api_key = settings.identity_api_key.clone().unwrap_or_default();
            let provider = IdentityHttpProvider::new(&base, api_key, settings.http_timeout())?;
            Ok(Arc::new(provider))
        }
        None => fixture_or_refuse(mode, "identity_api_base", || {
            let provider: Arc<dyn IdentityProvider> = Arc::new(FixtureIdentityProvider);
            provider
        }),
    }
}

type Webhooks = (Arc<dyn ContentGenerationWebhook>, Arc<dyn PublishWebhook>);

fn build_webhooks(settings: &AppSettings, mode: BuildMode) -> Result<Webhooks, StartupError> {
    match settings.webhook_endpoints()? {
        Some((generation, publish)) => {
            let webhooks = Arc::new(AutomationHttpWebhooks::new(
                generation,
                publish,
                settings.http_timeout(),
            )?);
            let generator: Arc<dyn ContentGenerationWebhook> = webhooks.clone();
            let publisher: Arc<dyn PublishWebhook> = webhooks;
            Ok((generator, publisher))
        }
        None => fixture_or_refuse(mode, "automation webhook urls", || {
            let webhooks = Arc::new(FixtureWebhooks);
            let generator: Arc<dyn ContentGenerationWebhook> = webhooks.clone();
            let publisher: Arc<dyn PublishWebhook> = webhooks;
            (generator, publisher)
        }),
    }
}

/// Resolve outbound adapters from settings.
///
/// # Errors
///
/// Returns [`StartupError`] when a configured adapter cannot be built, when
/// only half of the gateway credentials are set, or when a release build
/// leaves an adapter unconfigured.
pub fn build_adapters(
    settings: &AppSettings,
    mode: BuildMode,
) -> Result<ServiceAdapters, StartupError> {
    let (gateway, gateway_key_id, gateway_secret) = build_gateway(settings, mode)?;
    let identity = build_identity(settings, mode)?;
    let (generator, publisher) = build_webhooks(settings, mode)?;

    Ok(ServiceAdapters {
        gateway,
        gateway_key_id,
        gateway_secret,
        identity,
        generator,
        publisher,
        clock: Arc::new(DefaultClock),
    })
}

/// Build HTTP state from settings.
///
/// Runs pending migrations and uses Diesel repositories when a database URL
/// is configured; otherwise state lives in memory for the process lifetime.
///
/// # Errors
///
/// Returns [`StartupError`] when settings are invalid, migrations fail, or
/// an adapter cannot be constructed.
pub async fn build_http_state(
    settings: &AppSettings,
    mode: BuildMode,
) -> Result<HttpState, StartupError> {
    let adapters = build_adapters(settings, mode)?;
    let tunables = ServiceTunables::from_settings(settings);

    let ports = match settings.database_url.as_deref() {
        Some(database_url) => {
            run_migrations(database_url).await?;
            let pool = DbPool::new(PoolConfig::new(database_url)).await?;
            info!("using PostgreSQL persistence");
            assemble_ports(
                Repositories {
                    ledger: Arc::new(DieselCreditLedgerRepository::new(pool.clone())),
                    payments: Arc::new(DieselPaymentRepository::new(pool.clone())),
                    posts: Arc::new(DieselPostRepository::new(pool)),
                },
                adapters,
                tunables,
            )
        }
        None => {
            warn!("database url not configured; state is held in memory");
            assemble_ports(
                Repositories::in_memory(InMemoryStore::new()),
                adapters,
                tunables,
            )
        }
    };

    let cron_secret = match settings.cron_secret.as_deref() {
        Some(secret) if !secret.is_empty() => CronSecret::new(secret),
        _ => {
            warn!("cron secret not configured; sweep endpoints reject every call");
            CronSecret::new(String::new())
        }
    };

    Ok(HttpState::new(ports, cron_secret))
}
