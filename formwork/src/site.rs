use crate::auth::Authenticator;
use crate::cmd::{NestedCommand, SiteCommand};
use crate::conf::SiteConf;
use crate::layers::log_requests;
use crate::passwords::{PasswordError, PasswordHasher};
use crate::store::{DbError, MemoryStore, PgStore, Store};
use crate::{logging, shutdown, views};
use axum::Router;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs as _};
use std::sync::Arc;
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Password hasher error: {0}")]
    Password(#[from] PasswordError),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

pub struct SiteBuilder {
    conf: SiteConf,
    store: Option<Arc<dyn Store>>,
}

impl SiteBuilder {
    fn new(conf: SiteConf) -> Self {
        Self { conf, store: None }
    }

    /// Use `store` instead of connecting to `conf.database`.
    pub fn with_store<S: Store + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn with_shared_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> Result<Site, SiteError> {
        let store = match self.store {
            Some(store) => store,
            None => Arc::new(PgStore::connect(&self.conf.database).await?) as Arc<dyn Store>,
        };

        let authenticator = Authenticator::new(&self.conf.auth, &self.conf.secret_key);
        let hasher = PasswordHasher::new(self.conf.auth.password_iterations)?;

        let router = views::router()
            .layer(axum::middleware::from_fn(log_requests))
            .layer(CatchPanicLayer::new());
        #[cfg(feature = "cors")]
        let router = router.layer(crate::layers::cors());

        Ok(Site {
            inner: Arc::new(SiteInner {
                start_time: std::time::Instant::now(),
                conf: self.conf,
                store,
                authenticator,
                hasher,
                router,
            }),
        })
    }
}

struct SiteInner {
    start_time: std::time::Instant,
    conf: SiteConf,
    store: Arc<dyn Store>,
    authenticator: Authenticator,
    hasher: PasswordHasher,
    router: Router<Site>,
}

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct Site {
    inner: Arc<SiteInner>,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("conf", &self.inner.conf)
            .field("authenticator", &self.inner.authenticator)
            .field("uptime", &self.uptime())
            .finish_non_exhaustive()
    }
}

impl Site {
    pub fn builder(conf: SiteConf) -> SiteBuilder {
        SiteBuilder::new(conf)
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.inner.start_time.elapsed()
    }

    pub fn conf(&self) -> &SiteConf {
        &self.inner.conf
    }

    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.inner.authenticator
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.inner.hasher
    }

    /// Mainly needed for testing purposes.
    pub fn router(&self) -> Router {
        self.inner.router.clone().with_state(self.clone())
    }

    pub async fn serve_forever(self, verbose: bool) -> Result<(), SiteError> {
        let host = self.inner.conf.host.clone();
        let port = self.inner.conf.port;

        let addr: SocketAddr = format!("{}:{}", host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut iter| iter.next())
            .ok_or_else(|| {
                SiteError::ConfigError(format!(
                    "Failed to resolve address for {}:{}. Ensure the address is valid.",
                    host, port
                ))
            })?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "server listening");
        if verbose {
            println!("Server running at http://{}", addr);
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown::shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

impl FromRequestParts<Site> for Site {
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &Site) -> Result<Self, Self::Rejection> {
        Ok(state.clone())
    }
}

/// Command-line entry point: `serve` or `migrate`, per the process arguments.
pub async fn run(mut conf: SiteConf) -> Result<(), SiteError> {
    let cmd: SiteCommand = argh::from_env();
    let _log_guard = logging::init(&conf.log);

    match cmd.nested {
        NestedCommand::Migrate(_) => {
            let store = PgStore::connect(&conf.database).await?;
            store.migrate().await?;
            tracing::info!("migrations applied");
            if cmd.verbose {
                println!("Migrations applied");
            }
        }
        NestedCommand::Serve(serve) => {
            if let Some(host) = serve.host {
                conf.host = host;
            }
            if let Some(port) = serve.port {
                conf.port = port;
            }
            let builder = Site::builder(conf);
            let builder = if serve.memory {
                tracing::warn!("using the in-memory store; data is lost on exit");
                builder.with_store(MemoryStore::new())
            } else {
                builder
            };
            builder.build().await?.serve_forever(cmd.verbose).await?;
        }
    }
    Ok(())
}
