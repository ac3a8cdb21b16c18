//! Startup load of the six JSON resources, from disk or over HTTP.
//!
//! A failed load is recovered exactly once by substituting the fallback
//! dataset. There is no retry.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::channels::ChannelCatalog;
use crate::error::{EngineError, EngineResult};
use crate::store::fallback::fallback_store;
use crate::store::ingest::{ingest, RawBundle};
use crate::store::MetricsStore;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 12;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .user_agent(concat!("budget-analytics/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .build()
        .unwrap_or_else(|_| Client::new())
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    MonthlyData,
    BudgetOptimization,
    CategoryRevenue,
    ChannelResponse,
    TopChannels,
    SummaryStats,
}

impl Resource {
    pub const ALL: [Resource; 6] = [
        Resource::MonthlyData,
        Resource::BudgetOptimization,
        Resource::CategoryRevenue,
        Resource::ChannelResponse,
        Resource::TopChannels,
        Resource::SummaryStats,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::MonthlyData => "monthly_data.json",
            Self::BudgetOptimization => "budget_optimization.json",
            Self::CategoryRevenue => "category_revenue.json",
            Self::ChannelResponse => "channel_response.json",
            Self::TopChannels => "top_channels.json",
            Self::SummaryStats => "summary_stats.json",
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// Where the raw resource text comes from.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn describe(&self) -> String;

    async fn fetch(&self, resource: Resource) -> EngineResult<String>;
}

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DataSource for DirectorySource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn fetch(&self, resource: Resource) -> EngineResult<String> {
        let path = self.root.join(resource.file_name());
        debug!(path = %path.display(), "reading resource");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| {
                EngineError::load(resource.to_string(), format!("{}: {e}", path.display()))
            })
    }
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, resource: Resource) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            resource.file_name()
        )
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn fetch(&self, resource: Resource) -> EngineResult<String> {
        let url = self.url_for(resource);
        debug!(%url, "fetching resource");
        let response = HTTP_CLIENT
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::load(resource.to_string(), format!("GET {url}: {e}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EngineError::load(resource.to_string(), format!("reading {url}: {e}")))?;
        if !status.is_success() {
            let preview: String = body.chars().take(180).collect();
            return Err(EngineError::load(
                resource.to_string(),
                format!("GET {url} returned {status}: {preview}"),
            ));
        }
        Ok(body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Loaded,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub store: MetricsStore,
    pub origin: DataOrigin,
    /// Set when the fallback dataset was substituted.
    pub warning: Option<String>,
}

impl LoadOutcome {
    pub fn is_fallback(&self) -> bool {
        self.origin == DataOrigin::Fallback
    }
}

async fn fetch_json(source: &dyn DataSource, resource: Resource) -> EngineResult<Value> {
    let body = source.fetch(resource).await?;
    serde_json::from_str(&body)
        .map_err(|e| EngineError::load(resource.to_string(), format!("invalid JSON: {e}")))
}

/// Reads all six resources concurrently. Any failure is a
/// [`EngineError::DataLoadFailure`].
pub async fn fetch_bundle(source: &dyn DataSource) -> EngineResult<RawBundle> {
    let (
        monthly_data,
        budget_optimization,
        category_revenue,
        channel_response,
        top_channels,
        summary_stats,
    ) = tokio::try_join!(
        fetch_json(source, Resource::MonthlyData),
        fetch_json(source, Resource::BudgetOptimization),
        fetch_json(source, Resource::CategoryRevenue),
        fetch_json(source, Resource::ChannelResponse),
        fetch_json(source, Resource::TopChannels),
        fetch_json(source, Resource::SummaryStats),
    )?;
    Ok(RawBundle {
        monthly_data,
        budget_optimization,
        category_revenue,
        channel_response,
        top_channels,
        summary_stats,
    })
}

/// Loads the store from `source`, substituting the fallback dataset when any
/// resource fails. Never fails itself.
pub async fn load_store(source: &dyn DataSource, catalog: ChannelCatalog) -> LoadOutcome {
    match fetch_bundle(source).await {
        Ok(bundle) => {
            let store = ingest(&bundle, catalog);
            info!(
                source = %source.describe(),
                months = store.monthly().len(),
                categories = store.categories().len(),
                "metrics loaded"
            );
            LoadOutcome {
                store,
                origin: DataOrigin::Loaded,
                warning: None,
            }
        }
        Err(e) => {
            warn!(source = %source.describe(), error = %e, "using fallback dataset");
            LoadOutcome {
                store: fallback_store(catalog),
                origin: DataOrigin::Fallback,
                warning: Some(format!("{e}; showing built-in sample data")),
            }
        }
    }
}
