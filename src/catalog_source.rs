// src/catalog_source.rs

use crate::catalog::CatalogIndex;
use crate::config::CatalogConfig;
use crate::packing::CartonFormat;
use crate::packing::carton::formats_from_value;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CatalogLoadError {
    #[error("No catalog source configured (set catalog.path or catalog.api_url)")]
    NotConfigured,

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status} for {url}")]
    Status { status: u16, url: String },
}

/// Where a JSON list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    File(String),
    Api(String),
}

impl Origin {
    fn pick(path: Option<&str>, api_url: Option<&str>, endpoint: &str) -> Option<Self> {
        if let Some(path) = path {
            return Some(Self::File(path.to_string()));
        }
        api_url.map(|base| {
            Self::Api(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            ))
        })
    }

    fn describe(&self) -> &str {
        match self {
            Self::File(p) | Self::Api(p) => p,
        }
    }
}

/// Load the catalog snapshot for this session and index it.
pub async fn load_catalog(cfg: &CatalogConfig) -> Result<CatalogIndex, CatalogLoadError> {
    let origin = Origin::pick(
        cfg.path.as_deref(),
        cfg.api_url.as_deref(),
        &cfg.products_endpoint,
    )
    .ok_or(CatalogLoadError::NotConfigured)?;

    let raw = fetch_raw(&origin, cfg).await?;
    let index = CatalogIndex::from_json(&raw);
    info!(
        origin = %origin.describe(),
        products = index.len(),
        snapshot = %index.snapshot_id(),
        "Catalog snapshot loaded"
    );
    Ok(index)
}

/// Load carton formats. Without a configured source the list is empty and
/// only custom dimensions are available.
pub async fn load_formats(cfg: &CatalogConfig) -> Result<Vec<CartonFormat>, CatalogLoadError> {
    let Some(origin) = Origin::pick(
        cfg.formats_path.as_deref(),
        cfg.api_url.as_deref(),
        &cfg.formats_endpoint,
    ) else {
        warn!("No carton format source configured, custom dimensions only");
        return Ok(Vec::new());
    };

    let raw = fetch_raw(&origin, cfg).await?;
    let value: Value = serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(origin = %origin.describe(), error = %e, "Carton formats are not valid JSON");
        Value::Null
    });
    let formats = formats_from_value(&value);
    info!(origin = %origin.describe(), formats = formats.len(), "Carton formats loaded");
    Ok(formats)
}

async fn fetch_raw(origin: &Origin, cfg: &CatalogConfig) -> Result<String, CatalogLoadError> {
    match origin {
        Origin::File(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CatalogLoadError::Io {
                    path: path.clone(),
                    source,
                })
        }
        Origin::Api(url) => {
            let client = Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs))
                .build()?;
            let mut req = client.get(url).header("Accept", "application/json");
            if let Some(token) = &cfg.api_token {
                req = req.bearer_auth(token);
            }

            let resp = req.send().await?;
            if !resp.status().is_success() {
                return Err(CatalogLoadError::Status {
                    status: resp.status().as_u16(),
                    url: url.clone(),
                });
            }
            Ok(resp.text().await?)
        }
    }
}
