//! Builds store adapters from the `[hot]` and `[cold]` config sections.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{ColdBackend, HotBackend};
use crate::store::{
    ColdStore, FsColdStore, FsHotStore, HotStore, HttpColdStore, MemoryColdStore, MemoryHotStore,
};

pub fn build_hot_store(backend: &HotBackend) -> Arc<dyn HotStore> {
    match backend {
        HotBackend::Fs { path } => {
            info!(path = %path.display(), "using filesystem hot store");
            Arc::new(FsHotStore::new(path))
        }
        HotBackend::Memory => Arc::new(MemoryHotStore::new()),
    }
}

pub fn build_cold_store(backend: &ColdBackend, op_timeout: Duration) -> Result<Arc<dyn ColdStore>> {
    match backend {
        ColdBackend::Fs { path } => {
            info!(path = %path.display(), "using filesystem cold store");
            Ok(Arc::new(FsColdStore::new(path)))
        }
        ColdBackend::Http { url, token_env } => {
            let token = match token_env {
                Some(var) => Some(
                    std::env::var(var)
                        .with_context(|| format!("cold store token variable {} is not set", var))?,
                ),
                None => None,
            };
            info!(url = %url, authenticated = token.is_some(), "using HTTP cold store");
            let store = HttpColdStore::new(url.clone(), token, Some(op_timeout))
                .context("Failed to build HTTP cold store")?;
            Ok(Arc::new(store))
        }
        ColdBackend::Memory => Ok(Arc::new(MemoryColdStore::new())),
    }
}
