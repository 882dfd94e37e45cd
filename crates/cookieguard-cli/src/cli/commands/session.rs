//! Wiring shared by every command that touches stored consent.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cookieguard_core::{
    ClientContext, ConsentConfig, ConsentManager, FileStorage, HeaderCookieJar, HttpAuditSink,
    PolicyRegistry,
};

use crate::cli::args::{DecisionArgs, GlobalArgs};

pub fn load_registry(global: &GlobalArgs) -> Result<Arc<PolicyRegistry>> {
    let registry = match &global.policy {
        Some(path) => PolicyRegistry::from_path(path)
            .with_context(|| format!("failed to load cookie policy {}", path.display()))?,
        None => PolicyRegistry::reference().context("built-in cookie policy is invalid")?,
    };
    Ok(Arc::new(registry))
}

/// Config file when given, otherwise `COOKIEGUARD_*` variables.
pub fn load_config(global: &GlobalArgs) -> Result<ConsentConfig> {
    match &global.config {
        Some(path) => ConsentConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let config = ConsentConfig::from_env();
            config.validate()?;
            Ok(config)
        }
    }
}

fn state_dir(global: &GlobalArgs) -> Result<PathBuf> {
    global
        .state_dir
        .clone()
        .or_else(FileStorage::default_dir)
        .context("cannot determine a data directory, pass --state-dir")
}

/// A mounted manager backed by file storage, with header output.
pub struct Session {
    pub manager: ConsentManager,
    pub jar: Arc<HeaderCookieJar>,
    audit: Option<Arc<HttpAuditSink>>,
}

impl Session {
    pub fn open(global: &GlobalArgs, client: &DecisionArgs) -> Result<Self> {
        let registry = load_registry(global)?;
        let config = load_config(global)?;
        let storage = Arc::new(FileStorage::new(state_dir(global)?));
        let jar = Arc::new(HeaderCookieJar::new());
        let audit = HttpAuditSink::from_config(&config)?.map(Arc::new);

        let mut builder = ConsentManager::builder(registry)
            .config(config)
            .storage(storage)
            .cookie_jar(jar.clone())
            .client_context(ClientContext {
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
        if let Some(sink) = &audit {
            builder = builder.audit_sink(sink.clone());
        }

        let mut manager = builder.build()?;
        manager.mount();

        Ok(Self {
            manager,
            jar,
            audit,
        })
    }

    /// Wait for pending audit submissions.
    pub async fn finish(self) {
        if let Some(sink) = self.audit {
            sink.drain().await;
        }
    }
}
