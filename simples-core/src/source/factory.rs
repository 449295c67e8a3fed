use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::record_source::{RecordSource, SourceError};

/// Provider-agnostic connection configuration.
///
/// `provider` must match the [`SourceFactory::provider_name`] of a registered
/// factory. `connection_string` is passed through unchanged; its meaning is
/// provider-specific.
///
/// | provider | connection_string examples |
/// |----------|----------------------------|
/// | `json`   | `./erp-export`, `/var/lib/simples/sync` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub provider: String,
    pub connection_string: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            provider: "json".to_string(),
            connection_string: ".".to_string(),
        }
    }
}

/// One implementation per ERP provider, registered with a
/// [`SourceRegistry`] at startup.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    /// Unique, lowercase identifier for this provider.
    fn provider_name(&self) -> &'static str;

    async fn create(&self, config: &SourceConfig) -> Result<Box<dyn RecordSource>, SourceError>;
}

/// Registry of [`SourceFactory`] instances, keyed by provider name.
pub struct SourceRegistry {
    factories: HashMap<&'static str, Box<dyn SourceFactory>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a provider factory, replacing any factory with the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn SourceFactory>,
    ) {
        self.factories.insert(factory.provider_name(), factory);
    }

    /// Names of every registered provider, sorted alphabetically.
    pub fn available_providers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch to the factory that matches `config.provider`.
    ///
    /// # Errors
    /// * [`SourceError::Configuration`] when no factory is registered for the
    ///   requested provider.
    /// * Any error the chosen factory itself returns.
    pub async fn create(
        &self,
        config: &SourceConfig,
    ) -> Result<Box<dyn RecordSource>, SourceError> {
        let factory = self.factories.get(config.provider.as_str()).ok_or_else(|| {
            SourceError::Configuration(format!(
                "unknown provider '{}'; available: {:?}",
                config.provider,
                self.available_providers()
            ))
        })?;

        debug!(provider = %config.provider, "creating record source");
        factory.create(config).await
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// tests
// ─────────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::{RecordSource, SourceConfig, SourceError, SourceFactory, SourceRegistry};
    use crate::models::{DataKind, LedgerRecord};

    // ── stub source ──────────────────────────────────────────────────────
    struct StubSource {
        provider: &'static str,
    }

    #[async_trait]
    impl RecordSource for StubSource {
        fn provider(&self) -> &str {
            self.provider
        }
        async fn test_connection(&self) -> Result<(), SourceError> {
            Ok(())
        }
        async fn fetch_records(
            &self,
            _kind: DataKind,
        ) -> Result<Vec<LedgerRecord>, SourceError> {
            Ok(vec![LedgerRecord::default()])
        }
    }

    // ── stub factory ─────────────────────────────────────────────────────
    /// Flips `called` when `create` runs so tests can prove dispatch.
    struct StubFactory {
        name: &'static str,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl SourceFactory for StubFactory {
        fn provider_name(&self) -> &'static str {
            self.name
        }
        async fn create(
            &self,
            _config: &SourceConfig,
        ) -> Result<Box<dyn RecordSource>, SourceError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Box::new(StubSource {
                provider: self.name,
            }))
        }
    }

    struct FailingFactory;

    #[async_trait]
    impl SourceFactory for FailingFactory {
        fn provider_name(&self) -> &'static str {
            "failing"
        }
        async fn create(
            &self,
            _config: &SourceConfig,
        ) -> Result<Box<dyn RecordSource>, SourceError> {
            Err(SourceError::Io("intentional failure".to_string()))
        }
    }

    fn stub_factory(name: &'static str) -> (Box<dyn SourceFactory>, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (
            Box::new(StubFactory {
                name,
                called: flag.clone(),
            }),
            flag,
        )
    }

    fn config(provider: &str) -> SourceConfig {
        SourceConfig {
            provider: provider.to_string(),
            connection_string: "x".to_string(),
        }
    }

    // ── SourceConfig ─────────────────────────────────────────────────────
    #[test]
    fn source_config_default_is_json_current_dir() {
        let cfg = SourceConfig::default();
        assert_eq!(cfg.provider, "json");
        assert_eq!(cfg.connection_string, ".");
    }

    // ── registration ─────────────────────────────────────────────────────
    #[test]
    fn default_registry_is_empty() {
        assert!(SourceRegistry::default().available_providers().is_empty());
    }

    #[test]
    fn available_providers_is_sorted() {
        let mut reg = SourceRegistry::new();
        let (f1, _) = stub_factory("omie");
        let (f2, _) = stub_factory("bling");
        reg.register(f1);
        reg.register(f2);
        assert_eq!(reg.available_providers(), vec!["bling", "omie"]);
    }

    #[test]
    fn duplicate_registration_replaces_previous() {
        let mut reg = SourceRegistry::new();
        let (old, _) = stub_factory("json");
        let (new, _) = stub_factory("json");
        reg.register(old);
        reg.register(new);
        assert_eq!(reg.available_providers(), vec!["json"]);
    }

    // ── dispatch ─────────────────────────────────────────────────────────
    #[tokio::test]
    async fn create_calls_matching_factory_only() {
        let mut reg = SourceRegistry::new();
        let (bling, bling_called) = stub_factory("bling");
        let (omie, omie_called) = stub_factory("omie");
        reg.register(bling);
        reg.register(omie);

        let source = reg.create(&config("omie")).await.unwrap();

        assert_eq!(source.provider(), "omie");
        assert!(omie_called.load(Ordering::SeqCst));
        assert!(!bling_called.load(Ordering::SeqCst));
        assert_eq!(source.fetch_records(DataKind::Sales).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_provider_names_requested_and_available() {
        let mut reg = SourceRegistry::new();
        let (f, _) = stub_factory("json");
        reg.register(f);

        match reg.create(&config("tiny")).await {
            Err(SourceError::Configuration(msg)) => {
                assert!(msg.contains("tiny"), "error should name the requested provider");
                assert!(msg.contains("json"), "error should list available providers");
            }
            other => panic!("expected Configuration error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn create_propagates_factory_error() {
        let mut reg = SourceRegistry::new();
        reg.register(Box::new(FailingFactory));

        assert!(matches!(
            reg.create(&config("failing")).await,
            Err(SourceError::Io(_))
        ));
    }
}
