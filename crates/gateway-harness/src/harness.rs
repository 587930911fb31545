use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::errors::HarnessError;
use crate::model::ProviderId;
use crate::persist::{InteractionSink, LogInteractionSink};
use crate::provider::ProviderAdapter;
use crate::run::RunBuilder;

pub(crate) struct HarnessInner {
    providers: BTreeMap<ProviderId, Arc<dyn ProviderAdapter>>,
    default_provider: ProviderId,
    pub(crate) sink: Arc<dyn InteractionSink>,
}

/// Availability snapshot of one registered provider.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub available: bool,
    pub streaming: bool,
    pub default: bool,
}

/// Provider registry and entry point for completions.
///
/// Cheap to clone; every clone shares the same registry.
#[derive(Clone)]
pub struct Harness {
    pub(crate) inner: Arc<HarnessInner>,
}

impl Harness {
    /// Starts a builder for registering providers and creating a `Harness`.
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Starts building one completion request.
    pub fn run(&self) -> RunBuilder {
        RunBuilder::new(self.inner.clone())
    }

    /// Returns the provider for `name`, or the default provider when `name`
    /// is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn ProviderAdapter>, HarnessError> {
        self.inner.resolve(name)
    }

    /// Name of the configured default provider.
    pub fn default_provider(&self) -> &ProviderId {
        &self.inner.default_provider
    }

    /// Whether `name` is registered and currently configured.
    pub fn is_available(&self, name: &str) -> bool {
        self.inner
            .providers
            .get(&ProviderId::new(name))
            .is_some_and(|p| p.is_available())
    }

    /// Lists registered providers, evaluating availability now.
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.inner
            .providers
            .iter()
            .map(|(id, provider)| ProviderInfo {
                name: id.to_string(),
                available: provider.is_available(),
                streaming: provider.supports_streaming(),
                default: *id == self.inner.default_provider,
            })
            .collect()
    }
}

impl HarnessInner {
    pub(crate) fn resolve(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn ProviderAdapter>, HarnessError> {
        let id = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => ProviderId::new(name),
            None => self.default_provider.clone(),
        };
        self.providers
            .get(&id)
            .cloned()
            .ok_or(HarnessError::ProviderNotFound { provider: id })
    }
}

/// Builder used to register provider adapters before creating a `Harness`.
#[derive(Default)]
pub struct HarnessBuilder {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    default_provider: Option<ProviderId>,
    sink: Option<Arc<dyn InteractionSink>>,
}

impl HarnessBuilder {
    /// Registers a provider adapter.
    ///
    /// Register one adapter per provider id. The first registered provider is
    /// the default unless [`HarnessBuilder::default_provider`] is set.
    pub fn register_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Sets the provider used when a request names none.
    pub fn default_provider(mut self, name: impl Into<ProviderId>) -> Self {
        self.default_provider = Some(name.into());
        self
    }

    /// Sets where finished interactions are reported.
    pub fn interaction_sink(mut self, sink: Arc<dyn InteractionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the harness.
    ///
    /// Fails on duplicate ids, an unknown default, or when no always-available
    /// provider is registered.
    pub fn build(self) -> Result<Harness, HarnessError> {
        let mut map: BTreeMap<ProviderId, Arc<dyn ProviderAdapter>> = BTreeMap::new();
        let mut seen: HashSet<ProviderId> = HashSet::new();
        let mut first: Option<ProviderId> = None;
        for provider in self.providers {
            let id = provider.id();
            if !seen.insert(id.clone()) {
                return Err(HarnessError::Config(format!(
                    "duplicate provider registration: {id}"
                )));
            }
            first.get_or_insert_with(|| id.clone());
            map.insert(id, provider);
        }
        if !map.values().any(|p| p.always_available()) {
            return Err(HarnessError::Config(
                "an always-available provider (for example echo) must be registered".into(),
            ));
        }
        let default_provider = self
            .default_provider
            .or(first)
            .ok_or_else(|| HarnessError::Config("no providers registered".into()))?;
        if !map.contains_key(&default_provider) {
            return Err(HarnessError::Config(format!(
                "default provider is not registered: {default_provider}"
            )));
        }
        Ok(Harness {
            inner: Arc::new(HarnessInner {
                providers: map,
                default_provider,
                sink: self.sink.unwrap_or_else(|| Arc::new(LogInteractionSink)),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::CompletionResponse;
    use crate::errors::ProviderError;
    use crate::provider::ProviderRequest;
    use crate::vendors::echo::EchoProvider;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ToggleProvider {
        configured: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for ToggleProvider {
        fn id(&self) -> ProviderId {
            ProviderId::new("toggle")
        }

        fn is_available(&self) -> bool {
            self.configured.load(Ordering::SeqCst)
        }

        fn default_model(&self) -> String {
            "toggle-1".into()
        }

        async fn generate(
            &self,
            _req: ProviderRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            unreachable!("not used in this test")
        }
    }

    fn echo() -> Arc<dyn ProviderAdapter> {
        Arc::new(EchoProvider::default())
    }

    #[test]
    fn build_rejects_duplicate_provider_ids() {
        let result = Harness::builder()
            .register_provider(echo())
            .register_provider(echo())
            .build();
        assert!(
            matches!(result, Err(HarnessError::Config(message)) if message.contains("duplicate provider"))
        );
    }

    #[test]
    fn build_requires_an_always_available_provider() {
        let result = Harness::builder()
            .register_provider(Arc::new(ToggleProvider {
                configured: Arc::new(AtomicBool::new(true)),
            }))
            .build();
        assert!(
            matches!(result, Err(HarnessError::Config(message)) if message.contains("always-available"))
        );
    }

    #[test]
    fn build_rejects_unknown_default() {
        let result = Harness::builder()
            .register_provider(echo())
            .default_provider("missing")
            .build();
        assert!(
            matches!(result, Err(HarnessError::Config(message)) if message.contains("missing"))
        );
    }

    #[test]
    fn resolve_falls_back_to_default_and_rejects_unknown_names() {
        let harness = Harness::builder()
            .register_provider(echo())
            .build()
            .expect("harness");
        assert_eq!(harness.resolve(None).expect("default").id().as_str(), "echo");
        assert_eq!(harness.resolve(Some("  ")).expect("blank").id().as_str(), "echo");
        assert!(matches!(
            harness.resolve(Some("nope")),
            Err(HarnessError::ProviderNotFound { provider }) if provider.as_str() == "nope"
        ));
    }

    #[test]
    fn availability_is_evaluated_on_demand() {
        let configured = Arc::new(AtomicBool::new(false));
        let harness = Harness::builder()
            .register_provider(echo())
            .register_provider(Arc::new(ToggleProvider {
                configured: configured.clone(),
            }))
            .build()
            .expect("harness");

        assert!(!harness.is_available("toggle"));
        configured.store(true, Ordering::SeqCst);
        assert!(harness.is_available("toggle"));
        assert!(harness.is_available("echo"));
        assert!(!harness.is_available("unknown"));

        let listed = harness.providers();
        assert_eq!(listed.len(), 2);
        assert_eq!(
            listed[0],
            ProviderInfo {
                name: "echo".into(),
                available: true,
                streaming: true,
                default: true,
            }
        );
        assert!(listed[1].available);
        assert!(!listed[1].streaming);
    }
}
