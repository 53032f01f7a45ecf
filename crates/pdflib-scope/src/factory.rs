//! Root object factory with license key handling

use crate::config::{Config, ConfigResult, RootConfig};
use crate::error::{Result, ScopeError};
use crate::root::{license_option, RootObject};
use pdflib_engine::PdfEngine;
use tracing::{info, warn};

/// Source of fresh engine instances.
pub trait EngineProvider {
    fn create_engine(&self) -> Box<dyn PdfEngine>;
}

impl<F> EngineProvider for F
where
    F: Fn() -> Box<dyn PdfEngine>,
{
    fn create_engine(&self) -> Box<dyn PdfEngine> {
        self()
    }
}

/// Creates [`RootObject`]s that share a validated license key and settings.
///
/// ```
/// use pdflib_engine::{MemoryEngine, PdfEngine};
/// use pdflib_scope::Factory;
///
/// let mut factory = Factory::new(|| -> Box<dyn PdfEngine> {
///     Box::new(MemoryEngine::builder().accept_license("KEY-1").build())
/// });
/// assert!(!factory.set_license_key("wrong"));
/// assert!(factory.set_license_key("KEY-1"));
/// let root = factory.create_root_object()?;
/// # drop(root);
/// # Ok::<(), pdflib_scope::ScopeError>(())
/// ```
pub struct Factory {
    provider: Box<dyn EngineProvider>,
    config: RootConfig,
}

impl Factory {
    pub fn new(provider: impl EngineProvider + 'static) -> Self {
        Self::with_root_config(provider, RootConfig::default())
    }

    /// A factory whose root objects use `config`. A license key in `config`
    /// is applied without validation.
    pub fn with_root_config(provider: impl EngineProvider + 'static, config: RootConfig) -> Self {
        Self {
            provider: Box::new(provider),
            config,
        }
    }

    /// A factory configured from a loaded [`Config`]. The configured license
    /// key goes through [`set_license_key`](Factory::set_license_key).
    pub fn from_config(
        provider: impl EngineProvider + 'static,
        config: &Config,
    ) -> ConfigResult<Self> {
        let mut root_config = config.root_config()?;
        let license_key = root_config.license_key.take();
        let mut factory = Self::with_root_config(provider, root_config);
        if let Some(key) = license_key {
            factory.set_license_key(&key);
        }
        Ok(factory)
    }

    /// The license key applied to new root objects.
    pub fn license_key(&self) -> Option<&str> {
        self.config.license_key.as_deref()
    }

    pub fn root_config(&self) -> &RootConfig {
        &self.config
    }

    /// Validate `key` against a throwaway engine and use it for root objects
    /// created from now on.
    ///
    /// Any previously set key is dropped first, so a failed call leaves the
    /// factory unlicensed. Existing root objects are not affected. Returns
    /// whether the key was accepted.
    pub fn set_license_key(&mut self, key: &str) -> bool {
        self.config.license_key = None;

        let key = key.trim();
        if key.is_empty() {
            info!("Skipping empty license key.");
            return false;
        }

        match self.validate_license_key(key) {
            Ok(()) => {
                self.config.license_key = Some(key.to_string());
                true
            }
            Err(err) => {
                warn!(error = %err, "Skipping invalid license key!");
                false
            }
        }
    }

    fn validate_license_key(&self, key: &str) -> Result<()> {
        let mut engine = self.provider.create_engine();
        engine
            .set_option(&license_option(key))
            .map_err(|exception| ScopeError::LicenseInvalid {
                message: exception.message,
            })
    }

    /// A new root object on a fresh engine.
    pub fn create_root_object(&self) -> Result<RootObject> {
        RootObject::with_config(self.provider.create_engine(), self.config.clone())
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("licensed", &self.config.license_key.is_some())
            .field("virtual_file_prefix", &self.config.virtual_file_prefix)
            .field("min_pdf_version", &self.config.min_pdf_version)
            .finish()
    }
}
