//! Injected collaborators
//!
//! One context per signed-in browsing session, built at session start and
//! dropped on logout. Every component takes what it needs from here; there
//! is no global client.

use std::sync::Arc;

use campus_client::http::{HttpIdentityProvider, HttpRemoteFunctions};
use campus_client::memory::{MemoryIdentityProvider, MemoryRemoteFunctions, MemoryRosterStore};
use campus_client::{IdentityProvider, RemoteFunctions, RosterStore};

use crate::config::VerifyConfig;
use crate::error::VerifyError;

#[derive(Clone)]
pub struct VerifyContext {
    pub identity: Arc<dyn IdentityProvider>,
    pub functions: Arc<dyn RemoteFunctions>,
    pub roster: Arc<dyn RosterStore>,
    pub config: Arc<VerifyConfig>,
}

impl VerifyContext {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        functions: Arc<dyn RemoteFunctions>,
        roster: Arc<dyn RosterStore>,
        config: VerifyConfig,
    ) -> Self {
        Self {
            identity,
            functions,
            roster,
            config: Arc::new(config),
        }
    }

    /// HTTP identity and gateway clients from `config`, with the given roster.
    ///
    /// The identity client is also returned so the sign-in code can install
    /// sessions on it.
    pub fn hosted(
        config: VerifyConfig,
        roster: Arc<dyn RosterStore>,
    ) -> Result<(Self, Arc<HttpIdentityProvider>), VerifyError> {
        let timeout = config.gateway.timeout();

        let identity = Arc::new(HttpIdentityProvider::new(
            &config.identity.base_url,
            config.identity_api_key()?,
            timeout,
        )?);
        let functions = HttpRemoteFunctions::new(
            &config.gateway.base_url,
            &config.gateway.function_name,
            config.gateway_api_key()?,
            timeout,
        )?;

        tracing::info!(endpoint = %functions.endpoint(), "Hosted collaborators configured");
        let context = Self::new(identity.clone(), Arc::new(functions), roster, config);
        Ok((context, identity))
    }

    /// All-in-memory context for tests and demos
    pub fn in_memory(
        identity: Arc<MemoryIdentityProvider>,
        functions: Arc<MemoryRemoteFunctions>,
        roster: Arc<MemoryRosterStore>,
    ) -> Self {
        Self::new(identity, functions, roster, VerifyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    fn hosted_with_keys(gateway_env: &str, identity_env: &str) -> Result<(), VerifyError> {
        let mut config = VerifyConfig::default();
        config.gateway.api_key_env = gateway_env.to_string();
        config.identity.api_key_env = identity_env.to_string();
        VerifyContext::hosted(config, Arc::new(MemoryRosterStore::new())).map(|_| ())
    }

    #[test]
    fn test_hosted_reads_identity_key_env() {
        std::env::set_var("CAMPUS_CTX_GATEWAY_KEY", "gateway-secret");
        let err = hosted_with_keys("CAMPUS_CTX_GATEWAY_KEY", "CAMPUS_CTX_UNSET_IDENTITY_KEY")
            .unwrap_err();
        assert!(matches!(
            err,
            VerifyError::Config(ConfigError::MissingEnv(ref name))
                if name == "CAMPUS_CTX_UNSET_IDENTITY_KEY"
        ));
    }

    #[test]
    fn test_hosted_with_distinct_keys() {
        std::env::set_var("CAMPUS_CTX_GATEWAY_KEY_2", "gateway-secret");
        std::env::set_var("CAMPUS_CTX_IDENTITY_KEY_2", "identity-secret");
        assert!(hosted_with_keys("CAMPUS_CTX_GATEWAY_KEY_2", "CAMPUS_CTX_IDENTITY_KEY_2").is_ok());
    }
}
