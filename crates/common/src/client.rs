use thiserror::Error;

#[derive(Debug, Error)]
#[error("[client: {client}] missing environment variables: {}", .missing.join(", "))]
pub struct MissingEnv {
    pub client: &'static str,
    pub missing: Vec<&'static str>,
}

/// A backend connection set up once from the environment and cloned into
/// whatever needs it.
#[async_trait::async_trait]
pub trait ModuleClient: Clone + Send + Sync + 'static {
    const NAME: &'static str;
    const ENV_VARS: &'static [&'static str];
    type Client;

    fn missing_env() -> Vec<&'static str> {
        Self::ENV_VARS.iter().copied().filter(|var| std::env::var(var).is_err()).collect()
    }

    async fn setup_connection() -> Result<Self, MissingEnv>;

    fn get_client(&self) -> &Self::Client;
}

/// Declares a cloneable client wrapper implementing [`ModuleClient`]. `setup`
/// only runs once every listed env var is present.
#[macro_export]
macro_rules! define_module_client {
    {
        (struct $struct_name:ident, $client_name:expr)
        client_type: $client_type:ty,
        env: [ $( $env_var:literal ),* ],
        setup: $setup_logic:expr
    } => {
        #[derive(Clone)]
        pub struct $struct_name {
            client: std::sync::Arc<$client_type>,
        }

        impl $struct_name {
            pub fn from_client(client: $client_type) -> Self {
                Self { client: std::sync::Arc::new(client) }
            }
        }

        #[async_trait::async_trait]
        impl ::summon_common::ModuleClient for $struct_name {
            const NAME: &'static str = $client_name;
            const ENV_VARS: &'static [&'static str] = &[ $( $env_var ),* ];
            type Client = std::sync::Arc<$client_type>;

            async fn setup_connection() -> Result<Self, ::summon_common::MissingEnv> {
                let missing = <Self as ::summon_common::ModuleClient>::missing_env();
                if !missing.is_empty() {
                    let err = ::summon_common::MissingEnv { client: $client_name, missing };
                    tracing::error!("{}", err);
                    return Err(err);
                }
                Ok(Self::from_client($setup_logic.await))
            }

            fn get_client(&self) -> &Self::Client {
                &self.client
            }
        }
    }
}
