use std::time::Duration;

use thiserror::Error;

use crate::model::ModelError;
use crate::tools::RegistryError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("provider '{provider}' failed to connect: {reason}")]
    ProviderConnection { provider: String, reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model did not respond within {0:?}")]
    ModelTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;
