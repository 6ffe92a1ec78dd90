use crate::grid::GridError;
use crate::map_loader::MapError;
use crate::players::JoinError;
use std::io;
use thiserror::Error;

/// Problems with the level that stop the server before it accepts anyone.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("invalid map: {0}")]
    Grid(#[from] GridError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    /// Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Read/write failure on one connection; ends that connection only.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    /// Unparsable line; the line is skipped and the connection kept.
    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),
    /// Join rejected: every player symbol is taken or there is nowhere to spawn.
    #[error(transparent)]
    Join(#[from] JoinError),
}

impl From<MapError> for ServerError {
    fn from(err: MapError) -> Self {
        ServerError::Configuration(err.into())
    }
}

impl From<GridError> for ServerError {
    fn from(err: GridError) -> Self {
        ServerError::Configuration(err.into())
    }
}
