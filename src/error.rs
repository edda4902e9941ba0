//! Error taxonomy.
//!
//! Configuration problems are fatal at room-load time and surface as
//! [`ConfigError`]. Problems found while evaluating rules never abort a tick;
//! they are [`ActionError`]s that the dispatcher logs and moves past.

use thiserror::Error;

/// A room description that cannot be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("body '{id}': unsupported body type '{kind}'")]
    UnknownShape { id: String, kind: String },

    #[error("body '{id}': {reason}")]
    InvalidBody { id: String, reason: String },

    #[error("duplicate body id '{0}' in room layout")]
    DuplicateBodyId(String),

    #[error("rule #{index}: {reason}")]
    MalformedRule { index: usize, reason: String },

    #[error("rule #{index}: action '{action}' is not allowed on a {trigger} rule")]
    ActionNotAllowed {
        index: usize,
        action: &'static str,
        trigger: &'static str,
    },

    #[error("template '{template}': {reason}")]
    BadTemplate { template: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("body id '{0}' is already registered")]
    DuplicateId(String),
}

/// A single rule action that could not run. Never fatal.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("body '{0}' is no longer registered")]
    MissingBody(String),

    #[error("rule has no '{0}' body in this context")]
    NoSuchRole(&'static str),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Failure fetching or parsing a room.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("room '{room}': {source}")]
    Io {
        room: String,
        #[source]
        source: std::io::Error,
    },

    #[error("room '{room}' {file}: {source}")]
    Json {
        room: String,
        file: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("room '{0}' not found")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("interaction hooks are already attached")]
    HooksAttached,
}

pub type Result<T> = std::result::Result<T, Error>;
