use alloc::string::String;

use crate::EffectKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("surface host error: {0}")]
    Host(String),

    #[error("{kind:?} effect did not resolve within {elapsed_ms}ms")]
    Watchdog { kind: EffectKind, elapsed_ms: u64 },

    #[error("visibility observer unavailable: {0}")]
    ObserverUnavailable(String),

    #[error("surface could not be created: {0}")]
    SurfaceUnavailable(String),

    #[error("duplicate item id: {0}")]
    DuplicateId(String),

    #[error("order is not a permutation of the current items: {0}")]
    InvalidOrder(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = core::result::Result<T, Error>;
