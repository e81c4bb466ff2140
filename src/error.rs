use thiserror::Error;

use crate::{audio::AudioError, config::ConfigError, store::StoreError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("not logged in, run `wakey login` first")]
    NotLoggedIn,
    #[error("{0} isn't on your friend list")]
    UnknownFriend(String),
    #[error("invalid time `{0}`, expected HH:MM")]
    InvalidTime(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
