//! The alarm store and the identity/friends service the client talks to.
//!
//! Both are owned by someone else, the client only relies on every action
//! answering with the full, current alarm record.

use std::{collections::HashMap, sync::Arc};

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    alarm::{Alarm, AlarmId, NewAlarm, UserId},
    lifecycle::{ActionKind, TransitionError},
};

pub mod http;
pub mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

/// shown when a partner's name can't be resolved
pub const PLACEHOLDER_NAME: &str = "Friend";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("couldn't reach the alarm store: {0}")]
    Http(#[from] reqwest::Error),
    #[error("couldn't read the alarm store's answer: {0}")]
    Json(#[from] serde_json::Error),
    /// the store answered but said no
    #[error("{0}")]
    Rejected(String),
    #[error("Alarm not found")]
    AlarmNotFound(AlarmId),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Missing required fields")]
    MissingFields,
    #[error("Can only create alarms with friends")]
    NotFriends,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("the store answered success without a {0}")]
    MissingPayload(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// where the shared alarms live
pub trait AlarmStore {
    /// every alarm `user` is part of
    ///
    /// # Errors
    /// if the store can't be reached or refuses
    fn fetch_alarms(&self, user: UserId) -> Result<Vec<Alarm>, StoreError>;

    /// runs one action and hands back the full updated record
    ///
    /// # Errors
    /// if the store can't be reached or refuses, nothing changed in that case
    fn send_action(
        &self,
        kind: ActionKind,
        alarm: AlarmId,
        user: UserId,
    ) -> Result<Alarm, StoreError>;

    /// # Errors
    /// if the store can't be reached or refuses
    fn create_alarm(&self, request: &NewAlarm) -> Result<Alarm, StoreError>;
}

/// accounts and friend lists
pub trait Identity {
    /// # Errors
    /// if the name is taken or the store can't be reached
    fn signup(&self, username: &str, password: &str) -> Result<User, StoreError>;

    /// # Errors
    /// on bad credentials or if the store can't be reached
    fn login(&self, username: &str, password: &str) -> Result<User, StoreError>;

    /// # Errors
    /// if the store can't be reached
    fn friends(&self, user: UserId) -> Result<Vec<User>, StoreError>;
}

impl<T: AlarmStore + ?Sized> AlarmStore for Arc<T> {
    fn fetch_alarms(&self, user: UserId) -> Result<Vec<Alarm>, StoreError> {
        (**self).fetch_alarms(user)
    }

    fn send_action(
        &self,
        kind: ActionKind,
        alarm: AlarmId,
        user: UserId,
    ) -> Result<Alarm, StoreError> {
        (**self).send_action(kind, alarm, user)
    }

    fn create_alarm(&self, request: &NewAlarm) -> Result<Alarm, StoreError> {
        (**self).create_alarm(request)
    }
}

impl<T: Identity + ?Sized> Identity for Arc<T> {
    fn signup(&self, username: &str, password: &str) -> Result<User, StoreError> {
        (**self).signup(username, password)
    }

    fn login(&self, username: &str, password: &str) -> Result<User, StoreError> {
        (**self).login(username, password)
    }

    fn friends(&self, user: UserId) -> Result<Vec<User>, StoreError> {
        (**self).friends(user)
    }
}

/// resolves user ids to the names shown next to an alarm
pub trait Directory {
    fn display_name(&self, user: UserId) -> Option<&str>;

    fn placeholder(&self) -> &str {
        PLACEHOLDER_NAME
    }

    /// never fails, unknown partners get [`Directory::placeholder`]
    fn partner_name(&self, user: UserId) -> String {
        self.display_name(user).map_or_else(
            || {
                warn!("no name for partner {user}");
                self.placeholder().to_string()
            },
            ToString::to_string,
        )
    }
}

/// the logged in user's friend list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Friends(HashMap<UserId, String>);

impl Friends {
    #[must_use]
    pub fn id_of(&self, username: &str) -> Option<UserId> {
        self.0
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(username))
            .map(|(id, _)| *id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Directory for Friends {
    fn display_name(&self, user: UserId) -> Option<&str> {
        self.0.get(&user).map(String::as_str)
    }
}

impl FromIterator<(UserId, String)> for Friends {
    fn from_iter<I: IntoIterator<Item = (UserId, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<User>> for Friends {
    fn from(users: Vec<User>) -> Self {
        users
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect()
    }
}
