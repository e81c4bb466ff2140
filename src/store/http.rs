use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{AlarmStore, Identity, StoreError, User};
use crate::{
    alarm::{Alarm, AlarmId, NewAlarm, UserId},
    lifecycle::ActionKind,
};

/// the alarm store's REST api
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base: String,
}

/// `{success, message}` plus whichever record the route returns
#[derive(Debug, Deserialize)]
struct Reply {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    alarm: Option<Alarm>,
    #[serde(default)]
    user: Option<User>,
}

impl Reply {
    fn checked(self) -> Result<Self, StoreError> {
        if self.success {
            Ok(self)
        } else {
            Err(StoreError::Rejected(
                self.message
                    .unwrap_or_else(|| "the alarm store refused".to_string()),
            ))
        }
    }

    fn into_alarm(self) -> Result<Alarm, StoreError> {
        self.checked()?
            .alarm
            .ok_or(StoreError::MissingPayload("alarm"))
    }

    fn into_user(self) -> Result<User, StoreError> {
        self.checked()?.user.ok_or(StoreError::MissingPayload("user"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionRequest {
    alarm_id: AlarmId,
    user_id: UserId,
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

impl HttpStore {
    /// `base` is everything before the route, e.g. `http://localhost:3001/api`
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base)
    }

    fn post<B: Serialize + ?Sized>(&self, route: &str, body: &B) -> Result<Reply, StoreError> {
        debug!("POST {route}");
        let reply = self
            .client
            .post(self.url(route))
            .json(body)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(reply)
    }

    fn get<T: for<'de> Deserialize<'de>>(&self, route: &str) -> Result<T, StoreError> {
        debug!("GET {route}");
        let body = self
            .client
            .get(self.url(route))
            .send()?
            .error_for_status()?
            .text()?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl AlarmStore for HttpStore {
    fn fetch_alarms(&self, user: UserId) -> Result<Vec<Alarm>, StoreError> {
        let alarms: Vec<Alarm> = self.get(&format!("/alarms/{user}"))?;
        debug!("fetched {} alarms for {user}", alarms.len());
        Ok(alarms)
    }

    fn send_action(
        &self,
        kind: ActionKind,
        alarm: AlarmId,
        user: UserId,
    ) -> Result<Alarm, StoreError> {
        self.post(
            &format!("/agent/{kind}"),
            &ActionRequest {
                alarm_id: alarm,
                user_id: user,
            },
        )?
        .into_alarm()
    }

    fn create_alarm(&self, request: &NewAlarm) -> Result<Alarm, StoreError> {
        let alarm = self.post("/alarms", request)?.into_alarm()?;
        info!("created alarm {} at {}", alarm.id, alarm.time.format("%H:%M"));
        Ok(alarm)
    }
}

impl Identity for HttpStore {
    fn signup(&self, username: &str, password: &str) -> Result<User, StoreError> {
        self.post("/signup", &Credentials { username, password })?
            .into_user()
    }

    fn login(&self, username: &str, password: &str) -> Result<User, StoreError> {
        self.post("/login", &Credentials { username, password })?
            .into_user()
    }

    fn friends(&self, user: UserId) -> Result<Vec<User>, StoreError> {
        self.get(&format!("/friends/{user}"))
    }
}
