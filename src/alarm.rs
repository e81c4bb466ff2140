use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

pub type UserId = u64;
pub type AlarmId = u64;

/// where an alarm is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmStatus {
    #[default]
    Active,
    Ringing,
    Snoozed,
    Acknowledged,
    Cancelled,
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Ringing => "ringing",
            Self::Snoozed => "snoozed",
            Self::Acknowledged => "acknowledged",
            Self::Cancelled => "cancelled",
        })
    }
}

/// how pushy the agent is when it talks to a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Soft,
    Playful,
    Strict,
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "soft" => Ok(Self::Soft),
            "playful" => Ok(Self::Playful),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown tone `{other}`")),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Soft => "soft",
            Self::Playful => "playful",
            Self::Strict => "strict",
        })
    }
}

/// the sounds an alarm can ring with, unknown names fall back to the default
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Sound {
    #[default]
    Baddie,
    Manifestation,
    GetShitDone,
}

impl Sound {
    pub const ALL: [Self; 3] = [Self::Baddie, Self::Manifestation, Self::GetShitDone];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Baddie => "baddie",
            Self::Manifestation => "manifestation",
            Self::GetShitDone => "getshitdone",
        }
    }

    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.mp3", self.name())
    }
}

impl From<String> for Sound {
    fn from(value: String) -> Self {
        Self::ALL
            .into_iter()
            .find(|sound| sound.name() == value)
            .unwrap_or_default()
    }
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// a shared alarm between exactly two friends
///
/// this is the record the alarm store hands out, every client keeps a cached copy of it
/// and replaces that copy wholesale whenever the store sends back a newer one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Record")]
pub struct Alarm {
    pub id: AlarmId,
    pub user1_id: UserId,
    pub user2_id: UserId,
    #[serde(serialize_with = "hh_mm::serialize")]
    pub time: NaiveTime,
    pub label: String,
    pub sound: Sound,
    /// fixed tone picked when the alarm was created, overrides escalation
    pub tone: Option<Tone>,
    /// `active`, `acknowledged` or `cancelled` on the store,
    /// `ringing` and `snoozed` only ever exist on the client presenting it
    pub status: AlarmStatus,
    pub is_active: bool,
    pub snooze_count: BTreeMap<UserId, u32>,
    #[serde(rename = "acknowledged")]
    pub acknowledged_by: BTreeSet<UserId>,
    pub cancelled_by: Option<UserId>,
    pub agent_message: Option<String>,
    pub agent_tone: Option<Tone>,
    /// what the partner of whoever cancelled gets to read
    pub cancel_notify_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

/// an alarm as it arrives from the store
///
/// stores don't have to send a status, it is worked out from the record itself
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    id: AlarmId,
    user1_id: UserId,
    user2_id: UserId,
    #[serde(with = "hh_mm")]
    time: NaiveTime,
    #[serde(default = "default_label")]
    label: String,
    #[serde(default)]
    sound: Sound,
    #[serde(default, deserialize_with = "blank_tone")]
    tone: Option<Tone>,
    #[serde(default = "always_true")]
    is_active: bool,
    #[serde(default)]
    snooze_count: BTreeMap<UserId, u32>,
    #[serde(default)]
    acknowledged: BTreeSet<UserId>,
    #[serde(default)]
    cancelled_by: Option<UserId>,
    #[serde(default, deserialize_with = "blank_string")]
    agent_message: Option<String>,
    #[serde(default, deserialize_with = "blank_tone")]
    agent_tone: Option<Tone>,
    #[serde(default, deserialize_with = "blank_string")]
    cancel_notify_message: Option<String>,
    #[serde(default)]
    created_at: Option<NaiveDateTime>,
}

impl From<Record> for Alarm {
    fn from(record: Record) -> Self {
        let mut alarm = Self {
            id: record.id,
            user1_id: record.user1_id,
            user2_id: record.user2_id,
            time: record.time,
            label: record.label,
            sound: record.sound,
            tone: record.tone,
            status: AlarmStatus::Active,
            is_active: record.is_active,
            snooze_count: record.snooze_count,
            acknowledged_by: record.acknowledged,
            cancelled_by: record.cancelled_by,
            agent_message: record.agent_message,
            agent_tone: record.agent_tone,
            cancel_notify_message: record.cancel_notify_message,
            created_at: record.created_at,
        };
        alarm.settle();
        alarm
    }
}

impl Alarm {
    #[must_use]
    pub fn new(id: AlarmId, user1_id: UserId, user2_id: UserId, time: NaiveTime) -> Self {
        Self {
            id,
            user1_id,
            user2_id,
            time,
            label: default_label(),
            sound: Sound::default(),
            tone: None,
            status: AlarmStatus::Active,
            is_active: true,
            snooze_count: [(user1_id, 0), (user2_id, 0)].into_iter().collect(),
            acknowledged_by: BTreeSet::new(),
            cancelled_by: None,
            agent_message: None,
            agent_tone: None,
            cancel_notify_message: None,
            created_at: None,
        }
    }

    #[must_use]
    pub const fn participants(&self) -> [UserId; 2] {
        [self.user1_id, self.user2_id]
    }

    #[must_use]
    pub const fn is_participant(&self, user: UserId) -> bool {
        self.user1_id == user || self.user2_id == user
    }

    /// the other half of the pair, `None` if `user` isn't part of this alarm
    #[must_use]
    pub const fn partner_of(&self, user: UserId) -> Option<UserId> {
        if self.user1_id == user {
            Some(self.user2_id)
        } else if self.user2_id == user {
            Some(self.user1_id)
        } else {
            None
        }
    }

    #[must_use]
    pub fn snoozes(&self, user: UserId) -> u32 {
        self.snooze_count.get(&user).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_fully_acknowledged(&self) -> bool {
        self.participants()
            .iter()
            .all(|user| self.acknowledged_by.contains(user))
    }

    /// sets the status the store holds, which follows from who cancelled and who acknowledged
    ///
    /// drops the client only `ringing` and `snoozed`
    pub fn settle(&mut self) {
        self.status = if self.cancelled_by.is_some() {
            AlarmStatus::Cancelled
        } else if self.is_fully_acknowledged() {
            AlarmStatus::Acknowledged
        } else {
            AlarmStatus::Active
        };
    }

    /// acknowledged by both or cancelled by either, nothing rings after this
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(
            self.status,
            AlarmStatus::Acknowledged | AlarmStatus::Cancelled
        )
    }
}

/// what a client sends to create a shared alarm with a friend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlarm {
    pub user_id: UserId,
    pub friend_id: UserId,
    #[serde(with = "hh_mm")]
    pub time: NaiveTime,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub sound: Sound,
    #[serde(default, deserialize_with = "blank_tone")]
    pub tone: Option<Tone>,
}

fn default_label() -> String {
    "Wake up!".to_string()
}

const fn always_true() -> bool {
    true
}

/// parses `HH:MM`, the only time format alarms are exchanged in
pub fn parse_time(time: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(time, hh_mm::FORMAT)
}

// the store writes "" instead of null for messages and tones it hasn't set
fn blank_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

fn blank_tone<'de, D>(deserializer: D) -> Result<Option<Tone>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|s| s.parse().ok()))
}

pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(D::Error::custom)
    }
}
