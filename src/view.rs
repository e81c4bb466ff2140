use chrono::NaiveTime;

use crate::{
    alarm::{Alarm, AlarmId, AlarmStatus, Sound, Tone, UserId},
    store::Directory,
};

pub const DEFAULT_MESSAGE: &str = "Time to wake up! ⏰";
pub const CANCEL_NOTICE: &str = "Your friend cancelled the alarm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// the partner cancelled, shown instead of anything the agent said
    CancellationNotice,
    Agent,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMessage {
    pub text: String,
    pub tone: Option<Tone>,
    pub kind: MessageKind,
}

/// what one of the two participants sees for a shared alarm
///
/// derived from the record and the viewer alone, never mutated, so it is rebuilt
/// after every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmView {
    pub alarm_id: AlarmId,
    pub label: String,
    pub time: NaiveTime,
    pub sound: Sound,
    pub status: AlarmStatus,
    pub partner_name: String,
    pub my_snooze_count: u32,
    pub partner_snooze_count: u32,
    pub message: DisplayMessage,
}

impl AlarmView {
    #[must_use]
    pub fn derive(alarm: &Alarm, me: UserId, directory: &dyn Directory) -> Self {
        let partner = alarm.partner_of(me);
        Self {
            alarm_id: alarm.id,
            label: alarm.label.clone(),
            time: alarm.time,
            sound: alarm.sound,
            status: alarm.status,
            partner_name: partner.map_or_else(
                || directory.placeholder().to_string(),
                |partner| directory.partner_name(partner),
            ),
            my_snooze_count: alarm.snoozes(me),
            partner_snooze_count: partner.map_or(0, |partner| alarm.snoozes(partner)),
            message: display_message(alarm, me),
        }
    }
}

fn display_message(alarm: &Alarm, me: UserId) -> DisplayMessage {
    if alarm.cancelled_by.is_some_and(|by| by != me) {
        return DisplayMessage {
            text: alarm
                .cancel_notify_message
                .clone()
                .unwrap_or_else(|| CANCEL_NOTICE.to_string()),
            tone: Some(Tone::Playful),
            kind: MessageKind::CancellationNotice,
        };
    }
    match &alarm.agent_message {
        Some(text) => DisplayMessage {
            text: text.clone(),
            tone: alarm.agent_tone,
            kind: MessageKind::Agent,
        },
        None => DisplayMessage {
            text: DEFAULT_MESSAGE.to_string(),
            tone: None,
            kind: MessageKind::Default,
        },
    }
}
