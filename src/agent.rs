//! The wake-up agent: picks what the store says back after every action.
//!
//! The tone escalates with how often the acting participant snoozed, unless the
//! alarm was created with a fixed tone.

use rand::{seq::SliceRandom, Rng};

use crate::{
    alarm::{Alarm, Tone, UserId},
    lifecycle::Applied,
};

/// snooze counts below this get the soft tone
pub const SOFT_THRESHOLD: u32 = 2;
/// and below this the playful one, anything above is strict
pub const PLAYFUL_THRESHOLD: u32 = 4;

const SOFT_SNOOZE: &[&str] = &[
    "No worries, take 5 more minutes! ☀️",
    "Rest a bit longer, you've got this!",
    "A little extra sleep never hurt anyone 😴",
];
const SOFT_ACKNOWLEDGE: &[&str] = &[
    "Great job waking up! Have an amazing day! 🌟",
    "You're up! Hope today treats you well! ✨",
    "Morning champion! Let's make today count! 💪",
];
const SOFT_CANCEL: &[&str] = &["Alarm cancelled. Hope everything's okay! 💙"];
const SOFT_NOTIFY: &[&str] = &["Your friend had to cancel the alarm. Hope they're okay! 💙"];

const PLAYFUL_SNOOZE: &[&str] = &[
    "Again? Your bed must be really comfy 😏",
    "Okay okay, but this is the last one... right? 😅",
    "Someone's testing the limits today! ⏰",
    "Your friend is probably judging you rn 👀",
];
const PLAYFUL_ACKNOWLEDGE: &[&str] = &[
    "Finally! Your bed was holding you hostage 😂",
    "Look who decided to join the land of the living! 🎉",
    "You're up! Only took a few tries 😜",
];
const PLAYFUL_CANCEL: &[&str] = &["Alarm cancelled. Sweet dreams, I guess? 😴"];
const PLAYFUL_NOTIFY: &[&str] = &[
    "Your wake-up buddy bailed on you! Guess you're solo today 😅",
    "Looks like your friend hit the escape button 🏃‍♂️",
];

const STRICT_SNOOZE: &[&str] = &[
    "Seriously? You're making your friend wait. GET UP! 🚨",
    "This is getting ridiculous. Up. NOW. ⚠️",
    "Your snooze button is not your friend. WAKE UP! 💥",
    "You're disappointing everyone, including yourself. 😤",
];
const STRICT_ACKNOWLEDGE: &[&str] = &[
    "About time. Don't let this happen again. 😐",
    "You're up. Barely acceptable. ⏱️",
    "Finally awake. Let's not repeat this tomorrow. 💼",
];
const STRICT_CANCEL: &[&str] = &["Alarm cancelled. This better be important. 😠"];
const STRICT_NOTIFY: &[&str] =
    &["Your accountability partner cancelled. Don't use this as an excuse to sleep in. ⚠️"];

/// which table a message comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Snooze,
    Acknowledge,
    Cancel,
    /// for the partner of whoever cancelled
    CancelNotify,
}

#[must_use]
pub const fn messages(tone: Tone, reply: Reply) -> &'static [&'static str] {
    match (tone, reply) {
        (Tone::Soft, Reply::Snooze) => SOFT_SNOOZE,
        (Tone::Soft, Reply::Acknowledge) => SOFT_ACKNOWLEDGE,
        (Tone::Soft, Reply::Cancel) => SOFT_CANCEL,
        (Tone::Soft, Reply::CancelNotify) => SOFT_NOTIFY,
        (Tone::Playful, Reply::Snooze) => PLAYFUL_SNOOZE,
        (Tone::Playful, Reply::Acknowledge) => PLAYFUL_ACKNOWLEDGE,
        (Tone::Playful, Reply::Cancel) => PLAYFUL_CANCEL,
        (Tone::Playful, Reply::CancelNotify) => PLAYFUL_NOTIFY,
        (Tone::Strict, Reply::Snooze) => STRICT_SNOOZE,
        (Tone::Strict, Reply::Acknowledge) => STRICT_ACKNOWLEDGE,
        (Tone::Strict, Reply::Cancel) => STRICT_CANCEL,
        (Tone::Strict, Reply::CancelNotify) => STRICT_NOTIFY,
    }
}

/// the alarm's fixed tone if it has one, otherwise escalate with the snooze count
#[must_use]
pub fn tone_for(snoozes: u32, fixed: Option<Tone>) -> Tone {
    fixed.unwrap_or(if snoozes < SOFT_THRESHOLD {
        Tone::Soft
    } else if snoozes < PLAYFUL_THRESHOLD {
        Tone::Playful
    } else {
        Tone::Strict
    })
}

fn pick<R: Rng + ?Sized>(rng: &mut R, tone: Tone, reply: Reply) -> String {
    messages(tone, reply)
        .choose(rng)
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// writes the agent's reply for an action `by` that already went through [`Alarm::apply`]
pub fn annotate<R: Rng + ?Sized>(alarm: &mut Alarm, by: UserId, applied: Applied, rng: &mut R) {
    let tone = tone_for(alarm.snoozes(by), alarm.tone);
    match applied {
        Applied::Snoozed { .. } => {
            alarm.agent_message = Some(pick(rng, tone, Reply::Snooze));
            alarm.agent_tone = Some(tone);
        }
        Applied::Acknowledged { .. } => {
            alarm.agent_message = Some(pick(rng, tone, Reply::Acknowledge));
            alarm.agent_tone = Some(tone);
        }
        Applied::AlreadyAcknowledged => {
            alarm.agent_message = None;
            alarm.agent_tone = None;
        }
        Applied::Cancelled => {
            alarm.agent_message = Some(pick(rng, tone, Reply::Cancel));
            alarm.agent_tone = Some(tone);
            alarm.cancel_notify_message = Some(pick(rng, tone, Reply::CancelNotify));
        }
        Applied::Unchanged => {}
    }
}
