use std::{str::FromStr, time::Duration};

use crate::{alarm::AlarmId, lifecycle::ActionKind, view::AlarmView};

/// everything the client loop reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// the minute ticker went off
    Tick,
    /// one shot check shortly after start up
    StartupCheck,
    User(UserEvent),
    Delayed(DelayedEvent),
}

/// what the person in front of this client asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    Action(ActionKind),
    TestRing(AlarmId),
    Refresh,
    List,
    Quit,
}

impl FromStr for UserEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or_default();
        match command {
            "s" | "snooze" => Ok(Self::Action(ActionKind::Snooze)),
            "a" | "ack" | "acknowledge" => Ok(Self::Action(ActionKind::Acknowledge)),
            "c" | "cancel" => Ok(Self::Action(ActionKind::Cancel)),
            "r" | "refresh" => Ok(Self::Refresh),
            "l" | "list" => Ok(Self::List),
            "q" | "quit" => Ok(Self::Quit),
            "t" | "test" => words
                .next()
                .and_then(|id| id.parse().ok())
                .map(Self::TestRing)
                .ok_or_else(|| "usage: test <alarm id>".to_string()),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command `{other}`")),
        }
    }
}

/// presentation work that has to wait a bit before it happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedEvent {
    /// start the sound again after a snooze message was shown
    ReRing(AlarmId),
    /// close a resolved alarm once both sides had time to read the final message
    Dismiss(AlarmId),
}

/// side effects the lifecycle asks the client to carry out, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Present(AlarmView),
    PlaySound(crate::alarm::Sound),
    StopSound,
    Schedule { after: Duration, event: DelayedEvent },
    Dismiss,
    /// fetch the alarm list again from the store
    Refresh,
    /// something the acting user should be told about
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(
            "snooze".parse::<UserEvent>(),
            Ok(UserEvent::Action(ActionKind::Snooze))
        );
        assert_eq!(
            " a ".parse::<UserEvent>(),
            Ok(UserEvent::Action(ActionKind::Acknowledge))
        );
        assert_eq!("test 12".parse::<UserEvent>(), Ok(UserEvent::TestRing(12)));
        assert!("test".parse::<UserEvent>().is_err());
        assert!("test twelve".parse::<UserEvent>().is_err());
        assert!("dance".parse::<UserEvent>().is_err());
        assert!("".parse::<UserEvent>().is_err());
    }
}
