//! The shared alarm state machine.
//!
//! ```text
//! active -> ringing -> snoozed -> ringing -> ...
//!                   -> acknowledged (one of two) -> ringing
//!                   -> acknowledged (both)        [resolved]
//!                   -> cancelled                  [resolved]
//! ```
//!
//! [`Alarm::apply`] holds the rules the authoritative store runs for every action.
//! The store only ever holds `active`, `acknowledged` or `cancelled`, so an alarm
//! nobody resolved is still `active` and rings again the next day.
//! [`Lifecycle`] is the client half: it sends actions to the store and only ever
//! shows the record the store sends back, marking it `ringing` or `snoozed` while
//! it is on screen.

use std::{fmt, time::Duration};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    alarm::{Alarm, AlarmStatus, UserId},
    communication::{DelayedEvent, Effect},
    store::{AlarmStore, Directory},
    view::AlarmView,
};

/// the three things a participant can do to a ringing alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Snooze,
    Acknowledge,
    Cancel,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Snooze => "snooze",
            Self::Acknowledge => "acknowledge",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// what an action actually changed, used to pick the agent's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Snoozed { count: u32 },
    Acknowledged { full: bool },
    /// the participant had already acknowledged
    AlreadyAcknowledged,
    Cancelled,
    /// the alarm was already resolved, nothing moved
    Unchanged,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Not a participant")]
    NotParticipant(UserId),
}

impl Alarm {
    /// starts ringing the local copy of an alarm
    ///
    /// returns false for resolved alarms, those never ring again
    pub fn ring(&mut self) -> bool {
        match self.status {
            AlarmStatus::Active | AlarmStatus::Snoozed | AlarmStatus::Ringing => {
                self.status = AlarmStatus::Ringing;
                true
            }
            AlarmStatus::Acknowledged | AlarmStatus::Cancelled => false,
        }
    }

    /// applies one participant's action to the authoritative record
    ///
    /// # Errors
    /// if `by` isn't one of the two participants, the record is left as is
    pub fn apply(&mut self, kind: ActionKind, by: UserId) -> Result<Applied, TransitionError> {
        if !self.is_participant(by) {
            return Err(TransitionError::NotParticipant(by));
        }
        Ok(match kind {
            ActionKind::Snooze => self.snooze(by),
            ActionKind::Acknowledge => self.acknowledge(by),
            ActionKind::Cancel => self.cancel(by),
        })
    }

    fn snooze(&mut self, by: UserId) -> Applied {
        let count = self.snooze_count.entry(by).or_insert(0);
        *count += 1;
        let count = *count;
        if self.is_resolved() {
            return Applied::Unchanged;
        }
        Applied::Snoozed { count }
    }

    fn acknowledge(&mut self, by: UserId) -> Applied {
        if self.status == AlarmStatus::Cancelled {
            return Applied::Unchanged;
        }
        if !self.acknowledged_by.insert(by) {
            return Applied::AlreadyAcknowledged;
        }
        let full = self.is_fully_acknowledged();
        if full {
            self.status = AlarmStatus::Acknowledged;
            self.is_active = false;
        }
        Applied::Acknowledged { full }
    }

    fn cancel(&mut self, by: UserId) -> Applied {
        // first writer wins, and a fully acknowledged alarm has nothing left to cancel
        if self.is_resolved() {
            return Applied::Unchanged;
        }
        self.cancelled_by = Some(by);
        self.status = AlarmStatus::Cancelled;
        self.is_active = false;
        Applied::Cancelled
    }
}

/// fixed presentation delays, local only and lost if the client closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delays {
    /// between showing the snooze message and ringing again
    pub rering: Duration,
    /// between showing a resolved alarm and closing it
    pub grace: Duration,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            rering: Duration::from_secs(3),
            grace: Duration::from_secs(2),
        }
    }
}

/// the alarm this client is currently presenting, if any
#[derive(Debug, Default)]
pub struct Lifecycle {
    current: Option<Alarm>,
    delays: Delays,
}

impl Lifecycle {
    #[must_use]
    pub const fn new(delays: Delays) -> Self {
        Self {
            current: None,
            delays,
        }
    }

    #[must_use]
    pub const fn current(&self) -> Option<&Alarm> {
        self.current.as_ref()
    }

    /// presents `alarm` and starts its sound
    pub fn ring(&mut self, mut alarm: Alarm, me: UserId, directory: &dyn Directory) -> Vec<Effect> {
        if !alarm.ring() {
            debug!("alarm {} is {}, not ringing", alarm.id, alarm.status);
            return vec![];
        }
        info!("alarm {} ringing at {}", alarm.id, alarm.time.format("%H:%M"));
        let effects = vec![
            Effect::Present(AlarmView::derive(&alarm, me, directory)),
            Effect::PlaySound(alarm.sound),
        ];
        self.current = Some(alarm);
        effects
    }

    /// sends `kind` for the current alarm and renders whatever the store answers
    ///
    /// on failure the current alarm is kept exactly as it was and the sound stays off
    pub fn perform<S>(
        &mut self,
        kind: ActionKind,
        store: &S,
        me: UserId,
        directory: &dyn Directory,
    ) -> Vec<Effect>
    where
        S: AlarmStore + ?Sized,
    {
        let Some(alarm_id) = self.current.as_ref().map(|alarm| alarm.id) else {
            debug!("no alarm ringing, ignoring {kind}");
            return vec![];
        };
        let mut effects = vec![Effect::StopSound];
        match store.send_action(kind, alarm_id, me) {
            Ok(mut updated) => {
                info!(
                    "{kind} on alarm {alarm_id} by {me} -> {} (acknowledged by {:?})",
                    updated.status, updated.acknowledged_by
                );
                if !updated.is_resolved() {
                    updated.status = if kind == ActionKind::Snooze {
                        AlarmStatus::Snoozed
                    } else {
                        AlarmStatus::Ringing
                    };
                }
                effects.push(Effect::Present(AlarmView::derive(&updated, me, directory)));
                if updated.is_resolved() {
                    effects.push(Effect::Schedule {
                        after: self.delays.grace,
                        event: DelayedEvent::Dismiss(alarm_id),
                    });
                } else if kind == ActionKind::Snooze {
                    effects.push(Effect::Schedule {
                        after: self.delays.rering,
                        event: DelayedEvent::ReRing(alarm_id),
                    });
                }
                self.current = Some(updated);
            }
            Err(err) => {
                warn!("{kind} on alarm {alarm_id} failed: {err}");
                effects.push(Effect::Error(format!("couldn't {kind} the alarm: {err}")));
            }
        }
        effects
    }

    /// a delay scheduled by [`Self::perform`] ran out
    pub fn on_delayed(
        &mut self,
        event: DelayedEvent,
        me: UserId,
        directory: &dyn Directory,
    ) -> Vec<Effect> {
        match event {
            DelayedEvent::ReRing(id) => match self.current.take() {
                // a re-ring is not a new occurrence, the scheduler never hears about it
                Some(alarm)
                    if alarm.id == id
                        && !alarm.is_resolved()
                        && !alarm.acknowledged_by.contains(&me) =>
                {
                    self.ring(alarm, me, directory)
                }
                other => {
                    self.current = other;
                    vec![]
                }
            },
            DelayedEvent::Dismiss(id) => {
                if self.current.as_ref().is_some_and(|alarm| alarm.id == id) {
                    self.current = None;
                    vec![Effect::Dismiss, Effect::Refresh]
                } else {
                    vec![]
                }
            }
        }
    }

    /// takes a fresher copy of the current alarm from a list refresh
    pub fn sync(&mut self, fresh: &Alarm, me: UserId, directory: &dyn Directory) -> Vec<Effect> {
        let Some(current) = self.current.as_mut().filter(|current| current.id == fresh.id) else {
            return vec![];
        };
        let mut fresh = fresh.clone();
        if !fresh.is_resolved() {
            // the store never hears about the local ring or snooze
            fresh.status = current.status;
        }
        if *current == fresh {
            return vec![];
        }
        *current = fresh;
        let mut effects = vec![Effect::Present(AlarmView::derive(current, me, directory))];
        if current.is_resolved() {
            effects.push(Effect::StopSound);
            effects.push(Effect::Schedule {
                after: self.delays.grace,
                event: DelayedEvent::Dismiss(current.id),
            });
        }
        effects
    }

    /// drops the current alarm without telling the store, used on logout
    pub fn clear(&mut self) -> Vec<Effect> {
        if self.current.take().is_some() {
            vec![Effect::StopSound, Effect::Dismiss]
        } else {
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use chrono::NaiveTime;
    use proptest::prelude::*;

    use super::*;
    use crate::{
        alarm::AlarmId,
        store::{Friends, StoreError},
        view::MessageKind,
    };

    const ALICE: UserId = 1;
    const BOB: UserId = 2;

    fn alarm() -> Alarm {
        Alarm::new(1, ALICE, BOB, NaiveTime::from_hms_opt(6, 30, 0).unwrap())
    }

    /// answers every action by running the rules on its own copy
    struct OneAlarm(RefCell<Alarm>);

    impl AlarmStore for OneAlarm {
        fn fetch_alarms(&self, _user: UserId) -> Result<Vec<Alarm>, StoreError> {
            Ok(vec![self.0.borrow().clone()])
        }

        fn send_action(
            &self,
            kind: ActionKind,
            _alarm: AlarmId,
            user: UserId,
        ) -> Result<Alarm, StoreError> {
            let mut alarm = self.0.borrow_mut();
            alarm.apply(kind, user)?;
            Ok(alarm.clone())
        }

        fn create_alarm(&self, _request: &crate::alarm::NewAlarm) -> Result<Alarm, StoreError> {
            unimplemented!()
        }
    }

    struct Offline;

    impl AlarmStore for Offline {
        fn fetch_alarms(&self, _user: UserId) -> Result<Vec<Alarm>, StoreError> {
            Err(StoreError::Rejected("offline".to_string()))
        }

        fn send_action(&self, _: ActionKind, _: AlarmId, _: UserId) -> Result<Alarm, StoreError> {
            Err(StoreError::Rejected("offline".to_string()))
        }

        fn create_alarm(&self, _request: &crate::alarm::NewAlarm) -> Result<Alarm, StoreError> {
            Err(StoreError::Rejected("offline".to_string()))
        }
    }

    #[test]
    fn snooze_counts_only_the_snoozer() {
        let mut alarm = alarm();
        assert_eq!(
            alarm.apply(ActionKind::Snooze, BOB),
            Ok(Applied::Snoozed { count: 1 })
        );
        assert_eq!(alarm.snoozes(BOB), 1);
        assert_eq!(alarm.snoozes(ALICE), 0);
        assert_eq!(alarm.status, AlarmStatus::Active);
        assert!(alarm.ring());
        assert_eq!(alarm.status, AlarmStatus::Ringing);
    }

    #[test]
    fn both_acknowledgements_resolve() {
        let mut alarm = alarm();
        assert_eq!(
            alarm.apply(ActionKind::Acknowledge, ALICE),
            Ok(Applied::Acknowledged { full: false })
        );
        assert_eq!(alarm.status, AlarmStatus::Active);
        assert!(alarm.is_active);
        assert_eq!(
            alarm.apply(ActionKind::Acknowledge, ALICE),
            Ok(Applied::AlreadyAcknowledged)
        );
        assert_eq!(
            alarm.apply(ActionKind::Acknowledge, BOB),
            Ok(Applied::Acknowledged { full: true })
        );
        assert_eq!(alarm.status, AlarmStatus::Acknowledged);
        assert!(!alarm.is_active);
        assert!(!alarm.ring());
    }

    #[test]
    fn first_cancel_wins() {
        let mut alarm = alarm();
        assert_eq!(alarm.apply(ActionKind::Cancel, ALICE), Ok(Applied::Cancelled));
        assert_eq!(alarm.apply(ActionKind::Cancel, BOB), Ok(Applied::Unchanged));
        assert_eq!(alarm.cancelled_by, Some(ALICE));
        assert_eq!(alarm.status, AlarmStatus::Cancelled);
        assert_eq!(alarm.apply(ActionKind::Acknowledge, BOB), Ok(Applied::Unchanged));
        assert!(alarm.acknowledged_by.is_empty());
    }

    #[test]
    fn cannot_cancel_after_both_woke_up() {
        let mut alarm = alarm();
        alarm.apply(ActionKind::Acknowledge, ALICE).unwrap();
        alarm.apply(ActionKind::Acknowledge, BOB).unwrap();
        assert_eq!(alarm.apply(ActionKind::Cancel, BOB), Ok(Applied::Unchanged));
        assert_eq!(alarm.cancelled_by, None);
        assert_eq!(alarm.status, AlarmStatus::Acknowledged);
    }

    #[test]
    fn strangers_are_rejected() {
        let mut alarm = alarm();
        let before = alarm.clone();
        assert_eq!(
            alarm.apply(ActionKind::Snooze, 99),
            Err(TransitionError::NotParticipant(99))
        );
        assert_eq!(alarm, before);
    }

    #[test]
    fn snooze_rerings_after_delay() {
        let store = OneAlarm(RefCell::new(alarm()));
        let friends = Friends::default();
        let mut lifecycle = Lifecycle::default();
        let effects = lifecycle.ring(alarm(), BOB, &friends);
        assert!(matches!(effects[0], Effect::Present(_)));
        assert!(matches!(effects[1], Effect::PlaySound(_)));

        let effects = lifecycle.perform(ActionKind::Snooze, &store, BOB, &friends);
        assert_eq!(effects[0], Effect::StopSound);
        let Effect::Present(view) = &effects[1] else {
            panic!("expected the snoozed alarm to be presented, got {effects:?}");
        };
        assert_eq!(view.my_snooze_count, 1);
        assert_eq!(view.status, AlarmStatus::Snoozed);
        assert_eq!(store.0.borrow().status, AlarmStatus::Active);
        assert_eq!(
            effects[2],
            Effect::Schedule {
                after: Duration::from_secs(3),
                event: DelayedEvent::ReRing(1),
            }
        );

        let effects = lifecycle.on_delayed(DelayedEvent::ReRing(1), BOB, &friends);
        assert!(effects.contains(&Effect::PlaySound(crate::alarm::Sound::Baddie)));
        assert_eq!(lifecycle.current().unwrap().status, AlarmStatus::Ringing);
    }

    #[test]
    fn acknowledging_during_snooze_keeps_it_quiet() {
        let store = OneAlarm(RefCell::new(alarm()));
        let friends = Friends::default();
        let mut lifecycle = Lifecycle::default();
        lifecycle.ring(alarm(), BOB, &friends);
        lifecycle.perform(ActionKind::Snooze, &store, BOB, &friends);

        let effects = lifecycle.perform(ActionKind::Acknowledge, &store, BOB, &friends);
        assert!(!effects
            .iter()
            .any(|effect| matches!(effect, Effect::Schedule { .. })));
        assert!(lifecycle
            .on_delayed(DelayedEvent::ReRing(1), BOB, &friends)
            .is_empty());
        let current = lifecycle.current().unwrap();
        assert_eq!(current.status, AlarmStatus::Ringing);
        assert!(current.acknowledged_by.contains(&BOB));

        // the partner who hasn't acknowledged still gets the re-ring
        let mut partner = Lifecycle::default();
        partner.ring(alarm(), ALICE, &friends);
        partner.perform(ActionKind::Snooze, &store, ALICE, &friends);
        assert!(partner
            .on_delayed(DelayedEvent::ReRing(1), ALICE, &friends)
            .contains(&Effect::PlaySound(crate::alarm::Sound::Baddie)));
    }

    #[test]
    fn sync_keeps_local_status_of_unresolved_alarm() {
        let friends = Friends::default();
        let mut lifecycle = Lifecycle::default();
        lifecycle.ring(alarm(), BOB, &friends);
        assert!(lifecycle.sync(&alarm(), BOB, &friends).is_empty());

        let mut snoozed_by_partner = alarm();
        snoozed_by_partner.apply(ActionKind::Snooze, ALICE).unwrap();
        let effects = lifecycle.sync(&snoozed_by_partner, BOB, &friends);
        let Effect::Present(view) = &effects[0] else {
            panic!("expected a presentation, got {effects:?}");
        };
        assert_eq!(view.partner_snooze_count, 1);
        assert_eq!(view.status, AlarmStatus::Ringing);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn failed_action_keeps_state() {
        let friends = Friends::default();
        let mut lifecycle = Lifecycle::default();
        lifecycle.ring(alarm(), ALICE, &friends);
        let before = lifecycle.current().cloned();

        let effects = lifecycle.perform(ActionKind::Acknowledge, &Offline, ALICE, &friends);
        assert_eq!(effects[0], Effect::StopSound);
        assert!(matches!(&effects[1], Effect::Error(msg) if msg.contains("offline")));
        assert_eq!(effects.len(), 2);
        assert_eq!(lifecycle.current().cloned(), before);
    }

    #[test]
    fn cancel_dismisses_after_grace() {
        let store = OneAlarm(RefCell::new(alarm()));
        let friends = Friends::default();
        let mut lifecycle = Lifecycle::default();
        lifecycle.ring(alarm(), ALICE, &friends);

        let effects = lifecycle.perform(ActionKind::Cancel, &store, ALICE, &friends);
        assert_eq!(
            effects.last(),
            Some(&Effect::Schedule {
                after: Duration::from_secs(2),
                event: DelayedEvent::Dismiss(1),
            })
        );
        // a pending re-ring must not bring a cancelled alarm back
        assert!(lifecycle
            .on_delayed(DelayedEvent::ReRing(1), ALICE, &friends)
            .is_empty());
        assert_eq!(
            lifecycle.on_delayed(DelayedEvent::Dismiss(1), ALICE, &friends),
            vec![Effect::Dismiss, Effect::Refresh]
        );
        assert!(lifecycle.current().is_none());
    }

    #[test]
    fn sync_shows_partner_cancel() {
        let friends: Friends = [(ALICE, "alice".to_string())].into_iter().collect();
        let mut lifecycle = Lifecycle::default();
        lifecycle.ring(alarm(), BOB, &friends);

        let mut cancelled = alarm();
        cancelled.apply(ActionKind::Cancel, ALICE).unwrap();
        let effects = lifecycle.sync(&cancelled, BOB, &friends);
        let Effect::Present(view) = &effects[0] else {
            panic!("expected a presentation, got {effects:?}");
        };
        assert_eq!(view.message.kind, MessageKind::CancellationNotice);
        assert!(effects.contains(&Effect::StopSound));
    }

    fn arb_actions() -> impl Strategy<Value = Vec<(ActionKind, UserId)>> {
        prop::collection::vec(
            (
                prop_oneof![
                    Just(ActionKind::Snooze),
                    Just(ActionKind::Acknowledge),
                    Just(ActionKind::Cancel),
                ],
                prop_oneof![Just(ALICE), Just(BOB)],
            ),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn acknowledgements_stay_within_pair(actions in arb_actions()) {
            let mut alarm = alarm();
            for (kind, by) in actions {
                alarm.apply(kind, by).unwrap();
                prop_assert!(alarm.acknowledged_by.iter().all(|u| alarm.is_participant(*u)));
                if alarm.cancelled_by.is_none() {
                    prop_assert_eq!(
                        alarm.is_fully_acknowledged(),
                        alarm.status == AlarmStatus::Acknowledged
                    );
                }
            }
        }

        #[test]
        fn snooze_count_matches_successful_snoozes(actions in arb_actions()) {
            let mut alarm = alarm();
            let mut expected = [0_u32; 2];
            for (kind, by) in actions {
                if alarm.apply(kind, by).is_ok() && kind == ActionKind::Snooze {
                    expected[usize::try_from(by - 1).unwrap()] += 1;
                }
            }
            prop_assert_eq!(alarm.snoozes(ALICE), expected[0]);
            prop_assert_eq!(alarm.snoozes(BOB), expected[1]);
        }

        #[test]
        fn cancellation_is_final(actions in arb_actions()) {
            let mut alarm = alarm();
            alarm.apply(ActionKind::Cancel, BOB).unwrap();
            for (kind, by) in actions {
                alarm.apply(kind, by).unwrap();
                prop_assert_eq!(alarm.cancelled_by, Some(BOB));
                prop_assert_eq!(alarm.status, AlarmStatus::Cancelled);
            }
        }
    }
}
