use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Local;
use log::info;

use super::{AlarmStore, Identity, StoreError, User};
use crate::{
    agent,
    alarm::{Alarm, AlarmId, NewAlarm, UserId},
    lifecycle::ActionKind,
};

#[derive(Debug, Default)]
struct State {
    users: Vec<(User, String)>,
    friendships: Vec<(UserId, UserId)>,
    alarms: Vec<Alarm>,
}

impl State {
    fn are_friends(&self, a: UserId, b: UserId) -> bool {
        self.friendships
            .iter()
            .any(|&(x, y)| (x, y) == (a, b) || (x, y) == (b, a))
    }
}

/// an authoritative alarm store kept in memory
///
/// every update runs under one lock, so two participants acting on the same alarm
/// at the same time both land, whatever order they arrive in
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // records are only ever replaced whole, so a poisoned lock still holds consistent state
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// makes `a` and `b` friends, skipping the request/accept dance
    pub fn befriend(&self, a: UserId, b: UserId) {
        let mut state = self.state();
        if !state.are_friends(a, b) {
            state.friendships.push((a, b));
        }
    }

    /// a copy of the stored record, resolved or not
    #[must_use]
    pub fn alarm(&self, id: AlarmId) -> Option<Alarm> {
        self.state().alarms.iter().find(|alarm| alarm.id == id).cloned()
    }
}

impl AlarmStore for MemoryStore {
    fn fetch_alarms(&self, user: UserId) -> Result<Vec<Alarm>, StoreError> {
        Ok(self
            .state()
            .alarms
            .iter()
            .filter(|alarm| alarm.is_participant(user) && alarm.is_active)
            .cloned()
            .collect())
    }

    fn send_action(
        &self,
        kind: ActionKind,
        alarm: AlarmId,
        user: UserId,
    ) -> Result<Alarm, StoreError> {
        let mut state = self.state();
        let stored = state
            .alarms
            .iter_mut()
            .find(|stored| stored.id == alarm)
            .ok_or(StoreError::AlarmNotFound(alarm))?;
        let mut updated = stored.clone();
        let applied = updated.apply(kind, user)?;
        agent::annotate(&mut updated, user, applied, &mut rand::thread_rng());
        *stored = updated.clone();
        info!("{kind} by {user} on alarm {alarm}: {applied:?}");
        Ok(updated)
    }

    fn create_alarm(&self, request: &NewAlarm) -> Result<Alarm, StoreError> {
        let mut state = self.state();
        if request.user_id == request.friend_id
            || !state.are_friends(request.user_id, request.friend_id)
        {
            return Err(StoreError::NotFriends);
        }
        let id = state.alarms.iter().map(|alarm| alarm.id).max().unwrap_or(0) + 1;
        let mut alarm = Alarm::new(id, request.user_id, request.friend_id, request.time);
        alarm.label.clone_from(&request.label);
        alarm.sound = request.sound;
        alarm.tone = request.tone;
        alarm.created_at = Some(Local::now().naive_local());
        state.alarms.push(alarm.clone());
        info!(
            "alarm {id} created for {} and {}",
            request.user_id, request.friend_id
        );
        Ok(alarm)
    }
}

impl Identity for MemoryStore {
    fn signup(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(StoreError::MissingFields);
        }
        let mut state = self.state();
        if state
            .users
            .iter()
            .any(|(user, _)| user.username.eq_ignore_ascii_case(username))
        {
            return Err(StoreError::UsernameTaken);
        }
        let user = User {
            id: state.users.len() as UserId + 1,
            username: username.to_string(),
        };
        state.users.push((user.clone(), password.to_string()));
        Ok(user)
    }

    fn login(&self, username: &str, password: &str) -> Result<User, StoreError> {
        let username = username.trim();
        self.state()
            .users
            .iter()
            .find(|(user, secret)| {
                user.username.eq_ignore_ascii_case(username) && secret == password
            })
            .map(|(user, _)| user.clone())
            .ok_or(StoreError::InvalidCredentials)
    }

    fn friends(&self, user: UserId) -> Result<Vec<User>, StoreError> {
        let state = self.state();
        Ok(state
            .friendships
            .iter()
            .filter_map(|&(a, b)| {
                if a == user {
                    Some(b)
                } else if b == user {
                    Some(a)
                } else {
                    None
                }
            })
            .filter_map(|friend| {
                state
                    .users
                    .iter()
                    .find(|(known, _)| known.id == friend)
                    .map(|(known, _)| known.clone())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use chrono::NaiveTime;

    use super::*;
    use crate::{
        alarm::{AlarmStatus, Sound},
        lifecycle::TransitionError,
    };

    fn pair() -> (MemoryStore, User, User) {
        let store = MemoryStore::new();
        let alice = store.signup("alice", "pw").unwrap();
        let bob = store.signup("bob", "pw").unwrap();
        store.befriend(alice.id, bob.id);
        (store, alice, bob)
    }

    fn new_alarm(alice: &User, bob: &User) -> NewAlarm {
        NewAlarm {
            user_id: alice.id,
            friend_id: bob.id,
            time: NaiveTime::from_hms_opt(6, 30, 0).unwrap(),
            label: "Run".to_string(),
            sound: Sound::Manifestation,
            tone: None,
        }
    }

    #[test]
    fn creates_only_between_friends() {
        let (store, alice, bob) = pair();
        let carol = store.signup("carol", "pw").unwrap();
        assert!(matches!(
            store.create_alarm(&new_alarm(&alice, &carol)),
            Err(StoreError::NotFriends)
        ));
        let alarm = store.create_alarm(&new_alarm(&alice, &bob)).unwrap();
        assert_eq!(alarm.id, 1);
        assert_eq!(alarm.snoozes(bob.id), 0);
        assert_eq!(alarm.status, AlarmStatus::Active);
        assert_eq!(store.fetch_alarms(bob.id).unwrap(), vec![alarm]);
        assert!(store.fetch_alarms(carol.id).unwrap().is_empty());
    }

    #[test]
    fn accounts() {
        let (store, alice, bob) = pair();
        assert!(matches!(
            store.signup("ALICE", "x"),
            Err(StoreError::UsernameTaken)
        ));
        assert!(matches!(
            store.login("alice", "wrong"),
            Err(StoreError::InvalidCredentials)
        ));
        assert_eq!(store.login("alice", "pw").unwrap(), alice);
        assert_eq!(store.friends(alice.id).unwrap(), vec![bob]);
    }

    #[test]
    fn unknown_alarm_and_stranger() {
        let (store, alice, bob) = pair();
        let carol = store.signup("carol", "pw").unwrap();
        assert!(matches!(
            store.send_action(ActionKind::Snooze, 42, alice.id),
            Err(StoreError::AlarmNotFound(42))
        ));
        let alarm = store.create_alarm(&new_alarm(&alice, &bob)).unwrap();
        assert!(matches!(
            store.send_action(ActionKind::Cancel, alarm.id, carol.id),
            Err(StoreError::Transition(TransitionError::NotParticipant(_)))
        ));
        assert_eq!(store.alarm(alarm.id), Some(alarm));
    }

    #[test]
    fn resolved_alarms_leave_the_list() {
        let (store, alice, bob) = pair();
        let alarm = store.create_alarm(&new_alarm(&alice, &bob)).unwrap();
        let cancelled = store
            .send_action(ActionKind::Cancel, alarm.id, bob.id)
            .unwrap();
        assert!(cancelled.cancel_notify_message.is_some());
        assert!(store.fetch_alarms(alice.id).unwrap().is_empty());
        assert_eq!(
            store.alarm(alarm.id).map(|alarm| alarm.status),
            Some(AlarmStatus::Cancelled)
        );
    }

    #[test]
    fn racing_acknowledgements_both_land() {
        for _ in 0..20 {
            let (store, alice, bob) = pair();
            let store = Arc::new(store);
            let alarm = store.create_alarm(&new_alarm(&alice, &bob)).unwrap();
            let handles: Vec<_> = [alice.id, bob.id]
                .into_iter()
                .map(|user| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        store
                            .send_action(ActionKind::Acknowledge, alarm.id, user)
                            .unwrap()
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
            let stored = store.alarm(alarm.id).unwrap();
            assert!(stored.is_fully_acknowledged());
            assert_eq!(stored.status, AlarmStatus::Acknowledged);
        }
    }
}
