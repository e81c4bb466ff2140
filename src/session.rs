use chrono::NaiveDateTime;
use log::{info, warn};

use crate::{
    alarm::{Alarm, AlarmId},
    communication::{DelayedEvent, Effect},
    lifecycle::{ActionKind, Delays, Lifecycle},
    scheduler::Scheduler,
    store::{AlarmStore, Friends, Identity, StoreError, User},
};

/// everything one logged in user's client knows
///
/// created at login and dropped at logout, nothing here outlives it
#[derive(Debug)]
pub struct Session {
    user: User,
    friends: Friends,
    alarms: Vec<Alarm>,
    scheduler: Scheduler,
    lifecycle: Lifecycle,
}

impl Session {
    #[must_use]
    pub fn new(user: User, friends: Friends, delays: Delays) -> Self {
        Self {
            user,
            friends,
            alarms: vec![],
            scheduler: Scheduler::new(),
            lifecycle: Lifecycle::new(delays),
        }
    }

    /// loads friends first, so alarms can show names, then the alarms
    ///
    /// # Errors
    /// if the store can't be reached
    pub fn start<S>(user: User, store: &S, delays: Delays) -> Result<Self, StoreError>
    where
        S: AlarmStore + Identity + ?Sized,
    {
        let friends = Friends::from(store.friends(user.id)?);
        let mut session = Self::new(user, friends, delays);
        session.refresh(store)?;
        info!(
            "session started for {} with {} friends and {} alarms",
            session.user.username,
            session.friends.len(),
            session.alarms.len()
        );
        Ok(session)
    }

    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub const fn friends(&self) -> &Friends {
        &self.friends
    }

    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub const fn current(&self) -> Option<&Alarm> {
        self.lifecycle.current()
    }

    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// # Errors
    /// if the store can't be reached, the cached alarms stay as they were
    pub fn refresh<S: AlarmStore + ?Sized>(&mut self, store: &S) -> Result<Vec<Effect>, StoreError> {
        let alarms = store.fetch_alarms(self.user.id)?;
        Ok(self.replace_alarms(alarms))
    }

    /// swaps in a freshly fetched alarm list
    pub fn replace_alarms(&mut self, alarms: Vec<Alarm>) -> Vec<Effect> {
        self.scheduler.retain(&alarms);
        let effects = alarms
            .iter()
            .flat_map(|alarm| self.lifecycle.sync(alarm, self.user.id, &self.friends))
            .collect();
        self.alarms = alarms;
        effects
    }

    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<Effect> {
        let due = self.scheduler.tick(now, &self.alarms);
        self.ring_all(&due)
    }

    pub fn startup_check(&mut self, now: NaiveDateTime) -> Vec<Effect> {
        let due = self.scheduler.startup_check(now, &self.alarms);
        self.ring_all(&due)
    }

    /// rings an alarm by hand, whatever the time
    pub fn test_ring(&mut self, id: AlarmId) -> Vec<Effect> {
        let effects = self.ring_all(&[id]);
        if effects.is_empty() {
            warn!("can't ring alarm {id}");
            return vec![Effect::Error(format!("no ringable alarm #{id}"))];
        }
        effects
    }

    fn ring_all(&mut self, ids: &[AlarmId]) -> Vec<Effect> {
        let mut effects = vec![];
        for id in ids {
            if let Some(alarm) = self.alarms.iter().find(|alarm| alarm.id == *id) {
                effects.extend(
                    self.lifecycle
                        .ring(alarm.clone(), self.user.id, &self.friends),
                );
            }
        }
        effects
    }

    /// acts on the ringing alarm and caches whatever the store sent back
    ///
    /// the cache keeps the store's status, so an unresolved alarm stays due for tomorrow
    pub fn act<S: AlarmStore + ?Sized>(&mut self, kind: ActionKind, store: &S) -> Vec<Effect> {
        let effects = self
            .lifecycle
            .perform(kind, store, self.user.id, &self.friends);
        if let Some(current) = self.lifecycle.current() {
            if let Some(cached) = self.alarms.iter_mut().find(|alarm| alarm.id == current.id) {
                cached.clone_from(current);
                cached.settle();
            }
        }
        effects
    }

    pub fn on_delayed(&mut self, event: DelayedEvent) -> Vec<Effect> {
        self.lifecycle
            .on_delayed(event, self.user.id, &self.friends)
    }

    /// logout, stops whatever is still ringing
    pub fn end(mut self) -> Vec<Effect> {
        info!("session for {} ended", self.user.username);
        self.lifecycle.clear()
    }
}
