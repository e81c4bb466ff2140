//! Decides when a cached alarm has to start ringing on this client.
//!
//! Checked once a minute against the local wall clock, at minute granularity.
//! Each alarm fires at most once per day: the scheduler remembers the date it last
//! fired an alarm. That marker lives only in this process, so a client restarted in
//! the same minute can fire the same occurrence again.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::{debug, info};

use crate::alarm::{Alarm, AlarmId, AlarmStatus};

#[derive(Debug, Default, Clone)]
pub struct Scheduler {
    last_fired: HashMap<AlarmId, NaiveDate>,
}

/// drops seconds and below, alarm times only have hours and minutes
#[must_use]
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_fired(&self, alarm: AlarmId, today: NaiveDate) -> bool {
        self.last_fired.get(&alarm) == Some(&today)
    }

    /// the recurring check, returns the alarms that have to ring now
    pub fn tick(&mut self, now: NaiveDateTime, alarms: &[Alarm]) -> Vec<AlarmId> {
        if truncate_to_minute(now.time()) == NaiveTime::MIN {
            self.reset_daily(now.date());
        }
        self.due(now, alarms)
    }

    /// the one off check shortly after start up, for an alarm whose minute
    /// started before the recurring check did
    ///
    /// marks what it fires just like [`Self::tick`], so the two never ring the same occurrence twice
    pub fn startup_check(&mut self, now: NaiveDateTime, alarms: &[Alarm]) -> Vec<AlarmId> {
        self.due(now, alarms)
    }

    /// forgets every occurrence from before `today`
    pub fn reset_daily(&mut self, today: NaiveDate) {
        let before = self.last_fired.len();
        self.last_fired.retain(|_, fired| *fired >= today);
        debug!(
            "daily reset cleared {} fired markers",
            before - self.last_fired.len()
        );
    }

    /// stop tracking alarms that are no longer in the cache
    pub fn retain(&mut self, alarms: &[Alarm]) {
        self.last_fired
            .retain(|id, _| alarms.iter().any(|alarm| alarm.id == *id));
    }

    fn due(&mut self, now: NaiveDateTime, alarms: &[Alarm]) -> Vec<AlarmId> {
        if alarms.is_empty() {
            debug!("no cached alarms to check");
            return vec![];
        }
        let minute = truncate_to_minute(now.time());
        let today = now.date();
        let due: Vec<AlarmId> = alarms
            .iter()
            .filter(|alarm| {
                alarm.status == AlarmStatus::Active
                    && truncate_to_minute(alarm.time) == minute
                    && !self.has_fired(alarm.id, today)
            })
            .map(|alarm| alarm.id)
            .collect();
        for id in &due {
            info!("alarm {id} due at {}", minute.format("%H:%M"));
            self.last_fired.insert(*id, today);
        }
        due
    }
}
