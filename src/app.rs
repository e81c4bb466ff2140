//! The single threaded client loop.
//!
//! Ticks, the start up check, user input and expired delays all arrive as
//! [`Message`]s and are handled one at a time, so the session never needs a lock.

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use crossbeam_channel::{after, select, tick, Receiver};
use log::{debug, error, info, warn};

use crate::{
    audio::Player,
    communication::{DelayedEvent, Effect, Message, UserEvent},
    config::Timing,
    presentation::Presenter,
    session::Session,
    store::AlarmStore,
};

#[derive(Debug)]
pub struct App<S, P, A> {
    store: S,
    session: Session,
    presenter: P,
    player: A,
    timing: Timing,
    pending: Vec<(Instant, DelayedEvent)>,
}

impl<S: AlarmStore, P: Presenter, A: Player> App<S, P, A> {
    pub const fn new(store: S, session: Session, presenter: P, player: A, timing: Timing) -> Self {
        Self {
            store,
            session,
            presenter,
            player,
            timing,
            pending: vec![],
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn presenter(&self) -> &P {
        &self.presenter
    }

    #[must_use]
    pub const fn player(&self) -> &A {
        &self.player
    }

    /// delays that haven't run out yet, soonest first
    #[must_use]
    pub fn pending(&self) -> Vec<DelayedEvent> {
        let mut pending = self.pending.clone();
        pending.sort_by_key(|(deadline, _)| *deadline);
        pending.into_iter().map(|(_, event)| event).collect()
    }

    /// handles one message, returns false once the user asked to quit
    ///
    /// `now` schedules delays, `wall` is the local time alarms are compared against
    pub fn handle(&mut self, message: Message, now: Instant, wall: NaiveDateTime) -> bool {
        debug!("handling {message:?}");
        let effects = match message {
            Message::Tick => self.session.tick(wall),
            Message::StartupCheck => self.session.startup_check(wall),
            Message::Delayed(event) => self.session.on_delayed(event),
            Message::User(UserEvent::Action(kind)) => self.session.act(kind, &self.store),
            Message::User(UserEvent::TestRing(id)) => self.session.test_ring(id),
            Message::User(UserEvent::Refresh) => vec![Effect::Refresh],
            Message::User(UserEvent::List) => {
                self.presenter.list(
                    self.session.alarms(),
                    self.session.user().id,
                    self.session.friends(),
                );
                vec![]
            }
            Message::User(UserEvent::Quit) => return false,
        };
        self.apply(effects, now);
        true
    }

    /// runs every delay whose deadline passed by `now`
    pub fn fire_due(&mut self, now: Instant, wall: NaiveDateTime) {
        for event in self.due_delays(now) {
            self.handle(Message::Delayed(event), now, wall);
        }
    }

    fn due_delays(&mut self, now: Instant) -> Vec<DelayedEvent> {
        let mut due: Vec<_> = vec![];
        self.pending.retain(|&(deadline, event)| {
            if deadline <= now {
                due.push((deadline, event));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(deadline, _)| *deadline);
        due.into_iter().map(|(_, event)| event).collect()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(deadline, _)| *deadline).min()
    }

    fn apply(&mut self, effects: Vec<Effect>, now: Instant) {
        for effect in effects {
            match effect {
                Effect::Present(view) => self.presenter.present(&view),
                Effect::PlaySound(sound) => {
                    if let Some(notice) = self.player.play(sound) {
                        self.presenter.notice(notice);
                    }
                }
                Effect::StopSound => self.player.stop(),
                Effect::Schedule { after, event } => self.pending.push((now + after, event)),
                Effect::Dismiss => self.presenter.dismiss(),
                Effect::Refresh => match self.session.refresh(&self.store) {
                    Ok(effects) => self.apply(effects, now),
                    Err(err) => {
                        warn!("refresh failed, keeping cached alarms: {err}");
                        self.presenter.error(&format!("couldn't refresh alarms: {err}"));
                    }
                },
                Effect::Error(message) => self.presenter.error(&message),
            }
        }
    }

    /// runs until the user quits or the input goes away, then logs out
    pub fn run(mut self, input: &Receiver<UserEvent>) {
        let ticker = tick(self.timing.tick());
        let startup = after(self.timing.startup_check());
        info!(
            "checking alarms every {:?}, first check in {:?}",
            self.timing.tick(),
            self.timing.startup_check()
        );
        self.handle(
            Message::User(UserEvent::List),
            Instant::now(),
            Local::now().naive_local(),
        );
        loop {
            let wait = self
                .next_deadline()
                .map_or(self.timing.tick(), |deadline| {
                    deadline.saturating_duration_since(Instant::now())
                });
            let message = select! {
                recv(ticker) -> _ => Some(Message::Tick),
                recv(startup) -> _ => Some(Message::StartupCheck),
                recv(input) -> event => match event {
                    Ok(event) => Some(Message::User(event)),
                    Err(_) => {
                        info!("input closed");
                        Some(Message::User(UserEvent::Quit))
                    }
                },
                default(wait.max(Duration::from_millis(1))) => None,
            };
            let now = Instant::now();
            let wall = Local::now().naive_local();
            if let Some(message) = message {
                if !self.handle(message, now, wall) {
                    break;
                }
            }
            self.fire_due(now, wall);
        }
        self.quit();
    }

    /// stops the sound and closes whatever is on screen, handing back both
    pub fn quit(self) -> (P, A) {
        let Self {
            session,
            mut presenter,
            mut player,
            ..
        } = self;
        for effect in session.end() {
            match effect {
                Effect::StopSound => player.stop(),
                Effect::Dismiss => presenter.dismiss(),
                other => error!("unexpected effect on logout: {other:?}"),
            }
        }
        (presenter, player)
    }
}
