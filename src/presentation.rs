use std::io::Write;

use log::warn;

use crate::{
    alarm::{Alarm, UserId},
    store::Directory,
    view::AlarmView,
};

/// shows alarms to the person in front of this client
pub trait Presenter {
    fn present(&mut self, view: &AlarmView);
    fn dismiss(&mut self);
    fn notice(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn list(&mut self, alarms: &[Alarm], me: UserId, directory: &dyn Directory);
}

/// plain text presentation on a terminal
#[derive(Debug)]
pub struct Terminal<W> {
    out: W,
}

impl<W: Write> Terminal<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("couldn't write to terminal: {err}");
        }
    }
}

impl<W: Write> Presenter for Terminal<W> {
    fn present(&mut self, view: &AlarmView) {
        let tone = view
            .message
            .tone
            .map_or_else(String::new, |tone| format!(" [{tone}]"));
        self.line(&format!(
            "⏰ {} {} with {} ({})",
            view.time.format("%H:%M"),
            view.label,
            view.partner_name,
            view.status
        ));
        self.line(&format!("   {}{tone}", view.message.text));
        self.line(&format!(
            "   snoozes: you {} / {} {}",
            view.my_snooze_count, view.partner_name, view.partner_snooze_count
        ));
        self.line("   [s]nooze  [a]cknowledge  [c]ancel");
    }

    fn dismiss(&mut self) {
        self.line("alarm closed");
    }

    fn notice(&mut self, message: &str) {
        self.line(&format!("note: {message}"));
    }

    fn error(&mut self, message: &str) {
        self.line(&format!("error: {message}"));
    }

    fn list(&mut self, alarms: &[Alarm], me: UserId, directory: &dyn Directory) {
        if alarms.is_empty() {
            self.line("No alarms yet. Create one with a friend!");
            return;
        }
        for alarm in alarms {
            let partner = alarm.partner_of(me).map_or_else(
                || directory.placeholder().to_string(),
                |partner| directory.partner_name(partner),
            );
            self.line(&format!(
                "#{} {} {} with {} 🔊 {} ({})",
                alarm.id,
                alarm.time.format("%H:%M"),
                alarm.label,
                partner,
                alarm.sound,
                alarm.status
            ));
        }
    }
}
