//! Display hibernation and the hidden shutdown sequence.
//!
//! Both share the raw key stream with chart selection. Every key press
//! restarts the inactivity timer; when it fires the display is forced into
//! hibernation. Toggles are rate limited by a cooldown because each script
//! call queues in the display driver.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::{
    input::Key,
    scheduler::{Scheduler, TimerToken},
};

use super::display::{DisplayState, PowerActions};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const HIBERNATE_COOLDOWN: Duration = Duration::from_millis(10_000);
pub const SECRET_KEY_WINDOW: Duration = Duration::from_millis(400);
/// Typed as digits, "2018" shuts the machine down.
pub const SECRET_SEQUENCE: [u8; 4] = [2, 0, 1, 8];

#[derive(Debug, Clone, PartialEq)]
pub struct HibernationState {
    pub allow_hibernate: bool,
    pub allow_secret_sequence: bool,
    pub secret_sequence_stage: u8,
    pub last_activity: DateTime<Utc>,
}

impl Default for HibernationState {
    fn default() -> Self {
        Self {
            allow_hibernate: true,
            allow_secret_sequence: true,
            secret_sequence_stage: 0,
            last_activity: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Hibernated,
    Woken,
    Unchanged,
    /// Still cooling down from the previous toggle.
    Ignored,
}

#[derive(Debug)]
pub struct HibernationController {
    state: HibernationState,
    hibernate_after: Duration,
}

impl HibernationController {
    pub fn new(hibernate_after: Duration) -> Self {
        Self {
            state: HibernationState::default(),
            hibernate_after,
        }
    }

    pub fn state(&self) -> &HibernationState {
        &self.state
    }

    /// Takes effect the next time the inactivity timer is armed.
    pub fn set_hibernate_after(&mut self, hibernate_after: Duration) {
        self.hibernate_after = hibernate_after;
    }

    /// Arms the inactivity timer, replacing a pending one.
    pub fn start(&mut self, scheduler: &mut dyn Scheduler) {
        scheduler.schedule(self.hibernate_after, TimerToken::Inactivity);
    }

    /// Registers activity and feeds the secret sequence. Returns true when
    /// the key completed the sequence and shutdown was requested.
    pub fn on_key(
        &mut self,
        key: Key,
        scheduler: &mut dyn Scheduler,
        power: &dyn PowerActions,
    ) -> bool {
        self.state.last_activity = Utc::now();
        scheduler.restart(self.hibernate_after, TimerToken::Inactivity);

        if !self.state.allow_secret_sequence {
            return false;
        }

        let completed = self.advance_secret_sequence(key);
        self.state.allow_secret_sequence = false;
        scheduler.restart(SECRET_KEY_WINDOW, TimerToken::SecretSequence);

        if completed {
            power.shutdown();
        }
        completed
    }

    fn advance_secret_sequence(&mut self, key: Key) -> bool {
        let stage = usize::from(self.state.secret_sequence_stage);
        if key != Key::Digit(SECRET_SEQUENCE[stage]) {
            self.state.secret_sequence_stage = 0;
            return false;
        }

        if stage + 1 == SECRET_SEQUENCE.len() {
            self.state.secret_sequence_stage = 0;
            return true;
        }

        self.state.secret_sequence_stage += 1;
        log_debug!("Secret sequence at stage {}", self.state.secret_sequence_stage);
        false
    }

    /// Operator toggle key. Ignored while cooling down.
    pub fn request_toggle(
        &mut self,
        scheduler: &mut dyn Scheduler,
        power: &dyn PowerActions,
    ) -> ToggleOutcome {
        if !self.state.allow_hibernate {
            log_info!("Hibernate toggle ignored during cooldown");
            return ToggleOutcome::Ignored;
        }
        self.flip_hibernate(false, scheduler, power)
    }

    /// Hibernates a display that is on. An off display is woken unless
    /// `force` is set. A failed query leaves the display alone. Every
    /// attempt starts the cooldown.
    pub fn flip_hibernate(
        &mut self,
        force: bool,
        scheduler: &mut dyn Scheduler,
        power: &dyn PowerActions,
    ) -> ToggleOutcome {
        let outcome = match power.query_display() {
            DisplayState::On => {
                power.hibernate();
                ToggleOutcome::Hibernated
            }
            DisplayState::Off if !force => {
                power.wake();
                ToggleOutcome::Woken
            }
            DisplayState::Off => ToggleOutcome::Unchanged,
            DisplayState::QueryFailed => {
                log_warn!("Display state unknown, leaving display as is");
                ToggleOutcome::Unchanged
            }
        };

        self.state.allow_hibernate = false;
        scheduler.restart(HIBERNATE_COOLDOWN, TimerToken::HibernateCooldown);
        outcome
    }

    /// Handles the timers this controller owns; others are ignored.
    pub fn on_timer(
        &mut self,
        token: TimerToken,
        scheduler: &mut dyn Scheduler,
        power: &dyn PowerActions,
    ) -> Option<ToggleOutcome> {
        match token {
            TimerToken::Inactivity => {
                log_info!("No activity for {:?}, hibernating", self.hibernate_after);
                Some(self.flip_hibernate(true, scheduler, power))
            }
            TimerToken::HibernateCooldown => {
                log_info!("Now allowing hibernate again");
                self.state.allow_hibernate = true;
                None
            }
            TimerToken::SecretSequence => {
                self.state.allow_secret_sequence = true;
                None
            }
            TimerToken::SizeReset => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{power::FakePower, scheduler::ManualScheduler};

    const HIBERNATE_AFTER: Duration = Duration::from_secs(120 * 60);

    struct Rig {
        controller: HibernationController,
        scheduler: ManualScheduler,
        power: FakePower,
    }

    impl Rig {
        fn new(display: DisplayState) -> Self {
            let mut rig = Self {
                controller: HibernationController::new(HIBERNATE_AFTER),
                scheduler: ManualScheduler::default(),
                power: FakePower::new(display),
            };
            rig.controller.start(&mut rig.scheduler);
            rig
        }

        fn press(&mut self, key: Key) -> bool {
            self.controller.on_key(key, &mut self.scheduler, &self.power)
        }

        fn fire(&mut self, token: TimerToken) -> Option<ToggleOutcome> {
            assert!(self.scheduler.fire(token), "{token:?} was not armed");
            self.controller
                .on_timer(token, &mut self.scheduler, &self.power)
        }

        /// Presses `digit` and lets the 400 ms window elapse.
        fn type_digit(&mut self, digit: u8) -> bool {
            let shutdown = self.press(Key::Digit(digit));
            self.fire(TimerToken::SecretSequence);
            shutdown
        }
    }

    #[test]
    fn inactivity_hibernates_once_then_cools_down() {
        let mut rig = Rig::new(DisplayState::On);
        assert_eq!(rig.scheduler.delay(TimerToken::Inactivity), Some(HIBERNATE_AFTER));

        let outcome = rig.fire(TimerToken::Inactivity);
        assert_eq!(outcome, Some(ToggleOutcome::Hibernated));
        assert_eq!(rig.power.count("hibernate"), 1);
        assert!(!rig.controller.state().allow_hibernate);
        assert_eq!(
            rig.scheduler.delay(TimerToken::HibernateCooldown),
            Some(HIBERNATE_COOLDOWN)
        );
        // Single shot: nothing re-arms inactivity until a key is pressed.
        assert!(!rig.scheduler.is_pending(TimerToken::Inactivity));

        rig.fire(TimerToken::HibernateCooldown);
        assert!(rig.controller.state().allow_hibernate);
        assert_eq!(rig.power.count("hibernate"), 1);
    }

    #[test]
    fn forced_hibernate_leaves_an_off_display_off() {
        let mut rig = Rig::new(DisplayState::Off);
        assert_eq!(rig.fire(TimerToken::Inactivity), Some(ToggleOutcome::Unchanged));
        assert_eq!(rig.power.count("wake"), 0);
        assert!(!rig.controller.state().allow_hibernate);
    }

    #[test]
    fn failed_query_takes_no_action() {
        let mut rig = Rig::new(DisplayState::QueryFailed);
        let outcome = rig
            .controller
            .request_toggle(&mut rig.scheduler, &rig.power);
        assert_eq!(outcome, ToggleOutcome::Unchanged);
        assert_eq!(*rig.power.calls.borrow(), ["query"]);
        assert!(rig.scheduler.is_pending(TimerToken::HibernateCooldown));
    }

    #[test]
    fn manual_toggle_wakes_and_is_rate_limited() {
        let mut rig = Rig::new(DisplayState::Off);

        let first = rig.controller.request_toggle(&mut rig.scheduler, &rig.power);
        assert_eq!(first, ToggleOutcome::Woken);

        let second = rig.controller.request_toggle(&mut rig.scheduler, &rig.power);
        assert_eq!(second, ToggleOutcome::Ignored);
        assert_eq!(rig.power.count("query"), 1);

        rig.fire(TimerToken::HibernateCooldown);
        let third = rig.controller.request_toggle(&mut rig.scheduler, &rig.power);
        assert_eq!(third, ToggleOutcome::Hibernated);
    }

    #[test]
    fn key_press_restarts_inactivity_timer() {
        let mut rig = Rig::new(DisplayState::On);
        rig.scheduler.cancelled.clear();

        rig.press(Key::Other('x'));

        assert_eq!(rig.scheduler.cancelled, [TimerToken::Inactivity, TimerToken::SecretSequence]);
        assert_eq!(rig.scheduler.delay(TimerToken::Inactivity), Some(HIBERNATE_AFTER));
    }

    #[test]
    fn secret_sequence_triggers_shutdown() {
        let mut rig = Rig::new(DisplayState::On);
        assert!(!rig.type_digit(2));
        assert!(!rig.type_digit(0));
        assert!(!rig.type_digit(1));
        assert!(rig.type_digit(8));
        assert_eq!(rig.power.count("shutdown"), 1);
        assert_eq!(rig.controller.state().secret_sequence_stage, 0);
    }

    #[test]
    fn wrong_key_resets_the_sequence() {
        let mut rig = Rig::new(DisplayState::On);
        for digit in [2, 0, 5] {
            assert!(!rig.type_digit(digit));
        }
        assert_eq!(rig.controller.state().secret_sequence_stage, 0);

        assert!(!rig.type_digit(1));
        assert!(!rig.type_digit(8));
        assert_eq!(rig.power.count("shutdown"), 0);
    }

    #[test]
    fn keys_inside_the_window_are_not_counted() {
        let mut rig = Rig::new(DisplayState::On);
        rig.press(Key::Digit(2));
        assert!(!rig.controller.state().allow_secret_sequence);

        // Arrives before the window elapsed: neither advances nor resets.
        rig.press(Key::Digit(5));
        assert_eq!(rig.controller.state().secret_sequence_stage, 1);

        rig.fire(TimerToken::SecretSequence);
        assert!(rig.controller.state().allow_secret_sequence);
        assert!(!rig.type_digit(0));
        assert_eq!(rig.controller.state().secret_sequence_stage, 2);
    }
}
