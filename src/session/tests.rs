use std::{fs, rc::Rc, time::Duration};

use super::*;
use crate::{
    charts::{ChartDefinition, GroupDefinition},
    notify::RecordingNotifier,
    power::{DisplayState, FakePower},
    scale::SIZE_STEP_RATIO,
    scheduler::ManualScheduler,
    settings::temp_settings_path,
};

struct Kiosk {
    session: KioskSession<ManualScheduler>,
    power: Rc<FakePower>,
    events: Rc<std::cell::RefCell<Vec<KioskEvent>>>,
    settings_path: std::path::PathBuf,
}

impl Kiosk {
    fn press(&mut self, keys: &str) {
        for key in keys.chars().filter_map(Key::from_char) {
            self.session.handle_key(key);
        }
    }

    fn fire(&mut self, token: TimerToken) {
        assert!(self.session.scheduler_mut().fire(token), "{token:?} not armed");
        self.session.handle_timer(token);
    }

    fn active_name(&self) -> &str {
        let id = self.session.selection().active().unwrap();
        &self.session.registry().get(id).unwrap().display_name
    }

    fn size_of(&self, id: usize) -> f64 {
        self.session.registry().get(id).unwrap().current_size_px
    }
}

fn font(caption: &str) -> ChartDefinition {
    ChartDefinition {
        chart_type: "font".into(),
        caption: caption.into(),
        size_locked: true,
        rows: vec![("0.1".into(), "H".into()), ("1.0".into(), "E".into())],
        ..ChartDefinition::default()
    }
}

fn charts() -> Vec<GroupDefinition> {
    vec![
        GroupDefinition {
            num_key: None,
            charts: vec![font("Welcome")],
        },
        GroupDefinition {
            num_key: Some("1".into()),
            charts: vec![font("A"), font("B")],
        },
        GroupDefinition {
            num_key: Some("2".into()),
            charts: vec![font("C")],
        },
    ]
}

fn kiosk(name: &str, display: DisplayState) -> Kiosk {
    let settings_path = temp_settings_path(name);
    fs::write(
        &settings_path,
        r#"{ "physDistance": 600, "physHeight": 300, "screenHeightPx": 1200,
             "hibernateTime": 1, "sizeResetTime": 30 }"#,
    )
    .unwrap();

    let power = Rc::new(FakePower::new(display));
    let notifier = RecordingNotifier::default();
    let events = notifier.events.clone();
    let mut session = KioskSession::new(
        SettingsStore::new(settings_path.clone()).unwrap(),
        &charts(),
        ManualScheduler::default(),
        Box::new(power.clone()),
        Box::new(notifier),
    )
    .unwrap();
    session.start();

    Kiosk {
        session,
        power,
        events,
        settings_path,
    }
}

#[test]
fn starts_on_the_first_chart_with_timers_armed() {
    let mut kiosk = kiosk("session-start", DisplayState::On);
    assert_eq!(kiosk.active_name(), "Welcome");

    let events = kiosk.events.borrow().clone();
    assert!(matches!(events[0], KioskEvent::ConfigUpdated { .. }));
    assert!(matches!(events[1], KioskEvent::ChartActivated { id: 0, .. }));

    let scheduler = kiosk.session.scheduler_mut();
    assert_eq!(scheduler.delay(TimerToken::Inactivity), Some(Duration::from_secs(60)));
    assert_eq!(scheduler.delay(TimerToken::SizeReset), Some(Duration::from_secs(30)));
}

#[test]
fn digits_cycle_and_size_lock_follows_the_key() {
    let mut kiosk = kiosk("session-cycle", DisplayState::On);
    let start = kiosk.size_of(1);

    kiosk.press("1");
    assert_eq!(kiosk.active_name(), "A");
    kiosk.press("+");
    kiosk.press("1");
    assert_eq!(kiosk.active_name(), "B");
    assert!((kiosk.size_of(2) - start * SIZE_STEP_RATIO).abs() < 1e-9);
    assert_eq!(kiosk.size_of(3), start);

    kiosk.press("1");
    assert_eq!(kiosk.active_name(), "A");
    kiosk.press("2");
    assert_eq!(kiosk.active_name(), "C");
}

#[test]
fn size_reset_timer_restores_start_sizes() {
    let mut kiosk = kiosk("session-reset", DisplayState::On);
    let start = kiosk.size_of(1);

    kiosk.press("1++");
    assert!(kiosk.size_of(1) > start);

    kiosk.fire(TimerToken::SizeReset);
    assert_eq!(kiosk.size_of(1), start);
    assert_eq!(kiosk.size_of(2), start);
}

#[test]
fn inactivity_hibernates_and_keys_postpone_it() {
    let mut kiosk = kiosk("session-hibernate", DisplayState::On);

    kiosk.press("x");
    assert!(kiosk.session.scheduler_mut().is_pending(TimerToken::Inactivity));
    assert_eq!(kiosk.power.count("hibernate"), 0);

    kiosk.fire(TimerToken::Inactivity);
    assert_eq!(kiosk.power.count("hibernate"), 1);
    assert!(!kiosk.session.hibernation().state().allow_hibernate);

    // Cooling down: the toggle key is ignored.
    kiosk.press("q");
    assert_eq!(kiosk.power.count("query"), 1);

    kiosk.fire(TimerToken::HibernateCooldown);
    kiosk.press("q");
    assert_eq!(kiosk.power.count("wake"), 1);
}

#[test]
fn secret_sequence_shuts_down_while_still_selecting_charts() {
    let mut kiosk = kiosk("session-secret", DisplayState::On);

    for key in "2018".chars() {
        kiosk.press(&key.to_string());
        kiosk.fire(TimerToken::SecretSequence);
    }

    assert_eq!(kiosk.power.count("shutdown"), 1);
    assert_eq!(kiosk.active_name(), "A");
}

#[test]
fn preferences_key_rescales_charts() {
    let mut kiosk = kiosk("session-prefs", DisplayState::On);
    let before = kiosk.session.scale().pixels_per_mm;
    let size_before = kiosk.size_of(0);

    fs::write(
        &kiosk.settings_path,
        r#"{ "physDistance": 600, "physHeight": 150, "screenHeightPx": 1200 }"#,
    )
    .unwrap();
    kiosk.press("p");

    assert_eq!(kiosk.session.scale().pixels_per_mm, before * 2.0);
    assert!((kiosk.size_of(0) - size_before * 2.0).abs() < 1e-9);
    assert!(matches!(
        kiosk.events.borrow().iter().rev().nth(1),
        Some(KioskEvent::ConfigUpdated { .. })
    ));
}

#[test]
fn broken_preferences_keep_the_running_config() {
    let mut kiosk = kiosk("session-broken-prefs", DisplayState::On);
    let before = *kiosk.session.scale();

    fs::write(&kiosk.settings_path, r#"{ "physHeight": 150 }"#).unwrap();
    kiosk.press("p");

    assert_eq!(*kiosk.session.scale(), before);
}

#[test]
fn unparsable_preferences_keep_the_running_config_and_the_file() {
    let mut kiosk = kiosk("session-unparsable-prefs", DisplayState::On);
    let before = *kiosk.session.scale();
    let broken = r#"{ "physDistance": 300, "physHeight": 300, "screenHeightPx": 1200, }"#;

    fs::write(&kiosk.settings_path, broken).unwrap();
    kiosk.press("p");

    assert_eq!(*kiosk.session.scale(), before);
    assert_eq!(fs::read_to_string(&kiosk.settings_path).unwrap(), broken);
}

#[test]
fn reloaded_timeouts_apply_immediately() {
    let mut kiosk = kiosk("session-reload-timers", DisplayState::On);

    fs::write(
        &kiosk.settings_path,
        r#"{ "physDistance": 600, "physHeight": 300, "screenHeightPx": 1200,
             "hibernateTime": 5, "sizeResetTime": 90 }"#,
    )
    .unwrap();
    kiosk.press("p");

    let scheduler = kiosk.session.scheduler_mut();
    assert_eq!(scheduler.delay(TimerToken::Inactivity), Some(Duration::from_secs(300)));
    assert_eq!(scheduler.delay(TimerToken::SizeReset), Some(Duration::from_secs(90)));
}

#[test]
fn invalid_settings_refuse_to_start() {
    let path = temp_settings_path("session-invalid");
    fs::write(&path, r#"{ "physDistance": 600 }"#).unwrap();

    let result = KioskSession::new(
        SettingsStore::new(path).unwrap(),
        &charts(),
        ManualScheduler::default(),
        Box::new(Rc::new(FakePower::new(DisplayState::On))),
        Box::new(RecordingNotifier::default()),
    );
    assert!(result.is_err());
}

#[test]
fn unreadable_charts_refuse_to_start() {
    let path = temp_settings_path("session-no-charts");
    fs::write(
        &path,
        r#"{ "physDistance": 600, "physHeight": 300, "screenHeightPx": 1200 }"#,
    )
    .unwrap();

    let result = KioskSession::new(
        SettingsStore::new(path).unwrap(),
        &crate::charts::XmlChartFile::new("/nonexistent/visutest/charts.xml"),
        ManualScheduler::default(),
        Box::new(Rc::new(FakePower::new(DisplayState::On))),
        Box::new(RecordingNotifier::default()),
    );

    let err = result.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<crate::charts::LoadError>(),
        Some(crate::charts::LoadError::Unreadable { .. })
    ));
}
