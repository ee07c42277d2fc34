//! The kiosk session: owns every piece of runtime state and routes key
//! presses and timer expiries to the controllers, one event at a time.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    charts::{ChartRegistry, ChartSource},
    input::Key,
    notify::{KioskEvent, Notifier},
    power::{HibernationController, PowerActions},
    scale::{compute_derived_scale, DerivedScale},
    scheduler::{Scheduler, TimerToken},
    selection::SelectionController,
    settings::{KioskConfig, SettingsStore},
};

pub struct KioskSession<S: Scheduler> {
    settings: SettingsStore,
    config: KioskConfig,
    scale: DerivedScale,
    registry: ChartRegistry,
    selection: SelectionController,
    hibernation: HibernationController,
    scheduler: S,
    power: Box<dyn PowerActions>,
    notifier: Box<dyn Notifier>,
}

impl<S: Scheduler> KioskSession<S> {
    /// Validates the configuration and loads all charts. Any error here
    /// means the kiosk cannot run.
    pub fn new(
        settings: SettingsStore,
        charts: &dyn ChartSource,
        scheduler: S,
        power: Box<dyn PowerActions>,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self> {
        let config = settings
            .kiosk_config()
            .with_context(|| format!("invalid settings in {}", settings.path().display()))?;
        let scale = compute_derived_scale(&config.physical);
        log_scale(&config, &scale);

        let registry = ChartRegistry::load(charts, &scale).context("charts could not be loaded")?;
        info!("Charts loaded successfully, {} chart(s)", registry.len());

        Ok(Self {
            hibernation: HibernationController::new(config.hibernate_after),
            selection: SelectionController::new(),
            settings,
            config,
            scale,
            registry,
            scheduler,
            power,
            notifier,
        })
    }

    /// Shows the first chart and arms the inactivity timers.
    pub fn start(&mut self) {
        self.notifier.notify(&KioskEvent::config_updated(
            &self.config.physical,
            &self.scale,
        ));

        match self.registry.default_chart() {
            Some(id) => {
                self.selection
                    .activate(id, &self.registry, self.notifier.as_ref());
            }
            None => warn!("No charts to show"),
        }

        self.hibernation.start(&mut self.scheduler);
        self.scheduler
            .schedule(self.config.size_reset_after, TimerToken::SizeReset);
    }

    pub fn handle_key(&mut self, key: Key) {
        self.hibernation
            .on_key(key, &mut self.scheduler, self.power.as_ref());
        self.scheduler
            .restart(self.config.size_reset_after, TimerToken::SizeReset);

        match key {
            Key::Digit(digit) => {
                self.selection
                    .on_numeric_key(digit, &self.registry, self.notifier.as_ref());
            }
            Key::SizeUp => {
                self.selection
                    .on_size_change(1, &mut self.registry, self.notifier.as_ref());
            }
            Key::SizeDown => {
                self.selection
                    .on_size_change(-1, &mut self.registry, self.notifier.as_ref());
            }
            Key::ToggleHibernate => {
                self.hibernation
                    .request_toggle(&mut self.scheduler, self.power.as_ref());
            }
            Key::Preferences => self.reload_config(),
            Key::Other(_) => {}
        }
    }

    pub fn handle_timer(&mut self, token: TimerToken) {
        match token {
            TimerToken::SizeReset => self.selection.reset_sizes(
                &mut self.registry,
                &self.scale,
                self.notifier.as_ref(),
            ),
            TimerToken::Inactivity
            | TimerToken::HibernateCooldown
            | TimerToken::SecretSequence => {
                self.hibernation
                    .on_timer(token, &mut self.scheduler, self.power.as_ref());
            }
        }
    }

    /// Re-reads the settings file, rescales every chart and re-arms the
    /// timers. A broken file keeps the current configuration running.
    pub fn reload_config(&mut self) {
        info!("Reloading preferences from {}", self.settings.path().display());
        if let Err(err) = self.settings.reload() {
            warn!("Keeping current preferences: {err:#}");
            return;
        }

        let config = match self.settings.kiosk_config() {
            Ok(config) => config,
            Err(err) => {
                warn!("Keeping current preferences: {err}");
                return;
            }
        };

        self.scale = compute_derived_scale(&config.physical);
        log_scale(&config, &self.scale);
        self.hibernation.set_hibernate_after(config.hibernate_after);
        self.config = config;

        self.notifier.notify(&KioskEvent::config_updated(
            &self.config.physical,
            &self.scale,
        ));
        self.selection
            .reset_sizes(&mut self.registry, &self.scale, self.notifier.as_ref());

        // Re-arm with the new durations.
        self.hibernation.start(&mut self.scheduler);
        self.scheduler
            .schedule(self.config.size_reset_after, TimerToken::SizeReset);
    }

    pub fn scale(&self) -> &DerivedScale {
        &self.scale
    }

    pub fn registry(&self) -> &ChartRegistry {
        &self.registry
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn hibernation(&self) -> &HibernationController {
        &self.hibernation
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

fn log_scale(config: &KioskConfig, scale: &DerivedScale) {
    info!(
        "  Distance: {} cm, height: {} mm / {} px",
        config.physical.viewing_distance_cm,
        config.physical.screen_height_mm,
        config.physical.screen_height_px
    );
    info!("  pixelsPerMm: {:.6}", scale.pixels_per_mm);
}

#[cfg(test)]
mod tests;
