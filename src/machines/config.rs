//! Boot and flash orchestration of a decoder.
//!
//! `Init` waits a short delay, `Configure` flashes the configuration,
//! `WaitForBoot` gives the device time to boot. A device that does not report
//! `booted` in time is flashed again until the retry budget is spent.

use crate::builder::{BuildError, TableBuilder, TransitionBuilder};
use crate::core::choice;
use crate::engine::{Machine, Statechart, StatechartError, Table};
use crate::settings::{millis, ConfigSettings};
use crate::state_enum;
use std::sync::Arc;

state_enum! {
    pub enum ConfigState {
        Init,
        Configure,
        WaitForBoot,
        Booted,
        Failed,
    }
    error: [Failed]
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigEvent {
    Booted,
    Failed,
    Restart,
    InitDone,
    Flashed,
    BootTimeout,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigOutput {
    Booted,
    Failed,
}

pub trait ConfigCallback: Send + Sync {
    /// Write the configuration to the device.
    fn configure(&self);
    fn boot(&self);
    fn is_booted(&self) -> bool;
    fn fail(&self);
}

pub struct Config {
    callback: Option<Arc<dyn ConfigCallback>>,
    settings: ConfigSettings,
    retries: u32,
}

impl Config {
    pub fn new(settings: ConfigSettings) -> Self {
        Self {
            callback: None,
            settings,
            retries: 0,
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn ConfigCallback>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn set_callback(&mut self, callback: Arc<dyn ConfigCallback>) {
        self.callback = Some(callback);
    }

    /// Flash attempts in the current boot sequence.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    fn call(&self, f: impl FnOnce(&dyn ConfigCallback)) {
        if let Some(callback) = &self.callback {
            f(callback.as_ref());
        }
    }

    fn is_booted(&self) -> bool {
        self.callback.as_ref().is_some_and(|cb| cb.is_booted())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(ConfigSettings::default())
    }
}

type Edge = TransitionBuilder<Config>;

impl Machine for Config {
    type State = ConfigState;
    type Event = ConfigEvent;
    type Output = ConfigOutput;

    const NAME: &'static str = "Config";
    const REGIONS: usize = 1;
    const TIMERS: usize = 3;
    const MAX_ARMED: usize = 1;

    fn define(&self) -> Result<Table<Self>, BuildError> {
        use ConfigState::*;

        let mut table = TableBuilder::<Self>::new()
            .initial(Init)
            .on_entry(Init, |config, _| config.retries = 0)
            .on_entry(Configure, |config, _| {
                config.retries += 1;
                config.call(|cb| cb.configure());
            })
            .on_entry(WaitForBoot, |config, _| config.call(|cb| cb.boot()))
            .on_entry(Booted, |_, rt| rt.emit(ConfigOutput::Booted))
            .on_entry(Failed, |config, rt| {
                config.call(|cb| cb.fail());
                rt.emit(ConfigOutput::Failed);
            })
            .timer(Init, millis(self.settings.init_delay_ms), ConfigEvent::InitDone)
            .timer(Configure, millis(self.settings.flash_delay_ms), ConfigEvent::Flashed)
            .timer(WaitForBoot, millis(self.settings.boot_timeout_ms), ConfigEvent::BootTimeout)
            .transition(
                Edge::new()
                    .from(Init)
                    .on(|e| matches!(e, ConfigEvent::InitDone))
                    .to(Configure),
            )?
            .transition(
                Edge::new()
                    .from(Configure)
                    .on(|e| matches!(e, ConfigEvent::Flashed))
                    .to(WaitForBoot),
            )?
            .transition(
                Edge::new()
                    .from(WaitForBoot)
                    .on(|e| matches!(e, ConfigEvent::Booted))
                    .to(Booted),
            )?
            .transition(
                Edge::new()
                    .from(WaitForBoot)
                    .on(|e| matches!(e, ConfigEvent::BootTimeout))
                    .to_choice(|config, _| {
                        choice(|| config.is_booted(), Booted)
                            .when(|| config.retries < config.settings.max_retries, Configure)
                            .otherwise(Failed)
                    }),
            )?;

        for source in [Init, Configure, WaitForBoot] {
            table = table.transition(
                Edge::new()
                    .from(source)
                    .on(|e| matches!(e, ConfigEvent::Failed))
                    .to(Failed),
            )?;
        }
        for source in [Booted, Failed] {
            table = table.transition(
                Edge::new()
                    .from(source)
                    .on(|e| matches!(e, ConfigEvent::Restart))
                    .to(Init),
            )?;
        }
        table.build()
    }

    fn check(&self) -> bool {
        self.callback.is_some()
    }
}

impl Statechart<Config> {
    pub fn raise_booted(&mut self) -> Result<(), StatechartError> {
        self.raise(ConfigEvent::Booted)
    }

    pub fn raise_failed(&mut self) -> Result<(), StatechartError> {
        self.raise(ConfigEvent::Failed)
    }

    pub fn raise_restart(&mut self) -> Result<(), StatechartError> {
        self.raise(ConfigEvent::Restart)
    }
}
