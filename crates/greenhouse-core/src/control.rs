//! Device control panel
//!
//! Device state lives here, not in rendered labels. Each change is rendered
//! to the page, announced with an alert and emitted as a [`DeviceCommand`].
//! Commands are logged and broadcast only; nothing is sent to hardware.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::device::{
    DeviceCommand, DeviceKind, LightState, SwitchAction, VentilationState, WaterState,
    WateringRequest,
};
use crate::error::{ControlError, Result};
use crate::markup;
use crate::page::{ElementId, Presenter};
use crate::task::TaskSlot;

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// How long a default watering runs before reverting to standby
    pub watering_duration: Duration,
    /// Sector used by [`DeviceControlController::activate_watering`]
    pub default_sector: u8,
    /// Brightness reported with light commands until one is requested
    pub default_brightness: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            watering_duration: Duration::from_secs(3),
            default_sector: 1,
            default_brightness: 100,
        }
    }
}

/// Snapshot of all device states
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSnapshot {
    pub water: WaterState,
    /// Sector being watered, while watering
    pub water_sector: Option<u8>,
    pub ventilation: VentilationState,
    pub light: LightState,
    pub brightness: u8,
    pub updated_at: DateTime<Utc>,
}

/// Grow light position and brightness as applied by one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LightSetting {
    pub state: LightState,
    pub brightness: u8,
}

struct DeviceState {
    water: WaterState,
    water_sector: Option<u8>,
    ventilation: VentilationState,
    light: LightState,
    brightness: u8,
    updated_at: DateTime<Utc>,
    /// Pending return of the pump to standby
    water_revert: TaskSlot,
}

/// Controller for the pump, fan and light panel
pub struct DeviceControlController<P: Presenter> {
    presenter: Arc<P>,
    config: DeviceConfig,
    state: Arc<Mutex<DeviceState>>,
    commands: broadcast::Sender<DeviceCommand>,
}

impl<P: Presenter> Clone for DeviceControlController<P> {
    fn clone(&self) -> Self {
        Self {
            presenter: self.presenter.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            commands: self.commands.clone(),
        }
    }
}

impl<P: Presenter> DeviceControlController<P> {
    /// Create the controller and render every device in its initial state
    pub fn new(presenter: Arc<P>, config: DeviceConfig) -> Self {
        let (commands, _) = broadcast::channel(64);
        let state = DeviceState {
            water: WaterState::Idle,
            water_sector: None,
            ventilation: VentilationState::Off,
            light: LightState::Off,
            brightness: config.default_brightness,
            updated_at: Utc::now(),
            water_revert: TaskSlot::new(),
        };

        render_water(&*presenter, state.water);
        render_ventilation(&*presenter, state.ventilation);
        render_light(&*presenter, state.light);

        Self {
            presenter,
            config,
            state: Arc::new(Mutex::new(state)),
            commands,
        }
    }

    /// Subscribe to issued device commands
    pub fn subscribe_commands(&self) -> broadcast::Receiver<DeviceCommand> {
        self.commands.subscribe()
    }

    /// Water the default sector for the configured duration
    pub async fn activate_watering(&self) {
        self.start_watering(self.config.default_sector, self.config.watering_duration)
            .await;
    }

    /// Water a specific sector for a specific duration
    pub async fn activate_watering_with(&self, request: WateringRequest) -> Result<()> {
        request.validate()?;
        self.start_watering(request.sector, Duration::from_secs(request.duration_secs))
            .await;
        Ok(())
    }

    /// Re-activating while watering re-arms the single revert timer, so the
    /// pump returns to standby `duration` after the latest activation.
    async fn start_watering(&self, sector: u8, duration: Duration) {
        let mut state = self.state.lock().await;

        self.presenter.alert("Watering plants activated!");
        state.water = WaterState::Watering;
        state.water_sector = Some(sector);
        state.updated_at = Utc::now();
        render_water(&*self.presenter, state.water);

        let token = state.water_revert.arm();
        let presenter = self.presenter.clone();
        let shared = self.state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;

            let mut state = shared.lock().await;
            if !state.water_revert.complete(token) {
                return;
            }
            state.water = WaterState::Idle;
            state.water_sector = None;
            state.updated_at = Utc::now();
            render_water(&*presenter, state.water);
            info!(sector, "Watering finished");
        });
        state.water_revert.attach(token, handle.abort_handle());

        self.issue(DeviceCommand::Water {
            sector,
            duration_secs: duration.as_secs(),
        });
    }

    pub async fn toggle_ventilation(&self) -> VentilationState {
        self.set_ventilation(SwitchAction::Toggle).await
    }

    /// Switch the fan; requesting the current position changes nothing
    pub async fn set_ventilation(&self, action: SwitchAction) -> VentilationState {
        let mut state = self.state.lock().await;
        let target = VentilationState::from_on(action.resolve(state.ventilation.is_on()));
        if target == state.ventilation {
            debug!(state = ?target, "Ventilation already in requested state");
            return target;
        }

        state.ventilation = target;
        state.updated_at = Utc::now();
        render_ventilation(&*self.presenter, target);
        self.presenter.alert(if target.is_on() {
            "Ventilation system turned ON"
        } else {
            "Ventilation system turned OFF"
        });
        self.issue(DeviceCommand::Fan { on: target.is_on() });
        target
    }

    pub async fn toggle_light(&self) -> LightState {
        let mut state = self.state.lock().await;
        let target = LightState::from_on(!state.light.is_on());
        self.apply_light(&mut state, target);
        target
    }

    /// Switch the grow light, optionally changing its brightness (0-100)
    pub async fn set_light(&self, action: SwitchAction, brightness: Option<u8>) -> Result<LightSetting> {
        if let Some(b) = brightness {
            if b > 100 {
                return Err(ControlError::InvalidBrightness(b));
            }
        }

        let mut state = self.state.lock().await;
        let brightness_changed = brightness.is_some_and(|b| b != state.brightness);
        if let Some(b) = brightness {
            state.brightness = b;
        }

        let target = LightState::from_on(action.resolve(state.light.is_on()));
        if target != state.light {
            self.apply_light(&mut state, target);
        } else if brightness_changed {
            state.updated_at = Utc::now();
            self.issue(DeviceCommand::Lights {
                on: target.is_on(),
                brightness: state.brightness,
            });
        }
        Ok(LightSetting {
            state: target,
            brightness: state.brightness,
        })
    }

    fn apply_light(&self, state: &mut DeviceState, target: LightState) {
        state.light = target;
        state.updated_at = Utc::now();
        render_light(&*self.presenter, target);
        self.presenter.alert(if target.is_on() {
            "Light source turned ON"
        } else {
            "Light source turned OFF"
        });
        self.issue(DeviceCommand::Lights {
            on: target.is_on(),
            brightness: state.brightness,
        });
    }

    pub async fn status(&self) -> DeviceSnapshot {
        let state = self.state.lock().await;
        DeviceSnapshot {
            water: state.water,
            water_sector: state.water_sector,
            ventilation: state.ventilation,
            light: state.light,
            brightness: state.brightness,
            updated_at: state.updated_at,
        }
    }

    fn issue(&self, command: DeviceCommand) {
        info!(device = %command.kind(), command = %command, "Device command issued");
        let _ = self.commands.send(command);
    }
}

fn render_water<P: Presenter + ?Sized>(presenter: &P, state: WaterState) {
    presenter.set_text(ElementId::WaterStatus, state.status_text());
    presenter.set_class(
        ElementId::WaterIcon,
        &DeviceKind::Water.icon_class(state == WaterState::Watering),
    );
}

fn render_ventilation<P: Presenter + ?Sized>(presenter: &P, state: VentilationState) {
    let kind = DeviceKind::Ventilation;
    presenter.set_markup(
        ElementId::VentToggle,
        &markup::button_label(kind.icon(), state.button_text()),
    );
    presenter.set_text(ElementId::VentStatus, state.status_text());
    presenter.set_class(ElementId::VentIcon, &kind.icon_class(state.is_on()));
}

fn render_light<P: Presenter + ?Sized>(presenter: &P, state: LightState) {
    let kind = DeviceKind::Light;
    presenter.set_markup(
        ElementId::LightToggle,
        &markup::button_label(kind.icon(), state.button_text()),
    );
    presenter.set_text(ElementId::LightStatus, state.status_text());
    presenter.set_class(ElementId::LightIcon, &kind.icon_class(state.is_on()));
}
