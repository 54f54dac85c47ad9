//! Device types for the simulated greenhouse actuators

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};

/// One of the controllable greenhouse systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Irrigation pump
    Water,
    /// Ventilation fan
    Ventilation,
    /// Grow light
    Light,
}

impl DeviceKind {
    /// Icon font class for this device
    pub fn icon(&self) -> &'static str {
        match self {
            DeviceKind::Water => "bx-water",
            DeviceKind::Ventilation => "bx-wind",
            DeviceKind::Light => "bx-bulb",
        }
    }

    /// Full class attribute of the status icon
    pub fn icon_class(&self, active: bool) -> String {
        let status = if active { "status-active" } else { "status-inactive" };
        format!("bx {} {}", self.icon(), status)
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Water => write!(f, "water"),
            DeviceKind::Ventilation => write!(f, "ventilation"),
            DeviceKind::Light => write!(f, "light"),
        }
    }
}

/// Irrigation pump state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterState {
    #[default]
    Idle,
    Watering,
}

impl WaterState {
    pub fn status_text(&self) -> &'static str {
        match self {
            WaterState::Idle => "Standby",
            WaterState::Watering => "Watering...",
        }
    }
}

/// Ventilation fan state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VentilationState {
    #[default]
    Off,
    Running,
}

impl VentilationState {
    pub fn from_on(on: bool) -> Self {
        if on {
            VentilationState::Running
        } else {
            VentilationState::Off
        }
    }

    pub fn is_on(&self) -> bool {
        *self == VentilationState::Running
    }

    pub fn status_text(&self) -> &'static str {
        match self {
            VentilationState::Off => "Off",
            VentilationState::Running => "Running",
        }
    }

    /// Label of the toggle button, which names the action it would perform
    pub fn button_text(&self) -> &'static str {
        match self {
            VentilationState::Off => "Turn on Ventilation",
            VentilationState::Running => "Turn off Ventilation",
        }
    }
}

/// Grow light state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightState {
    #[default]
    Off,
    On,
}

impl LightState {
    pub fn from_on(on: bool) -> Self {
        if on {
            LightState::On
        } else {
            LightState::Off
        }
    }

    pub fn is_on(&self) -> bool {
        *self == LightState::On
    }

    pub fn status_text(&self) -> &'static str {
        match self {
            LightState::Off => "Off",
            LightState::On => "On",
        }
    }

    pub fn button_text(&self) -> &'static str {
        match self {
            LightState::Off => "Turn on Light Source",
            LightState::On => "Turn off Light Source",
        }
    }
}

/// Requested switch position for a two-state device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchAction {
    On,
    Off,
    #[default]
    Toggle,
}

impl SwitchAction {
    /// Target position given whether the device is currently on
    pub fn resolve(&self, currently_on: bool) -> bool {
        match self {
            SwitchAction::On => true,
            SwitchAction::Off => false,
            SwitchAction::Toggle => !currently_on,
        }
    }
}

impl std::fmt::Display for SwitchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchAction::On => write!(f, "on"),
            SwitchAction::Off => write!(f, "off"),
            SwitchAction::Toggle => write!(f, "toggle"),
        }
    }
}

/// Manual watering request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WateringRequest {
    /// Irrigation sector (1-3)
    pub sector: u8,
    /// Watering duration in seconds (1-60)
    pub duration_secs: u64,
}

impl WateringRequest {
    pub const SECTORS: std::ops::RangeInclusive<u8> = 1..=3;
    pub const DURATION_SECS: std::ops::RangeInclusive<u64> = 1..=60;

    pub fn validate(&self) -> Result<()> {
        if !Self::SECTORS.contains(&self.sector) {
            return Err(ControlError::InvalidSector(self.sector));
        }
        if !Self::DURATION_SECS.contains(&self.duration_secs) {
            return Err(ControlError::InvalidDuration(self.duration_secs));
        }
        Ok(())
    }
}

/// Command addressed to a node, in the node's line protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "device", rename_all = "lowercase")]
pub enum DeviceCommand {
    Water { sector: u8, duration_secs: u64 },
    Fan { on: bool },
    Lights { on: bool, brightness: u8 },
}

impl DeviceCommand {
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceCommand::Water { .. } => DeviceKind::Water,
            DeviceCommand::Fan { .. } => DeviceKind::Ventilation,
            DeviceCommand::Lights { .. } => DeviceKind::Light,
        }
    }
}

impl std::fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let switch = |on: bool| if on { "ON" } else { "OFF" };
        match self {
            DeviceCommand::Water {
                sector,
                duration_secs,
            } => write!(f, "WATER_SECTOR_{}_{}", sector, duration_secs),
            DeviceCommand::Fan { on } => write!(f, "FAN_{}", switch(*on)),
            DeviceCommand::Lights { on, brightness } => {
                write!(f, "LIGHTS_{}_{}", switch(*on), brightness)
            }
        }
    }
}
