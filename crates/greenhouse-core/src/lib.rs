//! Greenhouse Core - Page state and controllers for the greenhouse dashboard
//!
//! This crate provides the UI-state core of the dashboard:
//! - A presentation contract ([`Presenter`]) and an in-memory [`Page`] document
//! - The image upload / leaf analysis controller
//! - The device control panel for the pump, fan and grow light
//! - Simulated soil, climate and light sensor readings
//! - Cancellable scheduled tasks backing every simulated delay

pub mod analysis;
pub mod control;
pub mod device;
pub mod error;
pub mod markup;
pub mod page;
pub mod sensors;
pub mod task;
pub mod upload;

pub use analysis::{AnalysisResult, LeafAnalyzer, SimulatedAnalyzer};
pub use control::{DeviceConfig, DeviceControlController, DeviceSnapshot, LightSetting};
pub use device::{
    DeviceCommand, DeviceKind, LightState, SwitchAction, VentilationState, WaterState,
    WateringRequest,
};
pub use error::{ControlError, Result};
pub use page::{Content, Element, ElementId, Page, PageEvent, Presenter, PLACEHOLDER};
pub use sensors::{SensorReadings, SimulatedSensors};
pub use task::{TaskSlot, TaskToken};
pub use upload::{
    Dimensions, ImageStatus, ImageUploadController, PendingAnalysis, SelectedFile, UploadConfig,
    UploadedImage,
};
