//! Application state management

use greenhouse_core::{DeviceControlController, ImageUploadController, Page, SimulatedSensors};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Dashboard document shared by both panels
    pub page: Arc<Page>,
    /// Image upload and leaf analysis panel
    pub upload: ImageUploadController<Page>,
    /// Pump, fan and light panel
    pub devices: DeviceControlController<Page>,
    /// Soil, climate and light readings
    pub sensors: Mutex<SimulatedSensors>,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Arc<Self> {
        let page = Arc::new(Page::new());
        let upload = ImageUploadController::new(page.clone(), config.to_upload_config());
        let devices = DeviceControlController::new(page.clone(), config.to_device_config());
        let sensors = Mutex::new(config.sensors.to_simulator());

        info!(
            analysis_delay_ms = config.analysis.delay_ms,
            watering_secs = config.devices.watering_duration_secs,
            "Dashboard controllers ready"
        );

        Arc::new(Self {
            page,
            upload,
            devices,
            sensors,
            config,
        })
    }
}
