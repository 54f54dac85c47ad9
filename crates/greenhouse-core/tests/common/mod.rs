use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use greenhouse_core::{
    DeviceConfig, DeviceControlController, ImageUploadController, Page, PageEvent, SelectedFile,
    UploadConfig,
};
use tokio::sync::broadcast;

/// Encode a blank RGB image of the given size as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn png_file(name: &str, width: u32, height: u32) -> SelectedFile {
    SelectedFile::new(name, "image/png", png_bytes(width, height))
}

pub fn upload_panel(delay: Duration) -> (Arc<Page>, ImageUploadController<Page>) {
    let page = Arc::new(Page::new());
    let config = UploadConfig {
        analysis_delay: delay,
        seed: None,
    };
    let controller = ImageUploadController::new(page.clone(), config);
    (page, controller)
}

pub fn device_panel() -> (Arc<Page>, DeviceControlController<Page>) {
    let page = Arc::new(Page::new());
    let controller = DeviceControlController::new(page.clone(), DeviceConfig::default());
    (page, controller)
}

/// Drain all alerts received so far.
pub fn drain_alerts(rx: &mut broadcast::Receiver<PageEvent>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let PageEvent::Alert { message } = event {
            out.push(message);
        }
    }
    out
}

/// Poll until `cond` holds, panicking after roughly one second.
pub async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}
