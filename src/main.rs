// GUI-subsystem binary: no console window is ever allocated on Windows.
#![windows_subsystem = "windows"]

use eframe::egui;
use pixeled::app::PixelEdApp;
use pixeled::logger;

fn main() -> Result<(), eframe::Error> {
    // Initialize session log (overwrites the previous session's log file)
    logger::init();

    // Fixed-size window: the canvas is a fixed 300x300 raster, so there is
    // nothing useful for a resize to do.
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 430.0])
            .with_resizable(false)
            .with_title("PixelEd"),
        ..Default::default()
    };

    eframe::run_native(
        "PixelEd",
        options,
        Box::new(|cc| Box::new(PixelEdApp::new(cc))),
    )
}
