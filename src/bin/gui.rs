#[cfg(feature = "gui")]
use eframe::{NativeOptions, egui::ViewportBuilder};
#[cfg(feature = "gui")]
use floodmap::gui::models::FloodGui;

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    let options = NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title("floodmap")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "floodmap",
        options,
        Box::new(|_cc| Ok(Box::new(FloodGui::default()))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("GUI feature is not enabled. Please build with --features gui");
    std::process::exit(1);
}
