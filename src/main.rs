use eframe::egui;
use proxy_uq::app::ProxyViewerApp;

fn main() -> eframe::Result {
    env_logger::init();

    // Any arguments are paths to `<core>_settings.txt` files to open.
    let settings: Vec<std::path::PathBuf> = std::env::args_os().skip(1).map(Into::into).collect();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Proxy UQ – Age-depth proxy viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(ProxyViewerApp::with_cores(&settings)))),
    )
}
