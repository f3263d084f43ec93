use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ProxyViewerApp {
    pub state: AppState,
}

impl ProxyViewerApp {
    /// Start with the given cores already open; `settings` are paths to
    /// `<core>_settings.txt` files.
    pub fn with_cores(settings: &[std::path::PathBuf]) -> Self {
        let mut app = Self::default();
        for path in settings {
            panels::open_core(&mut app.state, path);
        }
        app
    }
}

impl eframe::App for ProxyViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: cores and settings ----
        egui::SidePanel::left("core_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::central_plot(ui, &self.state);
        });
    }
}
