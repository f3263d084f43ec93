use std::path::Path;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::loader::CorePaths;
use crate::export;
use crate::state::{AppState, HistogramSource, View};

// ---------------------------------------------------------------------------
// Left side panel – cores and plot settings
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Cores");
    ui.separator();

    if state.cores.is_empty() {
        ui.label("No core loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            core_list(ui, state);
            ui.separator();

            // ---- View selector ----
            ui.strong("View");
            ui.horizontal(|ui: &mut Ui| {
                ui.selectable_value(&mut state.view, View::Proxy, "Proxy");
                ui.selectable_value(&mut state.view, View::AgeDepth, "Age-depth");
                ui.selectable_value(&mut state.view, View::Histogram, "Histogram");
            });
            ui.separator();

            // ---- Proxy selector ----
            ui.strong("Proxy");
            let current = state.selected_proxy.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("proxy")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for name in state.proxy_names() {
                        if ui.selectable_label(current == name, &name).clicked() {
                            state.selected_proxy = Some(name);
                        }
                    }
                });
            ui.separator();

            resampling_controls(ui, state);
            ui.separator();
            band_controls(ui, state);

            if state.view == View::Histogram {
                ui.separator();
                histogram_controls(ui, state);
            }
        });
}

/// One row per core: visibility checkbox in the core's colour, info on
/// hover, remove button.
fn core_list(ui: &mut Ui, state: &mut AppState) {
    let tags: Vec<String> = state.cores.keys().cloned().collect();
    for tag in tags {
        let (visible, info) = match state.cores.get(&tag) {
            Some(core) => (core.visible, core.run.info.to_string()),
            None => continue,
        };
        ui.horizontal(|ui: &mut Ui| {
            let mut checked = visible;
            let text = RichText::new(&tag).color(state.colors.color_for(&tag));
            if ui.checkbox(&mut checked, text).on_hover_text(info).changed() {
                state.toggle_visible(&tag);
            }
            if ui.small_button("✖").on_hover_text("Close core").clicked() {
                state.remove_core(&tag);
            }
        });
    }
}

fn resampling_controls(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Age step (y)");
    let mut y_by = state.resample.y_by;
    let response = ui.add(egui::DragValue::new(&mut y_by).speed(0.5).range(0.1..=10_000.0));
    let committed = response.drag_stopped() || response.lost_focus();
    if committed && y_by != state.resample.y_by {
        report(state, |s| s.set_y_by(y_by));
    }
}

fn band_controls(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Quantiles");
    let mut bands = state.bands.clone();
    let mut changed = false;
    let mut remove = None;

    for (i, q) in bands.levels.iter_mut().enumerate() {
        ui.horizontal(|ui: &mut Ui| {
            changed |= ui
                .add(egui::DragValue::new(q).speed(0.01).range(0.01..=0.49).fixed_decimals(2))
                .changed();
            ui.label(format!("– {:.2}", 1.0 - *q));
            if ui.small_button("−").clicked() {
                remove = Some(i);
            }
        });
    }
    if let Some(i) = remove {
        bands.levels.remove(i);
        changed = true;
    }
    if ui.small_button("+ level").clicked() {
        let next = bands.levels.iter().copied().fold(0.5_f64, f64::min) / 2.0;
        bands.levels.push(next.max(0.01));
        changed = true;
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.label("Min. samples");
        changed |= ui
            .add(egui::DragValue::new(&mut bands.min_sample_count).range(0..=100_000))
            .changed();
    });

    ui.checkbox(&mut state.fill, "Fill bands");

    if changed {
        report(state, move |s| s.set_band_config(bands));
    }
}

fn histogram_controls(ui: &mut Ui, state: &mut AppState) {
    let n = state.max_age_points();
    if n == 0 {
        ui.label("Empty age grid.");
        return;
    }
    let last = n - 1;

    ui.strong("Histogram");
    ui.horizontal(|ui: &mut Ui| {
        let source = &mut state.histogram_source;
        if ui
            .selectable_label(matches!(source, HistogramSource::AtAge(_)), "At age")
            .clicked()
        {
            *source = HistogramSource::AtAge(0);
        }
        if ui
            .selectable_label(matches!(source, HistogramSource::Window(_)), "Accumulated")
            .clicked()
        {
            *source = HistogramSource::Window(0..n.min(7));
        }
        if ui
            .selectable_label(matches!(source, HistogramSource::Change { .. }), "Change")
            .clicked()
        {
            *source = HistogramSource::Change { from: 0, to: last };
        }
    });

    match &mut state.histogram_source {
        HistogramSource::AtAge(i) => {
            ui.add(egui::Slider::new(i, 0..=last).text("age index"));
        }
        HistogramSource::Window(r) => {
            let (mut start, mut end) = (r.start, r.end.max(r.start + 1));
            ui.add(egui::Slider::new(&mut start, 0..=last).text("from"));
            ui.add(egui::Slider::new(&mut end, 1..=n).text("to (excl.)"));
            *r = start..end.max(start + 1);
        }
        HistogramSource::Change { from, to } => {
            ui.add(egui::Slider::new(from, 0..=last).text("from"));
            ui.add(egui::Slider::new(to, 0..=last).text("to"));
        }
    }
    ui.add(egui::Slider::new(&mut state.histogram_bins, 2..=100).text("bins"));
}

fn report(state: &mut AppState, f: impl FnOnce(&mut AppState) -> crate::error::Result<()>) {
    if let Err(e) = f(state) {
        log::error!("{e}");
        state.status_message = Some(format!("Error: {e}"));
    } else {
        state.status_message = None;
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open core…").clicked() {
                open_core_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(!state.cores.is_empty(), egui::Button::new("Export…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if !state.cores.is_empty() {
            ui.label(format!(
                "{} cores loaded, {} visible",
                state.cores.len(),
                state.visible_cores().count()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_core_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open core settings")
        .add_filter("Core settings", &["txt"])
        .pick_file();

    if let Some(path) = file {
        open_core(state, &path);
    }
}

/// Open the core whose `_settings.txt` is at `path`.
pub fn open_core(state: &mut AppState, path: &Path) {
    let Some(paths) = CorePaths::from_settings_file(path) else {
        state.status_message = Some(format!(
            "Error: {} is not a <core>_settings.txt file",
            path.display()
        ));
        return;
    };
    match state.open_core(&paths) {
        Ok(()) => log::info!("Opened core {}", paths.tag()),
        Err(e) => {
            log::error!("Failed to open core: {e}");
            state.status_message = Some(format!("Error: {e}"));
        }
    }
}

/// Write every core's result JSON and the band CSVs of each proxy into a
/// chosen folder.
pub fn export_dialog(state: &mut AppState) {
    let Some(dir) = rfd::FileDialog::new()
        .set_title("Export results to folder")
        .pick_folder()
    else {
        return;
    };

    let mut failures = Vec::new();
    for (tag, core) in &state.cores {
        if let Err(e) = export::write_result_json(&export::result_path(&dir, tag), &core.run.result) {
            failures.push(e.to_string());
        }
        for (proxy, band) in &core.proxy_bands {
            let Ok(band) = band else { continue };
            if let Err(e) = export::write_band_csv(&export::band_path(&dir, tag, proxy), band) {
                failures.push(e.to_string());
            }
        }
    }

    state.status_message = if failures.is_empty() {
        None
    } else {
        for f in &failures {
            log::error!("{f}");
        }
        Some(format!("Error: {} export(s) failed, first: {}", failures.len(), failures[0]))
    };
}
