use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, LineStyle, Plot, PlotPoints, PlotUi, Polygon};

use crate::color::{self, band_fill};
use crate::state::{AppState, HistogramSource, LoadedCore, View};
use crate::summary::QuantileBand;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the active view in the central panel.
pub fn central_plot(ui: &mut Ui, state: &AppState) {
    if state.cores.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a core to view its proxies  (File → Open core…)");
        });
        return;
    }

    match state.view {
        View::AgeDepth => age_depth_plot(ui, state),
        View::Proxy => proxy_plot(ui, state),
        View::Histogram => histogram_plot(ui, state),
    }
}

// ---------------------------------------------------------------------------
// Band drawing
// ---------------------------------------------------------------------------

/// Split `(x, y)` into runs of consecutive finite points.
pub fn finite_runs(x: &[f64], y: &[f64]) -> Vec<Vec<[f64; 2]>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (&xi, &yi) in x.iter().zip(y) {
        if yi.is_finite() {
            current.push([xi, yi]);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn draw_series(plot_ui: &mut PlotUi, x: &[f64], y: &[f64], style: impl Fn(Line) -> Line) {
    for run in finite_runs(x, y) {
        plot_ui.line(style(Line::new(PlotPoints::from(run))));
    }
}

/// Quantile envelopes plus the median of one band.
///
/// Envelopes are filled one grid interval at a time: each quad is convex,
/// which the polygon fill requires.
fn draw_band(
    plot_ui: &mut PlotUi,
    band: &QuantileBand,
    name: &str,
    color: Color32,
    median_color: Color32,
    fill: bool,
) {
    let x = &band.grid;
    if fill {
        let n_env = band.levels.len() / 2;
        let fill_color = band_fill(color, n_env);
        for (lower, upper) in band.envelopes() {
            for j in 1..x.len() {
                let quad = [lower[j - 1], lower[j], upper[j], upper[j - 1]];
                if quad.iter().any(|v| !v.is_finite()) {
                    continue;
                }
                let points = vec![
                    [x[j - 1], lower[j - 1]],
                    [x[j], lower[j]],
                    [x[j], upper[j]],
                    [x[j - 1], upper[j - 1]],
                ];
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(points))
                        .fill_color(fill_color)
                        .stroke(Stroke::NONE),
                );
            }
        }
    } else {
        for i in 0..band.levels.len() {
            draw_series(plot_ui, x, band.values.row(i), |line| {
                line.color(color)
                    .width(0.5)
                    .style(LineStyle::dashed_dense())
            });
        }
    }

    draw_series(plot_ui, x, band.median(), |line| {
        line.color(median_color).width(1.5).name(name)
    });
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Age-depth bands of the first visible core, then each raw proxy against
/// depth underneath.
fn age_depth_plot(ui: &mut Ui, state: &AppState) {
    let Some((tag, core)) = state.visible_cores().next() else {
        ui.label("All cores are hidden.");
        return;
    };

    let n_proxies = core.run.proxy_table.proxy_names().len();
    let height = ui.available_height() / (n_proxies as f32 + 2.0);

    ui.strong(format!("{tag}: age-depth models ({} samples)", core.run.info.samples));
    Plot::new("age_depth_plot")
        .height(height * 2.0)
        .legend(Legend::default())
        .x_axis_label("Depth (cm)")
        .y_axis_label("Age (y BP)")
        .show(ui, |plot_ui| match &core.depth_band {
            Ok(band) => draw_band(plot_ui, band, "median age", color::BAND, color::MEDIAN, state.fill),
            Err(msg) => log::debug!("no age-depth band for {tag}: {msg}"),
        });

    let table = &core.run.proxy_table;
    for (p, name) in table.proxy_names().iter().enumerate() {
        let Some(values) = table.column(p + 1) else {
            continue;
        };
        Plot::new(("proxy_trace", p))
            .height(height)
            .x_axis_label("Depth (cm)")
            .y_axis_label(format!("Proxy ({name})"))
            .show(ui, |plot_ui| {
                draw_series(plot_ui, table.depth(), values, |line| line.color(color::BAND));
            });
    }
}

/// Selected proxy over age for every visible core.
fn proxy_plot(ui: &mut Ui, state: &AppState) {
    let Some(proxy) = state.selected_proxy.as_deref() else {
        ui.label("No proxy selected.");
        return;
    };
    let single = state.visible_cores().count() == 1;

    Plot::new("proxy_plot")
        .legend(Legend::default())
        .x_axis_label("Age (y BP)")
        .y_axis_label(format!("Proxy ({proxy})"))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (tag, core) in state.visible_cores() {
                let Some(Ok(band)) = core.proxy_bands.get(proxy) else {
                    continue;
                };
                let (band_color, median_color) = core_colors(state, tag, single);
                draw_band(plot_ui, band, tag, band_color, median_color, state.fill);
            }
        });
}

fn core_colors(state: &AppState, tag: &str, single: bool) -> (Color32, Color32) {
    if single {
        (color::BAND, color::MEDIAN)
    } else {
        let c = state.colors.color_for(tag);
        (c, c)
    }
}

/// Density histogram of the selected proxy, one bar series per visible core.
fn histogram_plot(ui: &mut Ui, state: &AppState) {
    let x_label = match (&state.histogram_source, state.selected_proxy.as_deref()) {
        (_, None) => {
            ui.label("No proxy selected.");
            return;
        }
        (HistogramSource::AtAge(i), Some(p)) => {
            format!("{p} at {}", age_label(state, *i))
        }
        (HistogramSource::Window(r), Some(p)) => format!(
            "{p}, accumulated {} – {}",
            age_label(state, r.start),
            age_label(state, r.end.saturating_sub(1))
        ),
        (HistogramSource::Change { from, to }, Some(p)) => format!(
            "Change in {p} from {} to {}",
            age_label(state, *from),
            age_label(state, *to)
        ),
    };

    Plot::new("histogram_plot")
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label("Density")
        .show(ui, |plot_ui| {
            for (tag, _) in state.visible_cores() {
                let Some(hist) = state.histogram(tag) else {
                    continue;
                };
                let width = hist.bin_width();
                let bars: Vec<Bar> = hist
                    .centers()
                    .into_iter()
                    .zip(hist.density())
                    .map(|(x, d)| Bar::new(x, d).width(width))
                    .collect();
                let c = state.colors.color_for(tag);
                plot_ui.bar_chart(BarChart::new(bars).color(c).name(tag));
            }
        });
}

/// Age at grid index `i` of the first visible core that has it.
pub fn age_label(state: &AppState, i: usize) -> String {
    state
        .visible_cores()
        .find_map(|(_, c): (&String, &LoadedCore)| c.run.result.age_grid.get(i).copied())
        .map(|a| format!("{a:.0} y BP"))
        .unwrap_or_else(|| format!("index {i}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_break_at_missing_points() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, f64::NAN, 2.0, 3.0, f64::NAN, f64::NAN];
        let runs = finite_runs(&x, &y);
        assert_eq!(runs, vec![vec![[0.0, 1.0]], vec![[2.0, 2.0], [3.0, 3.0]]]);
        assert!(finite_runs(&x, &[f64::NAN; 6]).is_empty());
    }
}
