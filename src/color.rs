use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Per-core colours
// ---------------------------------------------------------------------------

/// Median line colour when a single core is shown.
pub const MEDIAN: Color32 = Color32::from_rgb(220, 40, 40);

/// Band colour when a single core is shown.
pub const BAND: Color32 = Color32::from_rgb(40, 90, 220);

/// `n` distinct colours on evenly spaced hues, starting at blue.
pub fn distinct_colors(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| {
            let hue = (220.0 + (i as f32 / n as f32) * 360.0) % 360.0;
            let hsl = Hsl::new(hue, 0.70, 0.50);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Fill for one of `bands` nested envelopes; stacked envelopes add up to
/// half opacity at the centre.
pub fn band_fill(color: Color32, bands: usize) -> Color32 {
    let alpha = (0.5 / bands.max(1) as f32 * 255.0) as u8;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), alpha)
}

/// Core tag → colour, reassigned whenever the set of cores changes.
#[derive(Debug, Clone, Default)]
pub struct CoreColors {
    mapping: BTreeMap<String, Color32>,
}

impl CoreColors {
    pub fn new<'a>(tags: impl IntoIterator<Item = &'a String>) -> Self {
        let tags: Vec<&String> = tags.into_iter().collect();
        let mapping = tags
            .iter()
            .zip(distinct_colors(tags.len()))
            .map(|(t, c)| ((*t).clone(), c))
            .collect();
        CoreColors { mapping }
    }

    pub fn color_for(&self, tag: &str) -> Color32 {
        self.mapping.get(tag).copied().unwrap_or(Color32::GRAY)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}
