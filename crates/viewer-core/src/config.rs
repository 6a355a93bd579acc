use serde::{Deserialize, Serialize};

/// Points per inch in PDF document space.
pub const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("dpi must be positive (got {0})")]
    InvalidDpi(f32),
    #[error("zoom range is invalid: min={min} max={max}")]
    InvalidZoomRange { min: f32, max: f32 },
    #[error("zoom step must be positive (got {0})")]
    InvalidZoomStep(f32),
    #[error("{field} must not be negative (got {value})")]
    NegativeLength { field: &'static str, value: i32 },
}

/// Tunables for the viewer. Every field falls back to its default when
/// missing from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Base rasterization resolution at 100% zoom.
    pub dpi: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_step: f32,
    /// Gap in pixels above, between and below pages.
    pub page_gap: i32,
    /// Horizontal and vertical slack subtracted from the viewport before
    /// computing fit-width and fit-page zoom.
    pub fit_margin: i32,
    /// Pixels of context left above a page after jumping to it.
    pub scroll_to_page_margin: i32,
    /// Selections narrower or shorter than this are ignored for text copy.
    pub min_selection_px: i32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dpi: 150.0,
            zoom_min: 0.2,
            zoom_max: 5.0,
            zoom_step: 0.1,
            page_gap: 10,
            fit_margin: 40,
            scroll_to_page_margin: 10,
            min_selection_px: 4,
        }
    }
}

impl ViewerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dpi > 0.0) {
            return Err(ConfigError::InvalidDpi(self.dpi));
        }

        if !(self.zoom_min > 0.0) || !(self.zoom_min <= self.zoom_max) {
            return Err(ConfigError::InvalidZoomRange { min: self.zoom_min, max: self.zoom_max });
        }

        if !(self.zoom_step > 0.0) {
            return Err(ConfigError::InvalidZoomStep(self.zoom_step));
        }

        for (field, value) in [
            ("page_gap", self.page_gap),
            ("fit_margin", self.fit_margin),
            ("scroll_to_page_margin", self.scroll_to_page_margin),
            ("min_selection_px", self.min_selection_px),
        ] {
            if value < 0 {
                return Err(ConfigError::NegativeLength { field, value });
            }
        }

        Ok(())
    }

    /// Pixels per point at 100% zoom.
    pub fn base_scale(&self) -> f32 {
        self.dpi / POINTS_PER_INCH
    }

    /// Pixels per point at the given zoom.
    pub fn render_scale(&self, zoom: f32) -> f32 {
        self.base_scale() * zoom
    }

    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.zoom_min, self.zoom_max)
    }
}
