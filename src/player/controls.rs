//! Presentation state: visual filters, zoom, and the assorted toggles that
//! only affect how the element is shown.

use serde::Serialize;

pub const ZOOM_MIN: f64 = 1.0;
pub const ZOOM_MAX: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ZoomMode {
    Fit,         // Whole frame visible (default)
    Custom(f64), // Scale factor, 1.0 = natural size
}

impl ZoomMode {
    pub fn to_string(&self) -> String {
        match self {
            ZoomMode::Fit => "Fit".to_string(),
            ZoomMode::Custom(level) => format!("{:.0}%", level * 100.0),
        }
    }

    pub fn zoom_level(&self) -> f64 {
        match self {
            ZoomMode::Fit => 1.0,
            ZoomMode::Custom(level) => *level,
        }
    }

    fn from_level(level: f64) -> Self {
        let level = (level.clamp(ZOOM_MIN, ZOOM_MAX) * 10.0).round() / 10.0;
        if level <= ZOOM_MIN {
            ZoomMode::Fit
        } else {
            ZoomMode::Custom(level)
        }
    }

    pub fn zoom_in(self) -> Self {
        Self::from_level(self.zoom_level() + ZOOM_STEP)
    }

    pub fn zoom_out(self) -> Self {
        Self::from_level(self.zoom_level() - ZOOM_STEP)
    }

    pub fn clamped(self) -> Self {
        Self::from_level(self.zoom_level())
    }
}

impl Default for ZoomMode {
    fn default() -> Self {
        Self::Fit
    }
}

/// One slider on the filter panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterAdjustment {
    Brightness(f64),
    Contrast(f64),
    Saturation(f64),
    Hue(f64),
    Blur(f64),
}

/// CSS-style filters. Percentages for the first three, degrees for hue, pixels for blur.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisualFilters {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub hue: f64,
    pub blur: f64,
}

impl Default for VisualFilters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 0.0,
            blur: 0.0,
        }
    }
}

impl VisualFilters {
    pub fn apply(&mut self, adjustment: FilterAdjustment) {
        match adjustment {
            FilterAdjustment::Brightness(v) => self.brightness = v.clamp(0.0, 200.0),
            FilterAdjustment::Contrast(v) => self.contrast = v.clamp(0.0, 200.0),
            FilterAdjustment::Saturation(v) => self.saturation = v.clamp(0.0, 200.0),
            FilterAdjustment::Hue(v) => self.hue = v.clamp(0.0, 360.0),
            FilterAdjustment::Blur(v) => self.blur = v.clamp(0.0, 10.0),
        }
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Value for a CSS `filter` property
    pub fn css(&self) -> String {
        format!(
            "brightness({}%) contrast({}%) saturate({}%) hue-rotate({}deg) blur({}px)",
            self.brightness, self.contrast, self.saturation, self.hue, self.blur
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub filters: VisualFilters,
    pub zoom: ZoomMode,
    pub lights_off: bool,
    pub fullscreen: bool,
    pub picture_in_picture: bool,
    pub comments_enabled: bool,
    pub stats_visible: bool,
    pub audio_boost: f64,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            filters: VisualFilters::default(),
            zoom: ZoomMode::default(),
            lights_off: false,
            fullscreen: false,
            picture_in_picture: false,
            comments_enabled: false,
            stats_visible: false,
            audio_boost: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_clamp_and_reset() {
        let mut filters = VisualFilters::default();
        assert!(filters.is_neutral());

        filters.apply(FilterAdjustment::Brightness(250.0));
        filters.apply(FilterAdjustment::Blur(-3.0));
        filters.apply(FilterAdjustment::Hue(90.0));
        assert_eq!(filters.brightness, 200.0);
        assert_eq!(filters.blur, 0.0);
        assert_eq!(
            filters.css(),
            "brightness(200%) contrast(100%) saturate(100%) hue-rotate(90deg) blur(0px)"
        );

        filters.reset();
        assert!(filters.is_neutral());
    }

    #[test]
    fn test_zoom_steps_within_bounds() {
        let mut zoom = ZoomMode::Fit;
        zoom = zoom.zoom_out();
        assert_eq!(zoom, ZoomMode::Fit);

        zoom = zoom.zoom_in().zoom_in();
        assert_eq!(zoom, ZoomMode::Custom(1.2));
        assert_eq!(zoom.to_string(), "120%");

        for _ in 0..50 {
            zoom = zoom.zoom_in();
        }
        assert_eq!(zoom.zoom_level(), ZOOM_MAX);
        assert_eq!(ZoomMode::Custom(7.5).clamped(), ZoomMode::Custom(3.0));
        assert_eq!(ZoomMode::Custom(0.4).clamped(), ZoomMode::Fit);
    }
}
