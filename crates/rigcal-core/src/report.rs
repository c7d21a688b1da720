//! Per-view health shading and metric formatting for tabular reports.
//!
//! Everything here is read-only over [`ViewStats`]; no rendering toolkit is
//! involved. A front-end picks a [`Metric`], formats each cell with
//! [`Metric::format`] and shades it with [`view_health`].

use serde::{Deserialize, Serialize};

use crate::stats::ViewStats;
use crate::Real;

/// Colour in hue/saturation/luminance, all components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: Real,
    pub s: Real,
    pub l: Real,
}

impl Hsl {
    pub const GREEN: Hsl = Hsl {
        h: 1.0 / 3.0,
        s: 1.0,
        l: 0.5,
    };
    pub const RED: Hsl = Hsl {
        h: 0.0,
        s: 1.0,
        l: 0.5,
    };

    /// Component-wise linear interpolation, `t = 0` gives `self`.
    pub fn lerp(&self, other: &Hsl, t: Real) -> Hsl {
        let mix = |a: Real, b: Real| b * t + a * (1.0 - t);
        Hsl {
            h: mix(self.h, other.h),
            s: mix(self.s, other.s),
            l: mix(self.l, other.l),
        }
    }

    pub fn with_luminance(self, l: Real) -> Hsl {
        Hsl { l, ..self }
    }

    /// RGB triple in `[0, 1]`.
    pub fn to_rgb(&self) -> [Real; 3] {
        let (h, s, l) = (self.h.rem_euclid(1.0), self.s, self.l);
        if s == 0.0 {
            return [l; 3];
        }
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        [
            hue_channel(p, q, h + 1.0 / 3.0),
            hue_channel(p, q, h),
            hue_channel(p, q, h - 1.0 / 3.0),
        ]
    }

    /// RGB triple scaled to bytes.
    pub fn to_rgb8(&self) -> [u8; 3] {
        self.to_rgb().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

fn hue_channel(p: Real, q: Real, t: Real) -> Real {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// Shading configuration for [`view_health`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPalette {
    pub inliers: Hsl,
    pub outliers: Hsl,
    /// Outlier rate at which the hue saturates is `1 / outlier_gain`.
    pub outlier_gain: Real,
    /// Luminance never drops below this, so fully detected views stay readable.
    pub min_luminance: Real,
}

impl Default for HealthPalette {
    fn default() -> Self {
        Self {
            inliers: Hsl::GREEN,
            outliers: Hsl::RED,
            outlier_gain: 5.0,
            min_luminance: 0.7,
        }
    }
}

fn detection_luminance(rate: Real, palette: &HealthPalette) -> Real {
    (1.0 - rate.min(1.0)).max(palette.min_luminance)
}

/// Cell colour for one view: hue by outlier rate, luminance by detection rate.
pub fn view_health(stats: &ViewStats, num_points: usize, palette: &HealthPalette) -> Hsl {
    let detection_rate = stats.detected as Real / num_points.max(1) as Real;
    let outlier_rate = stats.outliers as Real / stats.detected.max(1) as Real;
    let t = (outlier_rate * palette.outlier_gain).min(1.0);

    palette
        .inliers
        .lerp(&palette.outliers, t)
        .with_luminance(detection_luminance(detection_rate, palette))
}

/// Cell colour for a raw detection count relative to `reference`
/// (typically the upper quartile of all view counts).
pub fn detection_health(count: usize, reference: Real, palette: &HealthPalette) -> Hsl {
    let rate = if reference > 0.0 {
        count as Real / reference
    } else {
        1.0
    };
    palette
        .inliers
        .with_luminance(detection_luminance(rate, palette))
}

/// Selectable per-view metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Detected,
    Median,
    UpperQ,
    Max,
    Rms,
    Mse,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Detected,
        Metric::Median,
        Metric::UpperQ,
        Metric::Max,
        Metric::Rms,
        Metric::Mse,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Detected => "Detected (Outliers)",
            Metric::Median => "Median",
            Metric::UpperQ => "Upper quartile",
            Metric::Max => "Maximum",
            Metric::Rms => "Root Mean Square",
            Metric::Mse => "Mean Square Error",
        }
    }

    /// Float value of the metric, `None` for [`Metric::Detected`].
    pub fn value(&self, stats: &ViewStats) -> Option<Real> {
        match self {
            Metric::Detected => None,
            Metric::Median => Some(stats.median),
            Metric::UpperQ => Some(stats.upper_q),
            Metric::Max => Some(stats.max),
            Metric::Rms => Some(stats.rms),
            Metric::Mse => Some(stats.mse),
        }
    }

    /// Cell text; float metrics of an empty view render as `-`.
    pub fn format(&self, stats: &ViewStats) -> String {
        match self.value(stats) {
            None => format!("{} ({})", stats.detected, stats.outliers),
            Some(_) if !stats.has_data() => "-".to_string(),
            Some(v) => format!("{v:.2}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::NO_DATA;

    fn stats(detected: usize, outliers: usize) -> ViewStats {
        let v = if detected == 0 { NO_DATA } else { 0.5 };
        ViewStats {
            detected,
            outliers,
            mse: v * v,
            rms: v,
            min: v,
            lower_q: v,
            median: v,
            upper_q: v,
            max: v,
        }
    }

    fn close(a: [Real; 3], b: [Real; 3]) -> bool {
        a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn hsl_primaries() {
        assert!(close(Hsl::GREEN.to_rgb(), [0.0, 1.0, 0.0]));
        assert!(close(Hsl::RED.to_rgb(), [1.0, 0.0, 0.0]));
        let grey = Hsl { h: 0.3, s: 0.0, l: 0.25 };
        assert!(close(grey.to_rgb(), [0.25; 3]));
        assert_eq!(Hsl::GREEN.with_luminance(1.0).to_rgb8(), [255, 255, 255]);
    }

    #[test]
    fn fully_detected_clean_view_is_pale_green() {
        let palette = HealthPalette::default();
        let c = view_health(&stats(48, 0), 48, &palette);
        assert!((c.h - 1.0 / 3.0).abs() < 1e-12);
        assert!((c.l - 0.7).abs() < 1e-12);
    }

    #[test]
    fn outlier_rate_saturates_hue() {
        let palette = HealthPalette::default();
        // 20% outliers with gain 5 is fully red
        let c = view_health(&stats(10, 2), 10, &palette);
        assert!(c.h.abs() < 1e-12);
        // 10% outliers sits halfway
        let c = view_health(&stats(10, 1), 10, &palette);
        assert!((c.h - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn empty_view_is_white() {
        let c = view_health(&stats(0, 0), 48, &HealthPalette::default());
        assert!((c.l - 1.0).abs() < 1e-12);
        assert!(close(c.to_rgb(), [1.0; 3]));
    }

    #[test]
    fn detection_health_uses_reference_count() {
        let palette = HealthPalette::default();
        assert!((detection_health(5, 20.0, &palette).l - 0.75).abs() < 1e-12);
        assert!((detection_health(40, 20.0, &palette).l - 0.7).abs() < 1e-12);
    }

    #[test]
    fn metric_formatting() {
        let full = stats(10, 3);
        assert_eq!(Metric::Detected.format(&full), "10 (3)");
        assert_eq!(Metric::Median.format(&full), "0.50");
        assert_eq!(Metric::Mse.format(&full), "0.25");
        assert_eq!(Metric::Rms.format(&stats(0, 0)), "-");
        assert_eq!(Metric::Detected.format(&stats(0, 0)), "0 (0)");
        assert_eq!(Metric::ALL.len(), 6);
        assert_eq!(Metric::UpperQ.label(), "Upper quartile");
    }

    #[test]
    fn palette_deserializes_with_defaults() {
        let palette: HealthPalette = serde_json::from_str(r#"{"outlier_gain": 2.0}"#).unwrap();
        assert_eq!(palette.outlier_gain, 2.0);
        assert_eq!(palette.min_luminance, 0.7);
        assert_eq!(palette.inliers, Hsl::GREEN);
    }
}
