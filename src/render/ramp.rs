use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Background painted where a bin falls below the intensity threshold.
pub const BACKGROUND: (u8, u8, u8) = (20, 0, 40);

/// Named intensity-to-color policies. All ramps map a normalized intensity
/// `v` in `[0, 1]` to an HSL pair; `v == 0` always renders the fixed
/// background so silence reads as empty rather than a hot color.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ColorRamp {
    /// Red-through-yellow heat ramp: hue 60·(1−v)°, full saturation,
    /// lightness 30%+50%·v.
    #[default]
    Classic,
    /// Deep blue to cyan.
    Ice,
    /// Dark red to orange.
    Ember,
    /// Grayscale.
    Mono,
}

impl FromStr for ColorRamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "ice" => Ok(Self::Ice),
            "ember" => Ok(Self::Ember),
            "mono" | "monochrome" => Ok(Self::Mono),
            _ => Err(format!("Unknown color ramp: {}", s)),
        }
    }
}

impl ColorRamp {
    /// Color for one bin intensity, `v` in `[0, 1]`.
    pub fn color_for(&self, v: f32) -> (u8, u8, u8) {
        if v <= 0.0 {
            return BACKGROUND;
        }
        let v = v.min(1.0);

        let (h, s, l) = match self {
            ColorRamp::Classic => (60.0 - v * 60.0, 1.0, 0.3 + v * 0.5),
            ColorRamp::Ice => (220.0 - v * 40.0, 0.9, 0.2 + v * 0.55),
            ColorRamp::Ember => (v * 30.0, 0.95, 0.15 + v * 0.55),
            ColorRamp::Mono => (0.0, 0.0, v * 0.9),
        };

        let hsl = Hsl::new(h, s, l);
        let rgb: Srgb = hsl.into_color();
        (
            (rgb.red * 255.0) as u8,
            (rgb.green * 255.0) as u8,
            (rgb.blue * 255.0) as u8,
        )
    }

    pub fn all() -> &'static [ColorRamp] {
        &[
            ColorRamp::Classic,
            ColorRamp::Ice,
            ColorRamp::Ember,
            ColorRamp::Mono,
        ]
    }

    pub fn next(&self) -> Self {
        let all = Self::all();
        let current = all.iter().position(|c| c == self).unwrap_or(0);
        all[(current + 1) % all.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_intensity_renders_the_background() {
        for ramp in ColorRamp::all() {
            assert_eq!(ramp.color_for(0.0), BACKGROUND);
            assert_eq!(ramp.color_for(-1.0), BACKGROUND);
        }
    }

    #[test]
    fn classic_ramp_runs_red_at_full_intensity() {
        // hue 60*(1-1) = 0 (red), lightness 80%
        let (r, g, b) = ColorRamp::Classic.color_for(1.0);
        assert!(r > g && r > b);
        assert!(r > 200);
    }

    #[test]
    fn classic_ramp_runs_yellow_at_low_intensity() {
        // hue near 60 (yellow): red and green roughly equal, blue low
        let (r, g, b) = ColorRamp::Classic.color_for(0.05);
        assert!(r.abs_diff(g) < 30, "r={r} g={g}");
        assert!(b < r);
    }

    #[test]
    fn intensity_above_one_is_clamped() {
        assert_eq!(
            ColorRamp::Classic.color_for(2.0),
            ColorRamp::Classic.color_for(1.0)
        );
    }

    #[test]
    fn ramp_cycle_wraps_around() {
        let mut ramp = ColorRamp::Classic;
        for _ in 0..ColorRamp::all().len() {
            ramp = ramp.next();
        }
        assert_eq!(ramp, ColorRamp::Classic);
    }

    #[test]
    fn ramp_parses_from_str() {
        assert_eq!("classic".parse::<ColorRamp>().unwrap(), ColorRamp::Classic);
        assert_eq!("MONO".parse::<ColorRamp>().unwrap(), ColorRamp::Mono);
        assert!("plasma".parse::<ColorRamp>().is_err());
    }
}
