//! Colour maps for scalar fields

/// Scalar to colour mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    #[default]
    Jet,
    Viridis,
    Gray,
}

// Sampled from matplotlib's viridis at t = 0, 1/8, ..., 1
const VIRIDIS: [[f32; 3]; 9] = [
    [0.267, 0.005, 0.329],
    [0.283, 0.141, 0.458],
    [0.254, 0.265, 0.530],
    [0.207, 0.372, 0.553],
    [0.164, 0.471, 0.558],
    [0.128, 0.567, 0.551],
    [0.135, 0.659, 0.518],
    [0.267, 0.749, 0.441],
    [0.993, 0.906, 0.144],
];

impl Colormap {
    /// Colour of `t`, clamped to `[0, 1]`. NaN maps to the low end.
    pub fn map(&self, t: f32) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let rgb = match self {
            Colormap::Jet => {
                let channel = |offset: f32| (1.5 - (4.0 * t - offset).abs()).clamp(0.0, 1.0);
                [channel(3.0), channel(2.0), channel(1.0)]
            }
            Colormap::Viridis => {
                let scaled = t * (VIRIDIS.len() - 1) as f32;
                let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
                let frac = scaled - lo as f32;
                let (a, b) = (VIRIDIS[lo], VIRIDIS[lo + 1]);
                [
                    a[0] + (b[0] - a[0]) * frac,
                    a[1] + (b[1] - a[1]) * frac,
                    a[2] + (b[2] - a[2]) * frac,
                ]
            }
            Colormap::Gray => [t, t, t],
        };
        rgb.map(|c| (c * 255.0).round() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(Colormap::Jet.map(0.0), [0, 0, 128]);
        assert_eq!(Colormap::Jet.map(0.5), [128, 255, 128]);
        assert_eq!(Colormap::Jet.map(1.0), [128, 0, 0]);
    }

    #[test]
    fn test_viridis_endpoints() {
        assert_eq!(Colormap::Viridis.map(0.0), [68, 1, 84]);
        assert_eq!(Colormap::Viridis.map(1.0), [253, 231, 37]);
    }

    #[test]
    fn test_clamping_and_nan() {
        assert_eq!(Colormap::Gray.map(-2.0), [0, 0, 0]);
        assert_eq!(Colormap::Gray.map(3.0), [255, 255, 255]);
        assert_eq!(Colormap::Gray.map(f32::NAN), [0, 0, 0]);
    }
}
