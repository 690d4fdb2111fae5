use rand::Rng;
use serde::{ Deserialize, Serialize };

/// Dye intensity of freshly generated pointer colors
const COLOR_INTENSITY: f32 = 0.15;

/// A linear RGB triple
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Rgb {
        Rgb { r, g, b }
    }

    pub fn scaled(self, factor: f32) -> Rgb {
        Rgb::new(self.r * factor, self.g * factor, self.b * factor)
    }

    /// Map channels given in 0..255 units into 0..1
    pub fn normalized(self) -> Rgb {
        self.scaled(1.0 / 255.0)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Convert a hue/saturation/value triple, each in [0, 1], into RGB
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    match (i as i32).rem_euclid(6) {
        0 => Rgb::new(v, t, p),
        1 => Rgb::new(q, v, p),
        2 => Rgb::new(p, v, t),
        3 => Rgb::new(p, q, v),
        4 => Rgb::new(t, p, v),
        _ => Rgb::new(v, p, q),
    }
}

/// A random fully saturated hue at pointer dye intensity
pub fn generate_color<R: Rng>(rng: &mut R) -> Rgb {
    hsv_to_rgb(rng.gen::<f32>(), 1.0, 1.0).scaled(COLOR_INTENSITY)
}

/// Wrap `value` into `[min, max)`
pub fn wrap(value: f32, min: f32, max: f32) -> f32 {
    let range = max - min;
    if range == 0.0 {
        return min;
    }
    (value - min).rem_euclid(range) + min
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{ rngs::SmallRng, SeedableRng };

    #[test]
    fn primary_hues() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Rgb::new(1.0, 0.0, 0.0));
        let green = hsv_to_rgb(1.0 / 3.0, 1.0, 1.0);
        assert!(green.g > 0.99 && green.r < 0.01 && green.b < 0.01);
        let blue = hsv_to_rgb(2.0 / 3.0, 1.0, 1.0);
        assert!(blue.b > 0.99 && blue.r < 0.01 && blue.g < 0.01);
    }

    #[test]
    fn zero_saturation_is_grey() {
        let grey = hsv_to_rgb(0.42, 0.0, 0.5);
        assert_eq!(grey, Rgb::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn generated_colors_are_dim_and_saturated() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..64 {
            let color = generate_color(&mut rng);
            let max = color.r.max(color.g).max(color.b);
            let min = color.r.min(color.g).min(color.b);
            assert!((max - COLOR_INTENSITY).abs() < 1e-5);
            assert!(min.abs() < 1e-5);
        }
    }

    #[test]
    fn wrap_stays_in_range() {
        assert!((wrap(1.25, 0.0, 1.0) - 0.25).abs() < 1e-6);
        assert!((wrap(3.5, 0.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((wrap(-0.25, 0.0, 1.0) - 0.75).abs() < 1e-6);
        assert_eq!(wrap(5.0, 2.0, 2.0), 2.0);
    }

    #[test]
    fn back_color_normalization() {
        let color = Rgb::new(255.0, 127.5, 0.0).normalized();
        assert!((color.r - 1.0).abs() < 1e-6);
        assert!((color.g - 0.5).abs() < 1e-6);
        assert_eq!(color.b, 0.0);
    }
}
