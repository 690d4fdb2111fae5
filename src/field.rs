use std::mem;
use crate::config::SimulationConfig;

/// Two fields of the same shape used for ping-pong passes
///
/// A pass samples `read` and renders into `write`; `swap` then makes the
/// result current. Swapping exchanges the handles, no data is copied.
#[derive(Debug)]
pub struct DoubleField<T> {
    read: T,
    write: T,
}

impl<T> DoubleField<T> {
    pub fn new(read: T, write: T) -> DoubleField<T> {
        DoubleField { read, write }
    }

    pub fn read(&self) -> &T {
        &self.read
    }

    pub fn write(&self) -> &T {
        &self.write
    }

    /// Borrow the current state and the scratch target at once
    pub fn split(&mut self) -> (&T, &mut T) {
        (&self.read, &mut self.write)
    }

    pub fn swap(&mut self) {
        mem::swap(&mut self.read, &mut self.write);
    }

    /// Replace both sides, returning the old pair
    pub fn replace(&mut self, read: T, write: T) -> (T, T) {
        (mem::replace(&mut self.read, read), mem::replace(&mut self.write, write))
    }
}

/// Grid size for a base `resolution` on a canvas of `width` x `height`
///
/// The short side gets `resolution` cells and the long side is stretched by
/// the aspect ratio, so cells stay square.
pub fn grid_resolution(resolution: u32, width: u32, height: u32) -> (u32, u32) {
    let (width, height) = (width.max(1), height.max(1));
    let mut aspect = width as f32 / height as f32;
    if aspect < 1.0 {
        aspect = 1.0 / aspect;
    }

    let min = resolution.max(1);
    let max = (resolution as f32 * aspect).round().max(1.0) as u32;

    if width > height { (max, min) } else { (min, max) }
}

/// `floor(pixels * device_pixel_ratio)`
pub fn scale_by_pixel_ratio(pixels: f64, device_pixel_ratio: f64) -> u32 {
    (pixels * device_pixel_ratio).floor().max(0.0) as u32
}

/// Sizes of everything a backend allocates for one canvas size
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    pub canvas: (u32, u32),
    pub sim: (u32, u32),
    pub dye: (u32, u32),
}

impl FieldLayout {
    pub fn new(config: &SimulationConfig, canvas: (u32, u32)) -> FieldLayout {
        FieldLayout {
            canvas,
            sim: grid_resolution(config.sim_resolution, canvas.0, canvas.1),
            dye: grid_resolution(config.dye_resolution, canvas.0, canvas.1),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        crate::pointer::aspect_ratio(self.canvas)
    }
}

pub fn texel_size((width, height): (u32, u32)) -> [f32; 2] {
    [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_twice_is_identity() {
        let mut field = DoubleField::new("a", "b");
        field.swap();
        assert_eq!((*field.read(), *field.write()), ("b", "a"));
        field.swap();
        assert_eq!((*field.read(), *field.write()), ("a", "b"));
    }

    #[test]
    fn split_writes_into_scratch() {
        let mut field = DoubleField::new(vec![1.0_f32], vec![0.0_f32]);
        let (read, write) = field.split();
        write[0] = read[0] * 2.0;
        field.swap();
        assert_eq!(field.read(), &vec![2.0]);
    }

    #[test]
    fn long_side_tracks_long_canvas_side() {
        assert_eq!(grid_resolution(128, 800, 600), (171, 128));
        assert_eq!(grid_resolution(128, 600, 800), (128, 171));
        assert_eq!(grid_resolution(128, 500, 500), (128, 128));
    }

    #[test]
    fn same_aspect_same_grid() {
        assert_eq!(grid_resolution(128, 800, 600), grid_resolution(128, 1600, 1200));
    }

    #[test]
    fn degenerate_canvas_still_allocates() {
        let (width, height) = grid_resolution(64, 0, 0);
        assert!(width >= 1 && height >= 1);
    }

    #[test]
    fn pixel_ratio_scaling_floors() {
        assert_eq!(scale_by_pixel_ratio(100.0, 1.5), 150);
        assert_eq!(scale_by_pixel_ratio(101.0, 1.25), 126);
    }

    #[test]
    fn layout_uses_both_resolutions() {
        let config = SimulationConfig { sim_resolution: 32, dye_resolution: 256, ..Default::default() };
        let layout = FieldLayout::new(&config, (1000, 500));
        assert_eq!(layout.sim, (64, 32));
        assert_eq!(layout.dye, (512, 256));
        assert!((layout.aspect_ratio() - 2.0).abs() < 1e-6);
    }
}
