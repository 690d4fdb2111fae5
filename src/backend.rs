use crate::color::Rgb;
use crate::config::SimulationConfig;
use crate::error::FluidError;
use crate::field::FieldLayout;

/// What a backend can do at full quality
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Float fields can be sampled with hardware bilinear filtering
    pub linear_filtering: bool,
    /// Fields are stored as half floats rather than 8 bit channels
    pub float_targets: bool,
}

/// A localized, gaussian impulse of velocity and dye
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Splat {
    /// Center in texture coordinates
    pub position: [f32; 2],
    /// Velocity added at the center
    pub force: [f32; 2],
    /// Dye added at the center
    pub color: Rgb,
    /// Squared falloff distance, already corrected for the aspect ratio
    pub radius: f32,
    /// Canvas width over height
    pub aspect_ratio: f32,
}

/// A place where the fluid fields live and get advanced
///
/// Every operation runs against the fields allocated by the last `resize`.
pub trait FluidBackend {
    fn capabilities(&self) -> Capabilities;

    /// Reallocate the fields for `layout`, carrying velocity and dye over
    ///
    /// Does nothing for fields whose size is unchanged.
    fn resize(&mut self, layout: &FieldLayout) -> Result<(), FluidError>;

    fn splat(&mut self, splat: &Splat) -> Result<(), FluidError>;

    /// Advance every field by `delta_time` seconds
    fn step(&mut self, delta_time: f32, config: &SimulationConfig) -> Result<(), FluidError>;

    /// Composite the dye into the render target
    fn render(&mut self, config: &SimulationConfig) -> Result<(), FluidError>;
}
