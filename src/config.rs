use serde::{ Deserialize, Serialize };
use wasm_bindgen::JsValue;
use crate::backend::Capabilities;
use crate::color::Rgb;
use crate::error::FluidError;

/// Dye resolution used when float textures can't be linearly filtered
const LOW_PRECISION_DYE_RESOLUTION: u32 = 256;

/// Tunable parameters of the simulation
///
/// Field names serialize in `SCREAMING_SNAKE_CASE` so a host can hand over
/// `{ SPLAT_FORCE: 6000, SHADING: false }` and get defaults for the rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct SimulationConfig {
    /// Short-side cell count of the velocity, pressure, divergence and curl grids
    pub sim_resolution: u32,
    /// Short-side cell count of the dye grid
    pub dye_resolution: u32,
    /// Decay rate of the dye per second
    pub density_dissipation: f32,
    /// Decay rate of the velocity per second
    pub velocity_dissipation: f32,
    /// Pressure carried over between steps as the Jacobi initial guess
    pub pressure: f32,
    pub pressure_iterations: u32,
    /// Vorticity confinement strength
    pub curl: f32,
    pub splat_radius: f32,
    pub splat_force: f32,
    pub shading: bool,
    pub color_update_speed: f32,
    /// Background in 0..255 channel units, drawn when not `transparent`
    pub back_color: Rgb,
    pub transparent: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            sim_resolution: 128,
            dye_resolution: 1440,
            density_dissipation: 3.5,
            velocity_dissipation: 2.0,
            pressure: 0.1,
            pressure_iterations: 20,
            curl: 3.0,
            splat_radius: 0.2,
            splat_force: 6000.0,
            shading: true,
            color_update_speed: 10.0,
            back_color: Rgb::new(0.0, 0.0, 0.0),
            transparent: true,
        }
    }
}

impl SimulationConfig {
    /// Read a configuration object handed over from JS
    ///
    /// `undefined` and `null` yield the defaults.
    pub fn from_js(value: JsValue) -> Result<SimulationConfig, FluidError> {
        if value.is_undefined() || value.is_null() {
            return Ok(SimulationConfig::default());
        }

        if !value.is_object() || js_sys::Array::is_array(&value) {
            return Err(FluidError::Config("options must be an object".into()));
        }

        let config: SimulationConfig = serde_wasm_bindgen::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<SimulationConfig, FluidError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(FluidError::Config("options must be an object".into()));
        }

        let config: SimulationConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FluidError> {
        if self.sim_resolution == 0 || self.dye_resolution == 0 {
            return Err(FluidError::Config("resolutions must be positive".into()));
        }
        if self.pressure_iterations == 0 {
            return Err(FluidError::Config("PRESSURE_ITERATIONS must be positive".into()));
        }

        let non_negative = [
            ("DENSITY_DISSIPATION", self.density_dissipation),
            ("VELOCITY_DISSIPATION", self.velocity_dissipation),
            ("PRESSURE", self.pressure),
            ("CURL", self.curl),
            ("SPLAT_RADIUS", self.splat_radius),
            ("SPLAT_FORCE", self.splat_force),
            ("COLOR_UPDATE_SPEED", self.color_update_speed),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(FluidError::Config(format!("{} must be a non-negative number, got {}", name, value)));
            }
        }

        Ok(())
    }

    /// Downgrade the options the backend can't honour
    pub fn with_capabilities(mut self, capabilities: &Capabilities) -> SimulationConfig {
        if !capabilities.linear_filtering {
            self.dye_resolution = self.dye_resolution.min(LOW_PRECISION_DYE_RESOLUTION);
            self.shading = false;
        }
        if !capabilities.float_targets {
            self.shading = false;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SimulationConfig::from_json(r#"{ "SPLAT_FORCE": 3000, "SHADING": false }"#).unwrap();
        assert_eq!(config.splat_force, 3000.0);
        assert!(!config.shading);
        assert_eq!(config.sim_resolution, 128);
        assert_eq!(config.pressure_iterations, 20);
    }

    #[test]
    fn back_color_is_an_object() {
        let config = SimulationConfig::from_json(r#"{ "BACK_COLOR": { "r": 10, "g": 20, "b": 30 }, "TRANSPARENT": false }"#).unwrap();
        assert_eq!(config.back_color, Rgb::new(10.0, 20.0, 30.0));
        assert!(!config.transparent);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "SIM_RESOLUTION": 0 }"#),
            Err(FluidError::Config(_)),
        ));
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "CURL": -1.0 }"#),
            Err(FluidError::Config(_)),
        ));
        assert!(matches!(
            SimulationConfig::from_json(r#"{ "PRESSURE_ITERATIONS": 0 }"#),
            Err(FluidError::Config(_)),
        ));
    }

    #[test]
    fn only_objects_are_options() {
        for json in ["[1, 2]", "[]", "128", "\"SHADING\"", "null"] {
            assert!(matches!(
                SimulationConfig::from_json(json),
                Err(FluidError::Config(_)),
            ));
        }
    }

    #[test]
    fn serializes_with_option_names() {
        let json = serde_json::to_string(&SimulationConfig::default()).unwrap();
        assert!(json.contains("\"DENSITY_DISSIPATION\""));
        assert!(json.contains("\"PRESSURE_ITERATIONS\""));
    }

    #[test]
    fn missing_linear_filtering_lowers_dye_and_disables_shading() {
        let capabilities = Capabilities { linear_filtering: false, float_targets: true };
        let config = SimulationConfig::default().with_capabilities(&capabilities);
        assert_eq!(config.dye_resolution, 256);
        assert!(!config.shading);
    }

    #[test]
    fn missing_float_targets_disables_shading_only() {
        let capabilities = Capabilities { linear_filtering: true, float_targets: false };
        let config = SimulationConfig::default().with_capabilities(&capabilities);
        assert_eq!(config.dye_resolution, 1440);
        assert!(!config.shading);
    }

    #[test]
    fn full_capabilities_change_nothing() {
        let capabilities = Capabilities { linear_filtering: true, float_targets: true };
        let config = SimulationConfig::default().with_capabilities(&capabilities);
        assert_eq!(config, SimulationConfig::default());
    }
}
