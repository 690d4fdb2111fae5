use std::fmt;
use wasm_bindgen::JsValue;

/// Shader stage a [compile error](FluidError::Compile) originated from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Errors produced while setting up or driving the fluid simulation
#[derive(Clone, Debug, PartialEq)]
pub enum FluidError {
    /// The host cannot provide a WebGL 2 context
    Unsupported(String),
    /// A shader failed to compile; carries the driver's info log
    Compile { stage: ShaderStage, log: String },
    /// A program failed to link; carries the driver's info log
    Link(String),
    /// A GPU object could not be allocated
    Resource(&'static str),
    /// The supplied configuration is invalid
    Config(String),
    /// An exception thrown by the JS side
    Js(String),
}

impl fmt::Display for FluidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FluidError::Unsupported(reason) => write!(f, "Fluid simulation unsupported: {}", reason),
            FluidError::Compile { stage, log } => write!(f, "{:?} shader failed to compile: {}", stage, log),
            FluidError::Link(log) => write!(f, "Program failed to link: {}", log),
            FluidError::Resource(what) => write!(f, "Unable to create {}", what),
            FluidError::Config(reason) => write!(f, "Invalid configuration: {}", reason),
            FluidError::Js(message) => write!(f, "JS error: {}", message),
        }
    }
}

impl std::error::Error for FluidError {}

impl From<JsValue> for FluidError {
    fn from(value: JsValue) -> Self {
        FluidError::Js(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
    }
}

impl From<FluidError> for JsValue {
    fn from(error: FluidError) -> Self {
        JsValue::from_str(&error.to_string())
    }
}

impl From<serde_json::Error> for FluidError {
    fn from(error: serde_json::Error) -> Self {
        FluidError::Config(error.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for FluidError {
    fn from(error: serde_wasm_bindgen::Error) -> Self {
        FluidError::Config(error.to_string())
    }
}
