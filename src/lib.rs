//! A fluid simulation cursor effect that is compiled using `wasm-pack` and runs in the browser
//!
//! [SplashCursor] wires a WebGL 2 canvas to a [Simulation]. The simulation
//! itself only talks to a [FluidBackend], so it also runs on the CPU through
//! [CpuFluid].

pub mod backend;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod field;
pub mod pointer;
pub mod renderer;
pub mod shader_program;
pub mod shaders;
pub mod solver;
pub mod textures;
mod web;

pub use crate::backend::{ Capabilities, FluidBackend, Splat };
pub use crate::color::Rgb;
pub use crate::config::SimulationConfig;
pub use crate::engine::{ EngineState, Simulation };
pub use crate::error::FluidError;
pub use crate::field::FieldLayout;
pub use crate::renderer::WebGlFluid;
pub use crate::solver::CpuFluid;
pub use crate::web::SplashCursor;
