//! CPU reference backend
//!
//! Every pass here computes exactly what the matching shader in
//! [`shaders`](crate::shaders) computes: neighbour fetches clamp to the edge
//! and arbitrary lookups are bilinear, like a `CLAMP_TO_EDGE` texture with
//! (manual) linear filtering. Fields are full precision, and channels a
//! one or two channel texture would drop stay zero.

use crate::backend::{ Capabilities, FluidBackend, Splat };
use crate::color::Rgb;
use crate::config::SimulationConfig;
use crate::error::FluidError;
use crate::field::{ DoubleField, FieldLayout };

/// Largest velocity component the vorticity pass lets through
const VELOCITY_LIMIT: f32 = 1000.0;

/// A 2D array of RGBA cells, origin in the bottom left
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<[f32; 4]>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Grid {
        let (width, height) = (width.max(1) as usize, height.max(1) as usize);
        Grid {
            width,
            height,
            cells: vec![[0.0; 4]; width * height],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    pub fn texel_size(&self) -> [f32; 2] {
        crate::field::texel_size(self.size())
    }

    pub fn get(&self, x: usize, y: usize) -> [f32; 4] {
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: [f32; 4]) {
        self.cells[y * self.width + x] = value;
    }

    pub fn cells(&self) -> &[[f32; 4]] {
        &self.cells
    }

    /// Texture coordinate of the center of cell `(x, y)`
    pub fn uv(&self, x: usize, y: usize) -> [f32; 2] {
        [
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        ]
    }

    /// Sum of the absolute values of every channel of every cell
    pub fn total_magnitude(&self) -> f32 {
        self.cells.iter()
            .flat_map(|cell| cell.iter())
            .map(|value| value.abs())
            .sum()
    }

    fn fetch(&self, x: isize, y: isize) -> [f32; 4] {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.get(x, y)
    }

    /// Bilinear lookup at texture coordinate `uv`
    pub fn sample(&self, uv: [f32; 2]) -> [f32; 4] {
        let s = uv[0] * self.width as f32 - 0.5;
        let t = uv[1] * self.height as f32 - 0.5;
        let (x0, y0) = (s.floor(), t.floor());
        let (fx, fy) = (s - x0, t - y0);
        let (x0, y0) = (x0 as isize, y0 as isize);

        let a = self.fetch(x0, y0);
        let b = self.fetch(x0 + 1, y0);
        let c = self.fetch(x0, y0 + 1);
        let d = self.fetch(x0 + 1, y0 + 1);

        let mut result = [0.0; 4];
        for i in 0..4 {
            let bottom = a[i] + (b[i] - a[i]) * fx;
            let top = c[i] + (d[i] - c[i]) * fx;
            result[i] = bottom + (top - bottom) * fy;
        }
        result
    }

    /// A grid of a new size holding a bilinear resampling of this one
    pub fn resampled(&self, width: u32, height: u32) -> Grid {
        let mut grid = Grid::new(width, height);
        grid.fill(|grid, x, y| self.sample(grid.uv(x, y)));
        grid
    }

    fn fill<F>(&mut self, mut value: F)
    where
        F: FnMut(&Grid, usize, usize) -> [f32; 4],
    {
        let mut cells = std::mem::take(&mut self.cells);
        let shape = Grid { width: self.width, height: self.height, cells: Vec::new() };
        for y in 0..self.height {
            for x in 0..self.width {
                cells[y * self.width + x] = value(&shape, x, y);
            }
        }
        self.cells = cells;
    }

    fn neighbours(&self, x: usize, y: usize) -> [[f32; 4]; 4] {
        let (x, y) = (x as isize, y as isize);
        [
            self.fetch(x - 1, y),
            self.fetch(x + 1, y),
            self.fetch(x, y - 1),
            self.fetch(x, y + 1),
        ]
    }
}

/// `0.5 * ((right.y - left.y) - (top.x - bottom.x))` into the first channel
pub fn curl(velocity: &Grid, out: &mut Grid) {
    out.fill(|_, x, y| {
        let [l, r, b, t] = velocity.neighbours(x, y);
        [0.5 * ((r[1] - l[1]) - (t[0] - b[0])), 0.0, 0.0, 0.0]
    });
}

/// Push velocity along the normalized gradient of `|curl|`
pub fn vorticity(velocity: &Grid, curl: &Grid, strength: f32, delta_time: f32, out: &mut Grid) {
    out.fill(|_, x, y| {
        let [l, r, b, t] = curl.neighbours(x, y);
        let c = curl.get(x, y)[0];

        let mut force = [
            0.5 * (t[0].abs() - b[0].abs()),
            0.5 * (r[0].abs() - l[0].abs()),
        ];
        let length = (force[0] * force[0] + force[1] * force[1]).sqrt() + 0.0001;
        force[0] *= strength * c / length;
        force[1] *= -strength * c / length;

        let v = velocity.get(x, y);
        [
            (v[0] + force[0] * delta_time).clamp(-VELOCITY_LIMIT, VELOCITY_LIMIT),
            (v[1] + force[1] * delta_time).clamp(-VELOCITY_LIMIT, VELOCITY_LIMIT),
            0.0,
            0.0,
        ]
    });
}

/// Central difference divergence; a missing neighbour mirrors the
/// velocity of the boundary cell so nothing flows through the walls
pub fn divergence(velocity: &Grid, out: &mut Grid) {
    let (width, height) = (velocity.width, velocity.height);
    out.fill(|_, x, y| {
        let [l, r, b, t] = velocity.neighbours(x, y);
        let c = velocity.get(x, y);

        let x_l = if x == 0 { -c[0] } else { l[0] };
        let x_r = if x + 1 >= width { -c[0] } else { r[0] };
        let x_b = if y == 0 { -c[1] } else { b[1] };
        let x_t = if y + 1 >= height { -c[1] } else { t[1] };

        [0.5 * (x_r - x_l + x_t - x_b), 0.0, 0.0, 0.0]
    });
}

/// `source * factor`
pub fn scale(source: &Grid, factor: f32, out: &mut Grid) {
    out.fill(|_, x, y| source.get(x, y).map(|value| value * factor));
}

/// One Jacobi relaxation of the pressure Poisson equation
pub fn jacobi(pressure: &Grid, divergence: &Grid, out: &mut Grid) {
    out.fill(|_, x, y| {
        let [l, r, b, t] = pressure.neighbours(x, y);
        let d = divergence.get(x, y)[0];
        [(l[0] + r[0] + b[0] + t[0] - d) * 0.25, 0.0, 0.0, 0.0]
    });
}

pub fn subtract_gradient(pressure: &Grid, velocity: &Grid, out: &mut Grid) {
    out.fill(|_, x, y| {
        let [l, r, b, t] = pressure.neighbours(x, y);
        let v = velocity.get(x, y);
        [v[0] - (r[0] - l[0]), v[1] - (t[0] - b[0]), 0.0, 0.0]
    });
}

/// Semi-Lagrangian advection of `source` through `velocity`
///
/// `out` must have the shape of `source`. The backtrace is measured in
/// velocity cells, so `velocity_texel_size` scales it into texture space.
pub fn advect(
    velocity: &Grid,
    source: &Grid,
    velocity_texel_size: [f32; 2],
    delta_time: f32,
    dissipation: f32,
    out: &mut Grid,
) {
    let decay = 1.0 + dissipation * delta_time;
    out.fill(|grid, x, y| {
        let uv = grid.uv(x, y);
        let v = velocity.sample(uv);
        let position = [
            uv[0] - delta_time * v[0] * velocity_texel_size[0],
            uv[1] - delta_time * v[1] * velocity_texel_size[1],
        ];
        source.sample(position).map(|value| value / decay)
    });
}

/// Add a gaussian blob of `color` centered on `point`
pub fn splat(target: &Grid, point: [f32; 2], aspect_ratio: f32, radius: f32, color: [f32; 3], out: &mut Grid) {
    out.fill(|grid, x, y| {
        let uv = grid.uv(x, y);
        let dx = (uv[0] - point[0]) * aspect_ratio;
        let dy = uv[1] - point[1];
        let falloff = (-(dx * dx + dy * dy) / radius).exp();

        let base = target.get(x, y);
        [
            base[0] + falloff * color[0],
            base[1] + falloff * color[1],
            base[2] + falloff * color[2],
            base[3],
        ]
    });
}

/// Shade the dye at `uv` and derive its alpha from the brightest channel
pub fn display(dye: &Grid, uv: [f32; 2], texel_size: [f32; 2], shading: bool) -> [f32; 4] {
    let c = dye.sample(uv);
    let mut color = [c[0], c[1], c[2]];

    if shading {
        let length = |v: [f32; 4]| (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
        let l = dye.sample([uv[0] - texel_size[0], uv[1]]);
        let r = dye.sample([uv[0] + texel_size[0], uv[1]]);
        let b = dye.sample([uv[0], uv[1] - texel_size[1]]);
        let t = dye.sample([uv[0], uv[1] + texel_size[1]]);

        let dx = length(r) - length(l);
        let dy = length(t) - length(b);
        let dz = (texel_size[0] * texel_size[0] + texel_size[1] * texel_size[1]).sqrt();
        let normal_z = dz / (dx * dx + dy * dy + dz * dz).sqrt();
        let diffuse = (normal_z + 0.7).clamp(0.7, 1.0);
        color = color.map(|channel| channel * diffuse);
    }

    let alpha = color[0].max(color[1]).max(color[2]);
    [color[0], color[1], color[2], alpha]
}

/// Blend a premultiplied `source` over `destination` with `ONE, ONE_MINUS_SRC_ALPHA`
fn blend(source: [f32; 4], destination: [f32; 4]) -> [f32; 4] {
    let source = source.map(|value| value.clamp(0.0, 1.0));
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = (source[i] + destination[i] * (1.0 - source[3])).clamp(0.0, 1.0);
    }
    out
}

/// Fluid fields in host memory, rendered into an RGBA8 pixel buffer
///
/// Rows of [pixels](CpuFluid::pixels) run top to bottom like a canvas.
pub struct CpuFluid {
    velocity: DoubleField<Grid>,
    dye: DoubleField<Grid>,
    pressure: DoubleField<Grid>,
    divergence: Grid,
    curl: Grid,
    canvas: (u32, u32),
    pixels: Vec<u8>,
}

impl CpuFluid {
    pub fn new(layout: &FieldLayout) -> CpuFluid {
        let (sim_width, sim_height) = layout.sim;
        let (dye_width, dye_height) = layout.dye;
        let (width, height) = layout.canvas;

        CpuFluid {
            velocity: DoubleField::new(Grid::new(sim_width, sim_height), Grid::new(sim_width, sim_height)),
            dye: DoubleField::new(Grid::new(dye_width, dye_height), Grid::new(dye_width, dye_height)),
            pressure: DoubleField::new(Grid::new(sim_width, sim_height), Grid::new(sim_width, sim_height)),
            divergence: Grid::new(sim_width, sim_height),
            curl: Grid::new(sim_width, sim_height),
            canvas: layout.canvas,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn velocity(&self) -> &Grid {
        self.velocity.read()
    }

    pub fn dye(&self) -> &Grid {
        self.dye.read()
    }

    pub fn pressure(&self) -> &Grid {
        self.pressure.read()
    }

    pub fn divergence(&self) -> &Grid {
        &self.divergence
    }

    pub fn curl(&self) -> &Grid {
        &self.curl
    }

    /// The last rendered frame, `canvas` sized RGBA8
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas
    }

    fn resize_double(field: &mut DoubleField<Grid>, size: (u32, u32), keep: bool) {
        if field.read().size() == size {
            return;
        }

        let read = if keep {
            field.read().resampled(size.0, size.1)
        } else {
            Grid::new(size.0, size.1)
        };
        field.replace(read, Grid::new(size.0, size.1));
    }
}

impl FluidBackend for CpuFluid {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            linear_filtering: true,
            float_targets: true,
        }
    }

    fn resize(&mut self, layout: &FieldLayout) -> Result<(), FluidError> {
        if layout.sim != self.velocity.read().size() {
            log::debug!("Reallocating simulation fields at {:?}", layout.sim);
            CpuFluid::resize_double(&mut self.velocity, layout.sim, true);
            CpuFluid::resize_double(&mut self.pressure, layout.sim, false);
            self.divergence = Grid::new(layout.sim.0, layout.sim.1);
            self.curl = Grid::new(layout.sim.0, layout.sim.1);
        }

        if layout.dye != self.dye.read().size() {
            log::debug!("Reallocating dye field at {:?}", layout.dye);
            CpuFluid::resize_double(&mut self.dye, layout.dye, true);
        }

        if layout.canvas != self.canvas {
            self.canvas = layout.canvas;
            self.pixels = vec![0; layout.canvas.0 as usize * layout.canvas.1 as usize * 4];
        }

        Ok(())
    }

    fn splat(&mut self, s: &Splat) -> Result<(), FluidError> {
        // APPLY FORCE
        let (read, write) = self.velocity.split();
        splat(read, s.position, s.aspect_ratio, s.radius, [s.force[0], s.force[1], 0.0], write);
        self.velocity.swap();

        // APPLY COLOR
        let (read, write) = self.dye.split();
        splat(read, s.position, s.aspect_ratio, s.radius, s.color.to_array(), write);
        self.dye.swap();

        Ok(())
    }

    fn step(&mut self, delta_time: f32, config: &SimulationConfig) -> Result<(), FluidError> {
        // CURL
        curl(self.velocity.read(), &mut self.curl);

        // VORTICITY CONFINEMENT
        let (read, write) = self.velocity.split();
        vorticity(read, &self.curl, config.curl, delta_time, write);
        self.velocity.swap();

        // DIVERGENCE
        divergence(self.velocity.read(), &mut self.divergence);

        // PRESSURE
        let (read, write) = self.pressure.split();
        scale(read, 0.25 * config.pressure, write);
        self.pressure.swap();

        for _ in 0..config.pressure_iterations {
            let (read, write) = self.pressure.split();
            jacobi(read, &self.divergence, write);
            self.pressure.swap();
        }

        // GRADIENT SUBTRACTION
        let (read, write) = self.velocity.split();
        subtract_gradient(self.pressure.read(), read, write);
        self.velocity.swap();

        // ADVECTION
        let texel_size = self.velocity.read().texel_size();
        let (read, write) = self.velocity.split();
        advect(read, read, texel_size, delta_time, config.velocity_dissipation, write);
        self.velocity.swap();

        let (read, write) = self.dye.split();
        advect(self.velocity.read(), read, texel_size, delta_time, config.density_dissipation, write);
        self.dye.swap();

        Ok(())
    }

    fn render(&mut self, config: &SimulationConfig) -> Result<(), FluidError> {
        let (width, height) = (self.canvas.0 as usize, self.canvas.1 as usize);
        let texel_size = crate::field::texel_size(self.canvas);
        let background = if config.transparent {
            [0.0; 4]
        } else {
            let Rgb { r, g, b } = config.back_color.normalized();
            [r, g, b, 1.0]
        };

        let dye = self.dye.read();
        for row in 0..height {
            // canvas rows run top down, texture rows bottom up
            let v = 1.0 - (row as f32 + 0.5) / height as f32;
            for column in 0..width {
                let uv = [(column as f32 + 0.5) / width as f32, v];
                let color = blend(display(dye, uv, texel_size, config.shading), background);

                let offset = (row * width + column) * 4;
                for (i, channel) in color.iter().enumerate() {
                    self.pixels[offset + i] = (channel * 255.0).round() as u8;
                }
            }
        }

        Ok(())
    }
}
