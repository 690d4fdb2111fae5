use web_sys::WebGl2RenderingContext;
use crate::backend::{ Capabilities, FluidBackend, Splat };
use crate::config::SimulationConfig;
use crate::error::{ FluidError, ShaderStage };
use crate::field::{ DoubleField, FieldLayout };
use crate::shader_program::{ Material, ShaderProgram };
use crate::shaders;
use crate::textures::{ supports_render_format, Formats, TextureFramebuffer };

type GL = WebGl2RenderingContext;

struct Programs {
    copy: ShaderProgram,
    splat: ShaderProgram,
    advection: ShaderProgram,
    divergence: ShaderProgram,
    curl: ShaderProgram,
    vorticity: ShaderProgram,
    pressure: ShaderProgram,
    gradient_subtract: ShaderProgram,
}

impl Programs {
    fn new(gl: &GL, vertex_shader: &web_sys::WebGlShader, formats: &Formats) -> Result<Programs, FluidError> {
        let advection_keywords: &[&str] = if formats.linear_filtering {
            &[]
        } else {
            &[shaders::MANUAL_FILTERING]
        };

        Ok(Programs {
            copy: ShaderProgram::with_fragment(gl, vertex_shader, shaders::COPY_SHADER_SOURCE, &[])?,
            splat: ShaderProgram::with_fragment(gl, vertex_shader, shaders::SPLAT_SHADER_SOURCE, &[])?,
            advection: ShaderProgram::with_fragment(gl, vertex_shader, shaders::ADVECTION_SHADER_SOURCE, advection_keywords)?,
            divergence: ShaderProgram::with_fragment(gl, vertex_shader, shaders::DIVERGENCE_SHADER_SOURCE, &[])?,
            curl: ShaderProgram::with_fragment(gl, vertex_shader, shaders::CURL_SHADER_SOURCE, &[])?,
            vorticity: ShaderProgram::with_fragment(gl, vertex_shader, shaders::VORTICITY_SHADER_SOURCE, &[])?,
            pressure: ShaderProgram::with_fragment(gl, vertex_shader, shaders::PRESSURE_SHADER_SOURCE, &[])?,
            gradient_subtract: ShaderProgram::with_fragment(gl, vertex_shader, shaders::GRADIENT_SUBTRACT_SHADER_SOURCE, &[])?,
        })
    }
}

/// Fluid fields living in WebGL 2 textures, drawn onto the canvas
pub struct WebGlFluid {
    gl: GL,
    formats: Formats,
    programs: Programs,
    display: Material,
    display_error: Option<FluidError>,
    velocity: DoubleField<TextureFramebuffer>,
    dye: DoubleField<TextureFramebuffer>,
    pressure: DoubleField<TextureFramebuffer>,
    divergence: TextureFramebuffer,
    curl: TextureFramebuffer,
}

impl WebGlFluid {
    /// Set up programs and fields on `gl`
    ///
    /// Float render targets and float linear filtering are negotiated here;
    /// missing support narrows the formats instead of failing.
    pub fn new(gl: GL, layout: &FieldLayout) -> Result<WebGlFluid, FluidError> {
        let color_buffer_float = gl.get_extension("EXT_color_buffer_float")?.is_some();
        let float_linear = gl.get_extension("OES_texture_float_linear")?.is_some();
        gl.disable(GL::BLEND);

        let formats = Formats::negotiate(float_linear, |format| {
            (color_buffer_float || !format.is_float()) && supports_render_format(&gl, format)
        });
        if !formats.float_targets() {
            log::warn!("Float render targets unavailable, falling back to {:?}", formats.rgba);
        }
        if !formats.linear_filtering {
            log::warn!("Float linear filtering unavailable, filtering manually");
        }

        let vertex_shader = ShaderProgram::compile_shader(
            &gl,
            ShaderStage::Vertex,
            shaders::VERTEX_SHADER_SOURCE,
            &[],
        )?;
        let programs = Programs::new(&gl, &vertex_shader, &formats)?;
        let display = Material::new(vertex_shader, shaders::DISPLAY_SHADER_SOURCE);

        init_quad_buffers(&gl)?;

        let filter = formats.filter();
        let (width, height) = layout.sim;
        let velocity = DoubleField::create(&gl, width, height, &formats.rg, filter)?;
        let pressure = DoubleField::create(&gl, width, height, &formats.r, GL::NEAREST)?;
        let divergence = TextureFramebuffer::new(&gl, width, height, &formats.r, GL::NEAREST)?;
        let curl = TextureFramebuffer::new(&gl, width, height, &formats.r, GL::NEAREST)?;

        let (width, height) = layout.dye;
        let dye = DoubleField::create(&gl, width, height, &formats.rgba, filter)?;

        log::info!(
            "WebGL 2 fluid ready: simulation {:?}, dye {:?}, formats {:?}",
            layout.sim,
            layout.dye,
            formats,
        );

        Ok(WebGlFluid {
            gl,
            formats,
            programs,
            display,
            display_error: None,
            velocity,
            dye,
            pressure,
            divergence,
            curl,
        })
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }

    fn splat_field(
        gl: &GL,
        program: &ShaderProgram,
        field: &mut DoubleField<TextureFramebuffer>,
        splat: &Splat,
        color: [f32; 3],
    ) -> Result<(), FluidError> {
        program.bind(gl);
        gl.uniform1f(program.uniform(shaders::U_ASPECT_RATIO), splat.aspect_ratio);
        gl.uniform1f(program.uniform(shaders::U_RADIUS), splat.radius);
        gl.uniform2f(program.uniform(shaders::U_POINT), splat.position[0], splat.position[1]);
        gl.uniform3fv_with_f32_array(program.uniform(shaders::U_COLOR), &color);
        gl.uniform1i(program.uniform(shaders::U_TARGET), field.read().attach(gl, 0)?);

        blit(gl, Some(field.write()));
        field.swap();

        Ok(())
    }

    fn advect(
        &mut self,
        delta_time: f32,
        dissipation: f32,
        dye: bool,
    ) -> Result<(), FluidError> {
        let gl = &self.gl;
        let program = &self.programs.advection;
        program.bind(gl);

        let velocity = self.velocity.read();
        let source = if dye { &self.dye } else { &self.velocity };
        gl.uniform2fv_with_f32_array(program.uniform(shaders::U_TEXEL_SIZE), &velocity.texel_size());
        gl.uniform2fv_with_f32_array(program.uniform(shaders::U_SOURCE_TEXEL_SIZE), &source.read().texel_size());
        gl.uniform1f(program.uniform(shaders::U_DELTA_TIME), delta_time);
        gl.uniform1f(program.uniform(shaders::U_DISSIPATION), dissipation);
        gl.uniform1i(program.uniform(shaders::U_VELOCITY), velocity.attach(gl, 0)?);
        gl.uniform1i(program.uniform(shaders::U_SOURCE), source.read().attach(gl, 1)?);

        blit(gl, Some(source.write()));
        if dye {
            self.dye.swap();
        } else {
            self.velocity.swap();
        }

        Ok(())
    }
}

impl FluidBackend for WebGlFluid {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            linear_filtering: self.formats.linear_filtering,
            float_targets: self.formats.float_targets(),
        }
    }

    fn resize(&mut self, layout: &FieldLayout) -> Result<(), FluidError> {
        let gl = &self.gl;

        // SIMULATION
        let (width, height) = layout.sim;
        if (width, height) != self.velocity.size() {
            log::debug!("Reallocating simulation fields at {}x{}", width, height);
            self.velocity.resize(gl, Some(&self.programs.copy), width, height)?;

            self.pressure.delete(gl);
            self.pressure = DoubleField::create(gl, width, height, &self.formats.r, GL::NEAREST)?;
            self.divergence.delete(gl);
            self.divergence = TextureFramebuffer::new(gl, width, height, &self.formats.r, GL::NEAREST)?;
            self.curl.delete(gl);
            self.curl = TextureFramebuffer::new(gl, width, height, &self.formats.r, GL::NEAREST)?;
        }

        // DYE
        let (width, height) = layout.dye;
        if (width, height) != self.dye.size() {
            log::debug!("Reallocating dye field at {}x{}", width, height);
            self.dye.resize(gl, Some(&self.programs.copy), width, height)?;
        }

        Ok(())
    }

    fn splat(&mut self, splat: &Splat) -> Result<(), FluidError> {
        let gl = &self.gl;
        gl.disable(GL::BLEND);

        // APPLY FORCE
        WebGlFluid::splat_field(
            gl,
            &self.programs.splat,
            &mut self.velocity,
            splat,
            [splat.force[0], splat.force[1], 0.0],
        )?;

        // APPLY COLOR
        WebGlFluid::splat_field(
            gl,
            &self.programs.splat,
            &mut self.dye,
            splat,
            splat.color.to_array(),
        )
    }

    fn step(&mut self, delta_time: f32, config: &SimulationConfig) -> Result<(), FluidError> {
        let gl = &self.gl;
        gl.disable(GL::BLEND);
        let texel_size = self.velocity.read().texel_size();

        // CURL
        let program = &self.programs.curl;
        program.bind(gl);
        gl.uniform2fv_with_f32_array(program.uniform(shaders::U_TEXEL_SIZE), &texel_size);
        gl.uniform1i(program.uniform(shaders::U_VELOCITY), self.velocity.read().attach(gl, 0)?);
        blit(gl, Some(&self.curl));

        // VORTICITY CONFINEMENT
        let program = &self.programs.vorticity;
        program.bind(gl);
        gl.uniform2fv_with_f32_array(program.uniform(shaders::U_TEXEL_SIZE), &texel_size);
        gl.uniform1i(program.uniform(shaders::U_VELOCITY), self.velocity.read().attach(gl, 0)?);
        gl.uniform1i(program.uniform(shaders::U_CURL), self.curl.attach(gl, 1)?);
        gl.uniform1f(program.uniform(shaders::U_CURL_STRENGTH), config.curl);
        gl.uniform1f(program.uniform(shaders::U_DELTA_TIME), delta_time);
        blit(gl, Some(self.velocity.write()));
        self.velocity.swap();

        // DIVERGENCE
        let program = &self.programs.divergence;
        program.bind(gl);
        gl.uniform2fv_with_f32_array(program.uniform(shaders::U_TEXEL_SIZE), &texel_size);
        gl.uniform1i(program.uniform(shaders::U_VELOCITY), self.velocity.read().attach(gl, 0)?);
        blit(gl, Some(&self.divergence));

        // PRESSURE
        let program = &self.programs.copy;
        program.bind(gl);
        gl.uniform1f(program.uniform(shaders::U_FACTOR), 0.25 * config.pressure);
        gl.uniform1i(program.uniform(shaders::U_TEXTURE), self.pressure.read().attach(gl, 0)?);
        blit(gl, Some(self.pressure.write()));
        self.pressure.swap();

        let program = &self.programs.pressure;
        program.bind(gl);
        gl.uniform2fv_with_f32_array(program.uniform(shaders::U_TEXEL_SIZE), &texel_size);
        gl.uniform1i(program.uniform(shaders::U_DIVERGENCE), self.divergence.attach(gl, 0)?);
        for _ in 0..config.pressure_iterations {
            gl.uniform1i(program.uniform(shaders::U_PRESSURE), self.pressure.read().attach(gl, 1)?);
            blit(gl, Some(self.pressure.write()));
            self.pressure.swap();
        }

        // GRADIENT SUBTRACTION
        let program = &self.programs.gradient_subtract;
        program.bind(gl);
        gl.uniform2fv_with_f32_array(program.uniform(shaders::U_TEXEL_SIZE), &texel_size);
        gl.uniform1i(program.uniform(shaders::U_PRESSURE), self.pressure.read().attach(gl, 0)?);
        gl.uniform1i(program.uniform(shaders::U_VELOCITY), self.velocity.read().attach(gl, 1)?);
        blit(gl, Some(self.velocity.write()));
        self.velocity.swap();

        // ADVECTION
        self.advect(delta_time, config.velocity_dissipation, false)?;
        self.advect(delta_time, config.density_dissipation, true)?;

        Ok(())
    }

    fn render(&mut self, config: &SimulationConfig) -> Result<(), FluidError> {
        let gl = &self.gl;
        gl.blend_func(GL::ONE, GL::ONE_MINUS_SRC_ALPHA);
        gl.enable(GL::BLEND);

        if !config.transparent {
            let color = config.back_color.normalized();
            gl.bind_framebuffer(GL::FRAMEBUFFER, None);
            gl.viewport(0, 0, gl.drawing_buffer_width(), gl.drawing_buffer_height());
            gl.clear_color(color.r, color.g, color.b, 1.0);
            gl.clear(GL::COLOR_BUFFER_BIT);
        }

        let keywords: &[&str] = if config.shading { &[shaders::SHADING] } else { &[] };
        let program = match self.display.set_keywords(gl, keywords) {
            Ok(program) => program,
            Err(error) => {
                // Drawing without a valid program is undefined, skip the frame
                if self.display_error.as_ref() != Some(&error) {
                    log::error!("Skipping display pass: {}", error);
                    self.display_error = Some(error);
                }
                return Ok(());
            }
        };

        gl.uniform2f(
            program.uniform(shaders::U_TEXEL_SIZE),
            1.0 / gl.drawing_buffer_width().max(1) as f32,
            1.0 / gl.drawing_buffer_height().max(1) as f32,
        );
        gl.uniform1i(program.uniform(shaders::U_TEXTURE), self.dye.read().attach(gl, 0)?);
        blit(gl, None);

        Ok(())
    }
}

impl Drop for WebGlFluid {
    fn drop(&mut self) {
        let gl = &self.gl;
        self.velocity.delete(gl);
        self.dye.delete(gl);
        self.pressure.delete(gl);
        self.divergence.delete(gl);
        self.curl.delete(gl);
    }
}

fn init_quad_buffers(gl: &GL) -> Result<(), FluidError> {
    let vertex_buffer = gl.create_buffer().ok_or(FluidError::Resource("vertex buffer"))?;
    gl.bind_buffer(GL::ARRAY_BUFFER, Some(&vertex_buffer));

    let vertices: [f32; 16] = [
        -1.0, -1.0, 0.0, 0.0,
         1.0, -1.0, 1.0, 0.0,
        -1.0,  1.0, 0.0, 1.0,
         1.0,  1.0, 1.0, 1.0,
    ];
    // SAFETY: the view is consumed by buffer_data before any allocation can move wasm memory
    let vertices = unsafe { js_sys::Float32Array::view(&vertices) };
    gl.buffer_data_with_array_buffer_view(
        GL::ARRAY_BUFFER,
        &vertices,
        GL::STATIC_DRAW,
    );

    gl.vertex_attrib_pointer_with_i32(0, 2, GL::FLOAT, false, 16, 0);
    gl.vertex_attrib_pointer_with_i32(1, 2, GL::FLOAT, false, 16, 8);

    gl.enable_vertex_attrib_array(0);
    gl.enable_vertex_attrib_array(1);

    Ok(())
}

/// Draw the full screen quad into `target`, or the canvas for `None`
pub fn blit(gl: &GL, target: Option<&TextureFramebuffer>) {
    match target {
        Some(tfb) => {
            gl.viewport(0, 0, tfb.width() as i32, tfb.height() as i32);
            gl.bind_framebuffer(GL::FRAMEBUFFER, Some(tfb.buffer()));
        }
        None => {
            gl.viewport(0, 0, gl.drawing_buffer_width(), gl.drawing_buffer_height());
            gl.bind_framebuffer(GL::FRAMEBUFFER, None);
        }
    }

    gl.draw_arrays(GL::TRIANGLE_STRIP, 0, 4);
}
