use web_sys::{
    WebGl2RenderingContext,
    WebGlProgram,
    WebGlShader,
    WebGlUniformLocation,
};
use std::collections::HashMap;
use crate::error::{ FluidError, ShaderStage };
use crate::shaders;

/// A linked program and the locations of its active uniforms
pub struct ShaderProgram {
    program: WebGlProgram,
    pub uniforms: HashMap<String, WebGlUniformLocation>,
}

impl ShaderProgram {
    /// Compile a shader with a `#define` line for every keyword
    pub fn compile_shader(
        gl: &WebGl2RenderingContext,
        stage: ShaderStage,
        source: &str,
        keywords: &[&str],
    ) -> Result<WebGlShader, FluidError> {
        let shader_type = match stage {
            ShaderStage::Vertex => WebGl2RenderingContext::VERTEX_SHADER,
            ShaderStage::Fragment => WebGl2RenderingContext::FRAGMENT_SHADER,
        };
        let shader = gl.create_shader(shader_type)
            .ok_or(FluidError::Resource("shader object"))?;

        gl.shader_source(&shader, &with_keywords(source, keywords));
        gl.compile_shader(&shader);

        if gl.get_shader_parameter(&shader, WebGl2RenderingContext::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            return Ok(shader);
        }

        let log = gl.get_shader_info_log(&shader)
            .unwrap_or_else(|| "Unknown error creating shader".into());
        gl.delete_shader(Some(&shader));
        Err(FluidError::Compile { stage, log })
    }

    pub fn new(
        gl: &WebGl2RenderingContext,
        vertex_shader: &WebGlShader,
        fragment_shader: &WebGlShader,
    ) -> Result<ShaderProgram, FluidError> {
        let program = gl.create_program()
            .ok_or(FluidError::Resource("program"))?;
        gl.attach_shader(&program, vertex_shader);
        gl.attach_shader(&program, fragment_shader);
        gl.bind_attrib_location(&program, 0, shaders::A_COORDINATES);
        gl.bind_attrib_location(&program, 1, shaders::A_UV);
        gl.link_program(&program);

        if !gl.get_program_parameter(&program, WebGl2RenderingContext::LINK_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            let log = gl.get_program_info_log(&program)
                .unwrap_or_else(|| "Unknown error linking program".into());
            gl.delete_program(Some(&program));
            return Err(FluidError::Link(log));
        }

        let count = gl.get_program_parameter(&program, WebGl2RenderingContext::ACTIVE_UNIFORMS)
            .as_f64()
            .unwrap_or(0.0) as u32;
        let uniforms = (0..count)
            .filter_map(|i| gl.get_active_uniform(&program, i))
            .filter_map(|info| {
                let name = info.name();
                gl.get_uniform_location(&program, &name).map(|location| (name, location))
            })
            .collect();

        Ok(ShaderProgram {
            program,
            uniforms,
        })
    }

    /// Compile `fragment_source` against an already compiled vertex shader
    pub fn with_fragment(
        gl: &WebGl2RenderingContext,
        vertex_shader: &WebGlShader,
        fragment_source: &str,
        keywords: &[&str],
    ) -> Result<ShaderProgram, FluidError> {
        let fragment_shader = ShaderProgram::compile_shader(
            gl,
            ShaderStage::Fragment,
            fragment_source,
            keywords,
        )?;
        ShaderProgram::new(gl, vertex_shader, &fragment_shader)
    }

    pub fn uniform(&self, name: &str) -> Option<&WebGlUniformLocation> {
        self.uniforms.get(name)
    }

    pub fn bind(&self, gl: &WebGl2RenderingContext) {
        gl.use_program(Some(&self.program));
    }
}

/// Results of building something once per keyword combination
///
/// Keyed by [keyword_hash], so the order of the keywords doesn't matter. A
/// failed build is kept and handed out again rather than retried.
pub struct Variants<T> {
    built: HashMap<i32, Result<T, FluidError>>,
}

impl<T> Variants<T> {
    pub fn new() -> Variants<T> {
        Variants { built: HashMap::new() }
    }

    /// The variant for `keywords`, calling `build` only the first time
    pub fn resolve<F>(&mut self, keywords: &[&str], build: F) -> (i32, &Result<T, FluidError>)
    where
        F: FnOnce() -> Result<T, FluidError>,
    {
        let hash = keyword_hash(keywords);
        let variant = self.built.entry(hash).or_insert_with(|| {
            let variant = build();
            if let Err(error) = &variant {
                log::error!("Variant {:?} unavailable: {}", keywords, error);
            }
            variant
        });
        (hash, variant)
    }

    pub fn len(&self) -> usize {
        self.built.len()
    }

    pub fn is_empty(&self) -> bool {
        self.built.is_empty()
    }
}

impl<T> Default for Variants<T> {
    fn default() -> Self {
        Variants::new()
    }
}

/// A fragment program compiled on demand for each keyword combination
pub struct Material {
    vertex_shader: WebGlShader,
    fragment_source: &'static str,
    programs: Variants<ShaderProgram>,
    active: Option<i32>,
}

impl Material {
    pub fn new(vertex_shader: WebGlShader, fragment_source: &'static str) -> Material {
        Material {
            vertex_shader,
            fragment_source,
            programs: Variants::new(),
            active: None,
        }
    }

    /// Resolve the variant for `keywords` and bind it
    pub fn set_keywords(
        &mut self,
        gl: &WebGl2RenderingContext,
        keywords: &[&str],
    ) -> Result<&ShaderProgram, FluidError> {
        let (vertex_shader, fragment_source) = (&self.vertex_shader, self.fragment_source);
        let (hash, program) = self.programs.resolve(keywords, || {
            ShaderProgram::with_fragment(gl, vertex_shader, fragment_source, keywords)
        });

        match program {
            Ok(program) => {
                program.bind(gl);
                self.active = Some(hash);
                Ok(program)
            }
            Err(error) => {
                self.active = None;
                Err(error.clone())
            }
        }
    }

    pub fn active(&self) -> Option<i32> {
        self.active
    }

    /// Number of keyword combinations built so far, failed ones included
    pub fn variant_count(&self) -> usize {
        self.programs.len()
    }
}

/// Prefix `source` with a `#define` for each keyword
pub fn with_keywords(source: &str, keywords: &[&str]) -> String {
    let mut prefixed = String::with_capacity(source.len() + keywords.len() * 24);
    for keyword in keywords {
        prefixed.push_str("#define ");
        prefixed.push_str(keyword);
        prefixed.push('\n');
    }
    prefixed.push_str(source);
    prefixed
}

/// Sum of the 31-multiplier string hashes of every keyword
pub fn keyword_hash(keywords: &[&str]) -> i32 {
    keywords.iter().fold(0i32, |sum, keyword| sum.wrapping_add(string_hash(keyword)))
}

fn string_hash(value: &str) -> i32 {
    value.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(unit as i32)
    })
}
