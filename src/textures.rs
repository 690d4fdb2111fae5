use web_sys::{
    WebGl2RenderingContext,
    WebGlTexture,
    WebGlFramebuffer,
};
use crate::error::FluidError;
use crate::field::DoubleField;
use crate::renderer::blit;
use crate::shader_program::ShaderProgram;
use crate::shaders;

type GL = WebGl2RenderingContext;

/// Highest texture unit [attach](TextureFramebuffer::attach) accepts
const MAX_TEXTURE_UNITS: u32 = 32;

/// Storage of a texture: internal format, pixel format and component type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureFormat {
    pub internal: u32,
    pub format: u32,
    pub ty: u32,
}

impl TextureFormat {
    pub const RGBA16F: TextureFormat = TextureFormat { internal: GL::RGBA16F, format: GL::RGBA, ty: GL::HALF_FLOAT };
    pub const RG16F: TextureFormat = TextureFormat { internal: GL::RG16F, format: GL::RG, ty: GL::HALF_FLOAT };
    pub const R16F: TextureFormat = TextureFormat { internal: GL::R16F, format: GL::RED, ty: GL::HALF_FLOAT };
    pub const RGBA8: TextureFormat = TextureFormat { internal: GL::RGBA8, format: GL::RGBA, ty: GL::UNSIGNED_BYTE };

    pub fn is_float(&self) -> bool {
        self.ty == GL::HALF_FLOAT || self.ty == GL::FLOAT
    }
}

/// Formats picked for the 4, 2 and 1 channel fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Formats {
    pub rgba: TextureFormat,
    pub rg: TextureFormat,
    pub r: TextureFormat,
    pub linear_filtering: bool,
}

impl Formats {
    /// Pick the narrowest renderable format for each channel count
    ///
    /// A format the driver can't render into is widened (`R16F` to `RG16F`
    /// to `RGBA16F`) and finally replaced by 8 bit `RGBA`.
    pub fn negotiate<F>(float_linear: bool, mut renderable: F) -> Formats
    where
        F: FnMut(&TextureFormat) -> bool,
    {
        let mut pick = |chain: &[TextureFormat]| {
            chain.iter()
                .copied()
                .find(|format| renderable(format))
                .unwrap_or(TextureFormat::RGBA8)
        };

        let rgba = pick(&[TextureFormat::RGBA16F]);
        let rg = pick(&[TextureFormat::RG16F, TextureFormat::RGBA16F]);
        let r = pick(&[TextureFormat::R16F, TextureFormat::RG16F, TextureFormat::RGBA16F]);

        Formats {
            rgba,
            rg,
            r,
            linear_filtering: float_linear || !rgba.is_float(),
        }
    }

    pub fn float_targets(&self) -> bool {
        self.rgba.is_float() && self.rg.is_float() && self.r.is_float()
    }

    pub fn filter(&self) -> u32 {
        if self.linear_filtering { GL::LINEAR } else { GL::NEAREST }
    }
}

/// Try rendering into a 4x4 texture of `format`
pub fn supports_render_format(gl: &GL, format: &TextureFormat) -> bool {
    match TextureFramebuffer::new(gl, 4, 4, format, GL::NEAREST) {
        Ok(probe) => {
            let complete = gl.check_framebuffer_status(GL::FRAMEBUFFER) == GL::FRAMEBUFFER_COMPLETE;
            probe.delete(gl);
            complete
        }
        Err(_) => false,
    }
}

/// A texture attached to its own framebuffer, so it can be sampled and rendered into
pub struct TextureFramebuffer {
    texture: WebGlTexture,
    framebuffer: WebGlFramebuffer,
    width: u32,
    height: u32,
    format: TextureFormat,
    filter: u32,
}

impl TextureFramebuffer {
    pub fn new(
        gl: &GL,
        width: u32,
        height: u32,
        format: &TextureFormat,
        filter: u32,
    ) -> Result<TextureFramebuffer, FluidError> {
        gl.active_texture(GL::TEXTURE0);
        let texture = gl.create_texture()
            .ok_or(FluidError::Resource("texture"))?;
        gl.bind_texture(GL::TEXTURE_2D, Some(&texture));

        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MIN_FILTER, filter as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MAG_FILTER, filter as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_S, GL::CLAMP_TO_EDGE as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_T, GL::CLAMP_TO_EDGE as i32);

        gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
            GL::TEXTURE_2D,
            0,
            format.internal as i32,
            width as i32,
            height as i32,
            0,
            format.format,
            format.ty,
            None,
        )?;

        let framebuffer = match gl.create_framebuffer() {
            Some(framebuffer) => framebuffer,
            None => {
                gl.delete_texture(Some(&texture));
                return Err(FluidError::Resource("framebuffer"));
            }
        };
        gl.bind_framebuffer(GL::FRAMEBUFFER, Some(&framebuffer));
        gl.framebuffer_texture_2d(
            GL::FRAMEBUFFER,
            GL::COLOR_ATTACHMENT0,
            GL::TEXTURE_2D,
            Some(&texture),
            0,
        );
        gl.viewport(0, 0, width as i32, height as i32);
        gl.clear_color(0.0, 0.0, 0.0, 0.0);
        gl.clear(GL::COLOR_BUFFER_BIT);

        Ok(TextureFramebuffer {
            texture,
            framebuffer,
            width,
            height,
            format: *format,
            filter,
        })
    }

    /// Bind the texture to unit `id`, returning the unit for a sampler uniform
    pub fn attach(
        &self,
        gl: &GL,
        id: u32,
    ) -> Result<i32, FluidError> {
        if id >= MAX_TEXTURE_UNITS {
            return Err(FluidError::Resource("texture unit"));
        }

        gl.active_texture(GL::TEXTURE0 + id);
        gl.bind_texture(GL::TEXTURE_2D, Some(&self.texture));

        Ok(id as i32)
    }

    pub fn delete(&self, gl: &GL) {
        gl.delete_texture(Some(&self.texture));
        gl.delete_framebuffer(Some(&self.framebuffer));
    }

    pub fn buffer(&self) -> &WebGlFramebuffer {
        &self.framebuffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn texel_size(&self) -> [f32; 2] {
        crate::field::texel_size(self.size())
    }

    /// A field of the new size holding a resampled copy of this one
    pub fn resized(
        &self,
        gl: &GL,
        copy_program: &ShaderProgram,
        width: u32,
        height: u32,
    ) -> Result<TextureFramebuffer, FluidError> {
        let target = TextureFramebuffer::new(gl, width, height, &self.format, self.filter)?;

        copy_program.bind(gl);
        gl.uniform1f(copy_program.uniform(shaders::U_FACTOR), 1.0);
        gl.uniform1i(copy_program.uniform(shaders::U_TEXTURE), self.attach(gl, 0)?);
        blit(gl, Some(&target));

        Ok(target)
    }
}

impl DoubleField<TextureFramebuffer> {
    pub fn create(
        gl: &GL,
        width: u32,
        height: u32,
        format: &TextureFormat,
        filter: u32,
    ) -> Result<DoubleField<TextureFramebuffer>, FluidError> {
        let read = TextureFramebuffer::new(gl, width, height, format, filter)?;
        let write = TextureFramebuffer::new(gl, width, height, format, filter)?;
        Ok(DoubleField::new(read, write))
    }

    pub fn size(&self) -> (u32, u32) {
        self.read().size()
    }

    /// Resize both sides, copying the current state into the new `read`
    ///
    /// Without a copy program the contents start cleared.
    pub fn resize(
        &mut self,
        gl: &GL,
        copy_program: Option<&ShaderProgram>,
        width: u32,
        height: u32,
    ) -> Result<(), FluidError> {
        if (width, height) == self.size() {
            return Ok(());
        }

        let (format, filter) = (self.read().format, self.read().filter);
        let read = match copy_program {
            Some(copy_program) => self.read().resized(gl, copy_program, width, height)?,
            None => TextureFramebuffer::new(gl, width, height, &format, filter)?,
        };
        let write = TextureFramebuffer::new(gl, width, height, &format, filter)?;

        let (old_read, old_write) = self.replace(read, write);
        old_read.delete(gl);
        old_write.delete(gl);

        Ok(())
    }

    pub fn delete(&self, gl: &GL) {
        self.read().delete(gl);
        self.write().delete(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everything_renderable_keeps_half_floats() {
        let formats = Formats::negotiate(true, |_| true);
        assert_eq!(formats.rgba, TextureFormat::RGBA16F);
        assert_eq!(formats.rg, TextureFormat::RG16F);
        assert_eq!(formats.r, TextureFormat::R16F);
        assert!(formats.linear_filtering);
        assert!(formats.float_targets());
    }

    #[test]
    fn narrow_formats_widen() {
        let formats = Formats::negotiate(true, |format| *format == TextureFormat::RGBA16F);
        assert_eq!(formats.rg, TextureFormat::RGBA16F);
        assert_eq!(formats.r, TextureFormat::RGBA16F);
        assert!(formats.float_targets());
    }

    #[test]
    fn no_float_targets_fall_back_to_rgba8() {
        let formats = Formats::negotiate(false, |format| !format.is_float());
        assert_eq!(formats.rgba, TextureFormat::RGBA8);
        assert_eq!(formats.rg, TextureFormat::RGBA8);
        assert_eq!(formats.r, TextureFormat::RGBA8);
        assert!(!formats.float_targets());
        // 8 bit textures are always filterable
        assert!(formats.linear_filtering);
    }

    #[test]
    fn missing_float_linear_means_nearest() {
        let formats = Formats::negotiate(false, |_| true);
        assert!(!formats.linear_filtering);
        assert_eq!(formats.filter(), GL::NEAREST);
    }

    #[test]
    fn probes_follow_fallback_order() {
        let mut probed = Vec::new();
        Formats::negotiate(true, |format| {
            probed.push(format.internal);
            format.internal != GL::R16F
        });
        assert_eq!(probed, vec![GL::RGBA16F, GL::RG16F, GL::R16F, GL::RG16F]);
    }
}
