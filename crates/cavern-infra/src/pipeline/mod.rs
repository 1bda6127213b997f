// Copyright 2025 the cavern authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The per-eye OpenGL render pipeline.
//!
//! [`GlEyePipeline`] owns one framebuffer per eye at the runtime's
//! recommended extent and dispatches the application's draw callback into
//! them. The trait seam exists so the render thread driver can be tested
//! without a GL context.

use std::sync::Arc;

use cavern_core::display::Eye;
use cavern_core::error::PipelineError;
use glow::HasContext;

use crate::callback::{CallbackSlots, RenderApi, RenderArgs};

/// What the render thread needs from a pipeline each frame.
pub trait FramePipeline {
    /// Runs a pending one-shot init callback with this pipeline's GL
    /// context and marks the init gate satisfied.
    fn run_init(&mut self, slots: &CallbackSlots);

    /// Renders one eye through the draw callback and returns the raw GL
    /// name of the eye's color texture.
    fn render_eye(&mut self, args: &RenderArgs, slots: &CallbackSlots)
        -> Result<u32, PipelineError>;

    /// Copies one eye's color buffer to the window's default framebuffer,
    /// letterboxed to the window extent.
    fn blit_mirror(&mut self, eye: Eye, window_extent: (u32, u32)) -> Result<(), PipelineError>;
}

struct EyeTarget {
    framebuffer: glow::NativeFramebuffer,
    color: glow::NativeTexture,
    depth: glow::NativeTexture,
}

/// GL framebuffer pipeline: RGBA8 color and 24-bit depth per eye.
pub struct GlEyePipeline {
    gl: Arc<glow::Context>,
    targets: [EyeTarget; 2],
    extent: (u32, u32),
}

impl GlEyePipeline {
    /// Builds both eye targets and verifies framebuffer completeness.
    pub fn new(gl: Arc<glow::Context>, extent: (u32, u32)) -> Result<Self, PipelineError> {
        let left = Self::build_target(&gl, extent)?;
        let right = Self::build_target(&gl, extent)?;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        Ok(Self {
            gl,
            targets: [left, right],
            extent,
        })
    }

    /// The per-eye render extent the targets were allocated at.
    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn build_target(gl: &glow::Context, extent: (u32, u32)) -> Result<EyeTarget, PipelineError> {
        let (width, height) = (extent.0 as i32, extent.1 as i32);
        unsafe {
            let framebuffer = gl
                .create_framebuffer()
                .map_err(|message| PipelineError::ResourceCreation { message })?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));

            let color = gl
                .create_texture()
                .map_err(|message| PipelineError::ResourceCreation { message })?;
            gl.bind_texture(glow::TEXTURE_2D, Some(color));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA8 as i32,
                width,
                height,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                None,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::NEAREST as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color),
                0,
            );

            let depth = gl
                .create_texture()
                .map_err(|message| PipelineError::ResourceCreation { message })?;
            gl.bind_texture(glow::TEXTURE_2D, Some(depth));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::DEPTH_COMPONENT24 as i32,
                width,
                height,
                0,
                glow::DEPTH_COMPONENT,
                glow::UNSIGNED_INT,
                None,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::DEPTH_ATTACHMENT,
                glow::TEXTURE_2D,
                Some(depth),
                0,
            );

            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            if status != glow::FRAMEBUFFER_COMPLETE {
                return Err(PipelineError::Incomplete { status });
            }

            Ok(EyeTarget {
                framebuffer,
                color,
                depth,
            })
        }
    }
}

impl FramePipeline for GlEyePipeline {
    fn run_init(&mut self, slots: &CallbackSlots) {
        if let Some(mut init) = slots.take_init() {
            init(&RenderApi { gl: &self.gl });
            slots.mark_init_done();
        }
    }

    fn render_eye(
        &mut self,
        args: &RenderArgs,
        slots: &CallbackSlots,
    ) -> Result<u32, PipelineError> {
        let target = &self.targets[args.eye.index()];
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(target.framebuffer));
            gl.viewport(0, 0, self.extent.0 as i32, self.extent.1 as i32);
            gl.enable(glow::DEPTH_TEST);
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        slots.call_draw(&RenderApi { gl }, args);

        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        Ok(target.color.0.get())
    }

    fn blit_mirror(&mut self, eye: Eye, window_extent: (u32, u32)) -> Result<(), PipelineError> {
        let target = &self.targets[eye.index()];
        let (rw, rh) = (self.extent.0 as i32, self.extent.1 as i32);
        let (ww, wh) = (window_extent.0.max(1) as i32, window_extent.1.max(1) as i32);

        // Letterbox the eye image into the window, preserving aspect.
        let scale = f32::min(ww as f32 / rw as f32, wh as f32 / rh as f32);
        let dw = (rw as f32 * scale) as i32;
        let dh = (rh as f32 * scale) as i32;
        let dx = (ww - dw) / 2;
        let dy = (wh - dh) / 2;

        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, None);
            gl.viewport(0, 0, ww, wh);
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);

            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(target.framebuffer));
            gl.blit_framebuffer(
                0,
                0,
                rw,
                rh,
                dx,
                dy,
                dx + dw,
                dy + dh,
                glow::COLOR_BUFFER_BIT,
                glow::LINEAR,
            );
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        Ok(())
    }
}

impl Drop for GlEyePipeline {
    fn drop(&mut self) {
        let gl = &self.gl;
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            for target in &self.targets {
                gl.delete_framebuffer(target.framebuffer);
                gl.delete_texture(target.color);
                gl.delete_texture(target.depth);
            }
        }
    }
}
