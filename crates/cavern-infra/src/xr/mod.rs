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

//! OpenXR backend: session setup, per-frame tracking and stereo submission.
//!
//! [`connect_openxr`] owns the whole bring-up sequence: OpenXR instance,
//! mirror window with a GLX context, session bound to that context,
//! reference spaces, the wand action set and one swapchain per eye. The
//! result is split into a [`OpenXrTracker`] (the frame-timing and pose
//! side) and an [`OpenXrDisplay`] (the submission side); both share the
//! session through [`XrShared`]. Everything here is thread-affine to the
//! render thread that created it.

pub mod actions;
pub mod convert;

use std::sync::{Arc, Mutex, MutexGuard};

use cavern_core::display::{Eye, StereoDisplay};
use cavern_core::error::{DisplayError, PipelineError, TrackingError, VrError};
use cavern_core::math::Mat4;
use cavern_core::tracking::{DeviceClass, HmdProfile, RawTrackingFrame, TrackedDevice};
use glow::HasContext;
use openxr as xr;

use crate::pipeline::GlEyePipeline;
use crate::platform::MirrorWindow;
use crate::thread::VrSession;
use actions::WandActions;
use convert::{fov_projection, pose_to_mat4};

const VIEW_TYPE: xr::ViewConfigurationType = xr::ViewConfigurationType::PRIMARY_STEREO;

/// What the caller wants the session to look like from the outside.
#[derive(Debug, Clone)]
pub struct SessionDesc {
    /// Application name reported to the runtime.
    pub app_name: String,
    /// Title of the desktop mirror window.
    pub window_title: String,
    /// Height of the mirror window in pixels; width follows the eye
    /// buffer's aspect ratio.
    pub window_height: u32,
}

/// Per-frame state produced by the tracker and consumed by the display.
struct FrameSnapshot {
    time: xr::Time,
    views: Vec<xr::View>,
    should_render: bool,
    /// Raw head pose in the reference space, meters. Holds the last
    /// known value while tracking is lost.
    head: Mat4,
}

impl Default for FrameSnapshot {
    fn default() -> Self {
        Self {
            time: xr::Time::from_nanos(0),
            views: Vec::new(),
            should_render: false,
            head: Mat4::IDENTITY,
        }
    }
}

/// Session state shared between the tracking and display halves.
///
/// Both halves live on the render thread; the mutexes only serialize the
/// begin/locate/end handoff within one frame.
pub struct XrShared {
    session: xr::Session<xr::OpenGL>,
    reference_space: xr::Space,
    frame_stream: Mutex<xr::FrameStream<xr::OpenGL>>,
    frame: Mutex<FrameSnapshot>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn transient(what: &str, err: xr::sys::Result) -> TrackingError {
    if err == xr::sys::Result::ERROR_SESSION_LOST {
        TrackingError::SessionEnded
    } else {
        TrackingError::Transient {
            message: format!("OpenXR {what}: {err:?}"),
        }
    }
}

pub(crate) fn init_error(what: &str, err: xr::sys::Result) -> TrackingError {
    TrackingError::Init {
        message: format!("OpenXR {what}: {err:?}"),
    }
}

pub(crate) fn path(instance: &xr::Instance, s: &str) -> Result<xr::Path, TrackingError> {
    instance
        .string_to_path(s)
        .map_err(|e| init_error("string_to_path", e))
}

/// The pose-and-timing half of the OpenXR session.
///
/// `wait_poses` owns the session lifecycle events and the frame cadence:
/// it blocks on the runtime's frame timing, begins the frame, and hands
/// back whatever the runtime knows about the head and controllers.
pub struct OpenXrTracker {
    instance: xr::Instance,
    shared: Arc<XrShared>,
    frame_waiter: xr::FrameWaiter,
    event_buffer: xr::EventDataBuffer,
    view_space: xr::Space,
    actions: WandActions,
    profile: HmdProfile,
    running: bool,
}

impl cavern_core::tracking::PoseSource for OpenXrTracker {
    fn hmd_profile(&self) -> &HmdProfile {
        &self.profile
    }

    fn wait_poses(&mut self) -> Result<RawTrackingFrame, TrackingError> {
        while let Some(event) = self
            .instance
            .poll_event(&mut self.event_buffer)
            .map_err(|e| transient("poll_event", e))?
        {
            if let xr::Event::SessionStateChanged(e) = event {
                log::debug!("session state: {:?}", e.state());
                match e.state() {
                    xr::SessionState::READY => {
                        self.shared
                            .session
                            .begin(VIEW_TYPE)
                            .map_err(|e| init_error("session begin", e))?;
                        self.running = true;
                    }
                    xr::SessionState::STOPPING => {
                        self.shared
                            .session
                            .end()
                            .map_err(|e| transient("session end", e))?;
                        self.running = false;
                        return Err(TrackingError::SessionEnded);
                    }
                    xr::SessionState::EXITING | xr::SessionState::LOSS_PENDING => {
                        return Err(TrackingError::SessionEnded);
                    }
                    _ => {}
                }
            }
        }

        if !self.running {
            return Err(TrackingError::Transient {
                message: "session not running yet".into(),
            });
        }

        let frame_state = self.frame_waiter.wait().map_err(|e| transient("wait_frame", e))?;
        let time = frame_state.predicted_display_time;
        lock(&self.shared.frame_stream)
            .begin()
            .map_err(|e| transient("begin_frame", e))?;

        let located = self
            .shared
            .session
            .locate_views(VIEW_TYPE, time, &self.shared.reference_space);
        let (_view_flags, views) = match located {
            Ok(v) => v,
            Err(e) => {
                // The frame is already begun; close it out so the next
                // iteration can begin again.
                let _ = lock(&self.shared.frame_stream).end(
                    time,
                    xr::EnvironmentBlendMode::OPAQUE,
                    &[],
                );
                return Err(transient("locate_views", e));
            }
        };

        let head = self
            .view_space
            .locate(&self.shared.reference_space, time)
            .ok()
            .filter(|location| {
                location
                    .location_flags
                    .contains(xr::SpaceLocationFlags::POSITION_VALID)
                    && location
                        .location_flags
                        .contains(xr::SpaceLocationFlags::ORIENTATION_VALID)
            })
            .map(|location| pose_to_mat4(location.pose));

        if let Err(e) = self.actions.sync(&self.shared.session) {
            log::debug!("action sync failed: {e:?}");
        }
        let mut devices = Vec::with_capacity(3);
        devices.push(TrackedDevice {
            class: DeviceClass::Hmd,
            role: None,
            pose: head,
        });
        devices.extend(
            self.actions
                .controller_devices(&self.shared.reference_space, time),
        );
        let controller = self.actions.controller_state(&self.shared.session);

        {
            let mut frame = lock(&self.shared.frame);
            frame.time = time;
            frame.views = views;
            frame.should_render = frame_state.should_render;
            if let Some(head) = head {
                frame.head = head;
            }
        }

        Ok(RawTrackingFrame { devices, controller })
    }
}

/// The submission half of the OpenXR session: one swapchain per eye plus
/// the projection layer handed to the compositor.
pub struct OpenXrDisplay {
    shared: Arc<XrShared>,
    gl: Arc<glow::Context>,
    swapchains: [xr::Swapchain<xr::OpenGL>; 2],
    images: [Vec<u32>; 2],
    extent: (u32, u32),
    read_fbo: glow::NativeFramebuffer,
    draw_fbo: glow::NativeFramebuffer,
    layer_views: [xr::CompositionLayerProjectionView<'static, xr::OpenGL>; 2],
    rendered: [bool; 2],
}

impl OpenXrDisplay {
    fn new(
        shared: Arc<XrShared>,
        gl: Arc<glow::Context>,
        swapchains: [xr::Swapchain<xr::OpenGL>; 2],
        images: [Vec<u32>; 2],
        extent: (u32, u32),
    ) -> Result<Self, PipelineError> {
        let (read_fbo, draw_fbo) = unsafe {
            let read = gl.create_framebuffer().map_err(|message| {
                PipelineError::ResourceCreation { message }
            })?;
            let draw = gl.create_framebuffer().map_err(|message| {
                PipelineError::ResourceCreation { message }
            })?;
            (read, draw)
        };
        Ok(Self {
            shared,
            gl,
            swapchains,
            images,
            extent,
            read_fbo,
            draw_fbo,
            layer_views: [
                xr::CompositionLayerProjectionView::new(),
                xr::CompositionLayerProjectionView::new(),
            ],
            rendered: [false, false],
        })
    }

    fn copy_to_swapchain(&self, source: u32, dest: u32) {
        let (width, height) = (self.extent.0 as i32, self.extent.1 as i32);
        let gl = &*self.gl;
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(self.read_fbo));
            gl.framebuffer_texture_2d(
                glow::READ_FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                std::num::NonZeroU32::new(source).map(glow::NativeTexture),
                0,
            );
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(self.draw_fbo));
            gl.framebuffer_texture_2d(
                glow::DRAW_FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                std::num::NonZeroU32::new(dest).map(glow::NativeTexture),
                0,
            );
            gl.blit_framebuffer(
                0,
                0,
                width,
                height,
                0,
                0,
                width,
                height,
                glow::COLOR_BUFFER_BIT,
                glow::NEAREST,
            );
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }
}

impl StereoDisplay for OpenXrDisplay {
    fn render_extent(&self) -> (u32, u32) {
        self.extent
    }

    fn projection(&self, eye: Eye, near: f32, far: f32) -> Mat4 {
        let frame = lock(&self.shared.frame);
        let fov = frame
            .views
            .get(eye.index())
            .map(|view| view.fov)
            .unwrap_or(xr::Fovf {
                angle_left: -std::f32::consts::FRAC_PI_4,
                angle_right: std::f32::consts::FRAC_PI_4,
                angle_up: std::f32::consts::FRAC_PI_4,
                angle_down: -std::f32::consts::FRAC_PI_4,
            });
        fov_projection(fov, near, far)
    }

    fn eye_to_head(&self, eye: Eye) -> Mat4 {
        let frame = lock(&self.shared.frame);
        let Some(view) = frame.views.get(eye.index()) else {
            return Mat4::IDENTITY;
        };
        let eye_world = pose_to_mat4(view.pose);
        match frame.head.inverse() {
            Some(head_inv) => head_inv * eye_world,
            None => Mat4::IDENTITY,
        }
    }

    fn submit(&mut self, eye: Eye, color_texture: u32) -> Result<(), DisplayError> {
        let index = eye.index();
        let submit_err = |what: &str, e: xr::sys::Result| DisplayError::Submit {
            message: format!("OpenXR {what}: {e:?}"),
        };

        let image_index = self.swapchains[index]
            .acquire_image()
            .map_err(|e| submit_err("acquire_image", e))?;
        self.swapchains[index]
            .wait_image(xr::Duration::INFINITE)
            .map_err(|e| submit_err("wait_image", e))?;
        let dest = self.images[index][image_index as usize];
        self.copy_to_swapchain(color_texture, dest);
        self.swapchains[index]
            .release_image()
            .map_err(|e| submit_err("release_image", e))?;

        let frame = lock(&self.shared.frame);
        if let Some(view) = frame.views.get(index) {
            // Break the sub-image's borrow of the swapchain; the
            // swapchain lives in `self` until after the frame ends.
            let sub_image = unsafe {
                xr::SwapchainSubImage::from_raw(xr::sys::SwapchainSubImage {
                    swapchain: self.swapchains[index].as_raw(),
                    image_rect: xr::Rect2Di {
                        offset: xr::Offset2Di { x: 0, y: 0 },
                        extent: xr::Extent2Di {
                            width: self.extent.0 as i32,
                            height: self.extent.1 as i32,
                        },
                    },
                    image_array_index: 0,
                })
            };
            self.layer_views[index] = xr::CompositionLayerProjectionView::new()
                .pose(view.pose)
                .fov(view.fov)
                .sub_image(sub_image);
            self.rendered[index] = true;
        }
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<(), DisplayError> {
        let end_err = |e: xr::sys::Result| DisplayError::FrameEnd {
            message: format!("OpenXR end_frame: {e:?}"),
        };
        let (time, should_render) = {
            let frame = lock(&self.shared.frame);
            (frame.time, frame.should_render)
        };
        let mut stream = lock(&self.shared.frame_stream);
        if should_render && self.rendered == [true, true] {
            let layer = xr::CompositionLayerProjection::new()
                .space(&self.shared.reference_space)
                .views(&self.layer_views);
            let layers: [&xr::CompositionLayerBase<xr::OpenGL>; 1] = [&layer];
            stream
                .end(time, xr::EnvironmentBlendMode::OPAQUE, &layers)
                .map_err(end_err)?;
        } else {
            stream
                .end(time, xr::EnvironmentBlendMode::OPAQUE, &[])
                .map_err(end_err)?;
        }
        self.rendered = [false, false];
        Ok(())
    }
}

impl Drop for OpenXrDisplay {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_framebuffer(self.read_fbo);
            self.gl.delete_framebuffer(self.draw_fbo);
        }
    }
}

/// Linear formats first; an sRGB swapchain would gamma-convert a second
/// time on scanout.
fn choose_swapchain_format(formats: &[u32]) -> u32 {
    let preferred = [glow::RGBA8, glow::SRGB8_ALPHA8];
    preferred
        .iter()
        .copied()
        .find(|format| formats.contains(format))
        .or_else(|| formats.first().copied())
        .unwrap_or(glow::RGBA8)
}

/// Width of a mirror window of `window_height` matching the eye buffer's
/// aspect ratio.
fn mirror_window_width(render_extent: (u32, u32), window_height: u32) -> u32 {
    (render_extent.0 * window_height / render_extent.1.max(1)).max(1)
}

/// Brings up the full session: runtime, mirror window, GL context, XR
/// session, spaces, actions and swapchains.
pub fn connect_openxr(desc: &SessionDesc) -> Result<VrSession, VrError> {
    let entry = unsafe { xr::Entry::load() }.map_err(|e| {
        VrError::Tracking(TrackingError::Init {
            message: format!("OpenXR loader: {e}"),
        })
    })?;

    let available = entry
        .enumerate_extensions()
        .map_err(|e| init_error("enumerate_extensions", e))?;
    if !available.khr_opengl_enable {
        return Err(VrError::Tracking(TrackingError::Init {
            message: "runtime lacks XR_KHR_opengl_enable".into(),
        }));
    }
    let mut extensions = xr::ExtensionSet::default();
    extensions.khr_opengl_enable = true;

    let app_info = xr::ApplicationInfo {
        application_name: &desc.app_name,
        application_version: 1,
        engine_name: "cavern",
        engine_version: 1,
    };
    let instance = entry
        .create_instance(&app_info, &extensions, &[])
        .map_err(|e| init_error("create_instance", e))?;
    let runtime_name = instance
        .properties()
        .map(|p| p.runtime_name)
        .unwrap_or_else(|_| "unknown".into());

    let system = instance
        .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
        .map_err(|e| init_error("system", e))?;
    let system_name = instance
        .system_properties(system)
        .map(|p| p.system_name)
        .unwrap_or_else(|_| "unknown".into());

    // Required handshake before session creation.
    let requirements = instance
        .graphics_requirements::<xr::OpenGL>(system)
        .map_err(|e| init_error("graphics_requirements", e))?;
    log::debug!(
        "runtime wants GL {} to {}",
        requirements.min_api_version_supported,
        requirements.max_api_version_supported
    );

    let view_configs = instance
        .enumerate_view_configuration_views(system, VIEW_TYPE)
        .map_err(|e| init_error("view_configuration_views", e))?;
    if view_configs.len() < 2 {
        return Err(VrError::Tracking(TrackingError::Init {
            message: format!("expected 2 stereo views, runtime reports {}", view_configs.len()),
        }));
    }
    let render_extent = (
        view_configs[0].recommended_image_rect_width,
        view_configs[0].recommended_image_rect_height,
    );

    let window = MirrorWindow::new(
        &desc.window_title,
        mirror_window_width(render_extent, desc.window_height),
        desc.window_height,
    )?;
    let gl = Arc::new(window.load_gl());
    let glx = window.glx_handles();

    let create_info = xr::opengl::SessionCreateInfo::Xlib {
        x_display: glx.display as *mut _,
        visualid: glx.visualid as u32,
        glx_fb_config: glx.fb_config as *mut _,
        glx_drawable: glx.drawable,
        glx_context: glx.context as *mut _,
    };
    let (session, frame_waiter, frame_stream) = unsafe {
        instance
            .create_session::<xr::OpenGL>(system, &create_info)
            .map_err(|e| init_error("create_session", e))?
    };

    let reference_space = session
        .create_reference_space(xr::ReferenceSpaceType::LOCAL, xr::Posef::IDENTITY)
        .map_err(|e| init_error("reference space", e))?;
    let view_space = session
        .create_reference_space(xr::ReferenceSpaceType::VIEW, xr::Posef::IDENTITY)
        .map_err(|e| init_error("view space", e))?;

    let wand_actions = WandActions::new(&instance, &session)?;

    let formats = session
        .enumerate_swapchain_formats()
        .map_err(|e| init_error("swapchain formats", e))?;
    let format = choose_swapchain_format(&formats);
    let swapchain_info = xr::SwapchainCreateInfo {
        create_flags: xr::SwapchainCreateFlags::EMPTY,
        usage_flags: xr::SwapchainUsageFlags::COLOR_ATTACHMENT,
        format,
        sample_count: 1,
        width: render_extent.0,
        height: render_extent.1,
        face_count: 1,
        array_size: 1,
        mip_count: 1,
    };
    let left_swapchain = session
        .create_swapchain(&swapchain_info)
        .map_err(|e| init_error("left swapchain", e))?;
    let right_swapchain = session
        .create_swapchain(&swapchain_info)
        .map_err(|e| init_error("right swapchain", e))?;
    let left_images = left_swapchain
        .enumerate_images()
        .map_err(|e| init_error("left swapchain images", e))?;
    let right_images = right_swapchain
        .enumerate_images()
        .map_err(|e| init_error("right swapchain images", e))?;

    let profile = HmdProfile {
        driver: runtime_name.clone(),
        model: system_name,
        serial: runtime_name,
        display_frequency: 0.0,
    };
    log::info!(
        "headset: {} '{}' #{} ({}x{} @ {} Hz)",
        profile.driver,
        profile.model,
        profile.serial,
        render_extent.0,
        render_extent.1,
        profile.display_frequency
    );

    let shared = Arc::new(XrShared {
        session,
        reference_space,
        frame_stream: Mutex::new(frame_stream),
        frame: Mutex::new(FrameSnapshot::default()),
    });

    let pipeline = GlEyePipeline::new(gl.clone(), render_extent)?;
    let display = OpenXrDisplay::new(
        shared.clone(),
        gl,
        [left_swapchain, right_swapchain],
        [left_images, right_images],
        render_extent,
    )?;
    let tracker = OpenXrTracker {
        instance,
        shared,
        frame_waiter,
        event_buffer: xr::EventDataBuffer::new(),
        view_space,
        actions: wand_actions,
        profile,
        running: false,
    };

    Ok(VrSession {
        pipeline: Box::new(pipeline),
        display: Box::new(display),
        source: Box::new(tracker),
        mirror: Box::new(window),
    })
}
