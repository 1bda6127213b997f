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

//! The Xlib mirror window with its GLX context.
//!
//! The window is created with a GLX-chosen visual so the same context can
//! be handed to the OpenXR runtime (which wants the raw display, visual,
//! drawable and context) and used for the mirror blit. Everything here is
//! thread-affine to the render thread.

use std::ffi::CString;
use std::os::raw::{c_int, c_ulong};
use std::ptr;

use cavern_core::display::{MirrorSurface, WindowPoll};
use cavern_core::error::WindowError;
use cavern_core::input::{KeySet, MouseButtons};
use x11::{glx, xlib};

use super::keymap::legacy_key_code;

// _MOTIF_WM_HINTS with decorations disabled.
const MWM_HINTS_DECORATIONS: c_ulong = 1 << 1;

/// Raw handles the OpenXR OpenGL session binding needs.
pub struct GlxHandles {
    /// The Xlib display connection.
    pub display: *mut xlib::Display,
    /// Visual id of the window (and of the fb config it was built from).
    pub visualid: u64,
    /// The GLX framebuffer configuration.
    pub fb_config: glx::GLXFBConfig,
    /// The window, as a GLX drawable.
    pub drawable: glx::GLXDrawable,
    /// The GL context, current on the render thread.
    pub context: glx::GLXContext,
}

/// The desktop companion window: undecorated, vsynced, cursor hidden,
/// collecting keyboard and mouse state for the input snapshot.
pub struct MirrorWindow {
    display: *mut xlib::Display,
    window: xlib::Window,
    fb_config: glx::GLXFBConfig,
    visualid: u64,
    context: glx::GLXContext,
    wm_delete: xlib::Atom,
    blank_cursor: xlib::Cursor,
    extent: (u32, u32),
    keys: KeySet,
    mouse: MouseButtons,
    close_requested: bool,
}

impl MirrorWindow {
    /// Opens the X display, picks a double-buffered RGBA fb config,
    /// creates the window with that config's visual and makes a GL
    /// context current on it.
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self, WindowError> {
        unsafe {
            let display = xlib::XOpenDisplay(ptr::null());
            if display.is_null() {
                return Err(WindowError::CreationFailed {
                    message: "XOpenDisplay failed (is an X server running?)".to_string(),
                });
            }

            let screen = xlib::XDefaultScreen(display);
            let attrs = [
                glx::GLX_X_RENDERABLE,
                1,
                glx::GLX_DRAWABLE_TYPE,
                glx::GLX_WINDOW_BIT,
                glx::GLX_RENDER_TYPE,
                glx::GLX_RGBA_BIT,
                glx::GLX_X_VISUAL_TYPE,
                glx::GLX_TRUE_COLOR,
                glx::GLX_RED_SIZE,
                8,
                glx::GLX_GREEN_SIZE,
                8,
                glx::GLX_BLUE_SIZE,
                8,
                glx::GLX_ALPHA_SIZE,
                8,
                glx::GLX_DEPTH_SIZE,
                24,
                glx::GLX_DOUBLEBUFFER,
                1,
                0,
            ];

            let mut fbcount = 0;
            let fb_configs = glx::glXChooseFBConfig(display, screen, attrs.as_ptr(), &mut fbcount);
            if fb_configs.is_null() || fbcount == 0 {
                xlib::XCloseDisplay(display);
                return Err(WindowError::Unsupported {
                    message: "glXChooseFBConfig found no double-buffered RGBA config".to_string(),
                });
            }
            let fb_config = *fb_configs;

            let visual_info = glx::glXGetVisualFromFBConfig(display, fb_config);
            if visual_info.is_null() {
                xlib::XFree(fb_configs as *mut _);
                xlib::XCloseDisplay(display);
                return Err(WindowError::Unsupported {
                    message: "glXGetVisualFromFBConfig failed".to_string(),
                });
            }
            let visualid = (*visual_info).visualid;

            let root = xlib::XDefaultRootWindow(display);
            let colormap =
                xlib::XCreateColormap(display, root, (*visual_info).visual, xlib::AllocNone);

            let mut swa: xlib::XSetWindowAttributes = std::mem::zeroed();
            swa.colormap = colormap;
            swa.event_mask = xlib::KeyPressMask
                | xlib::KeyReleaseMask
                | xlib::ButtonPressMask
                | xlib::ButtonReleaseMask
                | xlib::StructureNotifyMask;
            let window = xlib::XCreateWindow(
                display,
                root,
                0,
                0,
                width,
                height,
                0,
                (*visual_info).depth,
                xlib::InputOutput as u32,
                (*visual_info).visual,
                xlib::CWColormap | xlib::CWEventMask,
                &mut swa,
            );
            xlib::XFree(visual_info as *mut _);
            xlib::XFree(fb_configs as *mut _);

            let c_title = CString::new(title).unwrap_or_default();
            xlib::XStoreName(display, window, c_title.as_ptr());

            // Strip the title bar and borders.
            let motif = CString::new("_MOTIF_WM_HINTS").unwrap();
            let motif_atom = xlib::XInternAtom(display, motif.as_ptr(), xlib::False);
            let hints: [c_ulong; 5] = [MWM_HINTS_DECORATIONS, 0, 0, 0, 0];
            xlib::XChangeProperty(
                display,
                window,
                motif_atom,
                motif_atom,
                32,
                xlib::PropModeReplace,
                hints.as_ptr() as *const u8,
                hints.len() as c_int,
            );

            let delete = CString::new("WM_DELETE_WINDOW").unwrap();
            let mut wm_delete = xlib::XInternAtom(display, delete.as_ptr(), xlib::False);
            xlib::XSetWMProtocols(display, window, &mut wm_delete, 1);

            // A 1x1 transparent pixmap stands in for a hidden cursor.
            let pixmap = xlib::XCreatePixmap(display, window, 1, 1, 1);
            let mut dummy: xlib::XColor = std::mem::zeroed();
            let blank_cursor =
                xlib::XCreatePixmapCursor(display, pixmap, pixmap, &mut dummy, &mut dummy, 0, 0);
            xlib::XFreePixmap(display, pixmap);
            xlib::XDefineCursor(display, window, blank_cursor);

            xlib::XMapWindow(display, window);
            xlib::XFlush(display);

            let context =
                glx::glXCreateNewContext(display, fb_config, glx::GLX_RGBA_TYPE, ptr::null_mut(), 1);
            if context.is_null() {
                xlib::XDestroyWindow(display, window);
                xlib::XCloseDisplay(display);
                return Err(WindowError::ContextFailed {
                    message: "glXCreateNewContext failed".to_string(),
                });
            }

            if glx::glXMakeCurrent(display, window, context) == 0 {
                glx::glXDestroyContext(display, context);
                xlib::XDestroyWindow(display, window);
                xlib::XCloseDisplay(display);
                return Err(WindowError::ContextFailed {
                    message: "glXMakeCurrent failed".to_string(),
                });
            }

            let mut mirror = Self {
                display,
                window,
                fb_config,
                visualid,
                context,
                wm_delete,
                blank_cursor,
                extent: (width, height),
                keys: KeySet::new(),
                mouse: MouseButtons::default(),
                close_requested: false,
            };
            mirror.set_swap_interval(1);
            Ok(mirror)
        }
    }

    /// The raw handles the OpenXR runtime binds its OpenGL session to.
    pub fn glx_handles(&self) -> GlxHandles {
        GlxHandles {
            display: self.display,
            visualid: self.visualid,
            fb_config: self.fb_config,
            drawable: self.window,
            context: self.context,
        }
    }

    /// Builds a glow context over `glXGetProcAddress`. The GLX context
    /// must be current, which [`MirrorWindow::new`] leaves it.
    pub fn load_gl(&self) -> glow::Context {
        unsafe {
            glow::Context::from_loader_function(|name| {
                let name = CString::new(name).unwrap();
                match glx::glXGetProcAddress(name.as_ptr() as *const u8) {
                    Some(f) => f as *const std::ffi::c_void,
                    None => ptr::null(),
                }
            })
        }
    }

    fn set_swap_interval(&mut self, interval: c_int) {
        unsafe {
            let name = CString::new("glXSwapIntervalEXT").unwrap();
            match glx::glXGetProcAddress(name.as_ptr() as *const u8) {
                Some(f) => {
                    let swap_interval: unsafe extern "C" fn(
                        *mut xlib::Display,
                        glx::GLXDrawable,
                        c_int,
                    ) = std::mem::transmute(f);
                    swap_interval(self.display, self.window, interval);
                }
                None => {
                    log::debug!("glXSwapIntervalEXT not available; vsync left to the driver");
                }
            }
        }
    }
}

impl MirrorSurface for MirrorWindow {
    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn swap_buffers(&mut self) -> Result<(), WindowError> {
        unsafe {
            glx::glXSwapBuffers(self.display, self.window);
        }
        Ok(())
    }

    fn pump(&mut self) -> WindowPoll {
        let mut poll = WindowPoll::default();
        unsafe {
            while xlib::XPending(self.display) > 0 {
                let mut event: xlib::XEvent = std::mem::zeroed();
                xlib::XNextEvent(self.display, &mut event);
                match event.get_type() {
                    xlib::KeyPress | xlib::KeyRelease => {
                        let down = event.get_type() == xlib::KeyPress;
                        let sym = xlib::XLookupKeysym(&mut event.key, 0);
                        if let Some(code) = legacy_key_code(sym) {
                            self.keys.set(code, down);
                        }
                    }
                    xlib::ButtonPress => match event.button.button {
                        1 => self.mouse.left = true,
                        2 => self.mouse.middle = true,
                        3 => self.mouse.right = true,
                        // 4..=7 are the scroll wheel in X's button model.
                        4 => poll.scroll.1 += 1.0,
                        5 => poll.scroll.1 -= 1.0,
                        6 => poll.scroll.0 += 1.0,
                        7 => poll.scroll.0 -= 1.0,
                        8 => self.mouse.back = true,
                        _ => {}
                    },
                    xlib::ButtonRelease => match event.button.button {
                        1 => self.mouse.left = false,
                        2 => self.mouse.middle = false,
                        3 => self.mouse.right = false,
                        8 => self.mouse.back = false,
                        _ => {}
                    },
                    xlib::ConfigureNotify => {
                        let conf = event.configure;
                        let size = (conf.width.max(1) as u32, conf.height.max(1) as u32);
                        if size != self.extent {
                            self.extent = size;
                            poll.resized = Some(size);
                        }
                    }
                    xlib::ClientMessage => {
                        if event.client_message.data.get_long(0) as xlib::Atom == self.wm_delete {
                            self.close_requested = true;
                        }
                    }
                    _ => {}
                }
            }
        }
        poll.close_requested = self.close_requested;
        poll.keys = self.keys;
        poll.mouse = self.mouse;
        poll
    }
}

impl Drop for MirrorWindow {
    fn drop(&mut self) {
        unsafe {
            glx::glXMakeCurrent(self.display, 0, ptr::null_mut());
            glx::glXDestroyContext(self.display, self.context);
            xlib::XFreeCursor(self.display, self.blank_cursor);
            xlib::XDestroyWindow(self.display, self.window);
            xlib::XCloseDisplay(self.display);
        }
    }
}
