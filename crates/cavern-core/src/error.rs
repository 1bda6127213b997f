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

//! Error types for the tracking, window and render layers.
//!
//! The policy split is part of the contract: session/window/pipeline setup
//! failures are fatal (logged, then the process terminates — there is no
//! windowed fallback mode), per-frame tracking hiccups are transient (the
//! resolver keeps last-known-good values), and malformed legacy inputs
//! (unknown axis characters, unhandled query ids) are silent no-ops at the
//! API surface rather than errors.

use std::fmt;

/// Errors from the HMD runtime session and per-frame pose acquisition.
#[derive(Debug)]
pub enum TrackingError {
    /// Creating the runtime session failed. Fatal.
    Init {
        /// Description of the failure, including the runtime's own error.
        message: String,
    },
    /// A single frame's pose acquisition failed. Non-fatal: derived state
    /// keeps its previous values and the loop continues.
    Transient {
        /// Description of the hiccup.
        message: String,
    },
    /// The runtime ended the session (headset shut down, runtime exit).
    /// Not an init failure: the render loop drains cleanly.
    SessionEnded,
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::Init { message } => {
                write!(f, "HMD runtime initialization failed: {message}")
            }
            TrackingError::Transient { message } => {
                write!(f, "Pose acquisition failed this frame: {message}")
            }
            TrackingError::SessionEnded => write!(f, "HMD runtime ended the session"),
        }
    }
}

impl std::error::Error for TrackingError {}

/// Errors from mirror-window and GL-context creation or presentation.
#[derive(Debug)]
pub enum WindowError {
    /// Creating the native window failed. Fatal.
    CreationFailed {
        /// Description of the failure.
        message: String,
    },
    /// Creating or binding the GL context failed. Fatal.
    ContextFailed {
        /// Description of the failure.
        message: String,
    },
    /// The platform cannot host the session (e.g. no X11 display).
    Unsupported {
        /// What is missing.
        message: String,
    },
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::CreationFailed { message } => {
                write!(f, "Mirror window creation failed: {message}")
            }
            WindowError::ContextFailed { message } => {
                write!(f, "GL context creation failed: {message}")
            }
            WindowError::Unsupported { message } => {
                write!(f, "Platform not supported: {message}")
            }
        }
    }
}

impl std::error::Error for WindowError {}

/// Errors from the per-eye framebuffer pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// Allocating a GL resource (texture, framebuffer) failed. Fatal.
    ResourceCreation {
        /// Description of the failed resource.
        message: String,
    },
    /// An eye framebuffer did not reach completeness. Fatal.
    Incomplete {
        /// The GL framebuffer status value.
        status: u32,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::ResourceCreation { message } => {
                write!(f, "GL resource creation failed: {message}")
            }
            PipelineError::Incomplete { status } => {
                write!(f, "Eye framebuffer incomplete (status {status:#x})")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// Errors from per-eye submission and frame-end handoff to the compositor.
#[derive(Debug)]
pub enum DisplayError {
    /// Submitting an eye texture failed.
    Submit {
        /// Which eye and why.
        message: String,
    },
    /// Ending the frame / handing off to the compositor failed.
    FrameEnd {
        /// Description of the failure.
        message: String,
    },
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Submit { message } => write!(f, "Eye submission failed: {message}"),
            DisplayError::FrameEnd { message } => write!(f, "Frame handoff failed: {message}"),
        }
    }
}

impl std::error::Error for DisplayError {}

/// Umbrella error at the render-thread boundary.
///
/// Everything the thread can fail with, so the driver has one type to log
/// and classify.
#[derive(Debug)]
pub enum VrError {
    /// A tracking-layer error.
    Tracking(TrackingError),
    /// A window-layer error.
    Window(WindowError),
    /// A pipeline-layer error.
    Pipeline(PipelineError),
    /// A display-layer error.
    Display(DisplayError),
}

impl VrError {
    /// Whether the error is fatal under the layer's policy.
    ///
    /// Only per-frame transient tracking errors are survivable; a session
    /// end drains the loop but is not treated as a failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            VrError::Tracking(TrackingError::Transient { .. })
                | VrError::Tracking(TrackingError::SessionEnded)
        )
    }
}

impl fmt::Display for VrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VrError::Tracking(e) => write!(f, "Tracking error: {e}"),
            VrError::Window(e) => write!(f, "Window error: {e}"),
            VrError::Pipeline(e) => write!(f, "Pipeline error: {e}"),
            VrError::Display(e) => write!(f, "Display error: {e}"),
        }
    }
}

impl std::error::Error for VrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VrError::Tracking(e) => Some(e),
            VrError::Window(e) => Some(e),
            VrError::Pipeline(e) => Some(e),
            VrError::Display(e) => Some(e),
        }
    }
}

impl From<TrackingError> for VrError {
    fn from(err: TrackingError) -> Self {
        VrError::Tracking(err)
    }
}

impl From<WindowError> for VrError {
    fn from(err: WindowError) -> Self {
        VrError::Window(err)
    }
}

impl From<PipelineError> for VrError {
    fn from(err: PipelineError) -> Self {
        VrError::Pipeline(err)
    }
}

impl From<DisplayError> for VrError {
    fn from(err: DisplayError) -> Self {
        VrError::Display(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_tracking_error_display_format() {
        let err = TrackingError::Init {
            message: "no HMD attached".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "HMD runtime initialization failed: no HMD attached"
        );
    }

    #[test]
    fn test_pipeline_error_status_is_hex() {
        let err = PipelineError::Incomplete { status: 0x8cd6 };
        assert!(
            format!("{err}").contains("0x8cd6"),
            "framebuffer status should render in hex: {err}"
        );
    }

    #[test]
    fn test_vr_error_source_chain() {
        let err: VrError = WindowError::ContextFailed {
            message: "GLX unavailable".to_string(),
        }
        .into();
        let source = err.source().expect("umbrella error should expose a source");
        assert!(format!("{source}").contains("GLX unavailable"));
    }

    #[test]
    fn test_fatality_classification() {
        assert!(VrError::from(TrackingError::Init {
            message: "x".into()
        })
        .is_fatal());
        assert!(!VrError::from(TrackingError::Transient {
            message: "x".into()
        })
        .is_fatal());
        assert!(!VrError::from(TrackingError::SessionEnded).is_fatal());
        assert!(VrError::from(PipelineError::Incomplete { status: 0 }).is_fatal());
    }
}
