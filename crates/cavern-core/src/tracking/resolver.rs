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

//! Turns raw device poses into the queryable head and wand state.
//!
//! Resolution happens once per frame on the render thread. Every output
//! field is last-known-good: a device that fails to report a valid pose
//! leaves all of its derived state untouched, and the wand stays "tracked"
//! forever once a controller has been seen.

use super::source::{DeviceClass, Hand, RawTrackingFrame, MAX_TRACKED_DEVICES};
use super::FEET_PER_METER;
use crate::input::DeviceFamily;
use crate::math::{degrees_to_radians, Mat4, Vec3, Vec4, RAD_TO_DEG};

/// A pose reduced to the legacy query set: position, the three basis
/// vectors, and Euler angles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpacePose {
    /// Position in legacy units.
    pub position: Vec3,
    /// Unit vector to the device's right.
    pub right: Vec3,
    /// Unit vector out of the top of the device.
    pub up: Vec3,
    /// Unit vector the device is facing along.
    pub front: Vec3,
    /// Orientation as YXZ Euler angles, in degrees.
    pub euler: Vec3,
}

impl SpacePose {
    /// Derives the query set from a pose matrix.
    ///
    /// The facing direction is the negated third basis column: the
    /// tracked devices look down their local -Z.
    pub fn from_matrix(m: &Mat4) -> Self {
        Self {
            position: m.translation(),
            right: m.x_axis().normalize(),
            up: m.y_axis().normalize(),
            front: (-m.z_axis()).normalize(),
            euler: m.to_euler_yxz() * RAD_TO_DEG,
        }
    }
}

/// A tracked body's pose in world space and navigated space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyPose {
    /// Pose in (legacy-unit) tracking space.
    pub world: SpacePose,
    /// Pose mapped through the inverse navigation matrix.
    pub nav: SpacePose,
}

/// The per-frame resolved tracking state published to the application
/// thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTracking {
    /// The head pose.
    pub head: BodyPose,
    /// The wand (right-hand controller) pose.
    pub wand: BodyPose,
    /// Latched true from the first frame a right-hand controller reported
    /// a valid pose; never resets.
    pub wand_tracked: bool,
}

impl Default for ResolvedTracking {
    /// The pre-tracking state: everything zeroed except the world facing
    /// directions, which start along -Z.
    fn default() -> Self {
        let mut body = BodyPose::default();
        body.world.front = Vec3::new(0.0, 0.0, -1.0);
        Self {
            head: body,
            wand: body,
            wand_tracked: false,
        }
    }
}

/// Per-frame pose resolution with last-known-good semantics.
#[derive(Debug)]
pub struct PoseResolver {
    hand_correction: Mat4,
    state: ResolvedTracking,
    raw_head: Mat4,
}

impl PoseResolver {
    /// Creates a resolver for a classified device family.
    ///
    /// Oculus Touch controllers are gripped at an angle the runtime does
    /// not compensate for, so their poses get a constant -30 degree pitch
    /// correction; every other family uses the pose as delivered.
    pub fn new(family: DeviceFamily) -> Self {
        let hand_correction = if family == DeviceFamily::OculusTouch {
            Mat4::from_rotation_x(degrees_to_radians(-30.0))
        } else {
            Mat4::IDENTITY
        };
        Self {
            hand_correction,
            state: ResolvedTracking::default(),
            raw_head: Mat4::IDENTITY,
        }
    }

    /// Ingests one frame of raw poses under the current navigation matrix.
    ///
    /// Invalid device slots contribute nothing; a singular navigation
    /// matrix freezes the nav-space fields while world-space fields keep
    /// updating.
    pub fn ingest(&mut self, frame: &RawTrackingFrame, nav: &Mat4) {
        let nav_inverse = nav.inverse();
        if nav_inverse.is_none() {
            log::debug!("Navigation matrix is singular; nav-space poses frozen this frame");
        }

        for device in frame.devices.iter().take(MAX_TRACKED_DEVICES) {
            let Some(pose) = device.pose else { continue };
            match (device.class, device.role) {
                (DeviceClass::Hmd, _) => {
                    self.raw_head = pose;
                    let scaled = scale_to_legacy_units(&pose);
                    self.state.head.world = SpacePose::from_matrix(&scaled);
                    if let Some(inv) = nav_inverse {
                        self.state.head.nav = SpacePose::from_matrix(&(inv * scaled));
                    }
                }
                (DeviceClass::Controller, Some(Hand::Right)) => {
                    // The correction is a pure rotation, so the translation
                    // column passes through unchanged.
                    let scaled = scale_to_legacy_units(&pose) * self.hand_correction;
                    self.state.wand.world = SpacePose::from_matrix(&scaled);
                    if let Some(inv) = nav_inverse {
                        self.state.wand.nav = SpacePose::from_matrix(&(inv * scaled));
                    }
                    self.state.wand_tracked = true;
                }
                _ => {}
            }
        }
    }

    /// The current resolved state (the value the render thread publishes).
    pub fn current(&self) -> ResolvedTracking {
        self.state
    }

    /// The head's raw meter-space pose, as last reported.
    ///
    /// The per-eye view matrix is built from this, not from the scaled
    /// query-side pose.
    pub fn raw_head_pose(&self) -> Mat4 {
        self.raw_head
    }
}

/// Rescales a pose's translation from meters to legacy units, leaving the
/// rotation columns untouched.
fn scale_to_legacy_units(pose: &Mat4) -> Mat4 {
    let mut scaled = *pose;
    scaled.cols[3] = Vec4::from_vec3(pose.translation() / FEET_PER_METER, 1.0);
    scaled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::approx_eq_eps;
    use crate::nav::Navigation;
    use crate::tracking::source::TrackedDevice;

    const TOL: f32 = 1e-4;

    fn head_frame(pose: Option<Mat4>) -> RawTrackingFrame {
        RawTrackingFrame {
            devices: vec![TrackedDevice {
                class: DeviceClass::Hmd,
                role: None,
                pose,
            }],
            controller: None,
        }
    }

    fn wand_frame(hand: Hand, pose: Option<Mat4>) -> RawTrackingFrame {
        RawTrackingFrame {
            devices: vec![TrackedDevice {
                class: DeviceClass::Controller,
                role: Some(hand),
                pose,
            }],
            controller: None,
        }
    }

    fn vec3_close(a: Vec3, b: Vec3) -> bool {
        approx_eq_eps(a.x, b.x, TOL) && approx_eq_eps(a.y, b.y, TOL) && approx_eq_eps(a.z, b.z, TOL)
    }

    #[test]
    fn test_default_state_faces_minus_z() {
        let resolver = PoseResolver::new(DeviceFamily::ViveWand);
        let state = resolver.current();
        assert_eq!(state.head.world.front, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(state.head.world.position, Vec3::ZERO);
        assert_eq!(state.head.nav, SpacePose::default(), "nav state starts zeroed");
        assert!(!state.wand_tracked);
    }

    #[test]
    fn test_head_position_converts_to_legacy_units() {
        let mut resolver = PoseResolver::new(DeviceFamily::ViveWand);
        let pose = Mat4::from_translation(Vec3::new(
            FEET_PER_METER,
            2.0 * FEET_PER_METER,
            -FEET_PER_METER,
        ));
        resolver.ingest(&head_frame(Some(pose)), &Mat4::IDENTITY);

        let head = resolver.current().head.world;
        assert!(
            vec3_close(head.position, Vec3::new(1.0, 2.0, -1.0)),
            "one meter-unit step should read as one legacy unit, got {:?}",
            head.position
        );
        // The raw pose keeps its meter translation for the render pass.
        assert!(vec3_close(
            resolver.raw_head_pose().translation(),
            Vec3::new(FEET_PER_METER, 2.0 * FEET_PER_METER, -FEET_PER_METER)
        ));
    }

    #[test]
    fn test_basis_vectors_from_rotated_head() {
        let mut resolver = PoseResolver::new(DeviceFamily::ViveWand);
        let pose = Mat4::from_rotation_y(degrees_to_radians(90.0));
        resolver.ingest(&head_frame(Some(pose)), &Mat4::IDENTITY);

        let head = resolver.current().head.world;
        assert!(vec3_close(head.front, Vec3::new(-1.0, 0.0, 0.0)));
        assert!(vec3_close(head.right, Vec3::new(0.0, 0.0, -1.0)));
        assert!(vec3_close(head.up, Vec3::Y));
        assert!(
            approx_eq_eps(head.euler.y, 90.0, 1e-2),
            "yaw should read 90 degrees, got {}",
            head.euler.y
        );
    }

    #[test]
    fn test_nav_translate_moves_nav_head_to_its_arguments() {
        let nav = Navigation::new();
        nav.translate(1.0, 2.0, 3.0);

        let mut resolver = PoseResolver::new(DeviceFamily::ViveWand);
        resolver.ingest(&head_frame(Some(Mat4::IDENTITY)), &nav.matrix_snapshot());

        let state = resolver.current();
        assert!(
            vec3_close(state.head.nav.position, Vec3::new(1.0, 2.0, 3.0)),
            "an origin head navigated by translate(x,y,z) should read (x,y,z), got {:?}",
            state.head.nav.position
        );
        // World-space state is unaffected by navigation.
        assert!(vec3_close(state.head.world.position, Vec3::ZERO));
    }

    #[test]
    fn test_invalid_pose_keeps_last_known_good() {
        let mut resolver = PoseResolver::new(DeviceFamily::ViveWand);
        let pose = Mat4::from_translation(Vec3::new(0.0, FEET_PER_METER, 0.0));
        resolver.ingest(&head_frame(Some(pose)), &Mat4::IDENTITY);
        let before = resolver.current();

        resolver.ingest(&head_frame(None), &Mat4::IDENTITY);
        assert_eq!(resolver.current(), before, "an invalid pose must change nothing");

        resolver.ingest(&RawTrackingFrame::default(), &Mat4::IDENTITY);
        assert_eq!(resolver.current(), before, "an empty frame must change nothing");
    }

    #[test]
    fn test_wand_latch_survives_disappearance() {
        let mut resolver = PoseResolver::new(DeviceFamily::ViveWand);
        assert!(!resolver.current().wand_tracked);

        let pose = Mat4::from_translation(Vec3::new(FEET_PER_METER, 0.0, 0.0));
        resolver.ingest(&wand_frame(Hand::Right, Some(pose)), &Mat4::IDENTITY);
        let tracked = resolver.current();
        assert!(tracked.wand_tracked);
        assert!(vec3_close(tracked.wand.world.position, Vec3::X));

        resolver.ingest(&RawTrackingFrame::default(), &Mat4::IDENTITY);
        let after = resolver.current();
        assert!(after.wand_tracked, "the tracked latch never resets");
        assert_eq!(after.wand, tracked.wand, "wand state goes stale, not away");
    }

    #[test]
    fn test_left_hand_controllers_are_ignored() {
        let mut resolver = PoseResolver::new(DeviceFamily::ViveWand);
        let pose = Mat4::from_translation(Vec3::new(0.0, 0.0, -FEET_PER_METER));
        resolver.ingest(&wand_frame(Hand::Left, Some(pose)), &Mat4::IDENTITY);

        let state = resolver.current();
        assert!(!state.wand_tracked);
        assert_eq!(state.wand.world.position, Vec3::ZERO);
    }

    #[test]
    fn test_oculus_grip_correction_pitches_the_wand() {
        let mut vive = PoseResolver::new(DeviceFamily::ViveWand);
        vive.ingest(&wand_frame(Hand::Right, Some(Mat4::IDENTITY)), &Mat4::IDENTITY);
        assert!(vec3_close(
            vive.current().wand.world.front,
            Vec3::new(0.0, 0.0, -1.0)
        ));

        let mut oculus = PoseResolver::new(DeviceFamily::OculusTouch);
        let pose = Mat4::from_translation(Vec3::new(FEET_PER_METER, 0.0, 0.0));
        oculus.ingest(&wand_frame(Hand::Right, Some(pose)), &Mat4::IDENTITY);

        let wand = oculus.current().wand.world;
        assert!(
            vec3_close(wand.front, Vec3::new(0.0, -0.5, -(3.0f32.sqrt()) / 2.0)),
            "a -30 degree pitch correction should tilt the facing down, got {:?}",
            wand.front
        );
        assert!(
            vec3_close(wand.position, Vec3::X),
            "the grip correction must not move the wand"
        );
    }

    #[test]
    fn test_singular_nav_freezes_nav_space_only() {
        let mut resolver = PoseResolver::new(DeviceFamily::ViveWand);
        resolver.ingest(
            &head_frame(Some(Mat4::from_translation(Vec3::new(0.0, FEET_PER_METER, 0.0)))),
            &Mat4::IDENTITY,
        );
        let nav_before = resolver.current().head.nav;

        let pose = Mat4::from_translation(Vec3::new(FEET_PER_METER, FEET_PER_METER, 0.0));
        resolver.ingest(&head_frame(Some(pose)), &Mat4::ZERO);

        let state = resolver.current();
        assert_eq!(state.head.nav, nav_before, "nav pose frozen under a singular matrix");
        assert!(vec3_close(state.head.world.position, Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_device_slots_beyond_the_cap_are_ignored() {
        let mut resolver = PoseResolver::new(DeviceFamily::ViveWand);
        let mut devices = vec![
            TrackedDevice {
                class: DeviceClass::Controller,
                role: Some(Hand::Left),
                pose: None,
            };
            MAX_TRACKED_DEVICES
        ];
        devices.push(TrackedDevice {
            class: DeviceClass::Hmd,
            role: None,
            pose: Some(Mat4::from_translation(Vec3::new(FEET_PER_METER, 0.0, 0.0))),
        });
        resolver.ingest(
            &RawTrackingFrame {
                devices,
                controller: None,
            },
            &Mat4::IDENTITY,
        );
        assert_eq!(
            resolver.current().head.world.position,
            Vec3::ZERO,
            "slot 17 must not be read"
        );
    }
}
