//! Permission-gated photo capture.
//!
//! One press of the capture button runs one attempt:
//!
//! ```text
//! check permission --granted--> Capturing --photo--> Saved | SaveFailed
//!        |                         ^    \--none--> NoPhotoTaken
//!     denied                       |
//!        v                      granted
//! AwaitingPermission ---------------+
//!        \--denied--> PermissionDenied
//! ```
//!
//! The permission is re-checked on every attempt. A pending request has no
//! timeout: if the OS never answers, the attempt stays pending until the next
//! press, which starts over and replaces it.

pub mod camera;
pub mod permission;
pub mod storage;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::notice::Notice;

pub use camera::{CameraApi, CapturedImage, PlatformCamera};
pub use permission::{Permission, PermissionApi, PermissionStatus, PlatformPermissions};
pub use storage::{PhotoStorage, PrivateStorage, SaveError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    AwaitingPermission,
    Capturing,
    Saved { name: String },
    NoPhotoTaken,
    PermissionDenied,
    CameraUnavailable,
    SaveFailed,
}

impl CaptureState {
    /// Whether an attempt is waiting on the OS or the user.
    pub fn is_pending(&self) -> bool {
        matches!(self, CaptureState::AwaitingPermission | CaptureState::Capturing)
    }
}

/// Generates `photo_<timestamp>_<n>.jpg` names.
///
/// The timestamp has millisecond resolution and `n` increases with every
/// name, so two captures within the same millisecond still differ.
#[derive(Debug, Default)]
pub struct PhotoNamer {
    counter: u64,
}

impl PhotoNamer {
    pub fn next_name(&mut self, now: DateTime<Local>) -> String {
        self.counter += 1;
        format!(
            "photo_{}_{}.jpg",
            now.format("%Y%m%d_%H%M%S_%3f"),
            self.counter
        )
    }
}

pub struct CaptureWorkflow {
    state: CaptureState,
    namer: PhotoNamer,
}

impl Default for CaptureWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureWorkflow {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            namer: PhotoNamer::default(),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Handles a press of the capture button. A pending attempt is
    /// abandoned in favour of the new one.
    pub fn start(
        &mut self,
        permissions: &mut dyn PermissionApi,
        camera: &mut dyn CameraApi,
    ) -> Option<Notice> {
        if self.state.is_pending() {
            info!("Abandoning pending capture ({:?})", self.state);
        }

        match permissions.check(Permission::Camera) {
            PermissionStatus::Granted => self.launch(camera),
            PermissionStatus::Denied => {
                info!("Camera permission missing, asking the user");
                self.state = CaptureState::AwaitingPermission;
                permissions.request(Permission::Camera);
                None
            }
        }
    }

    pub fn on_permission_result(
        &mut self,
        permission: Permission,
        granted: bool,
        camera: &mut dyn CameraApi,
    ) -> Option<Notice> {
        if self.state != CaptureState::AwaitingPermission || permission != Permission::Camera {
            debug!("Ignoring unexpected {:?} permission result", permission);
            return None;
        }

        if granted {
            self.launch(camera)
        } else {
            warn!("Camera permission denied");
            self.state = CaptureState::PermissionDenied;
            Some(Notice::PermissionDenied)
        }
    }

    pub fn on_capture_result(
        &mut self,
        image: Option<CapturedImage>,
        storage: &mut dyn PhotoStorage,
    ) -> Option<Notice> {
        if self.state != CaptureState::Capturing {
            debug!("Ignoring capture result outside of an attempt");
            return None;
        }

        let Some(image) = image else {
            info!("Capture cancelled");
            self.state = CaptureState::NoPhotoTaken;
            return Some(Notice::NoPhotoTaken);
        };

        let name = self.namer.next_name(Local::now());
        match storage.save_jpeg(&name, &image) {
            Ok(path) => {
                info!("Photo saved to {}", path.display());
                self.state = CaptureState::Saved { name: name.clone() };
                Some(Notice::PhotoSaved { name })
            }
            Err(e) => {
                warn!("Failed to save {}: {}", name, e);
                self.state = CaptureState::SaveFailed;
                Some(Notice::SaveFailed)
            }
        }
    }

    fn launch(&mut self, camera: &mut dyn CameraApi) -> Option<Notice> {
        match camera.launch() {
            Ok(()) => {
                self.state = CaptureState::Capturing;
                None
            }
            Err(e) => {
                warn!("Failed to open the capture UI: {:#}", e);
                self.state = CaptureState::CameraUnavailable;
                Some(Notice::CameraUnavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCamera, FakePermissions, FakeStorage};
    use chrono::TimeZone;
    use image::RgbaImage;

    fn photo() -> CapturedImage {
        CapturedImage::new(RgbaImage::new(4, 4))
    }

    #[test]
    fn test_granted_goes_straight_to_camera() {
        let mut workflow = CaptureWorkflow::new();
        let mut permissions = FakePermissions::granted();
        let mut camera = FakeCamera::new();

        assert_eq!(workflow.start(&mut permissions, &mut camera), None);
        assert_eq!(workflow.state(), &CaptureState::Capturing);
        assert_eq!(camera.launches(), 1);
        assert_eq!(permissions.checks(), 1);
        assert_eq!(permissions.requests(), 0);
    }

    #[test]
    fn test_denied_request_reports_once_without_camera() {
        let mut workflow = CaptureWorkflow::new();
        let mut permissions = FakePermissions::denied();
        let mut camera = FakeCamera::new();

        assert_eq!(workflow.start(&mut permissions, &mut camera), None);
        assert_eq!(workflow.state(), &CaptureState::AwaitingPermission);
        assert_eq!(permissions.requests(), 1);

        let notice = workflow.on_permission_result(Permission::Camera, false, &mut camera);
        assert_eq!(notice, Some(Notice::PermissionDenied));
        assert_eq!(workflow.state(), &CaptureState::PermissionDenied);

        assert_eq!(workflow.on_permission_result(Permission::Camera, false, &mut camera), None);
        assert_eq!(camera.launches(), 0);
    }

    #[test]
    fn test_grant_after_request_launches_camera() {
        let mut workflow = CaptureWorkflow::new();
        let mut permissions = FakePermissions::denied();
        let mut camera = FakeCamera::new();

        workflow.start(&mut permissions, &mut camera);
        assert_eq!(workflow.on_permission_result(Permission::Camera, true, &mut camera), None);
        assert_eq!(workflow.state(), &CaptureState::Capturing);
        assert_eq!(camera.launches(), 1);
    }

    #[test]
    fn test_permission_is_checked_every_attempt() {
        let mut workflow = CaptureWorkflow::new();
        let mut permissions = FakePermissions::granted();
        let mut camera = FakeCamera::new();
        let mut storage = FakeStorage::new();

        workflow.start(&mut permissions, &mut camera);
        workflow.on_capture_result(None, &mut storage);

        permissions.set_granted(false);
        workflow.start(&mut permissions, &mut camera);

        assert_eq!(permissions.checks(), 2);
        assert_eq!(workflow.state(), &CaptureState::AwaitingPermission);
        assert_eq!(camera.launches(), 1);
    }

    #[test]
    fn test_cancelled_capture() {
        let mut workflow = CaptureWorkflow::new();
        let mut camera = FakeCamera::new();
        let mut storage = FakeStorage::new();
        workflow.start(&mut FakePermissions::granted(), &mut camera);

        let notice = workflow.on_capture_result(None, &mut storage);
        assert_eq!(notice, Some(Notice::NoPhotoTaken));
        assert_eq!(workflow.state(), &CaptureState::NoPhotoTaken);
        assert!(storage.saved().is_empty());
    }

    #[test]
    fn test_photo_is_saved_once() {
        let mut workflow = CaptureWorkflow::new();
        let mut camera = FakeCamera::new();
        let mut storage = FakeStorage::new();
        workflow.start(&mut FakePermissions::granted(), &mut camera);

        let notice = workflow.on_capture_result(Some(photo()), &mut storage);

        let saved = storage.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(notice, Some(Notice::PhotoSaved { name: saved[0].clone() }));
        assert_eq!(
            workflow.state(),
            &CaptureState::Saved {
                name: saved[0].clone()
            }
        );

        assert_eq!(workflow.on_capture_result(Some(photo()), &mut storage), None);
        assert_eq!(storage.saved().len(), 1);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let mut workflow = CaptureWorkflow::new();
        let mut camera = FakeCamera::new();
        let mut storage = FakeStorage::new();
        storage.fail_saves(true);
        workflow.start(&mut FakePermissions::granted(), &mut camera);

        let notice = workflow.on_capture_result(Some(photo()), &mut storage);
        assert_eq!(notice, Some(Notice::SaveFailed));
        assert_eq!(workflow.state(), &CaptureState::SaveFailed);
        assert!(storage.saved().is_empty());
    }

    #[test]
    fn test_camera_launch_failure() {
        let mut workflow = CaptureWorkflow::new();
        let mut camera = FakeCamera::new();
        camera.fail_launch(true);

        let notice = workflow.start(&mut FakePermissions::granted(), &mut camera);
        assert_eq!(notice, Some(Notice::CameraUnavailable));
        assert!(!workflow.state().is_pending());
    }

    #[test]
    fn test_press_after_lost_result_relaunches() {
        let mut workflow = CaptureWorkflow::new();
        let mut permissions = FakePermissions::granted();
        let mut camera = FakeCamera::new();
        let mut storage = FakeStorage::new();

        workflow.start(&mut permissions, &mut camera);
        assert_eq!(workflow.start(&mut permissions, &mut camera), None);
        assert_eq!(camera.launches(), 2);
        assert_eq!(workflow.state(), &CaptureState::Capturing);

        workflow.on_capture_result(Some(photo()), &mut storage);
        assert_eq!(storage.saved().len(), 1);
        assert!(!workflow.state().is_pending());
    }

    #[test]
    fn test_rapid_captures_get_distinct_names() {
        let mut workflow = CaptureWorkflow::new();
        let mut permissions = FakePermissions::granted();
        let mut camera = FakeCamera::new();
        let mut storage = FakeStorage::new();

        for _ in 0..2 {
            workflow.start(&mut permissions, &mut camera);
            workflow.on_capture_result(Some(photo()), &mut storage);
        }

        let saved = storage.saved();
        assert_eq!(saved.len(), 2);
        assert_ne!(saved[0], saved[1]);
    }

    #[test]
    fn test_names_differ_within_one_millisecond() {
        let mut namer = PhotoNamer::default();
        let now = Local.with_ymd_and_hms(2024, 5, 17, 9, 30, 5).unwrap();

        let first = namer.next_name(now);
        let second = namer.next_name(now);

        assert_eq!(first, "photo_20240517_093005_000_1.jpg");
        assert_ne!(first, second);
    }
}
