//! Test doubles for the platform collaborators.
//!
//! Each fake is cheap to clone; clones share their counters, so a test keeps
//! one copy while the code under test owns the boxed other.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use url::Url;

use crate::capture::{
    CameraApi, CapturedImage, Permission, PermissionApi, PermissionStatus, PhotoStorage, SaveError,
};
use crate::error::MediaError;
use crate::media::PlaybackEngine;
use crate::sound::{SampleId, SoundPool};

#[derive(Clone, Default)]
pub struct FakeSoundPool {
    next_id: Arc<AtomicU32>,
    plays: Arc<AtomicUsize>,
    last_volume: Arc<Mutex<Option<f32>>>,
    fail_playback: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
}

impl FakeSoundPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn last_volume(&self) -> Option<f32> {
        *self.last_volume.lock().unwrap()
    }

    pub fn fail_playback(&self, fail: bool) {
        self.fail_playback.store(fail, Ordering::SeqCst);
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl SoundPool for FakeSoundPool {
    fn load(&mut self, _asset: &Path) -> SampleId {
        SampleId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn play(&mut self, _sample: SampleId, volume: f32) -> Result<(), MediaError> {
        if self.fail_playback.load(Ordering::SeqCst) {
            return Err(MediaError::Output("device unplugged".into()));
        }
        self.plays.fetch_add(1, Ordering::SeqCst);
        *self.last_volume.lock().unwrap() = Some(volume);
        Ok(())
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Prepare(String),
    Play,
    Pause,
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    next_error: Arc<Mutex<Option<MediaError>>>,
    releases: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Makes the next engine call return `error`.
    pub fn fail_next(&self, error: MediaError) {
        *self.next_error.lock().unwrap() = Some(error);
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn record(&self, call: EngineCall) -> Result<(), MediaError> {
        self.calls.lock().unwrap().push(call);
        match self.next_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl PlaybackEngine for FakeEngine {
    fn prepare(&mut self, source: &Url) -> Result<(), MediaError> {
        self.record(EngineCall::Prepare(source.to_string()))
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.record(EngineCall::Play)
    }

    fn pause(&mut self) -> Result<(), MediaError> {
        self.record(EngineCall::Pause)
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Permissions whose requests never answer on their own; tests deliver the
/// result as a [`ScreenEvent`](crate::event::ScreenEvent).
#[derive(Clone)]
pub struct FakePermissions {
    granted: Arc<AtomicBool>,
    checks: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
    cancels: Arc<AtomicUsize>,
}

impl FakePermissions {
    fn with(granted: bool) -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(granted)),
            checks: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(AtomicUsize::new(0)),
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn granted() -> Self {
        Self::with(true)
    }

    pub fn denied() -> Self {
        Self::with(false)
    }

    pub fn set_granted(&self, granted: bool) {
        self.granted.store(granted, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl PermissionApi for FakePermissions {
    fn check(&mut self, _permission: Permission) -> PermissionStatus {
        self.checks.fetch_add(1, Ordering::SeqCst);
        if self.granted.load(Ordering::SeqCst) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    fn request(&mut self, _permission: Permission) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel(&mut self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakeCamera {
    launches: Arc<AtomicUsize>,
    fail_launch: Arc<AtomicBool>,
    cancels: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn fail_launch(&self, fail: bool) {
        self.fail_launch.store(fail, Ordering::SeqCst);
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl CameraApi for FakeCamera {
    fn launch(&mut self) -> Result<()> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(anyhow!("no camera"));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&mut self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakeStorage {
    saved: Arc<Mutex<Vec<String>>>,
    fail_saves: Arc<AtomicBool>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the photos that were written successfully.
    pub fn saved(&self) -> Vec<String> {
        self.saved.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl PhotoStorage for FakeStorage {
    fn save_jpeg(&mut self, name: &str, _image: &CapturedImage) -> Result<PathBuf, SaveError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SaveError::Io(std::io::Error::other("disk full")));
        }
        self.saved.lock().unwrap().push(name.to_string());
        Ok(PathBuf::from("/fake/photos").join(name))
    }
}
