//! Runtime permission checks.
//!
//! On Android this goes through `Activity.checkSelfPermission` and
//! `Activity.requestPermissions`. The answer comes back through
//! `MainActivity.onRequestPermissionsResult`, which forwards to the native
//! hook below. Desktop platforms have no runtime permission model, so every
//! check reports granted.

use crate::event::EventSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Camera,
}

impl Permission {
    pub fn android_name(&self) -> &'static str {
        match self {
            Permission::Camera => "android.permission.CAMERA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

pub trait PermissionApi {
    /// Asks the OS for the current status. Never cached.
    fn check(&mut self, permission: Permission) -> PermissionStatus;

    /// Prompts the user. The answer arrives as
    /// [`ScreenEvent::PermissionResult`](crate::event::ScreenEvent::PermissionResult),
    /// or never.
    fn request(&mut self, permission: Permission);

    /// Drops any outstanding request so a late answer is ignored.
    fn cancel(&mut self);
}

pub struct PlatformPermissions {
    events: EventSender,
}

impl PlatformPermissions {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

#[cfg(target_os = "android")]
mod android {
    use super::{Permission, PermissionApi, PermissionStatus, PlatformPermissions};
    use crate::event::{self, EventSender, ScreenEvent};
    use crate::platform_support::android_utils::{has_permission, string_array, with_activity};
    use jni::objects::{JObject, JValue};
    use jni::JNIEnv;
    use std::sync::Mutex;
    use tracing::{error, info, warn};

    pub const PERMISSION_REQUEST_CODE: i32 = 9100;

    static PENDING_REQUEST: Mutex<Option<(Permission, EventSender)>> = Mutex::new(None);

    impl PermissionApi for PlatformPermissions {
        fn check(&mut self, permission: Permission) -> PermissionStatus {
            match with_activity(|env, activity| has_permission(env, activity, permission.android_name())) {
                Ok(true) => PermissionStatus::Granted,
                Ok(false) => PermissionStatus::Denied,
                Err(e) => {
                    error!("Failed to check {:?} permission: {:?}", permission, e);
                    PermissionStatus::Denied
                }
            }
        }

        fn request(&mut self, permission: Permission) {
            *PENDING_REQUEST.lock().unwrap() = Some((permission, self.events.clone()));

            let launched = with_activity(|env, activity| {
                let names = string_array(env, permission.android_name())?;
                env.call_method(
                    activity,
                    "requestPermissions",
                    "([Ljava/lang/String;I)V",
                    &[JValue::Object(&names), JValue::Int(PERMISSION_REQUEST_CODE)],
                )?;
                Ok(())
            });

            match launched {
                Ok(()) => info!("Requested {:?} permission", permission),
                Err(e) => {
                    error!("Failed to request {:?} permission: {:?}", permission, e);
                    if let Some((permission, events)) = PENDING_REQUEST.lock().unwrap().take() {
                        event::post(
                            &events,
                            ScreenEvent::PermissionResult {
                                permission,
                                granted: false,
                            },
                        );
                    }
                }
            }
        }

        fn cancel(&mut self) {
            if let Some((permission, _)) = PENDING_REQUEST.lock().unwrap().take() {
                info!("Pending {:?} permission request cancelled", permission);
            }
        }
    }

    pub fn handle_permission_result(request_code: i32, granted: bool) {
        if request_code != PERMISSION_REQUEST_CODE {
            return;
        }

        let Some((permission, events)) = PENDING_REQUEST.lock().unwrap().take() else {
            warn!("Permission result with no request pending");
            return;
        };
        info!("{:?} permission granted: {}", permission, granted);
        event::post(&events, ScreenEvent::PermissionResult { permission, granted });
    }

    /// JNI entry point called from MainActivity when onRequestPermissionsResult fires.
    #[unsafe(no_mangle)]
    pub extern "system" fn Java_dev_dioxus_main_MainActivity_handleNativePermissionResult(
        _env: JNIEnv<'_>,
        _class: JObject<'_>,
        request_code: jni::sys::jint,
        granted: jni::sys::jboolean,
    ) {
        handle_permission_result(request_code, granted != 0);
    }
}

#[cfg(not(target_os = "android"))]
impl PermissionApi for PlatformPermissions {
    fn check(&mut self, _permission: Permission) -> PermissionStatus {
        PermissionStatus::Granted
    }

    fn request(&mut self, permission: Permission) {
        crate::event::post(
            &self.events,
            crate::event::ScreenEvent::PermissionResult {
                permission,
                granted: true,
            },
        );
    }

    fn cancel(&mut self) {}
}
