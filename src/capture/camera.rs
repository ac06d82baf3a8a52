//! The platform capture UI.
//!
//! Android launches `MediaStore.ACTION_IMAGE_CAPTURE` and reads the preview
//! bitmap out of the result intent. Desktop has no camera intent, so the
//! capture UI is an image picker and the chosen file becomes the photo.
//! Either way the outcome is posted as
//! [`ScreenEvent::CaptureResult`](crate::event::ScreenEvent::CaptureResult).

use std::fmt;

use anyhow::Result;
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::event::EventSender;

/// Pixels from one capture attempt.
#[derive(Clone)]
pub struct CapturedImage {
    pixels: RgbaImage,
}

impl CapturedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// JPEG has no alpha channel.
    pub fn to_rgb(&self) -> RgbImage {
        DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8()
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

pub trait CameraApi {
    /// Opens the capture UI. Returns once it is showing; the photo (or the
    /// cancellation) is posted later.
    fn launch(&mut self) -> Result<()>;

    /// Forgets the outstanding attempt. A result that still arrives for it is
    /// dropped.
    fn cancel(&mut self);
}

pub struct PlatformCamera {
    events: EventSender,
}

impl PlatformCamera {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

#[cfg(target_os = "android")]
mod android {
    use super::{CameraApi, CapturedImage, PlatformCamera};
    use crate::event::{self, EventSender, ScreenEvent};
    use crate::platform_support::android_utils::{with_activity, with_jni};
    use anyhow::{Result, anyhow};
    use image::RgbaImage;
    use jni::objects::{JIntArray, JObject, JValue};
    use jni::sys::jobject;
    use jni::JNIEnv;
    use std::sync::Mutex;
    use tracing::{error, info, warn};

    pub const CAPTURE_REQUEST_CODE: i32 = 9200;

    static PENDING_CAPTURE: Mutex<Option<EventSender>> = Mutex::new(None);

    impl CameraApi for PlatformCamera {
        fn launch(&mut self) -> Result<()> {
            if PENDING_CAPTURE
                .lock()
                .unwrap()
                .replace(self.events.clone())
                .is_some()
            {
                warn!("Replacing a capture that never returned a result");
            }

            let launched = with_activity(|env, activity| {
                let intent_class = env.find_class("android/content/Intent")?;
                let action = env.new_string("android.media.action.IMAGE_CAPTURE")?;
                let intent = env.new_object(
                    &intent_class,
                    "(Ljava/lang/String;)V",
                    &[JValue::Object(&action)],
                )?;
                env.call_method(
                    activity,
                    "startActivityForResult",
                    "(Landroid/content/Intent;I)V",
                    &[JValue::Object(&intent), JValue::Int(CAPTURE_REQUEST_CODE)],
                )?;
                Ok(())
            });

            if let Err(e) = launched {
                *PENDING_CAPTURE.lock().unwrap() = None;
                return Err(anyhow!("Failed to launch camera: {:?}", e));
            }

            info!("Camera launched, waiting for result...");
            Ok(())
        }

        fn cancel(&mut self) {
            if PENDING_CAPTURE.lock().unwrap().take().is_some() {
                info!("Pending capture cancelled");
            }
        }
    }

    pub fn handle_activity_result(request_code: i32, result_code: i32, data_ptr: jobject) {
        if request_code != CAPTURE_REQUEST_CODE {
            return;
        }

        let Some(events) = PENDING_CAPTURE.lock().unwrap().take() else {
            warn!("Camera result with no capture pending");
            return;
        };

        let result = with_jni(|env| {
            // RESULT_OK = -1
            if result_code != -1 || data_ptr.is_null() {
                return Ok(None);
            }
            let data = unsafe { JObject::from_raw(data_ptr) };
            let extras = env
                .call_method(&data, "getExtras", "()Landroid/os/Bundle;", &[])?
                .l()?;
            if extras.is_null() {
                return Ok(None);
            }
            let key = env.new_string("data")?;
            let bitmap = env
                .call_method(
                    &extras,
                    "get",
                    "(Ljava/lang/String;)Ljava/lang/Object;",
                    &[JValue::Object(&key)],
                )?
                .l()?;
            if bitmap.is_null() {
                return Ok(None);
            }
            read_bitmap(env, &bitmap).map(Some)
        });

        let image = match result {
            Ok(image) => image,
            Err(e) => {
                error!("Failed to read camera result: {:?}", e);
                None
            }
        };
        event::post(&events, ScreenEvent::CaptureResult(image));
    }

    fn read_bitmap(env: &mut JNIEnv<'_>, bitmap: &JObject<'_>) -> jni::errors::Result<CapturedImage> {
        let width = env.call_method(bitmap, "getWidth", "()I", &[])?.i()?;
        let height = env.call_method(bitmap, "getHeight", "()I", &[])?.i()?;
        let count = (width * height) as usize;

        let pixels: JIntArray = env.new_int_array(width * height)?;
        env.call_method(
            bitmap,
            "getPixels",
            "([IIIIIII)V",
            &[
                JValue::Object(&pixels),
                JValue::Int(0),
                JValue::Int(width),
                JValue::Int(0),
                JValue::Int(0),
                JValue::Int(width),
                JValue::Int(height),
            ],
        )?;

        let mut argb = vec![0i32; count];
        env.get_int_array_region(&pixels, 0, &mut argb)?;

        let mut rgba = Vec::with_capacity(count * 4);
        for pixel in argb {
            let [a, r, g, b] = (pixel as u32).to_be_bytes();
            rgba.extend_from_slice(&[r, g, b, a]);
        }

        let image = RgbaImage::from_raw(width as u32, height as u32, rgba)
            .ok_or(jni::errors::Error::JavaException)?;
        Ok(CapturedImage::new(image))
    }

    /// JNI entry point called from MainActivity when onActivityResult fires.
    #[unsafe(no_mangle)]
    pub extern "system" fn Java_dev_dioxus_main_MainActivity_handleNativeActivityResult(
        _env: JNIEnv<'_>,
        _class: JObject<'_>,
        request_code: jni::sys::jint,
        result_code: jni::sys::jint,
        data: JObject<'_>,
    ) {
        handle_activity_result(request_code, result_code, data.as_raw());
    }
}

#[cfg(not(target_os = "android"))]
impl CameraApi for PlatformCamera {
    fn launch(&mut self) -> Result<()> {
        use crate::event::{self, ScreenEvent};
        use tracing::{info, warn};

        let events = self.events.clone();
        dioxus::prelude::spawn(async move {
            let file = rfd::AsyncFileDialog::new()
                .set_title("Take a photo")
                .add_filter("Images", &["jpg", "jpeg", "png", "bmp", "webp"])
                .pick_file()
                .await;

            let image = match file {
                Some(file) => {
                    let path = file.path().to_path_buf();
                    match image::open(&path) {
                        Ok(decoded) => {
                            info!("Captured {}", path.display());
                            Some(CapturedImage::new(decoded.to_rgba8()))
                        }
                        Err(e) => {
                            warn!("Failed to read {}: {}", path.display(), e);
                            None
                        }
                    }
                }
                None => None,
            };
            event::post(&events, ScreenEvent::CaptureResult(image));
        });
        Ok(())
    }

    fn cancel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_rgb_drops_alpha() {
        let image = CapturedImage::new(RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 128])));
        let rgb = image.to_rgb();

        assert_eq!(rgb.dimensions(), (2, 3));
        assert_eq!(rgb.get_pixel(1, 2).0, [10, 20, 30]);
        assert_eq!(format!("{image:?}"), "CapturedImage { width: 2, height: 3 }");
    }
}
