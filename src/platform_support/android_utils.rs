//! Android JNI utilities.
//!
//! Shared by the permission, camera and storage backends.

#[cfg(target_os = "android")]
mod android {
    use jni::objects::{JObject, JString, JValue};
    use jni::sys::jobject;
    use jni::JNIEnv;
    use ndk_context::AndroidContext;
    use std::sync::Arc;

    /// Get the Android context from NDK.
    pub fn get_context() -> AndroidContext {
        ndk_context::android_context()
    }

    /// Run a closure with an attached JNI environment.
    pub fn with_jni<F, R>(closure: F) -> jni::errors::Result<R>
    where
        for<'j> F: FnOnce(&mut JNIEnv<'j>) -> jni::errors::Result<R>,
    {
        let context = get_context();
        let vm = Arc::new(unsafe { jni::JavaVM::from_raw(context.vm().cast())? });
        jni::Executor::new(vm).with_attached(|env| closure(env))
    }

    /// Run a closure with an attached JNI environment and the Activity.
    pub fn with_activity<F, R>(closure: F) -> jni::errors::Result<R>
    where
        for<'j> F: FnOnce(&mut JNIEnv<'j>, &JObject<'j>) -> jni::errors::Result<R>,
    {
        with_jni(|env| {
            let activity = get_activity(env)?;
            closure(env, &activity)
        })
    }

    /// Get the Activity as a JObject.
    pub fn get_activity<'j>(_env: &mut JNIEnv<'j>) -> jni::errors::Result<JObject<'j>> {
        let context = get_context();
        let ctx = unsafe { JObject::from_raw(context.context() as jobject) };
        Ok(ctx)
    }

    /// `Activity.getFilesDir().getAbsolutePath()`.
    pub fn files_dir(env: &mut JNIEnv<'_>, activity: &JObject<'_>) -> jni::errors::Result<String> {
        let dir = env
            .call_method(activity, "getFilesDir", "()Ljava/io/File;", &[])?
            .l()?;
        let path = env
            .call_method(&dir, "getAbsolutePath", "()Ljava/lang/String;", &[])?
            .l()?;
        let path: JString = path.into();
        Ok(env.get_string(&path)?.into())
    }

    /// Builds a single-element `String[]`.
    pub fn string_array<'j>(env: &mut JNIEnv<'j>, value: &str) -> jni::errors::Result<JObject<'j>> {
        let value = env.new_string(value)?;
        let array = env.new_object_array(1, "java/lang/String", &value)?;
        Ok(array.into())
    }

    /// Whether the activity currently holds `permission`.
    pub fn has_permission(
        env: &mut JNIEnv<'_>,
        activity: &JObject<'_>,
        permission: &str,
    ) -> jni::errors::Result<bool> {
        let name = env.new_string(permission)?;
        let status = env
            .call_method(
                activity,
                "checkSelfPermission",
                "(Ljava/lang/String;)I",
                &[JValue::Object(&name)],
            )?
            .i()?;
        // PackageManager.PERMISSION_GRANTED
        Ok(status == 0)
    }
}

#[cfg(target_os = "android")]
pub use android::{
    files_dir, get_activity, get_context, has_permission, string_array, with_activity, with_jni,
};
