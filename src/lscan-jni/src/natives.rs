//! Native methods registered on the analyser class

use crate::host::JniHost;
use crate::{BRIDGE, REGISTRY};
use jni::objects::{JObject, JString};
use jni::sys::{jlong, jobject, jstring};
use jni::{JNIEnv, NativeMethod};
use lscan_bridge::RasterHandle;
use std::ffi::c_void;
use std::ptr;
use tracing::{debug, warn};

/// `(name, signature)` of each native method, as declared by the host class
pub(crate) const INIT: (&str, &str) = ("init", "(Ljava/lang/String;Ljava/lang/String;)V");
pub(crate) const ANALYSE: (&str, &str) = (
    "analyse",
    "(JLandroid/graphics/Rect;)Ljava/util/ArrayList;",
);
pub(crate) const GET_LICENCE: (&str, &str) = ("get_licence", "()Ljava/lang/String;");

pub(crate) fn methods() -> [NativeMethod; 3] {
    [
        native(INIT, init as *mut c_void),
        native(ANALYSE, analyse as *mut c_void),
        native(GET_LICENCE, get_licence as *mut c_void),
    ]
}

fn native((name, sig): (&str, &str), fn_ptr: *mut c_void) -> NativeMethod {
    NativeMethod {
        name: name.into(),
        sig: sig.into(),
        fn_ptr,
    }
}

extern "system" fn init<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    alphabet: JString<'local>,
    model: JString<'local>,
) {
    let alphabet = read_string(&mut env, &alphabet);
    let model = read_string(&mut env, &model);
    let (Some(alphabet), Some(model)) = (alphabet, model) else {
        return;
    };
    let Some(bridge) = BRIDGE.get() else {
        warn!("init called before the bridge was loaded");
        return;
    };

    bridge.lock().initialize(&alphabet, &model);
}

extern "system" fn analyse<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    raster: jlong,
    region: JObject<'local>,
) -> jobject {
    let (Some(registry), Some(bridge)) = (REGISTRY.get(), BRIDGE.get()) else {
        warn!("analyse called before the bridge was loaded");
        return ptr::null_mut();
    };

    let mut host = JniHost::new(&mut env);
    let delivery = bridge
        .lock()
        .analyse_to_host(&mut host, registry, RasterHandle::new(raster), &region);

    delivery
        .root
        .map(JObject::into_raw)
        .unwrap_or(ptr::null_mut())
}

extern "system" fn get_licence<'local>(env: JNIEnv<'local>, _this: JObject<'local>) -> jstring {
    debug!("get licence");
    let text = BRIDGE
        .get()
        .map(|bridge| bridge.lock().last_result().to_string())
        .unwrap_or_default();

    match env.new_string(text) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            warn!("failed to create licence string: {}", e);
            ptr::null_mut()
        }
    }
}

fn read_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Option<String> {
    let read: jni::errors::Result<String> = env.get_string(value).map(Into::into);
    match read {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("failed to read string argument: {}", e);
            let _ = env.exception_clear();
            None
        }
    }
}
