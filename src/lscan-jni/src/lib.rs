//! JNI binding for the licence scanner bridge
//!
//! The library that links the recognition engine exports the JVM load hook
//! with [`export_analyser!`]:
//!
//! ```ignore
//! lscan_jni::export_analyser!(plate_engine::Recognizer::default());
//! ```
//!
//! On load the host contract is resolved, the bridge state is installed and
//! only then are `init`, `analyse` and `get_licence` registered on the
//! analyser class. A load that fails at any step returns `JNI_ERR`.

mod host;
mod logging;
mod natives;

pub use host::{JniHandles, JniHost};
pub use jni;
pub use logging::{init_logger, Component, TaggedFormatter};

use anyhow::{anyhow, Context, Result};
use jni::sys::{jint, JNI_ERR, JNI_VERSION_1_6};
use jni::JavaVM;
use lscan_bridge::{Bridge, BridgeConfig, HandleRegistry, RecognitionEngine};
use parking_lot::Mutex;
use std::sync::OnceLock;
use tracing::{error, info, warn};

pub type SharedEngine = Box<dyn RecognitionEngine + Send>;

/// Written once by [`on_load`], read-only afterwards
pub(crate) static REGISTRY: OnceLock<HandleRegistry<JniHandles>> = OnceLock::new();

/// Serialises host calls; the host may invoke natives from any thread
pub(crate) static BRIDGE: OnceLock<Mutex<Bridge<SharedEngine>>> = OnceLock::new();

/// Body of `JNI_OnLoad`
pub fn on_load(vm: &JavaVM, engine: SharedEngine) -> jint {
    let config = BridgeConfig::load(None);

    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    // a subscriber may already be installed by another library in the process
    let _ = init_logger(&logging);

    let config = config.unwrap_or_else(|e| {
        warn!("{:#}; using default configuration", e);
        BridgeConfig::default()
    });

    match install(vm, &config, engine) {
        Ok(()) => {
            info!("registered natives on {}", config.host.analyser_class);
            JNI_VERSION_1_6
        }
        Err(e) => {
            error!("JNI error: {:#}", e);
            JNI_ERR
        }
    }
}

fn install(vm: &JavaVM, config: &BridgeConfig, engine: SharedEngine) -> Result<()> {
    let mut env = vm.get_env().context("failed to get JNI environment")?;

    let registry = lscan_bridge::resolve_legacy(&mut JniHost::new(&mut env))?;

    let class = env
        .find_class(config.host.analyser_class.as_str())
        .with_context(|| format!("can't find {}", config.host.analyser_class))?;

    REGISTRY
        .set(registry)
        .map_err(|_| anyhow!("host handles already resolved"))?;
    BRIDGE
        .set(Mutex::new(Bridge::new(engine, config.host.rect_layout)))
        .map_err(|_| anyhow!("bridge already installed"))?;

    env.register_native_methods(&class, &natives::methods())
        .context("failed to register native methods")?;

    Ok(())
}

/// Export `JNI_OnLoad` for a library whose analyser uses `$engine`
#[macro_export]
macro_rules! export_analyser {
    ($engine:expr) => {
        #[no_mangle]
        pub extern "system" fn JNI_OnLoad(
            vm: $crate::jni::JavaVM,
            _reserved: *mut ::std::ffi::c_void,
        ) -> $crate::jni::sys::jint {
            $crate::on_load(&vm, ::std::boxed::Box::new($engine))
        }
    };
}
