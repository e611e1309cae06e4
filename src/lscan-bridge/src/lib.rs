//! Boundary layer between a managed host runtime and the licence recognition engine
//!
//! The host hands in a decoded raster and a region of interest; the engine's
//! output comes back as three nested host lists of rectangles. This crate is
//! host-agnostic: the host's object model is reached through [`HostRuntime`],
//! the engine through [`RecognitionEngine`]. `lscan-jni` binds both to the JVM.

mod bridge;
mod codec;
mod config;
mod engine;
mod error;
mod host;
pub mod local;
mod marshal;
mod registry;
mod scope;
mod tree;

pub use bridge::{Analysis, AnalysisStatus, Bridge, Delivery};
pub use codec::{to_engine, to_host, HostRect, RectLayout};
pub use config::{BridgeConfig, HostConfig, LoggingConfig, CONFIG_ENV};
pub use engine::{MatrixElement, RasterHandle, RecognitionEngine, Rect};
pub use error::{
    ConversionError, EngineError, HostError, MemberKind, ResolutionError, ResolutionFailure,
    Result, TreeError,
};
pub use host::{Handles, HostRuntime};
pub use marshal::marshal_tree;
pub use registry::{
    DescriptorTable, FieldRole, HandleRegistry, MemberDescriptor, MethodRole, LIST_TYPE, RECT_TYPE,
};
pub use scope::{HandleScope, Scoped};
pub use tree::ResultTree;

/// Resolve the legacy descriptor table against `host`
pub fn resolve_legacy<H: HostRuntime>(
    host: &mut H,
) -> std::result::Result<HandleRegistry<H::Handles>, ResolutionError> {
    HandleRegistry::resolve(host, &DescriptorTable::legacy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_legacy_against_android_host() {
        let mut host = local::LocalHost::android();
        assert!(resolve_legacy(&mut host).is_ok());
    }
}
