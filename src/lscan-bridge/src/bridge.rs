//! The operations exposed to the host: `init`, `analyse` and `get_licence`

use crate::codec::{self, RectLayout};
use crate::engine::{MatrixElement, RasterHandle, RecognitionEngine, Rect};
use crate::error::EngineError;
use crate::host::HostRuntime;
use crate::marshal;
use crate::registry::HandleRegistry;
use crate::scope::HandleScope;
use crate::tree::ResultTree;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// How an analysis ended.
///
/// The host surface only ever sees a well-shaped tree; this keeps "nothing was
/// found" apart from "something went wrong" for Rust callers and the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Recognized,
    NothingDetected,
    EngineFailed(String),
    ConversionFailed(String),
}

impl AnalysisStatus {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            AnalysisStatus::EngineFailed(_) | AnalysisStatus::ConversionFailed(_)
        )
    }
}

/// Outcome of one `analyse` call, owned by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub text: String,
    pub tree: ResultTree,
    pub status: AnalysisStatus,
}

impl Analysis {
    fn failed(tree: ResultTree, status: AnalysisStatus) -> Self {
        Self {
            text: String::new(),
            tree,
            status,
        }
    }
}

/// An analysis delivered to the host
#[derive(Debug)]
pub struct Delivery<O> {
    /// Root list handed to the host, `None` if not even an empty tree could be built
    pub root: Option<O>,
    pub analysis: Analysis,
}

/// Boundary state: the engine plus the text of the most recent analysis
pub struct Bridge<E> {
    engine: E,
    layout: RectLayout,
    last_text: String,
}

impl<E: RecognitionEngine> Bridge<E> {
    pub fn new(engine: E, layout: RectLayout) -> Self {
        Self {
            engine,
            layout,
            last_text: String::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Initialise the engine. Failures, panics included, are logged and never
    /// reach the host; the return value is for diagnostics only.
    pub fn initialize(&mut self, alphabet: &str, model_path: &str) -> bool {
        info!("init called: {}", alphabet);

        let engine = &mut self.engine;
        match contain(|| engine.initialize(alphabet, model_path)) {
            Ok(()) => true,
            Err(e) => {
                warn!("error init recognition: {}", e);
                false
            }
        }
    }

    /// Read `region` from the host and analyse it
    pub fn analyse<H: HostRuntime>(
        &mut self,
        host: &mut H,
        registry: &HandleRegistry<H::Handles>,
        raster: RasterHandle,
        region: &H::Object,
    ) -> Analysis {
        self.last_text.clear();

        match codec::to_engine(host, registry, self.layout, region) {
            Ok(rect) => self.recognise(raster, rect),
            Err(e) => {
                warn!("failed to read analysis region: {}", e);
                Analysis::failed(
                    ResultTree::hollow(),
                    AnalysisStatus::ConversionFailed(e.to_string()),
                )
            }
        }
    }

    /// Analyse an engine-side region
    pub fn recognise(&mut self, raster: RasterHandle, region: Rect) -> Analysis {
        self.last_text.clear();
        debug!("analysing {:?} of raster {:#x}", region, raster.addr());

        let (text, pairs, regions) = match self.run_engine(raster, region) {
            Ok(output) => output,
            Err(e) => {
                warn!("{}", e);
                return Analysis::failed(
                    ResultTree::empty(region),
                    AnalysisStatus::EngineFailed(e.to_string()),
                );
            }
        };
        self.last_text.clone_from(&text);

        debug!("engine returned {} pairs over {} regions", pairs.len(), regions.len());

        match ResultTree::build(region, &pairs, &regions) {
            Ok(tree) => {
                let status = if text.is_empty() && regions.is_empty() {
                    AnalysisStatus::NothingDetected
                } else {
                    AnalysisStatus::Recognized
                };
                Analysis { text, tree, status }
            }
            Err(e) => {
                error!("engine output rejected: {}", e);
                Analysis {
                    text,
                    tree: ResultTree::empty(region),
                    status: AnalysisStatus::ConversionFailed(e.to_string()),
                }
            }
        }
    }

    /// `analyse`, then build the result as nested host lists.
    ///
    /// Transient host objects are released on every path. If the full tree
    /// cannot be built, a tree of three empty lists is returned instead.
    pub fn analyse_to_host<H: HostRuntime>(
        &mut self,
        host: &mut H,
        registry: &HandleRegistry<H::Handles>,
        raster: RasterHandle,
        region: &H::Object,
    ) -> Delivery<H::Object> {
        let mut analysis = self.analyse(host, registry, raster, region);
        debug!("analysis finished: {:?}", analysis.status);

        if let Some(root) = self.deliver(host, registry, &analysis.tree) {
            return Delivery {
                root: Some(root),
                analysis,
            };
        }

        let hollow = ResultTree::hollow();
        let root = self.deliver(host, registry, &hollow);
        if root.is_none() {
            error!("failed to build even an empty result tree");
        }
        if !analysis.status.is_error() {
            analysis.status =
                AnalysisStatus::ConversionFailed("result tree could not be built".into());
        }
        analysis.tree = hollow;
        Delivery { root, analysis }
    }

    /// Text of the most recent analysis, empty if it failed
    pub fn last_result(&self) -> &str {
        &self.last_text
    }

    /// Side outputs are only read after a successful `analyse`
    fn run_engine(
        &mut self,
        raster: RasterHandle,
        region: Rect,
    ) -> Result<(String, Vec<MatrixElement>, Vec<Rect>), EngineError> {
        let engine = &mut self.engine;
        contain(|| {
            let text = engine.analyse(raster, region)?;
            Ok((text, engine.matched_pairs(), engine.regions()))
        })
    }

    fn deliver<H: HostRuntime>(
        &self,
        host: &mut H,
        registry: &HandleRegistry<H::Handles>,
        tree: &ResultTree,
    ) -> Option<H::Object> {
        let mut scope = HandleScope::new(host);
        match marshal::marshal_tree(&mut scope, registry, self.layout, tree) {
            Ok(root) => scope.escape(root),
            Err(e) => {
                warn!("failed to build result tree: {}", e);
                None
            }
        }
    }
}

/// Run an engine call, turning a panic into [`EngineError::Panicked`]
fn contain<T>(call: impl FnOnce() -> Result<T, EngineError>) -> Result<T, EngineError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(EngineError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
