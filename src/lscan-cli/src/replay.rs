//! Replay recorded engine output through the bridge

use anyhow::{Context, Result};
use lscan_bridge::{EngineError, MatrixElement, RasterHandle, RecognitionEngine, Rect};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// One recorded engine run
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    /// Recognised text
    #[serde(default)]
    pub text: String,

    /// Candidate pairs (`dmatrix`)
    #[serde(default)]
    pub pairs: Vec<MatrixElement>,

    /// Detected regions (`type`)
    #[serde(default)]
    pub regions: Vec<Rect>,

    /// Make `analyse` fail with this message
    #[serde(default)]
    pub error: Option<String>,
}

impl Fixture {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))
    }
}

/// Engine that answers every call with a fixture
pub struct ReplayEngine {
    fixture: Fixture,
    analysed: bool,
}

impl ReplayEngine {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            fixture,
            analysed: false,
        }
    }
}

impl RecognitionEngine for ReplayEngine {
    fn initialize(&mut self, alphabet: &str, model_path: &str) -> Result<(), EngineError> {
        debug!("replay engine ignores alphabet {:?} and model {:?}", alphabet, model_path);
        Ok(())
    }

    fn analyse(&mut self, _raster: RasterHandle, region: Rect) -> Result<String, EngineError> {
        debug!("replaying analysis of {:?}", region);
        self.analysed = false;
        if let Some(message) = &self.fixture.error {
            return Err(EngineError::RecognitionFailed(message.clone()));
        }
        self.analysed = true;
        Ok(self.fixture.text.clone())
    }

    fn matched_pairs(&self) -> Vec<MatrixElement> {
        if self.analysed {
            self.fixture.pairs.clone()
        } else {
            Vec::new()
        }
    }

    fn regions(&self) -> Vec<Rect> {
        if self.analysed {
            self.fixture.regions.clone()
        } else {
            Vec::new()
        }
    }
}

/// Parse `x,y,width,height`
pub fn parse_region(s: &str) -> Result<Rect, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid region '{}': {}", s, e))?;

    match parts.as_slice() {
        [x, y, w, h] if *w >= 0 && *h >= 0 => Ok(Rect::new(*x, *y, *w, *h)),
        [_, _, _, _] => Err(format!("invalid region '{}': width and height must be >= 0", s)),
        _ => Err(format!("invalid region '{}': expected x,y,width,height", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lscan_bridge::local::LocalHost;
    use lscan_bridge::{resolve_legacy, AnalysisStatus, Bridge, RectLayout};
    use std::io::Write;

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region("1, 2,30,40"), Ok(Rect::new(1, 2, 30, 40)));
        assert!(parse_region("1,2,3").is_err());
        assert!(parse_region("1,2,-3,4").is_err());
        assert!(parse_region("a,b,c,d").is_err());
    }

    #[test]
    fn test_fixture_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"text": "XX-99-YY", "pairs": [{{"b": 0, "bb": 1}}],
                "regions": [{{"x": 1, "y": 2, "width": 3, "height": 4}},
                            {{"x": 5, "y": 6, "width": 7, "height": 8}}]}}"#
        )
        .unwrap();

        let fixture = Fixture::from_file(file.path()).unwrap();
        assert_eq!(fixture.text, "XX-99-YY");
        assert_eq!(fixture.pairs, vec![MatrixElement::new(0, 1)]);
        assert_eq!(fixture.regions.len(), 2);
        assert!(fixture.error.is_none());
    }

    #[test]
    fn test_failed_replay_exposes_no_side_outputs() {
        let fixture = Fixture {
            text: "stale".into(),
            regions: vec![Rect::new(0, 0, 1, 1)],
            error: Some("blurred".into()),
            ..Default::default()
        };
        let mut bridge = Bridge::new(ReplayEngine::new(fixture), RectLayout::Legacy);

        let analysis = bridge.recognise(RasterHandle::new(0), Rect::new(0, 0, 10, 10));

        assert_eq!(
            analysis.status,
            AnalysisStatus::EngineFailed("recognition failed: blurred".into())
        );
        assert!(bridge.engine().regions().is_empty());
        assert_eq!(bridge.last_result(), "");
    }

    #[test]
    fn test_replay_delivers_fixture_to_host() {
        let fixture = Fixture {
            text: "XX-99-YY".into(),
            pairs: vec![MatrixElement::new(1, 0)],
            regions: vec![Rect::new(10, 20, 30, 40), Rect::new(50, 60, 70, 80)],
            error: None,
        };
        let mut host = LocalHost::android();
        let registry = resolve_legacy(&mut host).unwrap();
        let region = host.new_region(RectLayout::Legacy.to_host(Rect::new(0, 0, 100, 50)));
        let mut bridge = Bridge::new(ReplayEngine::new(fixture), RectLayout::Legacy);

        let raster = RasterHandle::new(0x10);
        let delivery = bridge.analyse_to_host(&mut host, &registry, raster, &region);

        assert_eq!(delivery.analysis.status, AnalysisStatus::Recognized);
        assert_eq!(
            delivery.analysis.tree.matched,
            vec![Rect::new(50, 60, 70, 80), Rect::new(10, 20, 30, 40)]
        );
        assert_eq!(bridge.last_result(), "XX-99-YY");

        let root = delivery.root.unwrap();
        let snapshot = host.snapshot(&root).unwrap();
        assert_eq!(snapshot.as_list().map(<[_]>::len), Some(3));
        assert_eq!(host.stats().live, 1);
    }
}
