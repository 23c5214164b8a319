//! Stimulus-by-stimulus correction session.
//!
//! The session walks the stimuli of a gaze table, runs a [`PointEditor`] per
//! visit against a [`Frontend`], and persists the record after every visit so
//! an interrupted session loses at most the current stimulus.

use crate::assets::{AssetError, AssetSource};
use crate::config::SessionConfig;
use crate::correspondence::Correspondences;
use crate::editor::{Direction, InputEvent, PointEditor, Transition};
use crate::frontend::{Frontend, FrontendError};
use crate::gaze::{simplify_trace, GazeTable};
use crate::render::StimulusScene;
use crate::store::{CorrespondenceStore, StoreError, StoredPairs};

#[derive(Debug)]
pub enum SessionError {
    Asset(AssetError),
    Store(StoreError),
    Frontend(FrontendError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset(e) => write!(f, "{}", e),
            Self::Store(e) => write!(f, "saving record: {}", e),
            Self::Frontend(e) => write!(f, "frontend: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Asset(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Frontend(e) => Some(e),
        }
    }
}

impl From<AssetError> for SessionError {
    fn from(e: AssetError) -> Self {
        Self::Asset(e)
    }
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<FrontendError> for SessionError {
    fn from(e: FrontendError) -> Self {
        Self::Frontend(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Completed stimulus visits, revisits included.
    pub visited: usize,
    /// Navigation that ended the session; `None` if there was nothing to edit.
    pub last_direction: Option<Direction>,
}

pub struct CorrectionSession<'a> {
    table: &'a GazeTable,
    store: &'a mut CorrespondenceStore,
    assets: &'a dyn AssetSource,
    config: &'a SessionConfig,
}

impl<'a> CorrectionSession<'a> {
    pub fn new(
        table: &'a GazeTable,
        store: &'a mut CorrespondenceStore,
        assets: &'a dyn AssetSource,
        config: &'a SessionConfig,
    ) -> Self {
        Self {
            table,
            store,
            assets,
            config,
        }
    }

    pub fn run(&mut self, frontend: &mut dyn Frontend) -> Result<SessionSummary, SessionError> {
        let stimuli = self.table.stimuli();
        let mut summary = SessionSummary {
            visited: 0,
            last_direction: None,
        };
        if stimuli.is_empty() {
            tracing::warn!("Gaze table has no stimuli; nothing to edit");
            return Ok(summary);
        }

        let mut index = 0usize;
        loop {
            let stimulus = &stimuli[index];
            let (pairs, direction) = self.visit(stimulus, index, stimuli.len(), frontend)?;
            self.store.set(stimulus, pairs);
            self.store.save()?;
            summary.visited += 1;
            summary.last_direction = Some(direction);

            match direction {
                Direction::Next if index + 1 < stimuli.len() => index += 1,
                Direction::Previous if index > 0 => index -= 1,
                _ => break,
            }
        }
        tracing::info!(
            "Session ended after {} visits ({} of {} stimuli corrected)",
            summary.visited,
            self.store.corrected_count(),
            stimuli.len()
        );
        Ok(summary)
    }

    fn visit(
        &self,
        stimulus: &str,
        index: usize,
        total: usize,
        frontend: &mut dyn Frontend,
    ) -> Result<(Correspondences, Direction), SessionError> {
        let image = self.assets.load(stimulus)?;
        let pairs = match self.store.get(stimulus) {
            StoredPairs::Defined(pairs) => pairs.clone(),
            StoredPairs::Uncorrected => {
                Correspondences::image_anchors(image.width() as f64, image.height() as f64)
            }
        };
        tracing::info!(
            "[{}/{}] {}: {} pairs",
            index + 1,
            total,
            stimulus,
            pairs.len()
        );

        let trace = simplify_trace(&self.table.trace(stimulus), self.config.simplify_window);
        let scene = StimulusScene::new(
            format!("{}/{}: {}", index + 1, total, stimulus),
            &image,
            &self.config.view,
            trace,
            self.config.fixation_cross,
        );
        let mut editor = PointEditor::new(pairs, self.config.editor_options());
        frontend.present(&editor, &scene)?;

        loop {
            let event = frontend
                .next_event()?
                .unwrap_or(InputEvent::Navigate(Direction::Exit));
            match editor.handle(event) {
                Transition::Unchanged => {}
                Transition::Redraw => frontend.present(&editor, &scene)?,
                Transition::Navigate(direction) => {
                    return Ok((editor.pairs().clone(), direction));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::GazeColumns;
    use image::RgbaImage;
    use std::collections::VecDeque;

    struct InMemoryAssets;

    impl AssetSource for InMemoryAssets {
        fn load(&self, _stimulus: &str) -> Result<RgbaImage, AssetError> {
            Ok(RgbaImage::new(200, 100))
        }
    }

    #[derive(Default)]
    struct QueueFrontend {
        events: VecDeque<InputEvent>,
        presented: Vec<String>,
    }

    impl QueueFrontend {
        fn new(events: &[InputEvent]) -> Self {
            Self {
                events: events.iter().copied().collect(),
                presented: Vec::new(),
            }
        }
    }

    impl Frontend for QueueFrontend {
        fn next_event(&mut self) -> Result<Option<InputEvent>, FrontendError> {
            Ok(self.events.pop_front())
        }

        fn present(
            &mut self,
            _editor: &PointEditor,
            scene: &StimulusScene,
        ) -> Result<(), FrontendError> {
            self.presented.push(scene.title.clone());
            Ok(())
        }
    }

    fn table() -> GazeTable {
        let csv = "stimulus,pixel_x,pixel_y\na,10,10\nb,20,20\na,11,11\nc,30,30\n";
        GazeTable::from_reader(csv.as_bytes(), &GazeColumns::default()).unwrap()
    }

    fn config() -> SessionConfig {
        SessionConfig {
            view: crate::editor::ViewTransform::new(0.0, 1.0),
            ..SessionConfig::default()
        }
    }

    fn run(
        store: &mut CorrespondenceStore,
        events: &[InputEvent],
    ) -> (SessionSummary, QueueFrontend) {
        let table = table();
        let config = config();
        let mut fe = QueueFrontend::new(events);
        let summary = CorrectionSession::new(&table, store, &InMemoryAssets, &config)
            .run(&mut fe)
            .unwrap();
        (summary, fe)
    }

    fn nav(d: Direction) -> InputEvent {
        InputEvent::Navigate(d)
    }

    #[test]
    fn next_walks_stimuli_in_first_seen_order_and_ends_past_last() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.transforms.json");
        let mut store = CorrespondenceStore::load_or_default(&path, ["a", "b", "c"]);
        let events = [Direction::Next; 3].map(nav);
        let (summary, fe) = run(&mut store, &events);

        assert_eq!(summary.visited, 3);
        assert_eq!(summary.last_direction, Some(Direction::Next));
        assert_eq!(fe.presented, ["1/3: a", "2/3: b", "3/3: c"]);
        assert_eq!(store.corrected_count(), 3);
        assert_eq!(store.get("b").correspondences().unwrap().len(), 6);
        assert!(path.exists());
    }

    #[test]
    fn previous_before_first_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut store =
            CorrespondenceStore::load_or_default(dir.path().join("r.json"), ["a", "b", "c"]);
        let events = [nav(Direction::Next), nav(Direction::Previous), nav(Direction::Previous)];
        let (summary, fe) = run(&mut store, &events);
        assert_eq!(summary.visited, 3);
        assert_eq!(summary.last_direction, Some(Direction::Previous));
        assert_eq!(fe.presented, ["1/3: a", "2/3: b", "1/3: a"]);
        assert!(!store.get("c").is_defined());
    }

    #[test]
    fn edits_are_persisted_on_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        let mut store = CorrespondenceStore::load_or_default(&path, ["a", "b", "c"]);
        // Grab the top-left anchor and drag it, then leave.
        let events = [
            InputEvent::PointerMove([1.0, 1.0]),
            InputEvent::PrimaryDown([1.0, 1.0]),
            InputEvent::PrimaryDrag([4.0, 9.0]),
            InputEvent::PrimaryUp,
            nav(Direction::Exit),
        ];
        let (summary, fe) = run(&mut store, &events);
        assert_eq!(summary.visited, 1);
        assert_eq!(summary.last_direction, Some(Direction::Exit));
        assert_eq!(fe.presented.len(), 5);

        let reloaded = CorrespondenceStore::load_or_default(&path, ["a"]);
        let pairs = reloaded.get("a").correspondences().unwrap();
        assert_eq!(pairs.get(0).unwrap().source, [0.0, 0.0]);
        assert_eq!(pairs.get(0).unwrap().destination, [4.0, 9.0]);
        assert!(!reloaded.get("b").is_defined());
    }

    #[test]
    fn exhausted_events_count_as_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        let mut store = CorrespondenceStore::load_or_default(&path, ["a", "b", "c"]);
        let (summary, _) = run(&mut store, &[nav(Direction::Next)]);
        assert_eq!(summary.visited, 2);
        assert_eq!(summary.last_direction, Some(Direction::Exit));
        assert!(store.get("b").is_defined());
    }

    #[test]
    fn stored_pairs_are_reopened() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CorrespondenceStore::load_or_default(dir.path().join("r.json"), ["a"]);
        let pairs = Correspondences::from_parts(
            &[[0.0, 0.0], [50.0, 0.0], [0.0, 50.0]],
            &[[0.0, 0.0], [50.0, 5.0], [0.0, 50.0]],
        )
        .unwrap();
        store.set("a", pairs.clone());
        run(&mut store, &[nav(Direction::Exit)]);
        assert_eq!(store.get("a").correspondences(), Some(&pairs));
    }

    #[test]
    fn missing_image_is_an_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = table();
        let config = config();
        let assets = crate::assets::StimulusAssets::new(dir.path(), ".word.png");
        let mut store = CorrespondenceStore::load_or_default(dir.path().join("r.json"), ["a"]);
        let mut fe = QueueFrontend::new(&[]);
        let err = CorrectionSession::new(&table, &mut store, &assets, &config)
            .run(&mut fe)
            .unwrap_err();
        assert!(matches!(err, SessionError::Asset(ref e) if e.stimulus == "a"));
    }
}
