//! gazewarp — thin-plate-spline drift correction for gaze-tracking data.
//!
//! Eye-tracker calibration drifts during a recording, so fixations land
//! offset from the text actually read. An operator marks where points on a
//! stimulus should really be (source → destination pairs); a thin-plate
//! spline fitted to those pairs then remaps every gaze sample recorded on
//! that stimulus.
//!
//! The pieces are:
//!
//! 1. **Spline** – [`ThinPlateSpline`] fit and evaluation, wrapped by
//!    [`CoordinateMapper`] which keeps missing samples missing.
//! 2. **Record** – [`CorrespondenceStore`], the per-stimulus JSON record of pairs.
//! 3. **Editor** – [`editor::PointEditor`], a pure state machine over input events.
//! 4. **Session** – [`CorrectionSession`] walking stimuli against a [`Frontend`].
//! 5. **Batch** – [`BatchCorrector`] rewriting a gaze table from the record.

mod assets;
mod batch;
mod config;
mod correspondence;
pub mod editor;
mod frontend;
mod gaze;
mod mapper;
pub mod render;
mod session;
mod store;
mod tps;

pub use assets::{AssetError, AssetSource, StimulusAssets};
pub use batch::{corrected_path_for, BatchCorrector, BatchError, BatchReport, StimulusReport};
pub use config::SessionConfig;
pub use correspondence::{CorrespondencePair, Correspondences};
pub use frontend::{Frontend, FrontendError, ScriptFrontend};
pub use gaze::{simplify_trace, GazeColumns, GazeTable, TableError};
pub use mapper::CoordinateMapper;
pub use session::{CorrectionSession, SessionError, SessionSummary};
pub use store::{record_path_for, CorrespondenceStore, StoreError, StoredPairs};
pub use tps::{FitError, ThinPlateSpline, MIN_CONTROL_POINTS};
