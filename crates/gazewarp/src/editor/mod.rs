//! Interactive correspondence editing as a pure state machine.
//!
//! [`PointEditor`] owns one stimulus's live pairs plus hover, drag and undo
//! state. It consumes [`InputEvent`]s one at a time and reports whether the
//! frame needs redrawing; it never renders or blocks.

mod events;
mod history;
mod view;

pub use events::{Direction, InputEvent, ParseEventError};
pub use history::EditHistory;
pub use view::ViewTransform;

use crate::correspondence::{CorrespondencePair, Correspondences};
use crate::mapper::CoordinateMapper;
use crate::tps::MIN_CONTROL_POINTS;

/// Editor behaviour knobs fixed for one stimulus visit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorOptions {
    pub view: ViewTransform,
    /// Hit-test radius around destination points, in window pixels.
    pub point_radius_px: f64,
    /// Restrict drags to the vertical axis.
    pub vertical_only: bool,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            view: ViewTransform::default(),
            point_radius_px: 5.0,
            vertical_only: false,
        }
    }
}

/// Effect of one event on the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing visible changed.
    Unchanged,
    /// State changed; the frame should be redrawn.
    Redraw,
    /// The operator left this stimulus.
    Navigate(Direction),
}

/// Final pairs of a stimulus visit and where to go next.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorOutcome {
    pub pairs: Correspondences,
    pub direction: Direction,
}

/// Live correspondence editor for one stimulus visit.
///
/// Built from the stored pairs (or the image anchors) and fed events until a
/// navigation event finishes it. Hover and drag indices always refer to
/// positions in the current pair sequence.
#[derive(Debug, Clone)]
pub struct PointEditor {
    pairs: Correspondences,
    hover: Option<usize>,
    dragging: Option<usize>,
    history: EditHistory,
    options: EditorOptions,
    finished: Option<Direction>,
}

impl PointEditor {
    pub fn new(pairs: Correspondences, options: EditorOptions) -> Self {
        Self {
            pairs,
            hover: None,
            dragging: None,
            history: EditHistory::new(),
            options,
            finished: None,
        }
    }

    pub fn pairs(&self) -> &Correspondences {
        &self.pairs
    }

    pub fn hover(&self) -> Option<usize> {
        self.hover
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Whether pair `index` should be highlighted.
    pub fn is_active(&self, index: usize) -> bool {
        self.hover == Some(index) || self.dragging == Some(index)
    }

    /// Apply one event. After a navigation event every further event is ignored.
    pub fn handle(&mut self, event: InputEvent) -> Transition {
        if self.finished.is_some() {
            return Transition::Unchanged;
        }
        match event {
            InputEvent::PointerMove(pos) => self.on_pointer_move(pos),
            InputEvent::PrimaryDown(pos) => self.on_primary_down(pos),
            InputEvent::PrimaryDrag(pos) => self.on_primary_drag(pos),
            InputEvent::PrimaryUp => {
                self.dragging = None;
                Transition::Redraw
            }
            InputEvent::SecondaryDown(_) => self.on_secondary_down(),
            InputEvent::Undo => self.on_undo(),
            InputEvent::Navigate(direction) => {
                self.finished = Some(direction);
                self.dragging = None;
                Transition::Navigate(direction)
            }
        }
    }

    /// Consume the editor once a navigation event has been handled.
    pub fn finish(self) -> Option<EditorOutcome> {
        let direction = self.finished?;
        Some(EditorOutcome {
            pairs: self.pairs,
            direction,
        })
    }

    /// Transform used for the live preview.
    ///
    /// Identity until there are enough pairs to fit, or when the current
    /// pairs are degenerate.
    pub fn preview_mapper(&self) -> CoordinateMapper {
        if self.pairs.len() < MIN_CONTROL_POINTS {
            return CoordinateMapper::identity();
        }
        match CoordinateMapper::from_correspondences(&self.pairs) {
            Ok(mapper) => mapper,
            Err(e) => {
                tracing::debug!("preview falls back to identity: {}", e);
                CoordinateMapper::identity()
            }
        }
    }

    /// First pair, in sequence order, whose destination lies within the hit
    /// radius of `window_pos`. Overlapping points resolve to the lowest index.
    pub fn hit_test(&self, window_pos: [f64; 2]) -> Option<usize> {
        let r2 = self.options.point_radius_px * self.options.point_radius_px;
        self.pairs.iter().position(|pair| {
            let p = self.options.view.gaze_to_window(pair.destination);
            let dx = window_pos[0] - p[0];
            let dy = window_pos[1] - p[1];
            dx * dx + dy * dy < r2
        })
    }

    fn snapshot(&mut self) {
        self.history.push(self.pairs.clone());
    }

    fn on_pointer_move(&mut self, pos: [f64; 2]) -> Transition {
        let before = self.hover;
        self.hover = self.hit_test(pos);
        if before != self.hover {
            Transition::Redraw
        } else {
            Transition::Unchanged
        }
    }

    fn on_primary_down(&mut self, pos: [f64; 2]) -> Transition {
        self.snapshot();
        match self.hover {
            Some(index) => self.dragging = Some(index),
            None => {
                let p = self.options.view.window_to_gaze(pos);
                let index = self.pairs.push(CorrespondencePair::anchored(p));
                self.dragging = Some(index);
            }
        }
        Transition::Redraw
    }

    fn on_primary_drag(&mut self, pos: [f64; 2]) -> Transition {
        let Some(index) = self.dragging else {
            return Transition::Unchanged;
        };
        self.hover = None;
        let mut p = self.options.view.window_to_gaze(pos);
        if self.options.vertical_only {
            if let Some(pair) = self.pairs.get(index) {
                p[0] = pair.destination[0];
            }
        }
        self.pairs.set_destination(index, p);
        Transition::Redraw
    }

    fn on_secondary_down(&mut self) -> Transition {
        let Some(index) = self.hover else {
            return Transition::Unchanged;
        };
        self.snapshot();
        self.pairs.remove(index);
        self.dragging = None;
        self.hover = None;
        Transition::Redraw
    }

    fn on_undo(&mut self) -> Transition {
        match self.history.pop() {
            Some(previous) => {
                self.pairs = previous;
                self.hover = None;
                self.dragging = None;
                Transition::Redraw
            }
            None => Transition::Unchanged,
        }
    }
}
