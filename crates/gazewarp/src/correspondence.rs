//! Ordered (source, destination) control-point pairs for one stimulus.

/// One control point: nominal position and the corrected position it maps to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrespondencePair {
    /// Observed (drifted) location in gaze pixel coordinates.
    pub source: [f64; 2],
    /// Corrected location the source should map onto.
    pub destination: [f64; 2],
}

impl CorrespondencePair {
    /// A pair whose destination coincides with its source.
    pub fn anchored(p: [f64; 2]) -> Self {
        Self {
            source: p,
            destination: p,
        }
    }
}

/// Ordered pair sequence. A pair's identity is its index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correspondences {
    pairs: Vec<CorrespondencePair>,
}

impl Correspondences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip index-aligned source and destination lists.
    ///
    /// Returns `None` when the lengths differ.
    pub fn from_parts(source: &[[f64; 2]], destination: &[[f64; 2]]) -> Option<Self> {
        if source.len() != destination.len() {
            return None;
        }
        Some(Self {
            pairs: source
                .iter()
                .zip(destination)
                .map(|(&s, &d)| CorrespondencePair {
                    source: s,
                    destination: d,
                })
                .collect(),
        })
    }

    /// Six identity anchors on the top and bottom image edges: both corners
    /// and the horizontal midpoint.
    pub fn image_anchors(width: f64, height: f64) -> Self {
        let points = [
            [0.0, 0.0],
            [width / 2.0, 0.0],
            [width, 0.0],
            [0.0, height],
            [width / 2.0, height],
            [width, height],
        ];
        Self {
            pairs: points.into_iter().map(CorrespondencePair::anchored).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CorrespondencePair> {
        self.pairs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CorrespondencePair> + '_ {
        self.pairs.iter()
    }

    pub fn push(&mut self, pair: CorrespondencePair) -> usize {
        self.pairs.push(pair);
        self.pairs.len() - 1
    }

    /// Remove the pair at `index`; later pairs shift down by one.
    pub fn remove(&mut self, index: usize) -> Option<CorrespondencePair> {
        (index < self.pairs.len()).then(|| self.pairs.remove(index))
    }

    pub fn set_destination(&mut self, index: usize, destination: [f64; 2]) -> bool {
        match self.pairs.get_mut(index) {
            Some(pair) => {
                pair.destination = destination;
                true
            }
            None => false,
        }
    }

    pub fn sources(&self) -> Vec<[f64; 2]> {
        self.pairs.iter().map(|p| p.source).collect()
    }

    pub fn destinations(&self) -> Vec<[f64; 2]> {
        self.pairs.iter().map(|p| p.destination).collect()
    }
}
