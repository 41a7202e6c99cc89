//! The client's working set of finalized strokes.

use crate::stroke::{Stroke, StrokeId};
use kurbo::Rect;
use std::collections::HashSet;

/// Ordered, id-deduplicated collection of finalized strokes.
///
/// Strokes are kept in the order they became known locally, which is the
/// order they are drawn in.
#[derive(Debug, Clone, Default)]
pub struct Board {
    strokes: Vec<Stroke>,
    ids: HashSet<StrokeId>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stroke. Returns `false` if a stroke with the same id is
    /// already present.
    pub fn push(&mut self, stroke: Stroke) -> bool {
        if !self.ids.insert(stroke.id()) {
            log::trace!("Ignoring duplicate stroke {}", stroke.id());
            return false;
        }
        self.strokes.push(stroke);
        true
    }

    /// Replace the whole working set (history replay).
    pub fn replace_all(&mut self, strokes: impl IntoIterator<Item = Stroke>) {
        self.strokes.clear();
        self.ids.clear();
        for stroke in strokes {
            self.push(stroke);
        }
    }

    /// Merge strokes not yet known, keeping existing order. Returns how many
    /// were added.
    pub fn merge(&mut self, strokes: impl IntoIterator<Item = Stroke>) -> usize {
        strokes.into_iter().filter(|s| self.push(s.clone())).count()
    }

    pub fn contains(&self, id: &StrokeId) -> bool {
        self.ids.contains(id)
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Union of all stroke bounds, or `None` when empty.
    pub fn bounds(&self) -> Option<Rect> {
        self.strokes
            .iter()
            .map(Stroke::bounds)
            .reduce(|acc, r| acc.union(r))
    }
}
