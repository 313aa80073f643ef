use crate::grading::models::{QuestionId, Region, Session};
use crate::grading::types::Correctness;

const RESTING_OPACITY: f64 = 0.45;
const ACTIVE_OPACITY: f64 = 1.0;

/// Colour class of a region rectangle, one per correctness status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionColour {
    Green,
    Yellow,
    Red,
}

impl RegionColour {
    pub fn for_status(status: Correctness) -> Self {
        match status {
            Correctness::Correct => Self::Green,
            Correctness::Partial => Self::Yellow,
            Correctness::Incorrect => Self::Red,
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            Self::Green => "region-correct",
            Self::Yellow => "region-partial",
            Self::Red => "region-incorrect",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            Self::Green => "#22c55e",
            Self::Yellow => "#eab308",
            Self::Red => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionBox {
    pub question_id: QuestionId,
    pub ordinal: usize,
    pub region: Region,
    pub colour: RegionColour,
    pub emphasized: bool,
}

impl RegionBox {
    pub fn label(&self) -> String {
        format!("Q{}", self.ordinal)
    }

    pub fn opacity(&self) -> f64 {
        if self.emphasized {
            ACTIVE_OPACITY
        } else {
            RESTING_OPACITY
        }
    }
}

/// Question rectangles drawn over the page, in percent coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLayer {
    visible: bool,
}

impl Default for RegionLayer {
    fn default() -> Self {
        Self { visible: true }
    }
}

impl RegionLayer {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Rectangles in paint order. Only `active` is emphasized.
    pub fn boxes(&self, session: &Session, active: Option<&QuestionId>) -> Vec<RegionBox> {
        if !self.visible {
            return Vec::new();
        }
        session
            .questions()
            .iter()
            .enumerate()
            .map(|(idx, question)| RegionBox {
                question_id: question.id.clone(),
                ordinal: idx + 1,
                region: question.region,
                colour: RegionColour::for_status(question.status()),
                emphasized: active == Some(&question.id),
            })
            .collect()
    }

    /// Question under a click at page percent `(x, y)`; later rectangles paint
    /// on top and win.
    pub fn hit_test(&self, session: &Session, x: f64, y: f64) -> Option<QuestionId> {
        if !self.visible {
            return None;
        }
        session
            .questions()
            .iter()
            .rev()
            .find(|question| question.region.contains(x, y))
            .map(|question| question.id.clone())
    }
}
