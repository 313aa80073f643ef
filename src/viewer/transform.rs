use std::fmt;

/// Zoom in quarter steps.
const ZOOM_STEPS_PER_UNIT: u8 = 4;
const MIN_ZOOM_STEPS: u8 = 2;
const MAX_ZOOM_STEPS: u8 = 12;
const DEFAULT_ZOOM_STEPS: u8 = 4;

pub const ZOOM_STEP: f64 = 1.0 / ZOOM_STEPS_PER_UNIT as f64;
pub const MIN_ZOOM: f64 = MIN_ZOOM_STEPS as f64 * ZOOM_STEP;
pub const MAX_ZOOM: f64 = MAX_ZOOM_STEPS as f64 * ZOOM_STEP;

const BOOSTED_BRIGHTNESS: f64 = 1.15;
const BOOSTED_CONTRAST: f64 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Next quarter turn clockwise, wrapping after 270.
    pub fn next(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    /// Swaps the on-screen box dimensions for quarter turns.
    pub fn is_sideways(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// Maps a unit-square point of the unrotated page to where it lands on
    /// screen, both measured from the top-left of their boxes.
    pub fn rotate_unit(self, u: f64, v: f64) -> (f64, f64) {
        match self {
            Self::Deg0 => (u, v),
            Self::Deg90 => (1.0 - v, u),
            Self::Deg180 => (1.0 - u, 1.0 - v),
            Self::Deg270 => (v, 1.0 - u),
        }
    }

    /// Inverse of [`Rotation::rotate_unit`].
    pub fn unrotate_unit(self, u: f64, v: f64) -> (f64, f64) {
        match self {
            Self::Deg0 => (u, v),
            Self::Deg90 => (v, 1.0 - u),
            Self::Deg180 => (1.0 - u, 1.0 - v),
            Self::Deg270 => (1.0 - v, u),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Filter {
    pub brightness: f64,
    pub contrast: f64,
}

impl Filter {
    pub fn is_identity(&self) -> bool {
        self.brightness == 1.0 && self.contrast == 1.0
    }
}

/// Single transform handed to the page container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposedTransform {
    pub scale: f64,
    pub rotation: Rotation,
    pub filter: Filter,
}

impl ComposedTransform {
    /// Where a page point, in percent of the page, is drawn inside the
    /// container, also in percent. Scaling is about the page centre.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let (u, v) = self.rotation.rotate_unit(x / 100.0, y / 100.0);
        let scaled = |value: f64| 50.0 + (value * 100.0 - 50.0) * self.scale;
        (scaled(u), scaled(v))
    }

    pub fn css_filter(&self) -> String {
        if self.filter.is_identity() {
            "none".to_string()
        } else {
            format!("brightness({}) contrast({})", self.filter.brightness, self.filter.contrast)
        }
    }
}

impl fmt::Display for ComposedTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale({}) rotate({}deg)", self.scale, self.rotation.degrees())
    }
}

/// Zoom, rotation and brightness of the container holding the page and
/// both overlay layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewTransform {
    zoom_steps: u8,
    rotation: Rotation,
    boosted: bool,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { zoom_steps: DEFAULT_ZOOM_STEPS, rotation: Rotation::Deg0, boosted: false }
    }
}

impl ViewTransform {
    pub fn zoom(&self) -> f64 {
        f64::from(self.zoom_steps) * ZOOM_STEP
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn brightness_boosted(&self) -> bool {
        self.boosted
    }

    /// Returns `false` when already at the maximum.
    pub fn zoom_in(&mut self) -> bool {
        if self.zoom_steps >= MAX_ZOOM_STEPS {
            return false;
        }
        self.zoom_steps += 1;
        true
    }

    /// Returns `false` when already at the minimum.
    pub fn zoom_out(&mut self) -> bool {
        if self.zoom_steps <= MIN_ZOOM_STEPS {
            return false;
        }
        self.zoom_steps -= 1;
        true
    }

    pub fn rotate(&mut self) -> Rotation {
        self.rotation = self.rotation.next();
        self.rotation
    }

    pub fn toggle_brightness(&mut self) -> bool {
        self.boosted = !self.boosted;
        self.boosted
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn composed(&self) -> ComposedTransform {
        let filter = if self.boosted {
            Filter { brightness: BOOSTED_BRIGHTNESS, contrast: BOOSTED_CONTRAST }
        } else {
            Filter { brightness: 1.0, contrast: 1.0 }
        };
        ComposedTransform { scale: self.zoom(), rotation: self.rotation, filter }
    }
}
