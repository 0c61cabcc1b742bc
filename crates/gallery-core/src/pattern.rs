use crate::error::ConfigError;
use crate::item::Item;
use serde::Deserialize;
use serde::Serialize;

/// An item's footprint in grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub width: u32,
    pub height: u32,
}

/// Largest width or height, in cells, a pattern shape may have.
pub const MAX_SHAPE_SPAN: u32 = 64;

impl Shape {
    pub const UNIT: Shape = Shape::new(1, 1);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Box size of the shape alone; gaps only exist between cells of the packed grid.
    pub fn pixel_size(&self, base_unit: f64) -> PixelSize {
        PixelSize {
            width: self.width as f64 * base_unit,
            height: self.height as f64 * base_unit,
        }
    }

    pub fn is_within_bounds(&self) -> bool {
        self.width <= MAX_SHAPE_SPAN && self.height <= MAX_SHAPE_SPAN
    }

    pub fn clamp_width(self, columns: u32) -> Self {
        Self {
            width: self.width.min(columns.max(1)),
            height: self.height,
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::UNIT
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelSize {
    pub width: f64,
    pub height: f64,
}

pub const DEFAULT_PATTERNS: [Shape; 4] = [
    Shape::new(2, 1),
    Shape::new(1, 2),
    Shape::new(2, 2),
    Shape::new(1, 1),
];

/// A non-empty list of valid shapes, cycled over item ordinals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternSet {
    shapes: Vec<Shape>,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self {
            shapes: DEFAULT_PATTERNS.to_vec(),
        }
    }
}

impl PatternSet {
    pub fn new(shapes: Vec<Shape>) -> Result<Self, ConfigError> {
        if shapes.is_empty() {
            return Err(ConfigError::EmptyPatterns);
        }
        if let Some((index, bad)) = shapes.iter().enumerate().find(|(_, s)| !s.is_valid()) {
            return Err(ConfigError::InvalidShape {
                index,
                width: bad.width,
                height: bad.height,
            });
        }
        if let Some((index, big)) = shapes
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_within_bounds())
        {
            return Err(ConfigError::ShapeTooLarge {
                index,
                width: big.width,
                height: big.height,
                max: MAX_SHAPE_SPAN,
            });
        }
        Ok(Self { shapes })
    }

    /// Parses a JSON array such as `[{"width":2,"height":1}]`.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let shapes: Vec<Shape> = serde_json::from_str(input)
            .map_err(|err| ConfigError::MalformedPatterns(err.to_string()))?;
        Self::new(shapes)
    }

    /// Validates `shapes`, falling back to [`DEFAULT_PATTERNS`] on error. The error is logged and
    /// handed back so callers can surface it.
    pub fn or_default(shapes: Vec<Shape>) -> (Self, Option<ConfigError>) {
        match Self::new(shapes) {
            Ok(set) => (set, None),
            Err(err) => {
                tracing::warn!(error = %err, "invalid pattern list, using default patterns");
                (Self::default(), Some(err))
            }
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn assign(&self, index: usize) -> Shape {
        self.shapes[index % self.shapes.len()]
    }
}

/// Assigns shapes to `items`, the first of which has ordinal `start_index`.
pub fn assign_patterns<T>(
    items: &mut [Item<T>],
    start_index: usize,
    patterns: &PatternSet,
    base_unit: f64,
) {
    for (offset, item) in items.iter_mut().enumerate() {
        let shape = patterns.assign(start_index + offset);
        item.shape = shape;
        item.pixel_size = shape.pixel_size(base_unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_cycles_and_is_idempotent() {
        let set = PatternSet::default();
        assert_eq!(set.assign(0), Shape::new(2, 1));
        assert_eq!(set.assign(3), Shape::new(1, 1));
        assert_eq!(set.assign(4), Shape::new(2, 1));
        assert_eq!(set.assign(9), set.assign(9));
    }

    #[test]
    fn pixel_size_excludes_gap() {
        let size = Shape::new(2, 3).pixel_size(200.0);
        assert_eq!(size.width, 400.0);
        assert_eq!(size.height, 600.0);
    }

    #[test]
    fn rejects_empty_and_zero_sized_shapes() {
        assert_eq!(PatternSet::new(Vec::new()), Err(ConfigError::EmptyPatterns));
        assert_eq!(
            PatternSet::new(vec![Shape::new(1, 1), Shape::new(0, 2)]),
            Err(ConfigError::InvalidShape {
                index: 1,
                width: 0,
                height: 2
            })
        );
    }

    #[test]
    fn oversized_shapes_are_rejected_and_replaced() {
        assert_eq!(
            PatternSet::new(vec![Shape::new(1, 1), Shape::new(1, u32::MAX)]),
            Err(ConfigError::ShapeTooLarge {
                index: 1,
                width: 1,
                height: u32::MAX,
                max: MAX_SHAPE_SPAN
            })
        );
        assert!(PatternSet::new(vec![Shape::new(MAX_SHAPE_SPAN, MAX_SHAPE_SPAN)]).is_ok());

        let (set, flagged) = PatternSet::or_default(vec![Shape::new(MAX_SHAPE_SPAN + 1, 1)]);
        assert_eq!(set, PatternSet::default());
        assert!(matches!(flagged, Some(ConfigError::ShapeTooLarge { index: 0, .. })));
    }

    #[test]
    fn malformed_json_falls_back_and_is_flagged() {
        let err = PatternSet::from_json("[{\"width\": 2}").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedPatterns(_)));

        let (set, flagged) = PatternSet::or_default(Vec::new());
        assert_eq!(set, PatternSet::default());
        assert_eq!(flagged, Some(ConfigError::EmptyPatterns));
    }

    #[test]
    fn assign_patterns_continues_the_sequence() {
        let set = PatternSet::default();
        let mut items: Vec<Item<()>> = (0..3).map(|i| Item::new(format!("p{i}"), ())).collect();
        assign_patterns(&mut items, 5, &set, 10.0);
        assert_eq!(items[0].shape, Shape::new(1, 2));
        assert_eq!(items[1].shape, Shape::new(2, 2));
        assert_eq!(items[2].shape, Shape::new(1, 1));
        assert_eq!(items[1].pixel_size, PixelSize { width: 20.0, height: 20.0 });
    }
}
