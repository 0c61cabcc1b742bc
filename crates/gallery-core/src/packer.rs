//! Greedy placement of shaped items into a fixed-width grid.
//!
//! The packer scans cells left-to-right, top-to-bottom and places every item at the first cursor
//! position where it fits. It never looks ahead and never reorders items, so the same input always
//! produces the same layout.

use crate::item::ItemId;
use crate::pattern::MAX_SHAPE_SPAN;
use crate::pattern::Shape;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridMetrics {
    pub base_unit: f64,
    pub gap: f64,
}

impl GridMetrics {
    pub fn stride(&self) -> f64 {
        self.base_unit + self.gap
    }

    /// Column count for a container width; always at least one.
    pub fn columns_for(&self, container_width: f64) -> u32 {
        let stride = self.stride();
        if !container_width.is_finite() || container_width <= 0.0 || stride <= 0.0 {
            return 1;
        }
        let columns = (container_width / stride).floor();
        if columns < 1.0 {
            1
        } else {
            columns.min(u32::MAX as f64) as u32
        }
    }

    fn span(&self, cells: u32) -> f64 {
        cells as f64 * self.base_unit + cells.saturating_sub(1) as f64 * self.gap
    }
}

/// Pixel box of a placed item.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Position {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Occupied grid rectangle of a placed item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellRect {
    pub column: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub fn intersects(&self, other: &CellRect) -> bool {
        self.column < other.column + other.width
            && other.column < self.column + self.width
            && self.row < other.row + other.height
            && other.row < self.row + self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub cell: CellRect,
    pub position: Position,
}

/// Result of one packing pass: one placement per item, in item order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
    placements: Vec<(ItemId, Placement)>,
    index: HashMap<ItemId, usize>,
    columns: u32,
    canvas_height: f64,
}

impl Layout {
    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn canvas_height(&self) -> f64 {
        self.canvas_height
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn placement(&self, id: &ItemId) -> Option<&Placement> {
        self.index.get(id).map(|&i| &self.placements[i].1)
    }

    pub fn position(&self, id: &ItemId) -> Option<Position> {
        self.placement(id).map(|p| p.position)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &Placement)> {
        self.placements.iter().map(|(id, p)| (id, p))
    }
}

struct Occupancy<'a> {
    cells: HashMap<(u32, u32), &'a ItemId>,
}

impl<'a> Occupancy<'a> {
    fn fits(&self, x: u32, y: u32, shape: Shape, columns: u32) -> bool {
        let Some(right) = x.checked_add(shape.width) else {
            return false;
        };
        if right > columns {
            return false;
        }
        (y..y.saturating_add(shape.height))
            .all(|row| (x..right).all(|col| !self.cells.contains_key(&(col, row))))
    }

    fn claim(&mut self, x: u32, y: u32, shape: Shape, id: &'a ItemId) {
        for row in y..y.saturating_add(shape.height) {
            for col in x..x.saturating_add(shape.width) {
                self.cells.insert((col, row), id);
            }
        }
    }
}

/// Packs items in order into `container_width`.
///
/// Shapes wider than the grid are clamped to the column count, and no side exceeds
/// [`MAX_SHAPE_SPAN`], so every item is placed.
pub fn pack<'a, I>(items: I, container_width: f64, metrics: GridMetrics) -> Layout
where
    I: IntoIterator<Item = (&'a ItemId, Shape)>,
{
    let columns = metrics.columns_for(container_width);
    let stride = metrics.stride();
    let mut occupancy = Occupancy {
        cells: HashMap::new(),
    };
    let mut layout = Layout {
        columns,
        ..Layout::default()
    };
    let (mut x, mut y) = (0u32, 0u32);
    let mut bottom = None::<f64>;

    for (id, shape) in items {
        let mut shape = Shape::new(
            shape.width.clamp(1, MAX_SHAPE_SPAN),
            shape.height.clamp(1, MAX_SHAPE_SPAN),
        );
        if shape.width > columns {
            tracing::debug!(%id, width = shape.width, columns, "clamping shape to grid width");
            shape = shape.clamp_width(columns);
        }

        while !occupancy.fits(x, y, shape, columns) {
            x += 1;
            if x >= columns {
                x = 0;
                y += 1;
            }
        }

        occupancy.claim(x, y, shape, id);
        let position = Position {
            left: x as f64 * stride,
            top: y as f64 * stride,
            width: metrics.span(shape.width),
            height: metrics.span(shape.height),
        };
        bottom = Some(bottom.map_or(position.bottom(), |b: f64| b.max(position.bottom())));
        layout.index.insert(id.clone(), layout.placements.len());
        layout.placements.push((
            id.clone(),
            Placement {
                cell: CellRect {
                    column: x,
                    row: y,
                    width: shape.width,
                    height: shape.height,
                },
                position,
            },
        ));

        x += 1;
        if x >= columns {
            x = 0;
            y += 1;
        }
    }

    layout.canvas_height = bottom.map_or(0.0, |b| b + metrics.gap);
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternSet;

    const METRICS: GridMetrics = GridMetrics {
        base_unit: 200.0,
        gap: 10.0,
    };

    fn ids(n: usize) -> Vec<ItemId> {
        (0..n).map(|i| ItemId::from(format!("item-{i}"))).collect()
    }

    fn pack_cycle(ids: &[ItemId], patterns: &PatternSet, width: f64) -> Layout {
        pack(
            ids.iter().enumerate().map(|(i, id)| (id, patterns.assign(i))),
            width,
            METRICS,
        )
    }

    #[test]
    fn column_count_has_a_floor_of_one() {
        assert_eq!(METRICS.columns_for(840.0), 4);
        assert_eq!(METRICS.columns_for(839.0), 3);
        assert_eq!(METRICS.columns_for(50.0), 1);
        assert_eq!(METRICS.columns_for(f64::NAN), 1);
    }

    #[test]
    fn occupied_cells_never_overlap() {
        let ids = ids(60);
        let patterns = PatternSet::new(vec![
            Shape::new(3, 1),
            Shape::new(1, 3),
            Shape::new(2, 2),
            Shape::new(1, 1),
            Shape::new(2, 1),
        ])
        .unwrap();
        for width in [210.0, 420.0, 630.0, 1050.0, 2000.0] {
            let layout = pack_cycle(&ids, &patterns, width);
            assert_eq!(layout.len(), ids.len());
            let cells: Vec<CellRect> = layout.iter().map(|(_, p)| p.cell).collect();
            for (i, a) in cells.iter().enumerate() {
                assert!(a.column + a.width <= layout.columns());
                for b in &cells[i + 1..] {
                    assert!(!a.intersects(b), "{a:?} overlaps {b:?} at width {width}");
                }
            }
        }
    }

    #[test]
    fn packing_is_deterministic() {
        let ids = ids(40);
        let patterns = PatternSet::default();
        assert_eq!(
            pack_cycle(&ids, &patterns, 1300.0),
            pack_cycle(&ids, &patterns, 1300.0)
        );
    }

    #[test]
    fn wide_shapes_are_clamped_instead_of_looping() {
        let ids = ids(2);
        let layout = pack(
            [(&ids[0], Shape::new(6, 1)), (&ids[1], Shape::new(1, 1))],
            420.0,
            METRICS,
        );
        assert_eq!(layout.columns(), 2);
        let first = layout.placement(&ids[0]).unwrap();
        assert_eq!(first.cell.width, 2);
        assert_eq!(first.position.width, 410.0);
        assert_eq!(layout.position(&ids[1]).unwrap().top, 210.0);
        assert_eq!(layout.canvas_height(), 420.0);
    }

    #[test]
    fn unvalidated_tall_shapes_are_bounded() {
        let ids = ids(3);
        let layout = pack(
            [
                (&ids[0], Shape::new(1, 1)),
                (&ids[1], Shape::new(1, u32::MAX)),
                (&ids[2], Shape::new(u32::MAX, 1)),
            ],
            210.0,
            METRICS,
        );
        assert_eq!(layout.len(), 3);
        let tall = layout.placement(&ids[1]).unwrap();
        assert_eq!(tall.cell.row, 1);
        assert_eq!(tall.cell.height, MAX_SHAPE_SPAN);
        let wide = layout.placement(&ids[2]).unwrap();
        assert_eq!(wide.cell.row, 1 + MAX_SHAPE_SPAN);
        assert!(!tall.cell.intersects(&wide.cell));
        assert!(!layout.placement(&ids[0]).unwrap().cell.intersects(&tall.cell));
    }

    #[test]
    fn empty_input_has_zero_height() {
        let layout = pack(std::iter::empty(), 840.0, METRICS);
        assert!(layout.is_empty());
        assert_eq!(layout.canvas_height(), 0.0);
    }
}
