use crate::pattern::PixelSize;
use crate::pattern::Shape;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stable item identity. Cloning is cheap.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(Arc<str>);

impl ItemId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item<T> {
    pub id: ItemId,
    pub payload: T,
    /// The shape assigned from the pattern list, before any clamping to the grid.
    pub shape: Shape,
    /// Size of the footprint the item was last packed into.
    pub pixel_size: PixelSize,
}

impl<T> Item<T> {
    /// A unit-shaped item. The gallery assigns the real shape when the item is merged.
    pub fn new(id: impl Into<ItemId>, payload: T) -> Self {
        Self {
            id: id.into(),
            payload,
            shape: Shape::UNIT,
            pixel_size: PixelSize::default(),
        }
    }
}

/// The ordered item list with an id index.
#[derive(Clone, Debug)]
pub struct Catalog<T> {
    items: Vec<Item<T>>,
    index: HashMap<ItemId, usize>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Catalog<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item<T>> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item<T>> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Item<T>] {
        &self.items
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Item<T>] {
        &mut self.items
    }

    /// Appends items in order, skipping ids already present. Returns how many were added.
    pub fn append(&mut self, items: impl IntoIterator<Item = Item<T>>) -> usize {
        let mut added = 0;
        for item in items {
            if self.index.contains_key(&item.id) {
                tracing::warn!(id = %item.id, "duplicate item id ignored");
                continue;
            }
            self.index.insert(item.id.clone(), self.items.len());
            self.items.push(item);
            added += 1;
        }
        added
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<Item<T>> {
        let pos = self.index.remove(id)?;
        let item = self.items.remove(pos);
        for (i, later) in self.items.iter().enumerate().skip(pos) {
            self.index.insert(later.id.clone(), i);
        }
        Some(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}

impl<'a, T> IntoIterator for &'a Catalog<T> {
    type Item = &'a Item<T>;
    type IntoIter = std::slice::Iter<'a, Item<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_skips_duplicates_and_keeps_order() {
        let mut c = Catalog::new();
        let added = c.append(vec![
            Item::new("a", 1),
            Item::new("b", 2),
            Item::new("a", 3),
        ]);
        assert_eq!(added, 2);
        let ids: Vec<&str> = c.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(c.get(&ItemId::from("a")).map(|i| i.payload), Some(1));
    }

    #[test]
    fn remove_reindexes_later_items() {
        let mut c = Catalog::new();
        c.append(vec![Item::new("a", ()), Item::new("b", ()), Item::new("c", ())]);
        assert!(c.remove(&ItemId::from("a")).is_some());
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&ItemId::from("c")).map(|i| i.id.as_str()), Some("c"));
        assert!(c.remove(&ItemId::from("a")).is_none());
    }
}
