//! Ordered container with O(1) reordering.
//!
//! A doubly-linked list whose nodes are addressed by the item itself. Every
//! item maps to its neighbor links through a hash map, so insertion, removal,
//! adjacent swaps and neighbor queries never walk the list.

use std::collections::HashMap;
use std::hash::Hash;

use thiserror::Error;

/// Errors returned when an operation references the wrong item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("item is not in the container")]
    NotFound,

    #[error("item is already in the container")]
    AlreadyPresent,
}

#[derive(Debug, Clone, Copy)]
struct Links<T> {
    prev: Option<T>,
    next: Option<T>,
}

/// Ordered collection keyed by item identity.
#[derive(Debug, Clone)]
pub struct OrderedContainer<T> {
    first: Option<T>,
    last: Option<T>,
    links: HashMap<T, Links<T>>,
}

impl<T> Default for OrderedContainer<T> {
    fn default() -> Self {
        Self {
            first: None,
            last: None,
            links: HashMap::new(),
        }
    }
}

impl<T: Copy + Eq + Hash> OrderedContainer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.links.contains_key(item)
    }

    pub fn first(&self) -> Option<T> {
        self.first
    }

    pub fn last(&self) -> Option<T> {
        self.last
    }

    fn links_of(&self, item: &T) -> Result<Links<T>, ContainerError> {
        self.links.get(item).copied().ok_or(ContainerError::NotFound)
    }

    /// Item before `item`, or `None` when `item` is first.
    pub fn prev(&self, item: &T) -> Result<Option<T>, ContainerError> {
        Ok(self.links_of(item)?.prev)
    }

    /// Item after `item`, or `None` when `item` is last.
    pub fn next(&self, item: &T) -> Result<Option<T>, ContainerError> {
        Ok(self.links_of(item)?.next)
    }

    /// Walks from the front; O(index).
    pub fn item_at_index(&self, index: usize) -> Option<T> {
        self.iter().nth(index)
    }

    pub fn insert_start(&mut self, item: T) -> Result<(), ContainerError> {
        let next = self.first;
        self.insert(item, None, next)
    }

    pub fn insert_end(&mut self, item: T) -> Result<(), ContainerError> {
        let prev = self.last;
        self.insert(item, prev, None)
    }

    pub fn insert_before(&mut self, item: T, next_item: T) -> Result<(), ContainerError> {
        let prev = self.links_of(&next_item)?.prev;
        self.insert(item, prev, Some(next_item))
    }

    pub fn insert_after(&mut self, item: T, prev_item: T) -> Result<(), ContainerError> {
        let next = self.links_of(&prev_item)?.next;
        self.insert(item, Some(prev_item), next)
    }

    fn insert(&mut self, item: T, prev: Option<T>, next: Option<T>) -> Result<(), ContainerError> {
        if self.links.contains_key(&item) {
            return Err(ContainerError::AlreadyPresent);
        }
        self.links.insert(item, Links { prev, next });
        self.link(item, prev, next);
        Ok(())
    }

    /// Splices an already-registered `item` between `prev` and `next`, which
    /// must be adjacent.
    fn link(&mut self, item: T, prev: Option<T>, next: Option<T>) {
        if let Some(links) = self.links.get_mut(&item) {
            links.prev = prev;
            links.next = next;
        }

        match prev {
            Some(prev) => {
                if let Some(links) = self.links.get_mut(&prev) {
                    debug_assert!(links.next == next);
                    links.next = Some(item);
                }
            }
            None => self.first = Some(item),
        }

        match next {
            Some(next) => {
                if let Some(links) = self.links.get_mut(&next) {
                    debug_assert!(links.prev == prev);
                    links.prev = Some(item);
                }
            }
            None => self.last = Some(item),
        }
    }

    /// Detaches `item` from its neighbors, leaving its own links stale.
    fn unlink(&mut self, item: T, links: Links<T>) {
        match links.prev {
            Some(prev) => {
                if let Some(prev_links) = self.links.get_mut(&prev) {
                    prev_links.next = links.next;
                }
            }
            None => self.first = links.next,
        }

        match links.next {
            Some(next) => {
                if let Some(next_links) = self.links.get_mut(&next) {
                    next_links.prev = links.prev;
                }
            }
            None => self.last = links.prev,
        }

        debug_assert!(self.first != Some(item) && self.last != Some(item));
    }

    pub fn remove(&mut self, item: &T) -> Result<(), ContainerError> {
        let links = self.links.remove(item).ok_or(ContainerError::NotFound)?;
        self.unlink(*item, links);
        Ok(())
    }

    /// Moves `item` right after `after`, or to the front when `after` is `None`.
    pub fn move_to_position(&mut self, item: T, after: Option<T>) -> Result<(), ContainerError> {
        let links = self.links_of(&item)?;
        if let Some(after) = after {
            if after == item {
                return Ok(());
            }
            self.links_of(&after)?;
        }

        self.unlink(item, links);

        let (prev, next) = match after {
            None => (None, self.first),
            Some(after) => (Some(after), self.links_of(&after)?.next),
        };
        self.link(item, prev, next);
        Ok(())
    }

    /// Swaps `item` with its predecessor. No-op when `item` is first.
    pub fn move_back(&mut self, item: T) -> Result<(), ContainerError> {
        match self.links_of(&item)?.prev {
            Some(prev) => {
                self.swap_adjacent(prev, item);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Swaps `item` with its successor. No-op when `item` is last.
    pub fn move_forward(&mut self, item: T) -> Result<(), ContainerError> {
        match self.links_of(&item)?.next {
            Some(next) => {
                self.swap_adjacent(item, next);
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Swaps `a` and `b` where `b` directly follows `a`.
    fn swap_adjacent(&mut self, a: T, b: T) {
        let Ok(a_links) = self.links_of(&a) else {
            return;
        };
        let Ok(b_links) = self.links_of(&b) else {
            return;
        };
        debug_assert!(a_links.next == Some(b) && b_links.prev == Some(a));

        let before = a_links.prev;
        let after = b_links.next;

        match before {
            Some(before) => {
                if let Some(links) = self.links.get_mut(&before) {
                    links.next = Some(b);
                }
            }
            None => self.first = Some(b),
        }
        match after {
            Some(after) => {
                if let Some(links) = self.links.get_mut(&after) {
                    links.prev = Some(a);
                }
            }
            None => self.last = Some(a),
        }

        if let Some(links) = self.links.get_mut(&b) {
            links.prev = before;
            links.next = Some(a);
        }
        if let Some(links) = self.links.get_mut(&a) {
            links.prev = Some(b);
            links.next = after;
        }
    }

    /// Iterates over every item from the front.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            container: self,
            cursor: self.first,
        }
    }

    /// Iterates from `start` (inclusive) to the end over the current linkage.
    ///
    /// The sequence is lazy and cannot be restarted. It borrows the container,
    /// so callers that need to mutate while walking must collect it first.
    /// An unknown `start` yields an empty sequence.
    pub fn iter_from(&self, start: T) -> Iter<'_, T> {
        Iter {
            container: self,
            cursor: self.contains(&start).then_some(start),
        }
    }
}

/// Lazy walk over an [`OrderedContainer`].
pub struct Iter<'a, T> {
    container: &'a OrderedContainer<T>,
    cursor: Option<T>,
}

impl<T: Copy + Eq + Hash> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let item = self.cursor?;
        self.cursor = self.container.links.get(&item).and_then(|l| l.next);
        Some(item)
    }
}

impl<'a, T: Copy + Eq + Hash> IntoIterator for &'a OrderedContainer<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(c: &OrderedContainer<u32>) -> Vec<u32> {
        c.iter().collect()
    }

    fn filled(items: &[u32]) -> OrderedContainer<u32> {
        let mut c = OrderedContainer::new();
        for &item in items {
            c.insert_end(item).unwrap();
        }
        c
    }

    #[test]
    fn test_insert_positions() {
        let mut c = OrderedContainer::new();
        c.insert_end(2).unwrap();
        c.insert_start(1).unwrap();
        c.insert_end(4).unwrap();
        c.insert_before(3, 4).unwrap();
        c.insert_after(5, 4).unwrap();

        assert_eq!(collect(&c), vec![1, 2, 3, 4, 5]);
        assert_eq!(c.first(), Some(1));
        assert_eq!(c.last(), Some(5));
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let mut c = filled(&[1, 2]);
        assert_eq!(c.insert_end(1), Err(ContainerError::AlreadyPresent));
        assert_eq!(collect(&c), vec![1, 2]);
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let mut c = filled(&[1, 2]);
        assert_eq!(c.prev(&9), Err(ContainerError::NotFound));
        assert_eq!(c.remove(&9), Err(ContainerError::NotFound));
        assert_eq!(c.insert_after(3, 9), Err(ContainerError::NotFound));
        assert_eq!(c.move_forward(9), Err(ContainerError::NotFound));
    }

    #[test]
    fn test_neighbors() {
        let c = filled(&[1, 2, 3]);
        assert_eq!(c.prev(&1), Ok(None));
        assert_eq!(c.next(&1), Ok(Some(2)));
        assert_eq!(c.prev(&3), Ok(Some(2)));
        assert_eq!(c.next(&3), Ok(None));
    }

    #[test]
    fn test_remove_relinks() {
        let mut c = filled(&[1, 2, 3]);
        c.remove(&2).unwrap();
        assert_eq!(collect(&c), vec![1, 3]);
        assert_eq!(c.next(&1), Ok(Some(3)));

        c.remove(&1).unwrap();
        c.remove(&3).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.first(), None);
        assert_eq!(c.last(), None);
    }

    #[test]
    fn test_move_forward_last_is_noop() {
        let mut c = filled(&[1, 2, 3]);
        c.move_forward(3).unwrap();
        assert_eq!(collect(&c), vec![1, 2, 3]);

        c.move_back(1).unwrap();
        assert_eq!(collect(&c), vec![1, 2, 3]);
    }

    #[test]
    fn test_adjacent_swaps() {
        let mut c = filled(&[1, 2, 3, 4]);
        c.move_forward(1).unwrap();
        assert_eq!(collect(&c), vec![2, 1, 3, 4]);
        assert_eq!(c.first(), Some(2));

        c.move_back(4).unwrap();
        assert_eq!(collect(&c), vec![2, 1, 4, 3]);
        assert_eq!(c.last(), Some(3));
        assert_eq!(c.prev(&3), Ok(Some(4)));
        assert_eq!(c.next(&1), Ok(Some(4)));
    }

    #[test]
    fn test_move_to_position() {
        let mut c = filled(&[1, 2, 3, 4]);

        c.move_to_position(4, Some(1)).unwrap();
        assert_eq!(collect(&c), vec![1, 4, 2, 3]);
        assert_eq!(c.prev(&4), Ok(Some(1)));
        assert_eq!(c.next(&4), Ok(Some(2)));
        assert_eq!(c.last(), Some(3));

        c.move_to_position(3, None).unwrap();
        assert_eq!(collect(&c), vec![3, 1, 4, 2]);
        assert_eq!(c.first(), Some(3));
        assert_eq!(c.last(), Some(2));

        c.move_to_position(3, Some(2)).unwrap();
        assert_eq!(collect(&c), vec![1, 4, 2, 3]);

        // Moving after itself changes nothing.
        c.move_to_position(4, Some(4)).unwrap();
        assert_eq!(collect(&c), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_item_at_index() {
        let c = filled(&[10, 20, 30]);
        assert_eq!(c.item_at_index(0), Some(10));
        assert_eq!(c.item_at_index(2), Some(30));
        assert_eq!(c.item_at_index(3), None);
    }

    #[test]
    fn test_iter_from() {
        let c = filled(&[1, 2, 3, 4]);
        assert_eq!(c.iter_from(3).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(c.iter_from(9).count(), 0);
    }
}
