//! A list backed by an iterator that is only advanced as far as it is read.

use std::iter::Fuse;

/// Elements are pulled from the source iterator the first time an index at
/// or past them is requested, then kept.
pub struct LazyList<I: Iterator> {
    source: Fuse<I>,
    items: Vec<I::Item>,
    exhausted: bool,
}

impl<I: Iterator> LazyList<I> {
    pub fn new<T>(source: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            source: source.into_iter().fuse(),
            items: Vec::new(),
            exhausted: false,
        }
    }

    /// Element at `index`, advancing the source as needed.
    pub fn get(&mut self, index: usize) -> Option<&I::Item> {
        self.fill_to(index.saturating_add(1));
        self.items.get(index)
    }

    /// Total number of elements. Drains the source.
    pub fn len(&mut self) -> usize {
        self.fill_to(usize::MAX);
        self.items.len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.get(0).is_none()
    }

    /// Elements pulled so far.
    pub fn materialized(&self) -> &[I::Item] {
        &self.items
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn into_vec(mut self) -> Vec<I::Item> {
        self.items.extend(self.source);
        self.items
    }

    fn fill_to(&mut self, count: usize) {
        while !self.exhausted && self.items.len() < count {
            match self.source.next() {
                Some(item) => self.items.push(item),
                None => self.exhausted = true,
            }
        }
    }
}

impl<I: Iterator> IntoIterator for LazyList<I> {
    type Item = I::Item;
    type IntoIter = std::iter::Chain<std::vec::IntoIter<I::Item>, Fuse<I>>;

    /// Materialized elements first, then whatever the source still holds.
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter().chain(self.source)
    }
}
