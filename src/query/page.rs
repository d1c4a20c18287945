use std::{collections::BTreeMap, ops::Deref};

use crate::query::{field::Field, model::PageRequest};

/// One slice of a result set together with the total hit count.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    pageable: Option<PageRequest>,
    total: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pageable: Option<PageRequest>, total: u64) -> Self {
        Self {
            content,
            pageable,
            total,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None, 0)
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn pageable(&self) -> Option<PageRequest> {
        self.pageable
    }

    pub fn total_elements(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u64 {
        match self.pageable {
            Some(page) => self.total.div_ceil(page.size() as u64),
            None if self.total == 0 => 0,
            None => 1,
        }
    }

    pub fn number(&self) -> u64 {
        self.pageable.map(|p| p.page_number()).unwrap_or(0)
    }

    pub fn has_next(&self) -> bool {
        match self.pageable {
            Some(page) => page.offset() + (self.content.len() as u64) < self.total,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.content.iter()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            pageable: self.pageable,
            total: self.total,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetEntry {
    pub field: Field,
    pub value: String,
    pub count: u64,
}

/// A result page plus one facet page per requested facet field.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetPage<T> {
    page: Page<T>,
    facets: BTreeMap<Field, Page<FacetEntry>>,
}

impl<T> FacetPage<T> {
    pub fn new(page: Page<T>) -> Self {
        Self {
            page,
            facets: BTreeMap::new(),
        }
    }

    pub fn add_facet_result_page(&mut self, field: Field, entries: Page<FacetEntry>) {
        self.facets.insert(field, entries);
    }

    pub fn facet_result_page(&self, field: &Field) -> Option<&Page<FacetEntry>> {
        self.facets.get(field)
    }

    pub fn facet_fields(&self) -> impl Iterator<Item = &Field> {
        self.facets.keys()
    }

    pub fn facets(&self) -> &BTreeMap<Field, Page<FacetEntry>> {
        &self.facets
    }

    pub fn into_page(self) -> Page<T> {
        self.page
    }
}

impl<T> Deref for FacetPage<T> {
    type Target = Page<T>;

    fn deref(&self) -> &Self::Target {
        &self.page
    }
}
