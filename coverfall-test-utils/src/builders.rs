//! Test data builders

use coverfall_core::types::BookRef;

/// Fluent builder for [`BookRef`] fixtures
#[derive(Debug, Default, Clone)]
pub struct BookRefBuilder {
    book: BookRef,
}

impl BookRefBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: &str) -> Self {
        self.book.title = Some(title.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.book.author = Some(author.to_string());
        self
    }

    pub fn isbn(mut self, isbn: &str) -> Self {
        self.book.isbn = Some(isbn.to_string());
        self
    }

    pub fn source_id(mut self, source_id: &str) -> Self {
        self.book.source_id = Some(source_id.to_string());
        self
    }

    pub fn source_url(mut self, source_url: &str) -> Self {
        self.book.source_url = Some(source_url.to_string());
        self
    }

    pub fn image_url(mut self, image_url: &str) -> Self {
        self.book.image_url = Some(image_url.to_string());
        self
    }

    pub fn build(self) -> BookRef {
        self.book
    }
}
