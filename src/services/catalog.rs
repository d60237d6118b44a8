//! Catalog management service

use crate::{
    error::AppResult,
    models::book::{Book, CreateBook, UpdateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get a catalog record by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Insert a new catalog entry
    pub async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        self.repository.books.create(book).await
    }

    /// Partial catalog edit
    pub async fn update_book(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        // Check if the book exists so edits report a clean NotFound.
        self.repository.books.get_by_id(id).await?;
        self.repository.books.update(id, update).await
    }

    /// Delete a catalog entry; refused while active requests reference it.
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }
}
