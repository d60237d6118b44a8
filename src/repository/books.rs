//! Books repository for database operations

use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookLanguage, CreateBook, MetadataPatch, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

/// Active (pending or approved) requests block catalog deletion.
const ACTIVE_REQUEST_FOR_BOOK: &str = "SELECT EXISTS(\
     SELECT 1 FROM borrow_requests \
     WHERE book_id = $1 AND status IN ('pending', 'approved') AND return_date IS NULL)";

fn book_from_row(row: &PgRow) -> AppResult<Book> {
    let language: String = row.get("language");
    let language = BookLanguage::parse(&language)
        .ok_or_else(|| AppError::Internal(format!("Unknown book language '{}'", language)))?;
    Ok(Book {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        language,
        description_en: row.get("description_en"),
        description_ar: row.get("description_ar"),
        description_fetched: row.get("description_fetched"),
        categories: row.get("categories"),
        book_count: row.get("book_count"),
        isbn: row.get("isbn"),
        publisher: row.get("publisher"),
        page_count: row.get("page_count"),
        cover_image: row.get("cover_image"),
        publication_date: row.get("publication_date"),
        added_at: row.get("added_at"),
    })
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let row = sqlx::query("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        book_from_row(&row)
    }

    /// Fuzzy lookup by title, optionally narrowed by author.
    ///
    /// Case-insensitive substring match; exact title matches rank first,
    /// then shorter titles, so "Dune" beats "Dune Messiah".
    pub async fn find_by_title_author(
        &self,
        title: &str,
        author: Option<&str>,
    ) -> AppResult<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM books
            WHERE title ILIKE '%' || $1 || '%'
              AND ($2::text IS NULL OR author ILIKE '%' || $2 || '%')
            ORDER BY (lower(title) = lower($1)) DESC, length(title), id
            LIMIT 1
            "#,
        )
        .bind(title)
        .bind(author)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(book_from_row).transpose()
    }

    /// Insert a new catalog entry.
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let row = sqlx::query(
            r#"
            INSERT INTO books (
                title, author, language, description_en, description_ar,
                description_fetched, categories, book_count, isbn, publisher,
                page_count, cover_image, publication_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.language.as_str())
        .bind(&book.description_en)
        .bind(&book.description_ar)
        .bind(book.description_fetched)
        .bind(&book.categories)
        .bind(book.book_count)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.page_count)
        .bind(&book.cover_image)
        .bind(&book.publication_date)
        .fetch_one(&self.pool)
        .await?;
        book_from_row(&row)
    }

    /// Partial catalog edit; absent fields keep their current value.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let row = sqlx::query(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author = COALESCE($3, author),
                language = COALESCE($4, language),
                categories = COALESCE($5, categories),
                book_count = COALESCE($6, book_count),
                isbn = COALESCE($7, isbn),
                publisher = COALESCE($8, publisher),
                page_count = COALESCE($9, page_count),
                cover_image = COALESCE($10, cover_image),
                publication_date = COALESCE($11, publication_date)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.author)
        .bind(update.language.map(|l| l.as_str()))
        .bind(&update.categories)
        .bind(update.book_count)
        .bind(&update.isbn)
        .bind(&update.publisher)
        .bind(update.page_count)
        .bind(&update.cover_image)
        .bind(&update.publication_date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        book_from_row(&row)
    }

    /// Delete a catalog entry. Refused while pending or approved requests
    /// still reference the book.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let has_active: bool = sqlx::query_scalar(ACTIVE_REQUEST_FOR_BOOK)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if has_active {
            return Err(AppError::Conflict(
                "Book has active borrow requests and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Partial description update. `None` fields are left untouched.
    pub async fn upsert_descriptions(
        &self,
        id: i32,
        description_en: Option<&str>,
        description_ar: Option<&str>,
        fetched: bool,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE books SET
                description_en = COALESCE($2, description_en),
                description_ar = COALESCE($3, description_ar),
                description_fetched = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(description_en)
        .bind(description_ar)
        .bind(fetched)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Fill provider-sourced metadata into empty fields only.
    pub async fn backfill_metadata(&self, id: i32, patch: &MetadataPatch) -> AppResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            UPDATE books SET
                isbn = COALESCE(isbn, $2),
                publisher = COALESCE(publisher, $3),
                page_count = COALESCE(page_count, $4),
                cover_image = COALESCE(cover_image, $5),
                publication_date = COALESCE(publication_date, $6)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.isbn)
        .bind(&patch.publisher)
        .bind(patch.page_count)
        .bind(&patch.cover_image)
        .bind(&patch.publication_date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Copies not held by an approved, unreturned loan. Clamped at zero:
    /// an over-committed book never reports negative availability.
    pub async fn available_copies(&self, id: i32) -> AppResult<i64> {
        let available: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT GREATEST(
                book_count - (
                    SELECT COUNT(*) FROM borrow_requests
                    WHERE book_id = books.id
                      AND status = 'approved'
                      AND return_date IS NULL
                ),
                0
            )
            FROM books WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        available.ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Total catalog entries.
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Sum of per-book available copies across the catalog.
    pub async fn total_available_copies(&self) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(GREATEST(b.book_count - COALESCE(l.active, 0), 0)), 0)
            FROM books b
            LEFT JOIN (
                SELECT book_id, COUNT(*) AS active
                FROM borrow_requests
                WHERE status = 'approved' AND return_date IS NULL
                GROUP BY book_id
            ) l ON l.book_id = b.id
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    /// Category histogram; a book with several categories counts once per
    /// category.
    pub async fn category_histogram(&self) -> AppResult<Vec<(String, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT unnest(categories) AS category, COUNT(*) AS count
            FROM books
            GROUP BY category
            ORDER BY count DESC, category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| (row.get("category"), row.get("count")))
            .collect())
    }
}
