//! Durable store: the whole catalog as one JSON object on disk
//!
//! Every mutation rewrites the file through a temporary sibling that is then
//! renamed over the target, so a crash leaves either the old or the new
//! catalog on disk, never a truncated one.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

use super::{
    adjusted_quantity,
    memory::{check_duplicate, collect_sorted},
    BookStore, StoreError, StoreResult,
};
use crate::models::book::{contains_ignore_case, Book};

type Catalog = BTreeMap<String, Book>;

/// JSON-file backed store. One mutex serializes reads, writes and the
/// persist step.
pub struct JsonStore {
    path: PathBuf,
    books: Mutex<Catalog>,
}

impl JsonStore {
    /// Open the store at `path`. A missing file is created from `seed`; an
    /// existing file is loaded as is and `seed` is ignored.
    pub async fn open(path: impl AsRef<Path>, seed: Vec<Book>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }

        let books = match fs::read(&path).await {
            Ok(bytes) => {
                let books = decode(&bytes)?;
                tracing::debug!(path = %path.display(), count = books.len(), "Loaded catalog");
                books
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let books: Catalog = seed.into_iter().map(|b| (b.id.clone(), b)).collect();
                persist(&path, &books).await?;
                tracing::info!(path = %path.display(), count = books.len(), "Created seeded catalog");
                books
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            books: Mutex::new(books),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn decode(bytes: &[u8]) -> StoreResult<Catalog> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Catalog::new());
    }
    let raw: Catalog = serde_json::from_slice(bytes)?;

    // The record is authoritative for its id; two records may not collide
    let mut books = Catalog::new();
    for book in raw.into_values() {
        check_duplicate(books.values(), &book)?;
        books.insert(book.id.clone(), book);
    }
    Ok(books)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write the full catalog atomically: temp file, fsync, rename.
async fn persist(path: &Path, books: &Catalog) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(books)?;
    let tmp = temp_path(path);

    let mut file = fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl BookStore for JsonStore {
    async fn list(&self) -> StoreResult<Vec<Book>> {
        let books = self.books.lock().await;
        Ok(collect_sorted(books.values(), |_| true))
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Book> {
        let books = self.books.lock().await;
        books
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, book: Book) -> StoreResult<String> {
        let mut books = self.books.lock().await;
        check_duplicate(books.values(), &book)?;

        let id = book.id.clone();
        books.insert(id.clone(), book);
        if let Err(e) = persist(&self.path, &books).await {
            books.remove(&id);
            return Err(e);
        }
        Ok(id)
    }

    async fn update(&self, book: Book) -> StoreResult<()> {
        let mut books = self.books.lock().await;
        let id = book.id.clone();
        if books.contains_key(&id) {
            check_duplicate(books.values().filter(|b| b.id != id), &book)?;
        }
        let previous = match books.get_mut(&id) {
            Some(current) => std::mem::replace(current, book),
            None => return Err(StoreError::NotFound(id)),
        };

        if let Err(e) = persist(&self.path, &books).await {
            books.insert(id, previous);
            return Err(e);
        }
        Ok(())
    }

    async fn find_by_title(&self, title: &str) -> StoreResult<Vec<Book>> {
        let books = self.books.lock().await;
        Ok(collect_sorted(books.values(), |b| contains_ignore_case(&b.title, title)))
    }

    async fn find_by_author(&self, author: &str) -> StoreResult<Vec<Book>> {
        let books = self.books.lock().await;
        Ok(collect_sorted(books.values(), |b| contains_ignore_case(&b.author, author)))
    }

    async fn adjust_quantity(&self, id: &str, delta: i64) -> StoreResult<Book> {
        let mut books = self.books.lock().await;
        let book = books
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let previous = book.quantity;
        book.quantity = adjusted_quantity(book, delta)?;
        let updated = book.clone();

        if let Err(e) = persist(&self.path, &books).await {
            if let Some(book) = books.get_mut(id) {
                book.quantity = previous;
            }
            return Err(e);
        }
        Ok(updated)
    }
}
