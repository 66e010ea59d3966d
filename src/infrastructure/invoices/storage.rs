//! Rendered invoice files on local disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::shared::error::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceStorage: Send + Sync {
    /// Store a rendered invoice, returning the path to persist on the invoice.
    async fn save(&self, invoice_number: &str, bytes: Vec<u8>) -> Result<String, AppError>;

    /// Load a stored invoice; `None` if the file is gone.
    async fn load(&self, path: &str) -> Result<Option<Vec<u8>>, AppError>;
}

#[derive(Debug, Clone)]
pub struct FileInvoiceStorage {
    root: PathBuf,
}

impl FileInvoiceStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AppError> {
        let name = Path::new(path)
            .file_name()
            .ok_or_else(|| AppError::Internal(format!("Invalid invoice path: {}", path)))?;
        Ok(self.root.join(name))
    }
}

/// `SZ000042/2026` -> `SZ000042_2026.pdf`
pub fn file_name_for(invoice_number: &str) -> String {
    let stem: String = invoice_number
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}.pdf", stem)
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Internal(format!("Invoice storage failed: {}", e))
}

#[async_trait]
impl InvoiceStorage for FileInvoiceStorage {
    async fn save(&self, invoice_number: &str, bytes: Vec<u8>) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(io_error)?;

        let name = file_name_for(invoice_number);
        let path = self.root.join(&name);
        tokio::fs::write(&path, bytes).await.map_err(io_error)?;
        debug!(path = %path.display(), "Invoice stored");

        Ok(name)
    }

    async fn load(&self, path: &str) -> Result<Option<Vec<u8>>, AppError> {
        match tokio::fs::read(self.resolve(path)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!(
            "hotelflow-invoices-{}",
            crate::shared::tokens::random_hex(8)
        ))
    }

    #[test]
    fn test_file_name_is_flat() {
        assert_eq!(file_name_for("SZ000042/2026"), "SZ000042_2026.pdf");
        assert_eq!(file_name_for("../x"), "___x.pdf");
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = scratch_dir();
        let storage = FileInvoiceStorage::new(&dir);

        let path = storage.save("SZ000001/2026", b"%PDF-1.3".to_vec()).await.unwrap();
        assert_eq!(path, "SZ000001_2026.pdf");

        let loaded = storage.load(&path).await.unwrap();
        assert_eq!(loaded.as_deref(), Some(&b"%PDF-1.3"[..]));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let storage = FileInvoiceStorage::new(scratch_dir());
        assert!(storage.load("SZ999999_2026.pdf").await.unwrap().is_none());
    }
}
