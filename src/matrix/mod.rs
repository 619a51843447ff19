pub mod http;

use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::tally::CategoryTally;

/// Header of the key column, written when a sheet is created or found empty.
pub const KEY_HEADER: &str = "Date";

/// An opened sheet. Ranges are addressed through the title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetHandle {
    pub title: String,
}

/// One cell update. Row and column are 1-based, matching how sheet services address cells.
#[derive(Debug, Clone, PartialEq)]
pub struct CellWrite {
    pub row: u32,
    pub col: u32,
    pub value: f64,
}

/// The raw sheet service surface. The matrix engine drives these six calls; everything about
/// authentication and cell addressing stays behind the implementation.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SheetBackend: Sync + Send {
    /// Locates the named sheet, creating it with a lone [KEY_HEADER] header when absent.
    /// Calling twice yields the same sheet, never a duplicate.
    async fn open_or_create(&self, title: &str) -> Result<SheetHandle>;

    async fn read_header_row(&self, sheet: &SheetHandle) -> Result<Vec<String>>;

    async fn write_header_row(&self, sheet: &SheetHandle, header: &[String]) -> Result<()>;

    /// Full first column, header cell included.
    async fn read_key_column(&self, sheet: &SheetHandle) -> Result<Vec<String>>;

    async fn append_row(&self, sheet: &SheetHandle, values: &[String]) -> Result<()>;

    async fn batch_write_cells(&self, sheet: &SheetHandle, writes: &[CellWrite]) -> Result<()>;
}

/// Maintains the day-by-category matrix: grows the header for unseen categories, finds or
/// appends the row for a date, and lands all cell updates in one batch.
pub struct MatrixStore<B> {
    backend: B,
}

impl<B: SheetBackend> MatrixStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub async fn ensure_sheet(&self, title: &str) -> Result<SheetHandle> {
        self.backend.open_or_create(title).await
    }

    pub async fn upsert_row(
        &self,
        sheet: &SheetHandle,
        row_key: &str,
        tally: &CategoryTally,
    ) -> Result<()> {
        let mut header = self.backend.read_header_row(sheet).await?;
        let original_len = header.len();
        if header.is_empty() {
            header.push(KEY_HEADER.to_string());
        }

        for (category, _) in tally.iter() {
            if !header.iter().any(|existing| existing == category) {
                header.push(category.to_string());
            }
        }

        // Column addresses below come from this written vector, never from a re-read that
        // could lag behind the write.
        if header.len() != original_len {
            self.backend.write_header_row(sheet, &header).await?;
        }

        let keys = self.backend.read_key_column(sheet).await?;
        let row = match keys.iter().position(|key| key == row_key) {
            Some(index) => index as u32 + 1,
            None => {
                self.backend
                    .append_row(sheet, &[row_key.to_string()])
                    .await?;
                keys.len() as u32 + 1
            }
        };

        let writes: Vec<CellWrite> = tally
            .iter()
            .map(|(category, hours)| {
                let col = header
                    .iter()
                    .position(|existing| existing == category)
                    .expect("category was appended to the header above");
                CellWrite {
                    row,
                    col: col as u32 + 1,
                    value: hours,
                }
            })
            .collect();

        debug!("Upserting row {row_key:?} at row {row} with {} cells", writes.len());
        self.backend.batch_write_cells(sheet, &writes).await
    }
}
