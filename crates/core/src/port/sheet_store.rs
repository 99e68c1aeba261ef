// Sheet Store Port (authoritative external queue representation)

use crate::domain::Subject;
use crate::error::Result;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// The external spreadsheet, one column per subject, labels in queue order.
///
/// Every method is a single logical mutation that may fail with
/// `AppError::Store`; nothing is atomic across calls.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Labels currently in the subject's column, top to bottom
    async fn read_ordered_labels(&self, subject: &Subject) -> Result<Vec<String>>;

    /// Write a label into the first free cell of the column
    async fn append_label(&self, subject: &Subject, label: &str) -> Result<()>;

    /// Remove a label from the column, closing the gap
    async fn remove_label(&self, subject: &Subject, label: &str) -> Result<()>;

    /// Blank every label cell of the column (header kept)
    async fn clear_column(&self, subject: &Subject) -> Result<()>;
}
