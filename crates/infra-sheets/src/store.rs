// Google Sheets SheetStore Implementation

use crate::auth::TokenProvider;
use crate::layout::{
    column_letter, find_column, first_empty_row, free_header_slot, labels, sheet_prefix,
    without_label, FIRST_LABEL_ROW, HEADER_ROW,
};
use async_trait::async_trait;
use lineup_core::domain::{Subject, SubjectCatalog};
use lineup_core::error::{AppError, Result};
use lineup_core::port::SheetStore;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_RANGE: &str = "A:ZZ";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `values` resource of the Sheets v4 API
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<String>>,
}

fn map_http_error(context: &str, err: reqwest::Error) -> AppError {
    AppError::Store(format!("{context}: {err}"))
}

/// One spreadsheet, one column per subject keyed by the subject code
pub struct GoogleSheetsStore {
    client: reqwest::Client,
    tokens: TokenProvider,
    spreadsheet_id: String,
    range: String,
    base_url: String,
}

impl GoogleSheetsStore {
    pub fn new(tokens: TokenProvider, spreadsheet_id: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            tokens,
            spreadsheet_id: spreadsheet_id.into(),
            range: DEFAULT_RANGE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Sheet area holding the queues, e.g. `"Queue!A:ZZ"`
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }

    /// `B3` or `B2:B7` on the configured sheet
    fn a1(&self, column: usize, from_row: usize, to_row: Option<usize>) -> String {
        let letter = column_letter(column + 1);
        let prefix = sheet_prefix(&self.range);
        match to_row {
            Some(to_row) => format!("{prefix}{letter}{from_row}:{letter}{to_row}"),
            None => format!("{prefix}{letter}{from_row}"),
        }
    }

    /// Whole queue area, column-major: `columns[i][0]` is the header
    async fn read_columns(&self) -> Result<Vec<Vec<String>>> {
        let token = self.tokens.access_token(&self.client).await?;
        let response = self
            .client
            .get(self.values_url(&self.range))
            .bearer_auth(token)
            .query(&[("majorDimension", "COLUMNS")])
            .send()
            .await
            .map_err(|e| map_http_error("sheet read failed", e))?;

        let body: ValueRange = check_status(response, "sheet read")
            .await?
            .json()
            .await
            .map_err(|e| map_http_error("invalid sheet read response", e))?;
        Ok(body.values)
    }

    async fn read_subject_column(&self, subject: &Subject) -> Result<(usize, Vec<String>)> {
        let mut columns = self.read_columns().await?;
        let index = find_column(&columns, &subject.code).ok_or_else(|| {
            AppError::NotFound(format!(
                "no sheet column with header '{}' for subject '{}'",
                subject.code, subject.name
            ))
        })?;
        Ok((index, columns.swap_remove(index)))
    }

    async fn write_column(&self, range: String, cells: Vec<String>) -> Result<()> {
        let token = self.tokens.access_token(&self.client).await?;
        let body = ValueRange {
            range: Some(range.clone()),
            major_dimension: Some("COLUMNS".to_string()),
            values: vec![cells],
        };

        let response = self
            .client
            .put(self.values_url(&range))
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await
            .map_err(|e| map_http_error("sheet write failed", e))?;
        check_status(response, "sheet write").await?;
        Ok(())
    }

    async fn clear_range(&self, range: String) -> Result<()> {
        let token = self.tokens.access_token(&self.client).await?;
        let response = self
            .client
            .post(format!("{}:clear", self.values_url(&range)))
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| map_http_error("sheet clear failed", e))?;
        check_status(response, "sheet clear").await?;
        Ok(())
    }

    /// Write the code of every subject without a column into the first free
    /// header cell. Returns how many headers were added.
    pub async fn ensure_headers(&self, catalog: &SubjectCatalog) -> Result<usize> {
        let columns = self.read_columns().await?;
        let mut taken = Vec::new();

        for subject in catalog.iter() {
            if find_column(&columns, &subject.code).is_some() {
                continue;
            }
            let index = free_header_slot(&columns, &taken);
            taken.push(index);

            let range = self.a1(index, HEADER_ROW, None);
            self.write_column(range.clone(), vec![subject.code.clone()])
                .await?;
            info!(subject = %subject.name, code = %subject.code, range = %range, "Restored missing column header");
        }

        Ok(taken.len())
    }
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Store(format!("{what} returned {status}: {body}")))
}

#[async_trait]
impl SheetStore for GoogleSheetsStore {
    async fn read_ordered_labels(&self, subject: &Subject) -> Result<Vec<String>> {
        let (_, column) = self.read_subject_column(subject).await?;
        let labels = labels(&column);
        debug!(subject = %subject.name, count = labels.len(), "Read labels from sheet");
        Ok(labels)
    }

    async fn append_label(&self, subject: &Subject, label: &str) -> Result<()> {
        let (index, column) = self.read_subject_column(subject).await?;
        let row = first_empty_row(&column);
        let range = self.a1(index, row, None);
        self.write_column(range.clone(), vec![label.to_string()])
            .await?;
        debug!(subject = %subject.name, label, range = %range, "Appended label");
        Ok(())
    }

    async fn remove_label(&self, subject: &Subject, label: &str) -> Result<()> {
        let (index, column) = self.read_subject_column(subject).await?;
        let Some(cells) = without_label(&column, label) else {
            warn!(subject = %subject.name, label, "Label not in sheet, nothing to remove");
            return Ok(());
        };

        let last_row = FIRST_LABEL_ROW + cells.len() - 1;
        let range = self.a1(index, FIRST_LABEL_ROW, Some(last_row));
        self.write_column(range.clone(), cells).await?;
        debug!(subject = %subject.name, label, range = %range, "Removed label");
        Ok(())
    }

    async fn clear_column(&self, subject: &Subject) -> Result<()> {
        let columns = self.read_columns().await?;
        let index = find_column(&columns, &subject.code).ok_or_else(|| {
            AppError::NotFound(format!("no sheet column for subject '{}'", subject.name))
        })?;

        let letter = column_letter(index + 1);
        let range = format!("{}{letter}{FIRST_LABEL_ROW}:{letter}", sheet_prefix(&self.range));
        self.clear_range(range.clone()).await?;
        info!(subject = %subject.name, range = %range, "Cleared sheet column");
        Ok(())
    }
}
