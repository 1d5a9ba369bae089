use crate::error::{CategorizerError, Result};
use crate::table::Table;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// The tabular store the pipeline reads batches from and writes annotated
/// rows back to. Faults here abort the run; they are never downgraded to
/// empty results the way provider faults are.
#[allow(async_fn_in_trait)]
pub trait SheetStore {
    /// Reads a named range as a table, first row as headers.
    async fn read_table(&self, range: &str) -> Result<Table>;

    /// Replaces the full range content with `[headers] + rows`, blanks for
    /// missing values.
    async fn write_table(&self, range: &str, table: &Table) -> Result<()>;
}

/// Google-Sheets-backed store over the spreadsheet values API. The access
/// token is the opaque authenticated handle; how it was obtained or
/// decrypted is the credential layer's business, not ours.
#[derive(Debug, Clone)]
pub struct GoogleSheetsClient {
    client: Client,
    access_token: String,
    spreadsheet_id: String,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(access_token: impl Into<String>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            access_token: access_token.into(),
            spreadsheet_id: spreadsheet_id.into(),
            base_url: SHEETS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl SheetStore for GoogleSheetsClient {
    async fn read_table(&self, range: &str) -> Result<Table> {
        debug!("Reading sheet range {}", range);
        let url = format!(
            "{}/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        );

        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await?;
            return Err(CategorizerError::SheetApi {
                status: status.as_u16(),
                body,
            });
        }

        let body: ValueRange = res.json().await?;
        if body.values.is_empty() {
            warn!("No data found in range {}", range);
        }

        let table = Table::from_values(body.values);
        debug!("Read {} rows from {}", table.row_count(), range);
        Ok(table)
    }

    async fn write_table(&self, range: &str, table: &Table) -> Result<()> {
        info!(
            "Writing {} rows to range {} in sheet {}",
            table.row_count(),
            range,
            self.spreadsheet_id
        );
        let url = format!(
            "{}/{}/values/{}?valueInputOption=RAW",
            self.base_url, self.spreadsheet_id, range
        );
        let payload = json!({ "values": table.to_values() });

        let res = self
            .client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await?;
            return Err(CategorizerError::SheetApi {
                status: status.as_u16(),
                body,
            });
        }

        let body: UpdateResponse = res.json().await?;
        info!(
            "Updated {} cells in range {}",
            body.updated_cells.unwrap_or(0),
            range
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    updated_cells: Option<u64>,
}
