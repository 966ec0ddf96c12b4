//! Google Sheets table source: service-account auth, spreadsheet lookup by title, first-worksheet read.

pub mod auth;
pub mod types;

use std::path::Path;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use tracing::debug;

use crate::catalog::{Table, TableSource};
use auth::ServiceAccountAuth;
use types::{ErrorEnvelope, FileList, SpreadsheetMeta, ValueRange};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("cannot read service account credentials: {0}")]
    Credentials(String),

    #[error("cannot sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("token request rejected ({code}): {message}")]
    Auth { code: u16, message: String },

    #[error("spreadsheet '{0}' not found or not shared with the service account")]
    SpreadsheetNotFound(String),

    #[error("spreadsheet has no worksheets")]
    NoWorksheet,

    #[error("Google API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Reads the first worksheet of a spreadsheet found by its exact title.
pub struct SheetsClient {
    http: Client,
    auth: ServiceAccountAuth,
    spreadsheet_name: String,
    drive_base: String,
    sheets_base: String,
}

impl SheetsClient {
    pub fn new(http: Client, credentials_path: impl AsRef<Path>, spreadsheet_name: &str) -> Self {
        Self {
            http,
            auth: ServiceAccountAuth::new(credentials_path),
            spreadsheet_name: spreadsheet_name.to_string(),
            drive_base: DRIVE_API_BASE.to_string(),
            sheets_base: SHEETS_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(
        http: Client,
        credentials_path: impl AsRef<Path>,
        spreadsheet_name: &str,
        base_url: &str,
    ) -> Self {
        Self {
            http,
            auth: ServiceAccountAuth::new(credentials_path),
            spreadsheet_name: spreadsheet_name.to_string(),
            drive_base: base_url.to_string(),
            sheets_base: base_url.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SheetsError> {
        let token = self.auth.token(&self.http).await?;
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .header("User-Agent", crate::USER_AGENT)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                code: status.as_u16(),
                message: extract_error_message(&text),
            });
        }
        Ok(response.json().await?)
    }

    async fn find_spreadsheet_id(&self) -> Result<String, SheetsError> {
        let q = format!(
            "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            escape_drive_literal(&self.spreadsheet_name)
        );
        let list: FileList = self
            .get_json(
                &format!("{}/files", self.drive_base),
                &[
                    ("q", q.as_str()),
                    ("fields", "files(id,name)"),
                    ("includeItemsFromAllDrives", "true"),
                    ("supportsAllDrives", "true"),
                ],
            )
            .await?;

        list.files
            .into_iter()
            .find(|f| f.name == self.spreadsheet_name)
            .map(|f| f.id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(self.spreadsheet_name.clone()))
    }

    async fn first_worksheet_title(&self, spreadsheet_id: &str) -> Result<String, SheetsError> {
        let meta: SpreadsheetMeta = self
            .get_json(
                &format!("{}/spreadsheets/{spreadsheet_id}", self.sheets_base),
                &[("fields", "sheets.properties")],
            )
            .await?;

        meta.sheets
            .into_iter()
            .min_by_key(|s| s.properties.index)
            .map(|s| s.properties.title)
            .ok_or(SheetsError::NoWorksheet)
    }

    async fn worksheet_values(
        &self,
        spreadsheet_id: &str,
        title: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        let range = utf8_percent_encode(&quote_sheet_title(title), NON_ALPHANUMERIC).to_string();
        let values: ValueRange = self
            .get_json(
                &format!("{}/spreadsheets/{spreadsheet_id}/values/{range}", self.sheets_base),
                &[("valueRenderOption", "FORMATTED_VALUE")],
            )
            .await?;
        Ok(values.values)
    }
}

impl TableSource for SheetsClient {
    async fn fetch_table(&self) -> Result<Table, SheetsError> {
        let id = self.find_spreadsheet_id().await?;
        let title = self.first_worksheet_title(&id).await?;
        let values = self.worksheet_values(&id, &title).await?;
        debug!(spreadsheet = %self.spreadsheet_name, worksheet = %title, rows = values.len(), "worksheet fetched");
        Ok(Table::from_values(values))
    }
}

/// Escape a value for a single-quoted Drive query literal.
fn escape_drive_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A1 notation for a whole sheet: the title in single quotes, inner quotes doubled.
fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.chars().take(200).collect())
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use auth::tests::write_key_file;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3600
            })))
            .mount(server)
            .await;
    }

    async fn mount_files(server: &MockServer, files: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(header("authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": files })))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer, test_name: &str) -> (SheetsClient, std::path::PathBuf) {
        let key_path = write_key_file(test_name, &format!("{}/token", server.uri()));
        let client = SheetsClient::with_base_url(Client::new(), &key_path, "Dori Bazasi", &server.uri());
        (client, key_path)
    }

    #[tokio::test]
    async fn fetches_first_worksheet_as_table() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_files(&server, serde_json::json!([{"id": "sheet-123", "name": "Dori Bazasi"}])).await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/sheet-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sheets": [
                    {"properties": {"sheetId": 7, "title": "Arxiv", "index": 1}},
                    {"properties": {"sheetId": 0, "title": "Narxlar", "index": 0}}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/sheet-123/values/%27Narxlar%27"))
            .and(query_param("valueRenderOption", "FORMATTED_VALUE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "range": "Narxlar!A1:C3",
                "majorDimension": "ROWS",
                "values": [
                    ["Dori Nomi", "Narxi", "Dorixona"],
                    ["Nospa", "15 000"],
                    ["Analgin", "3000", "Shifo"]
                ]
            })))
            .mount(&server)
            .await;

        let (client, key_path) = client(&server, "fetch-table");
        let table = client.fetch_table().await.unwrap();

        assert_eq!(table.headers, vec!["Dori Nomi", "Narxi", "Dorixona"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["Nospa", "15 000", ""]);
        let _ = std::fs::remove_file(key_path);
    }

    #[tokio::test]
    async fn unknown_spreadsheet_is_not_found() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_files(&server, serde_json::json!([])).await;

        let (client, key_path) = client(&server, "not-found");
        let err = client.fetch_table().await.unwrap_err();

        assert!(matches!(err, SheetsError::SpreadsheetNotFound(ref n) if n == "Dori Bazasi"));
        let _ = std::fs::remove_file(key_path);
    }

    #[tokio::test]
    async fn spreadsheet_without_worksheets_is_an_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_files(&server, serde_json::json!([{"id": "empty", "name": "Dori Bazasi"}])).await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let (client, key_path) = client(&server, "no-worksheet");
        assert!(matches!(client.fetch_table().await, Err(SheetsError::NoWorksheet)));
        let _ = std::fs::remove_file(key_path);
    }

    #[tokio::test]
    async fn permission_denied_is_api_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Insufficient Permission"}
            })))
            .mount(&server)
            .await;

        let (client, key_path) = client(&server, "forbidden");
        match client.fetch_table().await {
            Err(SheetsError::Api { code, message }) => {
                assert_eq!(code, 403);
                assert_eq!(message, "Insufficient Permission");
            }
            other => panic!("expected Api(403), got: {other:?}"),
        }
        let _ = std::fs::remove_file(key_path);
    }
}
