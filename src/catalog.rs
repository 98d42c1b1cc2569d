use derive_more::{Display, Error};
use lazy_regex::regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One row of the published catalog, as exported by the sheet or the static
/// fallback file. Every column is optional text; normalization decides what
/// survives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProductRow {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub sub_product_id: String,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub image_link: String,
    #[serde(default)]
    pub image_front: String,
    #[serde(default)]
    pub image_top: String,
    #[serde(default)]
    pub image_side: String,
    #[serde(default)]
    pub image_projection: String,
    #[serde(default)]
    pub youtube_video: String,
    #[serde(default)]
    pub category_type: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub fabric_type: String,
    #[serde(default)]
    pub increment_by: String,
}

#[derive(Debug, Display, Error)]
pub enum FetchError {
    #[display("Catalog request failed: {_0}")]
    Network(reqwest_middleware::Error),
    #[display("Catalog endpoint returned {status}")]
    Status { status: reqwest::StatusCode },
    #[display("Unable to read catalog file: {_0}")]
    Io(std::io::Error),
    #[error(ignore)]
    #[display("Unable to parse catalog payload: {_0}")]
    Parse(anyhow::Error),
}

impl From<reqwest_middleware::Error> for FetchError {
    fn from(err: reqwest_middleware::Error) -> Self {
        FetchError::Network(err)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.into())
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err)
    }
}

/// Rewrites a spreadsheet-by-id URL to its canonical CSV-export form,
/// keeping an explicit tab id when the source URL carries one. Anything
/// that does not look like a spreadsheet URL passes through unchanged.
pub fn sheet_csv_url(url: &str) -> String {
    let re = regex!(r"/spreadsheets/d/([a-zA-Z0-9_-]+)");
    let Some(caps) = re.captures(url) else {
        return url.to_string();
    };
    let sheet_id = &caps[1];
    let gid = regex!(r"gid=(\d+)")
        .captures(url)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "0".to_string());
    format!("https://docs.google.com/spreadsheets/d/{sheet_id}/export?format=csv&gid={gid}")
}

pub fn parse_csv_rows(text: &str) -> Result<Vec<RawProductRow>, FetchError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    rdr.deserialize()
        .collect::<Result<Vec<RawProductRow>, _>>()
        .map_err(|err| FetchError::Parse(err.into()))
}

pub struct CatalogSource {
    client: reqwest_middleware::ClientWithMiddleware,
    sheet_url: Option<String>,
    fallback_path: PathBuf,
}

impl CatalogSource {
    pub fn new(
        client: reqwest_middleware::ClientWithMiddleware,
        sheet_url: Option<String>,
        fallback_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            sheet_url,
            fallback_path: fallback_path.into(),
        }
    }

    /// Sheet first, static file second. Only when every source fails does
    /// the error reach the caller; a silent empty catalog is never returned.
    pub async fn fetch(&self) -> Result<Vec<RawProductRow>, FetchError> {
        if let Some(url) = &self.sheet_url {
            match self.fetch_sheet(url).await {
                Ok(rows) => return Ok(rows),
                Err(err) => log::warn!(
                    "Sheet fetch failed, falling back to {}: {err}",
                    self.fallback_path.display()
                ),
            }
        }
        self.fetch_fallback().await
    }

    async fn fetch_sheet(&self, url: &str) -> Result<Vec<RawProductRow>, FetchError> {
        let url = sheet_csv_url(url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { status });
        }
        let text = response.text().await?;
        parse_csv_rows(&text)
    }

    async fn fetch_fallback(&self) -> Result<Vec<RawProductRow>, FetchError> {
        let text = tokio::fs::read_to_string(&self.fallback_path).await?;
        serde_json::from_str(&text).map_err(|err| FetchError::Parse(err.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_share_url_to_csv_export() {
        let url = "https://docs.google.com/spreadsheets/d/17d5ZsULSFn9J-abc_DEF/edit?usp=sharing";
        assert_eq!(
            sheet_csv_url(url),
            "https://docs.google.com/spreadsheets/d/17d5ZsULSFn9J-abc_DEF/export?format=csv&gid=0"
        );
    }

    #[test]
    fn keeps_explicit_tab_id() {
        let url = "https://docs.google.com/spreadsheets/d/abc123/edit#gid=417";
        assert_eq!(
            sheet_csv_url(url),
            "https://docs.google.com/spreadsheets/d/abc123/export?format=csv&gid=417"
        );
    }

    #[test]
    fn passes_through_other_urls() {
        let url = "https://example.com/catalog.csv";
        assert_eq!(sheet_csv_url(url), url);
    }

    #[test]
    fn parses_headered_csv() {
        let text = "product_id,sub_product_id,product_name,price,increment_by\n\
                    P1,P1-A,Bear,199.50,6\n\
                    P2,,Duck,50,\n";
        let rows = parse_csv_rows(text).expect("csv should parse");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sub_product_id, "P1-A");
        assert_eq!(rows[0].price, "199.50");
        assert_eq!(rows[1].product_name, "Duck");
        assert_eq!(rows[1].increment_by, "");
    }

    #[test]
    fn missing_columns_default_to_empty() {
        let text = "product_id,product_name\nP1,Bear\n";
        let rows = parse_csv_rows(text).expect("csv should parse");
        assert_eq!(rows[0].category_type, "");
        assert_eq!(rows[0].image_link, "");
    }
}
