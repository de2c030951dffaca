pub(crate) mod dataset;

use crate::http::{Client, RequestError};
use crate::EventHandler;

/// Metadata fields requested from `@search` when the caller does not
/// ask for specific ones. Enough for the download workflow.
const DEFAULT_METADATA_FIELDS: &str = "UID,dataset_full_format,dataset_download_information";

pub(crate) const DEFAULT_PORTAL_TYPE: &str = "DataSet";

pub(crate) const DEFAULT_BATCH_SIZE: u32 = 25;

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("invalid JSON in search response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Summary entry from the `@search` endpoint.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatasetSummary {
    /// URL of the full dataset metadata.
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub portal_type: String,
}

/// Search the catalog for datasets matching `query`.
///
/// A catalog with zero matches answers with an empty list, which is
/// returned as-is, not as an error.
pub(crate) fn search<E: EventHandler>(
    client: &mut Client<E>,
    query: Option<&str>,
    portal_type: &str,
    metadata_fields: Option<&[&str]>,
    batch_size: u32,
) -> Result<Vec<DatasetSummary>, CatalogError> {
    #[derive(serde::Deserialize)]
    struct SearchPage {
        #[serde(default)]
        items: Vec<DatasetSummary>,
    }

    let url = client.api_url("@search");

    let fields = metadata_fields.map(|f| f.join(","));
    let batch = batch_size.to_string();

    let mut params = vec![("portal_type", portal_type), ("b_size", batch.as_str())];

    if let Some(query) = query {
        params.push(("SearchableText", query));
    }

    params.push((
        "metadata_fields",
        fields.as_deref().unwrap_or(DEFAULT_METADATA_FIELDS),
    ));

    let response = client.get(&url, &params)?;
    let page: SearchPage = serde_json::from_reader(response.into_reader())?;

    Ok(page.items)
}
