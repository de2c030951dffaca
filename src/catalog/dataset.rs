use crate::http::{Client, RequestError};
use crate::EventHandler;

use super::DatasetSummary;

/// Title substring that identifies the sibling "change layer" products.
/// Those share the title prefix of the main dataset and must not win
/// the selection.
const EXCLUDED_TITLE_TERM: &str = "change";

// Pre-packaged artifact the workflow downloads.
const FILE_TYPE: &str = "Raster";
const FILE_FORMAT: &str = "Geotiff";
const FILE_RESOLUTION: &str = "100 m";

// Packaging option used to request direct URLs.
const DOWNLOAD_NAME: &str = "RASTER";
const DOWNLOAD_COLLECTION: &str = "100 m";

#[derive(thiserror::Error, Debug)]
pub enum ResolutionError {
    #[error("no dataset titled like {0:?} in the search results")]
    NoMatchingDataset(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("invalid JSON in dataset metadata: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset metadata is missing the UID field")]
    MissingUid,

    #[error("no 100 m GeoTIFF raster entry in the downloadable files")]
    NoPackagedFile,

    #[error("no RASTER 100 m entry in the download information")]
    NoDownloadInformation,
}

/// Container for the `{"items": [...]}` lists in the CLMS metadata.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct ItemList<T> {
    #[serde(default)]
    pub items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        ItemList { items: Vec::new() }
    }
}

/// Full dataset metadata from the detail endpoint.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatasetDetail {
    #[serde(rename = "UID", default)]
    pub uid: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub downloadable_files: ItemList<FileDescriptor>,

    #[serde(default)]
    pub dataset_download_information: ItemList<DownloadInformation>,
}

/// Pre-packaged downloadable artifact of a dataset.
#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct FileDescriptor {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub format: String,

    #[serde(default)]
    pub resolution: String,

    #[serde(default)]
    pub size: String,

    /// File name stem of the packaged archive.
    #[serde(default)]
    pub file: String,
}

/// Spatial/temporal packaging option of a dataset, needed to request
/// direct download URLs.
#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct DownloadInformation {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub collection: String,
}

impl DatasetDetail {
    pub fn uid(&self) -> Result<&str, ResolutionError> {
        self.uid.as_deref().ok_or(ResolutionError::MissingUid)
    }

    /// First pre-packaged file that is a 100 m GeoTIFF raster.
    pub fn packaged_file(&self) -> Result<&FileDescriptor, ResolutionError> {
        self.downloadable_files
            .items
            .iter()
            .find(|f| {
                f.kind == FILE_TYPE && f.format == FILE_FORMAT && f.resolution == FILE_RESOLUTION
            })
            .ok_or(ResolutionError::NoPackagedFile)
    }

    /// First download-information entry for the 100 m raster collection.
    pub fn download_information(&self) -> Result<&DownloadInformation, ResolutionError> {
        self.dataset_download_information
            .items
            .iter()
            .find(|i| i.name == DOWNLOAD_NAME && i.collection == DOWNLOAD_COLLECTION)
            .ok_or(ResolutionError::NoDownloadInformation)
    }
}

/// Pick the dataset whose title contains `phrase`.
///
/// The scan follows the order given by the catalog: the first title
/// that contains the phrase, and is not a change layer, wins.
pub(crate) fn select_summary<'a>(
    summaries: &'a [DatasetSummary],
    phrase: &str,
) -> Option<&'a DatasetSummary> {
    let phrase = phrase.to_lowercase();

    summaries.iter().find(|summary| {
        let title = summary.title.to_lowercase();
        title.contains(&phrase) && !title.contains(EXCLUDED_TITLE_TERM)
    })
}

/// Resolve a search result to the full dataset metadata, fetched from
/// the URL in its `@id` field.
pub(crate) fn resolve<E: EventHandler>(
    client: &mut Client<E>,
    summaries: &[DatasetSummary],
    phrase: &str,
) -> Result<DatasetDetail, ResolutionError> {
    let summary = select_summary(summaries, phrase)
        .ok_or_else(|| ResolutionError::NoMatchingDataset(phrase.to_owned()))?;

    let response = client.get(&summary.id, &[])?;

    Ok(serde_json::from_reader(response.into_reader())?)
}
