use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::catalog::{self, dataset, CatalogError};
use crate::credentials::Credentials;
use crate::http::{Client, DEFAULT_API_BASE};
use crate::transfer;
use crate::urls::{self, UrlFilter, UrlResolutionError};
use crate::ResolutionError;

/// Handler to receive notifications for events during the fetch
/// process.
///
/// All methods are optional.
#[expect(unused_variables)]
pub trait EventHandler {
    /// A new bearer token is requested from the token endpoint.
    fn token_request(&self, uri: &str) {}

    /// Authenticated request to the CLMS API.
    fn api_request(&self, url: &str) {}

    /// A file transfer starts.
    ///
    /// `total_bytes` is the Content-Length of the response, when the
    /// server declares one.
    fn download_start(&self, url: &str, total_bytes: Option<u64>) {}

    /// Some data has been written to the destination file.
    ///
    /// Emitted roughly every 100 MiB, and once more when the transfer
    /// completes.
    fn download_progress(&self, written: u64, total_bytes: Option<u64>) {}

    /// A single file transfer failed. The workflow continues with the
    /// remaining URLs.
    fn download_failed(&self, url: &str, error: &dyn Display) {}

    /// The workflow finished with `files` files written.
    fn finished(&self, files: usize) {}
}

/// [`EventHandler`] instance to ignore all events.
pub struct NoEventHandler;

impl EventHandler for NoEventHandler {}

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("dataset search failed: {0}")]
    Search(#[from] CatalogError),

    #[error("dataset resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("download URL resolution failed: {0}")]
    Urls(#[from] UrlResolutionError),

    #[error("the catalog returned no download URLs")]
    NoUrls,

    #[error("all {0} downloads failed")]
    AllDownloadsFailed(usize),
}

/// Dataset the workflow looks for.
#[derive(Clone, Debug)]
pub struct DatasetSpec {
    /// Text query sent to the catalog search.
    pub query: String,

    /// Phrase contained in the title of the wanted dataset. Used to
    /// pick one entry from the search results.
    pub title_phrase: String,

    /// Temporal extent of the dataset (`YYYY-MM-DD`), forwarded to the
    /// URL resolution endpoint.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl DatasetSpec {
    pub fn new(query: impl Into<String>, title_phrase: impl Into<String>) -> Self {
        DatasetSpec {
            query: query.into(),
            title_phrase: title_phrase.into(),
            date_from: None,
            date_to: None,
        }
    }

    /// Restrict the download URLs to a date range.
    pub fn period(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.date_from = Some(from.into());
        self.date_to = Some(to.into());
        self
    }

    /// CORINE Land Cover 2018, pre-packaged 100 m raster.
    pub fn clc2018() -> Self {
        DatasetSpec::new("CLC2018", "corine land cover 2018").period("2017-01-01", "2018-12-31")
    }
}

/// Downloads the pre-packaged files of a CLMS dataset.
///
/// See the [crate documentation][crate] for an example.
pub struct Fetcher {
    spec: DatasetSpec,
    credentials: Credentials,
    api_base: String,
    bbox: Option<[f64; 4]>,
    chunk_size: usize,
}

impl Fetcher {
    pub fn new(spec: DatasetSpec, credentials: Credentials) -> Self {
        Fetcher {
            spec,
            credentials,
            api_base: DEFAULT_API_BASE.to_owned(),
            bbox: None,
            chunk_size: transfer::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Replace the production API base URL.
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Bounding box (`x_min, y_min, x_max, y_max`, in EPSG:4326)
    /// forwarded to the URL resolution endpoint.
    pub fn bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Size of the copy buffer used for file transfers.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Run the whole workflow: search the catalog, resolve the dataset
    /// and its packaging option, get the direct URLs, and download
    /// them one by one to `output_dir`.
    ///
    /// A failed transfer is reported to the event handler and does not
    /// abort the remaining ones. The call returns the files that could
    /// be written, and fails only when there is none.
    pub fn fetch(
        self,
        event_handler: impl EventHandler,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, WorkflowError> {
        let mut client = Client::new(self.credentials, self.api_base, &event_handler);

        let summaries = catalog::search(
            &mut client,
            Some(&self.spec.query),
            catalog::DEFAULT_PORTAL_TYPE,
            None,
            catalog::DEFAULT_BATCH_SIZE,
        )?;

        let detail = dataset::resolve(&mut client, &summaries, &self.spec.title_phrase)?;

        // Both selections must succeed before asking for URLs.
        let uid = detail.uid()?.to_owned();
        detail.packaged_file()?;
        let information_id = detail.download_information()?.id.clone();

        let filter = UrlFilter {
            date_from: self.spec.date_from.clone(),
            date_to: self.spec.date_to.clone(),
            bbox: self.bbox,
        };

        let urls = urls::resolve(&mut client, &uid, &information_id, &filter)?;

        if urls.is_empty() {
            return Err(WorkflowError::NoUrls);
        }

        let fallback_stem = self.spec.query.to_lowercase();

        let mut downloaded = Vec::new();

        for (index, url) in urls.iter().enumerate() {
            let destination = output_dir.join(file_name(url, index + 1, &fallback_stem));

            match transfer::download(&mut client, url, &destination, self.chunk_size) {
                Ok(path) => downloaded.push(path),
                Err(error) => event_handler.download_failed(url, &error),
            }
        }

        if downloaded.is_empty() {
            return Err(WorkflowError::AllDownloadsFailed(urls.len()));
        }

        event_handler.finished(downloaded.len());

        Ok(downloaded)
    }
}

/// File name for a download URL: the final path segment, without the
/// query string. Falls back to `<stem>_partN` when the segment is
/// empty.
fn file_name(url: &str, index: usize, stem: &str) -> String {
    let name = url
        .split('?')
        .next()
        .unwrap_or_default()
        .rsplit('/')
        .next()
        .unwrap_or_default();

    if name.is_empty() {
        format!("{stem}_part{index}")
    } else {
        name.to_owned()
    }
}
