use crate::http::{Client, RequestError};
use crate::EventHandler;

#[derive(thiserror::Error, Debug)]
pub enum UrlResolutionError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("invalid JSON in download URL response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Optional filters for `@get-download-file-urls`.
#[derive(Clone, Debug, Default)]
pub(crate) struct UrlFilter {
    pub date_from: Option<String>,
    pub date_to: Option<String>,

    /// `x_min, y_min, x_max, y_max`, in EPSG:4326.
    pub bbox: Option<[f64; 4]>,
}

/// Response body of `@get-download-file-urls`.
///
/// The shape of this endpoint is not contractually fixed: it has been
/// seen answering with a plain list of URLs, and with objects keyed by
/// `items`, `urls` or `files`. Anything else is treated as "no URLs
/// available", never as a decoding error.
#[derive(serde::Deserialize, Debug)]
#[serde(untagged)]
enum UrlResponse {
    Sequence(Vec<String>),
    Keyed {
        items: Option<Vec<String>>,
        urls: Option<Vec<String>>,
        files: Option<Vec<String>>,
    },
    Unrecognized(serde_json::Value),
}

impl UrlResponse {
    /// Normalize the tolerated shapes into a single URL list.
    fn into_urls(self) -> Vec<String> {
        match self {
            UrlResponse::Sequence(urls) => urls,

            UrlResponse::Keyed { items, urls, files } => {
                items.or(urls).or(files).unwrap_or_default()
            }

            UrlResponse::Unrecognized(_) => Vec::new(),
        }
    }
}

/// Get the direct download URLs for a packaging option of a dataset.
///
/// The returned URLs are time-limited by the service; they are meant
/// to be downloaded right away.
pub(crate) fn resolve<E: EventHandler>(
    client: &mut Client<E>,
    dataset_uid: &str,
    download_information_id: &str,
    filter: &UrlFilter,
) -> Result<Vec<String>, UrlResolutionError> {
    let url = client.api_url("@get-download-file-urls");

    let mut params = vec![
        ("dataset_uid", dataset_uid.to_owned()),
        ("download_information_id", download_information_id.to_owned()),
    ];

    if let Some([x_min, y_min, x_max, y_max]) = filter.bbox {
        params.push(("x_min", x_min.to_string()));
        params.push(("y_min", y_min.to_string()));
        params.push(("x_max", x_max.to_string()));
        params.push(("y_max", y_max.to_string()));
    }

    if let Some(date_from) = &filter.date_from {
        params.push(("date_from", date_from.clone()));
    }

    if let Some(date_to) = &filter.date_to {
        params.push(("date_to", date_to.clone()));
    }

    let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

    let response = client.get(&url, &params)?;
    let body: UrlResponse = serde_json::from_reader(response.into_reader())?;

    Ok(body.into_urls())
}
