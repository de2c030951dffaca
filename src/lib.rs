//! Client for the download API of the Copernicus Land Monitoring
//! Service (CLMS).
//!
//! The entry point is [`Fetcher`]: given the [`Credentials`] of a CLMS
//! service key and a [`DatasetSpec`], it authenticates with a signed
//! JWT assertion, finds the dataset in the catalog, resolves its
//! pre-packaged 100 m raster files, and downloads them one by one to a
//! local directory.
//!
//! ```no_run
//! # use clms_fetch::*;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let key = std::fs::read_to_string("service-key.pem")?;
//! let credentials = Credentials::new("client-id", "user-id", &key)?;
//!
//! let files = Fetcher::new(DatasetSpec::clc2018(), credentials)
//!     .fetch(NoEventHandler, "data/raw/clc".as_ref())?;
//!
//! for file in files {
//!     println!("{}", file.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Transfers that fail do not abort the workflow: [`Fetcher::fetch`]
//! returns the files that could be written, and fails only when there
//! is none. A failed transfer never leaves a truncated file at its
//! destination.

mod auth;
mod catalog;
mod credentials;
mod http;
mod transfer;
mod urls;
mod workflow;

pub use auth::AuthError;
pub use catalog::dataset::{
    DatasetDetail, DownloadInformation, FileDescriptor, ItemList, ResolutionError,
};
pub use catalog::{CatalogError, DatasetSummary};
pub use credentials::{ConfigError, Credentials, DEFAULT_TOKEN_URI};
pub use http::RequestError;
pub use transfer::TransferError;
pub use urls::UrlResolutionError;
pub use workflow::{DatasetSpec, EventHandler, Fetcher, NoEventHandler, WorkflowError};
