use std::path::PathBuf;

use clap::Parser;
use clms_fetch::{Credentials, DatasetSpec, EventHandler, Fetcher};

#[derive(Parser, Debug)]
struct Args {
    /// Text query sent to the catalog search.
    #[arg(long, default_value = "CLC2018")]
    query: String,

    /// Phrase contained in the title of the wanted dataset.
    #[arg(long, default_value = "corine land cover 2018")]
    title: String,

    /// Start of the temporal filter (YYYY-MM-DD).
    #[arg(long, default_value = "2017-01-01")]
    date_from: String,

    /// End of the temporal filter (YYYY-MM-DD).
    #[arg(long, default_value = "2018-12-31")]
    date_to: String,

    /// Directory to write the downloaded files.
    output: PathBuf,
}

struct Logger;

impl EventHandler for Logger {
    fn token_request(&self, uri: &str) {
        println!("TOKEN {uri}");
    }

    fn api_request(&self, url: &str) {
        println!("GET {url}");
    }

    fn download_start(&self, url: &str, total_bytes: Option<u64>) {
        match total_bytes {
            Some(total) => println!("DOWNLOAD {url} ({:.2} MB)", mb(total)),
            None => println!("DOWNLOAD {url}"),
        }
    }

    fn download_progress(&self, written: u64, total_bytes: Option<u64>) {
        match total_bytes {
            Some(total) if total > 0 => {
                let percent = written as f64 * 100.0 / total as f64;
                println!("  {:.1} MB ({percent:.1}%)", mb(written));
            }

            _ => println!("  {:.1} MB", mb(written)),
        }
    }

    fn download_failed(&self, url: &str, error: &dyn std::fmt::Display) {
        eprintln!("FAILED {url}: {error}");
    }

    fn finished(&self, files: usize) {
        println!("DONE ({files} files)");
    }
}

fn mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let client_id = std::env::var("CLMS_CLIENT_ID")?;
    let user_id = std::env::var("CLMS_USER_ID")?;
    let key_file = std::env::var("CLMS_PRIVATE_KEY_FILE")?;
    let private_key = std::fs::read_to_string(key_file)?;

    let mut credentials = Credentials::new(client_id, user_id, &private_key)?;
    if let Ok(token_uri) = std::env::var("CLMS_TOKEN_URI") {
        credentials = credentials.token_uri(token_uri);
    }

    let spec = DatasetSpec::new(args.query, args.title).period(args.date_from, args.date_to);

    let files = Fetcher::new(spec, credentials).fetch(Logger, &args.output)?;

    for file in files {
        println!("{}", file.display());
    }

    Ok(())
}
