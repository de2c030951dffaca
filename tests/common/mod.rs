use std::time::Duration;

use tiny_http::{Request, Response, Server};
use url::Url;

pub const TEST_RSA_KEY: &str = include_str!("../data/rsa_key.pem");

/// Mock of the CLMS download service: token endpoint, catalog search,
/// dataset metadata, URL resolution, and the direct file URLs.
///
/// The catalog always answers a `CLC2018` search with two datasets,
/// the change layer listed first.
pub struct Service {
    /// Files served under `/files/<name>`. A `None` content makes the
    /// file fail with a server error.
    pub files: Vec<(&'static str, Option<&'static str>)>,

    /// When `true`, the URL resolution endpoint answers with an
    /// unrecognized shape instead of the file URLs.
    pub no_urls: bool,
}

impl Service {
    /// Start the service in a random port. Returns the port number.
    pub fn start(self) -> u16 {
        let server = Server::http("127.1:0").expect("start CLMS server");
        let port = server.server_addr().to_ip().unwrap().port();

        std::thread::spawn(move || {
            let timeout = Duration::from_secs(60);
            while let Ok(Some(request)) = server.recv_timeout(timeout) {
                self.handle(port, request);
            }
        });

        port
    }

    fn handle(&self, port: u16, req: Request) {
        if req.url() == "/token" {
            let json = r#"{"access_token": "test-token", "expires_in": 3600}"#;
            req.respond(Response::from_string(json)).expect("send token");
            return;
        }

        // Everything except the token exchange must be authenticated.
        let authorization = req
            .headers()
            .iter()
            .find(|h| h.field.equiv("authorization"))
            .map(|h| h.value.to_string());

        assert_eq!(authorization.as_deref(), Some("Bearer test-token"));

        let base_url = Url::parse("http://0").ok();
        let url_parser = Url::options().base_url(base_url.as_ref());

        let req_url = url_parser.parse(req.url()).unwrap();
        let query = |name: &str| {
            req_url
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        let response = match req_url.path() {
            "/api/@search" => {
                assert_eq!(query("SearchableText").as_deref(), Some("CLC2018"));
                assert_eq!(query("portal_type").as_deref(), Some("DataSet"));

                let json = format!(
                    r#"
                    {{
                      "items": [
                        {{
                          "@id": "http://127.0.0.1:{port}/api/clc2018-change",
                          "title": "CORINE Land Cover 2018 Change",
                          "portal_type": "DataSet"
                        }},
                        {{
                          "@id": "http://127.0.0.1:{port}/api/clc2018",
                          "title": "CORINE Land Cover 2018",
                          "portal_type": "DataSet"
                        }}
                      ]
                    }}
                    "#
                );

                Response::from_string(json)
            }

            "/api/clc2018" => {
                let json = r#"
                    {
                      "UID": "clc2018-uid",
                      "title": "CORINE Land Cover 2018",
                      "downloadable_files": {
                        "items": [
                          {"type": "Vector", "format": "GDB", "resolution": "100 m", "file": "vector"},
                          {"type": "Raster", "format": "Geotiff", "resolution": "100 m",
                           "size": "2 GB", "file": "u2018_clc2018_v2020_20u1_raster100m"}
                        ]
                      },
                      "dataset_download_information": {
                        "items": [
                          {"@id": "vector-id", "name": "VECTOR", "collection": "100 m"},
                          {"@id": "raster-100m-id", "name": "RASTER", "collection": "100 m"}
                        ]
                      }
                    }
                "#;

                Response::from_string(json)
            }

            "/api/@get-download-file-urls" => {
                assert_eq!(query("dataset_uid").as_deref(), Some("clc2018-uid"));
                assert_eq!(
                    query("download_information_id").as_deref(),
                    Some("raster-100m-id"),
                );
                assert_eq!(query("date_from").as_deref(), Some("2017-01-01"));
                assert_eq!(query("date_to").as_deref(), Some("2018-12-31"));

                let json = if self.no_urls {
                    r#"{"status": "queued"}"#.to_owned()
                } else {
                    let urls: Vec<String> = self
                        .files
                        .iter()
                        .map(|(name, _)| format!("\"http://127.0.0.1:{port}/files/{name}\""))
                        .collect();

                    format!(r#"{{"items": [{}]}}"#, urls.join(", "))
                };

                Response::from_string(json)
            }

            path if path.starts_with("/files/") => {
                let name = &path["/files/".len()..];

                match self.files.iter().find(|(n, _)| *n == name) {
                    Some((_, Some(content))) => Response::from_string(*content),
                    Some((_, None)) => Response::from_string("boom").with_status_code(500),
                    None => Response::from_string("not found").with_status_code(404),
                }
            }

            _ => Response::from_string("not found").with_status_code(404),
        };

        req.respond(response).expect("send response");
    }
}
