//! Source-archive download.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use std::path::Path;
use std::time::Duration;

/// Where the reference source archives live.
pub const DEFAULT_BASE_URL: &str = "https://ftp.mcs.anl.gov/pub/petsc";

/// Fetch an archive to `dest`, failing on any non-success status.
pub fn fetch_archive(url: &str, dest: &Path, timeout: Duration) -> Result<()> {
    let client = Client::builder()
        .user_agent("blaslink")
        .timeout(timeout)
        .build()
        .context("building HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("requesting {url}"))?;

    if !response.status().is_success() {
        bail!("HTTP {} fetching {}", response.status(), url);
    }

    let bytes = response
        .bytes()
        .with_context(|| format!("reading body of {url}"))?;
    std::fs::write(dest, &bytes).with_context(|| format!("writing {}", dest.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn fetch_writes_body_to_dest() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/fblaslapack.tar.gz");
            then.status(200).body(b"archive-bytes");
        });

        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("fblaslapack.tar.gz");
        fetch_archive(
            &server.url("/fblaslapack.tar.gz"),
            &dest,
            Duration::from_secs(5),
        )
        .unwrap();

        mock.assert();
        assert_eq!(std::fs::read(&dest).unwrap(), b"archive-bytes");
    }

    #[test]
    fn fetch_fails_on_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.tar.gz");
            then.status(404);
        });

        let temp = tempfile::TempDir::new().unwrap();
        let dest = temp.path().join("missing.tar.gz");
        let err = fetch_archive(
            &server.url("/missing.tar.gz"),
            &dest,
            Duration::from_secs(5),
        )
        .unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(!dest.exists());
    }
}
