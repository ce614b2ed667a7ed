//! Credential files for the data services the pipeline downloads from.
//!
//! OpenTopography reads its API key from `.opentopography.txt` in the working
//! directory. The Copernicus Climate Data Store client reads `~/.cdsapirc`.
//! Keys are passed in explicitly; nothing here prompts.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default Climate Data Store endpoint
pub const DEFAULT_CDS_URL: &str = "https://cds.climate.copernicus.eu/api/v2";

pub const OPENTOPOGRAPHY_FILE: &str = ".opentopography.txt";
pub const CDSAPIRC_FILE: &str = ".cdsapirc";

/// API keys for OpenTopography and the Climate Data Store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub opentopography_key: String,
    pub cds_key: String,
    pub cds_url: String,
}

impl ApiCredentials {
    /// Surrounding whitespace is trimmed; an empty key is an error.
    /// `cds_url` falls back to [`DEFAULT_CDS_URL`].
    pub fn new(opentopography_key: &str, cds_key: &str, cds_url: Option<&str>) -> Result<Self> {
        let opentopography_key = non_empty("OpenTopography API key", opentopography_key)?;
        let cds_key = non_empty("CDS API key", cds_key)?;
        let cds_url = match cds_url {
            Some(url) => non_empty("CDS API url", url)?,
            None => DEFAULT_CDS_URL.to_string(),
        };

        Ok(Self {
            opentopography_key,
            cds_key,
            cds_url,
        })
    }

    /// Contents of `.opentopography.txt`: the bare key
    pub fn opentopography_contents(&self) -> String {
        self.opentopography_key.clone()
    }

    /// Contents of `.cdsapirc`
    pub fn cdsapirc_contents(&self) -> String {
        format!("url: {} \nkey: {}", self.cds_url, self.cds_key)
    }
}

fn non_empty(what: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        bail!("{} must not be empty", what);
    }
    Ok(value.to_string())
}

/// Where [`write_credential_files`] put the files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    pub opentopography: PathBuf,
    pub cdsapirc: PathBuf,
}

/// Write `.opentopography.txt` into `work_dir` and `.cdsapirc` into
/// `home_dir`, replacing existing files.
pub fn write_credential_files(creds: &ApiCredentials, work_dir: &Path, home_dir: &Path) -> Result<CredentialPaths> {
    let paths = CredentialPaths {
        opentopography: work_dir.join(OPENTOPOGRAPHY_FILE),
        cdsapirc: home_dir.join(CDSAPIRC_FILE),
    };

    fs::write(&paths.opentopography, creds.opentopography_contents())
        .with_context(|| format!("Failed to write {}", paths.opentopography.display()))?;
    debug!("Wrote {}", paths.opentopography.display());

    fs::write(&paths.cdsapirc, creds.cdsapirc_contents())
        .with_context(|| format!("Failed to write {}", paths.cdsapirc.display()))?;
    debug!("Wrote {}", paths.cdsapirc.display());

    Ok(paths)
}

/// The user's home directory
pub fn default_home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Could not determine the home directory; pass --home-dir")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cdsapirc_layout() {
        let creds = ApiCredentials::new("ot-key", "123:abc", None).unwrap();
        assert_eq!(
            creds.cdsapirc_contents(),
            "url: https://cds.climate.copernicus.eu/api/v2 \nkey: 123:abc"
        );
        assert_eq!(creds.opentopography_contents(), "ot-key");
    }

    #[test]
    fn test_custom_url() {
        let creds = ApiCredentials::new("a", "b", Some("https://example.org/api")).unwrap();
        assert!(creds.cdsapirc_contents().starts_with("url: https://example.org/api \n"));
    }

    #[test]
    fn test_rejects_empty_keys() {
        assert!(ApiCredentials::new("", "b", None).is_err());
        assert!(ApiCredentials::new("a", "   ", None).is_err());
        assert!(ApiCredentials::new("a", "b", Some("")).is_err());
    }

    #[test]
    fn test_keys_are_trimmed() {
        let creds = ApiCredentials::new(" key\n", "cds ", None).unwrap();
        assert_eq!(creds.opentopography_key, "key");
        assert_eq!(creds.cds_key, "cds");
    }

    #[test]
    fn test_write_files() {
        let work = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let creds = ApiCredentials::new("ot-key", "123:abc", None).unwrap();

        let paths = write_credential_files(&creds, work.path(), home.path()).unwrap();
        assert_eq!(paths.opentopography, work.path().join(".opentopography.txt"));
        assert_eq!(paths.cdsapirc, home.path().join(".cdsapirc"));
        assert_eq!(fs::read_to_string(&paths.opentopography).unwrap(), "ot-key");
        assert_eq!(fs::read_to_string(&paths.cdsapirc).unwrap(), creds.cdsapirc_contents());
    }

    #[test]
    fn test_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(OPENTOPOGRAPHY_FILE), "old key that is longer").unwrap();
        let creds = ApiCredentials::new("new", "c", None).unwrap();

        write_credential_files(&creds, dir.path(), dir.path()).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join(OPENTOPOGRAPHY_FILE)).unwrap(), "new");
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let creds = ApiCredentials::new("a", "b", None).unwrap();
        assert!(write_credential_files(&creds, &missing, dir.path()).is_err());
    }
}
