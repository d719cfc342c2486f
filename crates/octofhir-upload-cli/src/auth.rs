use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use octofhir_upload::AuthHeader;
use serde::{Deserialize, Serialize};

use crate::cli::AuthType;

/// Stored credentials: either Basic Auth or a Bearer token, as written by
/// `octofhir login`. Obtaining them is not this tool's job.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoredCredentials {
    #[serde(rename = "basic")]
    Basic {
        server: String,
        username: String,
        password: String,
    },
    #[serde(rename = "bearer")]
    Bearer {
        server: String,
        access_token: String,
    },
}

impl StoredCredentials {
    pub fn server(&self) -> &str {
        match self {
            Self::Basic { server, .. } | Self::Bearer { server, .. } => server,
        }
    }
}

fn creds_path(profile: &str) -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".octofhir");
    Ok(dir.join(format!("credentials.{profile}.json")))
}

pub fn load_credentials(profile: &str) -> Result<Option<StoredCredentials>> {
    let path = creds_path(profile)?;
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let creds: StoredCredentials = serde_json::from_str(&content)
        .with_context(|| format!("Invalid credentials file {}", path.display()))?;
    Ok(Some(creds))
}

pub fn to_auth_header(creds: &StoredCredentials) -> AuthHeader {
    match creds {
        StoredCredentials::Basic {
            username, password, ..
        } => AuthHeader::Basic {
            username: username.clone(),
            password: password.clone(),
        },
        StoredCredentials::Bearer { access_token, .. } => AuthHeader::Bearer {
            token: access_token.clone(),
        },
    }
}

/// Build the header from a `--credential` value.
pub fn from_credential(credential: &str, auth_type: AuthType) -> Result<AuthHeader> {
    match auth_type {
        AuthType::Bearer => Ok(AuthHeader::Bearer {
            token: credential.to_string(),
        }),
        AuthType::Basic => {
            let (username, password) = credential
                .split_once(':')
                .context("Basic credentials must be given as user:password")?;
            Ok(AuthHeader::Basic {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
    }
}

/// `--credential` if given, otherwise the profile's stored credentials.
pub fn resolve_auth(
    credential: &Option<String>,
    auth_type: AuthType,
    profile: &str,
) -> Result<Option<AuthHeader>> {
    if let Some(credential) = credential {
        return from_credential(credential, auth_type).map(Some);
    }
    Ok(load_credentials(profile)?.map(|c| to_auth_header(&c)))
}
