//! Access links: reverse-proxy rules exposing a user's files under an
//! opaque per-session path.

use crate::Result;
use async_trait::async_trait;
use mediashare_core::validate_segment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Publishes and revokes the routes of one session token
#[async_trait]
pub trait AccessLinkPublisher: Send + Sync {
    /// Expose `username`'s own area and the group area under `/<token>/`
    async fn publish(&self, token: &str, username: &str) -> Result<()>;

    /// Remove every route of `token`. Revoking an unknown token succeeds.
    async fn revoke(&self, token: &str) -> Result<()>;
}

/// Dynamic-configuration rule file understood by the reverse proxy
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    pub http: HttpRules,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRules {
    pub routers: BTreeMap<String, RouterRule>,
    pub middlewares: BTreeMap<String, MiddlewareRule>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct RouterRule {
    pub rule: String,
    pub service: String,
    pub middlewares: Vec<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareRule {
    #[serde(rename = "replacePathRegex")]
    pub replace_path_regex: ReplacePathRegex,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplacePathRegex {
    pub regex: String,
    pub replacement: String,
}

impl RuleFile {
    /// Rules for one session: `/<token>/own/..` maps to the user's own area,
    /// `/<token>/group/..` to the group area
    pub fn for_session(token: &str, username: &str, service: &str) -> Self {
        let mut http = HttpRules::default();
        for (area, target) in [
            ("own", format!("/user/{username}/own/")),
            ("group", "/group/".to_string()),
        ] {
            let name = format!("{token}-{area}");
            http.routers.insert(
                name.clone(),
                RouterRule {
                    rule: format!("PathPrefix(`/{token}/{area}`)"),
                    service: service.to_string(),
                    middlewares: vec![name.clone()],
                },
            );
            http.middlewares.insert(
                name,
                MiddlewareRule {
                    replace_path_regex: ReplacePathRegex {
                        regex: format!("^/{token}/{area}/(.*)"),
                        replacement: format!("{target}$1"),
                    },
                },
            );
        }
        Self { http }
    }
}

/// Writes one TOML rule file per session token into the proxy's watched
/// directory
#[derive(Clone, Debug)]
pub struct TomlRulePublisher {
    rules_dir: PathBuf,
    service: String,
}

impl TomlRulePublisher {
    pub fn new(rules_dir: impl Into<PathBuf>, service: impl Into<String>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            service: service.into(),
        }
    }

    /// Path of the rule file of `token`
    pub fn rule_path(&self, token: &str) -> PathBuf {
        self.rules_dir.join(format!("{token}.toml"))
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }
}

#[async_trait]
impl AccessLinkPublisher for TomlRulePublisher {
    async fn publish(&self, token: &str, username: &str) -> Result<()> {
        validate_segment("token", token)?;
        validate_segment("username", username)?;

        let rules = toml::to_string(&RuleFile::for_session(token, username, &self.service))?;

        // The proxy must never read a half-written file
        fs::create_dir_all(&self.rules_dir).await?;
        let staging = self.rules_dir.join(format!(".{token}.toml.tmp"));
        fs::write(&staging, rules).await?;
        fs::rename(&staging, self.rule_path(token)).await?;

        info!(username, "Access link published");
        Ok(())
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        validate_segment("token", token)?;
        match fs::remove_file(self.rule_path(token)).await {
            Ok(()) => {
                debug!("Access link revoked");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
