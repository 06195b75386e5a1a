// src/publish/github.rs
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PublicationHandle, Publisher};
use crate::render::RenderedDocument;

const BRANCH_SLUG_CHARS: usize = 40;

/// Opens one pull request per article against a GitHub repository.
pub struct GitHubPublisher {
    http: reqwest::Client,
    api_base: String,
    repo: String,
    token: String,
    articles_dir: String,
    branch_prefix: String,
}

#[derive(Deserialize)]
struct RepoResp {
    default_branch: String,
}
#[derive(Deserialize)]
struct RefResp {
    object: RefObject,
}
#[derive(Deserialize)]
struct RefObject {
    sha: String,
}
#[derive(Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: &'a str,
}
#[derive(Serialize)]
struct PutContent<'a> {
    message: String,
    content: String,
    branch: &'a str,
}
#[derive(Serialize)]
struct CreatePull<'a> {
    title: String,
    head: &'a str,
    base: &'a str,
    body: String,
}
#[derive(Deserialize)]
struct PullResp {
    #[serde(default)]
    html_url: String,
    number: u64,
}

impl GitHubPublisher {
    pub fn new(
        api_base: &str,
        repo: impl Into<String>,
        token: impl Into<String>,
        articles_dir: impl Into<String>,
        branch_prefix: impl Into<String>,
    ) -> Result<Self> {
        let repo = repo.into();
        if repo.split('/').filter(|p| !p.is_empty()).count() != 2 {
            bail!("publish.repo must look like `owner/name`, got `{repo}`");
        }
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building github http client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
            token: token.into(),
            articles_dir: articles_dir.into().trim_matches('/').to_string(),
            branch_prefix: branch_prefix.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}", self.api_base, self.repo, path)
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn branch_name(&self, slug: &str, now: DateTime<Utc>) -> String {
        let short: String = slug.chars().take(BRANCH_SLUG_CHARS).collect();
        format!(
            "{}{}-{}",
            self.branch_prefix,
            short.trim_end_matches('-'),
            now.format("%Y%m%d%H%M")
        )
    }

    async fn default_branch_sha(&self) -> Result<(String, String)> {
        let repo: RepoResp = self
            .request(reqwest::Method::GET, format!("{}/repos/{}", self.api_base, self.repo))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("reading repository")?
            .json()
            .await
            .context("repository json")?;
        let head: RefResp = self
            .request(
                reqwest::Method::GET,
                self.url(&format!("git/ref/heads/{}", repo.default_branch)),
            )
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("reading default branch ref")?
            .json()
            .await
            .context("ref json")?;
        Ok((repo.default_branch, head.object.sha))
    }
}

#[async_trait]
impl Publisher for GitHubPublisher {
    async fn publish(&self, title: &str, doc: &RenderedDocument) -> Result<PublicationHandle> {
        let (base, sha) = self.default_branch_sha().await?;
        let branch = self.branch_name(&doc.slug, Utc::now());

        self.request(reqwest::Method::POST, self.url("git/refs"))
            .json(&CreateRef {
                git_ref: format!("refs/heads/{branch}"),
                sha: &sha,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("creating branch {branch}"))?;

        let path = if self.articles_dir.is_empty() {
            format!("{}.html", doc.slug)
        } else {
            format!("{}/{}.html", self.articles_dir, doc.slug)
        };
        self.request(reqwest::Method::PUT, self.url(&format!("contents/{path}")))
            .json(&PutContent {
                message: format!("feat: add article \"{title}\""),
                content: STANDARD.encode(doc.html.as_bytes()),
                branch: &branch,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("committing {path}"))?;

        let pr: PullResp = self
            .request(reqwest::Method::POST, self.url("pulls"))
            .json(&CreatePull {
                title: format!("New article: {title}"),
                head: &branch,
                base: &base,
                body: format!("Automatically generated article.\n\nFile: `{path}`"),
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .context("opening pull request")?
            .json()
            .await
            .context("pull request json")?;

        if pr.html_url.trim().is_empty() {
            return Err(anyhow!("pull request #{} created without an html_url", pr.number));
        }
        tracing::info!(
            repo = %self.repo,
            branch = %branch,
            pr = pr.number,
            url = %pr.html_url,
            "article published"
        );
        Ok(PublicationHandle {
            url: pr.html_url,
            identifier: format!("#{}", pr.number),
            branch: Some(branch),
        })
    }
}
