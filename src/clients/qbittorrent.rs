use anyhow::{Context, Result, bail};
use reqwest::{Client, StatusCode};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct QBitConfig {
    pub base_url: String,

    pub username: String,

    pub password: String,
}

impl Default for QBitConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: "adminadmin".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddTorrentOptions {
    pub save_path: Option<String>,

    pub category: Option<String>,

    pub tags: Option<String>,

    pub paused: bool,
}

#[derive(Debug, Clone)]
pub struct QBitClient {
    client: Client,
    config: QBitConfig,
}

impl QBitClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: QBitConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent("Backlogarr/1.0")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v2/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post_form<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        form: &T,
    ) -> Result<(StatusCode, String)> {
        let response = self
            .client
            .post(self.endpoint(path))
            .header("Referer", &self.config.base_url)
            .form(form)
            .send()
            .await
            .with_context(|| format!("qBittorrent request to {path} failed"))?;

        let status = response.status();
        Ok((status, response.text().await?))
    }

    pub async fn login(&self) -> Result<()> {
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        match self.post_form("auth/login", &params).await? {
            (status, body) if status == StatusCode::OK && body.contains("Ok") => {
                debug!("Authenticated with qBittorrent");
                Ok(())
            }
            (_, body) if body.contains("Fails") => {
                bail!("qBittorrent authentication failed: invalid credentials")
            }
            (status, body) => bail!("qBittorrent authentication failed: status={status}, body={body}"),
        }
    }

    /// Logs in again when the session cookie has expired.
    async fn ensure_auth(&self) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint("app/version"))
            .header("Referer", &self.config.base_url)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!(reason = "session_expired", "Logging in to qBittorrent");
            self.login().await?;
        }
        Ok(())
    }

    pub async fn add_torrent_url(&self, url: &str, options: AddTorrentOptions) -> Result<()> {
        self.ensure_auth().await?;

        let mut form: Vec<(&str, String)> = vec![("urls", url.to_string())];
        form.extend(options.save_path.map(|path| ("savepath", path)));
        form.extend(options.category.map(|category| ("category", category)));
        form.extend(options.tags.map(|tags| ("tags", tags)));
        if options.paused {
            form.push(("paused", "true".to_string()));
        }

        match self.post_form("torrents/add", &form).await? {
            (status, _) if status == StatusCode::OK => {
                debug!(url, "Torrent added");
                Ok(())
            }
            (status, _) if status == StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                bail!("Torrent file is not valid")
            }
            (status, body) => bail!("Failed to add torrent: status={status}, body={body}"),
        }
    }
}

/// Normalises a category name the way qBittorrent stores it.
#[must_use]
pub fn sanitize_category(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>()
        .trim_matches('_')
        .to_lowercase()
}
