use std::collections::HashMap;

use anyhow::{Context as _, Result};
use fantoccini::{Client, ClientBuilder};
use lantern_config::HostConfig;
use serde_json::json;
use url::Url;
use webdriver::capabilities::Capabilities;

use super::page::WebDriverHost;

/// A WebDriver browser session.
pub struct BrowserSession {
    pub client: Client,
    config: HostConfig,
}

impl BrowserSession {
    /// Connect to the WebDriver service named in `config` (Chromedriver by default).
    pub async fn connect(config: HostConfig) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();
        let mut args = vec![json!("--disable-dev-shm-usage"), json!("--window-size=1280,900")];
        if config.headless {
            args.push(json!("--headless"));
            args.push(json!("--disable-gpu"));
        }
        chrome_opts.insert("args".to_string(), json!(args));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        tracing::info!(
            webdriver_url = %config.webdriver_url,
            headless = config.headless,
            "browser.connect",
        );
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await
            .with_context(|| format!("failed to connect to WebDriver at {}", config.webdriver_url))?;

        Ok(Self { client, config })
    }

    /// Open the configured chat page and install the page bridge.
    pub async fn open_chat(&self) -> Result<WebDriverHost> {
        let url = Url::parse(&self.config.chat_url)
            .with_context(|| format!("invalid chat URL: {}", self.config.chat_url))?;
        self.client.goto(url.as_str()).await?;
        tracing::info!(url = %url, "browser.navigated");

        let host = WebDriverHost::new(self.client.clone(), self.config.selectors.clone());
        host.install_bridge().await?;
        Ok(host)
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}
