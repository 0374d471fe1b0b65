//! Browser automation seam
//!
//! [`Page`] is the narrow set of WebDriver capabilities the suite relies on.
//! [`WebDriverPage`] implements it over a live `thirtyfour` session.

use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;
use tracing::{debug, info};

use crate::config::{BrowserConfig, BrowserKind};
use crate::error::E2eResult;
use crate::locator::Locator;

/// Operations on one browser session.
///
/// Every call is a round trip to the browser. Lookups never wait: an
/// element that is not there yields an empty vector, and waiting is the
/// job of [`crate::wait::Waiter`].
#[async_trait]
pub trait Page: Send + Sync + 'static {
    type Element: Clone + Send + Sync + 'static;

    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    /// All matches in the document, in document order.
    async fn find_all(&self, locator: &Locator) -> E2eResult<Vec<Self::Element>>;

    /// All matches under `scope`.
    async fn find_all_in(
        &self,
        scope: &Self::Element,
        locator: &Locator,
    ) -> E2eResult<Vec<Self::Element>>;

    async fn is_displayed(&self, element: &Self::Element) -> E2eResult<bool>;

    /// False once the element has been detached from the document.
    async fn is_attached(&self, element: &Self::Element) -> E2eResult<bool>;

    async fn click(&self, element: &Self::Element) -> E2eResult<()>;

    async fn send_keys(&self, element: &Self::Element, text: &str) -> E2eResult<()>;

    async fn clear(&self, element: &Self::Element) -> E2eResult<()>;

    async fn text(&self, element: &Self::Element) -> E2eResult<String>;

    /// Text of the open native dialog, `None` when no dialog is open.
    async fn alert_text(&self) -> E2eResult<Option<String>>;

    async fn accept_alert(&self) -> E2eResult<()>;

    async fn dismiss_alert(&self) -> E2eResult<()>;

    async fn delete_all_cookies(&self) -> E2eResult<()>;

    async fn screenshot_png(&self) -> E2eResult<Vec<u8>>;
}

fn by(locator: &Locator) -> By {
    match locator {
        Locator::Css(s) => By::Css(s.clone()),
        Locator::XPath(s) => By::XPath(s.clone()),
        Locator::Id(s) => By::Id(s.clone()),
    }
}

/// A live WebDriver session
#[derive(Clone)]
pub struct WebDriverPage {
    driver: WebDriver,
}

impl WebDriverPage {
    /// Open a new browser session on the WebDriver server
    pub async fn connect(config: &BrowserConfig) -> E2eResult<Self> {
        info!(
            "Opening {:?} session via {} (headless: {})",
            config.kind, config.webdriver_url, config.headless
        );

        let driver = match config.kind {
            BrowserKind::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if config.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(&config.webdriver_url, caps).await?
            }
            BrowserKind::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if config.headless {
                    caps.set_headless()?;
                }
                WebDriver::new(&config.webdriver_url, caps).await?
            }
        };

        driver
            .set_window_rect(0, 0, config.window_width, config.window_height)
            .await?;

        Ok(Self { driver })
    }

    /// End the browser session
    pub async fn quit(&self) -> E2eResult<()> {
        debug!("Quitting browser session");
        self.driver.clone().quit().await?;
        Ok(())
    }
}

#[async_trait]
impl Page for WebDriverPage {
    type Element = WebElement;

    async fn goto(&self, url: &str) -> E2eResult<()> {
        debug!("goto {}", url);
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn find_all(&self, locator: &Locator) -> E2eResult<Vec<WebElement>> {
        Ok(self.driver.find_all(by(locator)).await?)
    }

    async fn find_all_in(&self, scope: &WebElement, locator: &Locator) -> E2eResult<Vec<WebElement>> {
        Ok(scope.find_all(by(locator)).await?)
    }

    async fn is_displayed(&self, element: &WebElement) -> E2eResult<bool> {
        Ok(element.is_displayed().await?)
    }

    async fn is_attached(&self, element: &WebElement) -> E2eResult<bool> {
        Ok(element.is_present().await?)
    }

    async fn click(&self, element: &WebElement) -> E2eResult<()> {
        element.click().await?;
        Ok(())
    }

    async fn send_keys(&self, element: &WebElement, text: &str) -> E2eResult<()> {
        element.send_keys(text).await?;
        Ok(())
    }

    async fn clear(&self, element: &WebElement) -> E2eResult<()> {
        element.clear().await?;
        Ok(())
    }

    async fn text(&self, element: &WebElement) -> E2eResult<String> {
        Ok(element.text().await?)
    }

    async fn alert_text(&self) -> E2eResult<Option<String>> {
        match self.driver.get_alert_text().await {
            Ok(text) => Ok(Some(text)),
            Err(WebDriverError::NoSuchAlert(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn accept_alert(&self) -> E2eResult<()> {
        self.driver.accept_alert().await?;
        Ok(())
    }

    async fn dismiss_alert(&self) -> E2eResult<()> {
        self.driver.dismiss_alert().await?;
        Ok(())
    }

    async fn delete_all_cookies(&self) -> E2eResult<()> {
        self.driver.delete_all_cookies().await?;
        Ok(())
    }

    async fn screenshot_png(&self) -> E2eResult<Vec<u8>> {
        Ok(self.driver.screenshot_as_png().await?)
    }
}
