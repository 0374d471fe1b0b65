//! Wait primitives
//!
//! Every primitive polls the page at a fixed interval until its condition
//! holds or the timeout elapses, and reports expiry as
//! [`E2eError::Timeout`] naming the condition. Driver failures inside a
//! probe propagate unchanged, so "not found" never hides "browser crashed".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::TimeoutConfig;
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::page::Page;

pub struct Waiter<P: Page> {
    page: Arc<P>,
    default_timeout: Duration,
    poll_interval: Duration,
}

impl<P: Page> Clone for Waiter<P> {
    fn clone(&self) -> Self {
        Self {
            page: Arc::clone(&self.page),
            default_timeout: self.default_timeout,
            poll_interval: self.poll_interval,
        }
    }
}

/// An open native alert / confirm dialog.
pub struct AlertHandle<'a, P: Page> {
    page: &'a P,
    text: String,
}

impl<'a, P: Page> AlertHandle<'a, P> {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub async fn accept(self) -> E2eResult<()> {
        self.page.accept_alert().await
    }

    pub async fn dismiss(self) -> E2eResult<()> {
        self.page.dismiss_alert().await
    }
}

impl<P: Page> Waiter<P> {
    pub fn new(page: Arc<P>, timeouts: &TimeoutConfig) -> Self {
        Self {
            page,
            default_timeout: timeouts.default_timeout(),
            poll_interval: timeouts.poll_interval(),
        }
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Run `probe` until it yields a value or `timeout` elapses.
    ///
    /// The probe always runs at least once, even with a zero timeout.
    pub async fn poll_until<T, F, Fut>(&self, what: &str, timeout: Duration, mut probe: F) -> E2eResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<Option<T>>>,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(value) = probe().await? {
                return Ok(value);
            }
            let now = Instant::now();
            if now >= deadline {
                debug!("Gave up waiting for {} after {:?}", what, timeout);
                return Err(E2eError::timeout(what, timeout));
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Wait until the current URL contains `pattern`; returns the URL.
    pub async fn wait_for_url(&self, pattern: &str) -> E2eResult<String> {
        self.wait_for_url_within(pattern, self.default_timeout).await
    }

    pub async fn wait_for_url_within(&self, pattern: &str, timeout: Duration) -> E2eResult<String> {
        let page = &*self.page;
        self.poll_until(&format!("url containing '{}'", pattern), timeout, || async move {
            let url = page.current_url().await?;
            Ok(url.contains(pattern).then_some(url))
        })
        .await
    }

    /// Wait until the current URL equals `url` exactly.
    pub async fn wait_for_url_exact(&self, url: &str) -> E2eResult<()> {
        let page = &*self.page;
        self.poll_until(&format!("url == '{}'", url), self.default_timeout, || async move {
            Ok((page.current_url().await? == url).then_some(()))
        })
        .await
    }

    /// First element matching `locator` once one is in the document.
    pub async fn wait_for_element(&self, locator: &Locator) -> E2eResult<P::Element> {
        self.wait_for_element_within(locator, self.default_timeout).await
    }

    pub async fn wait_for_element_within(&self, locator: &Locator, timeout: Duration) -> E2eResult<P::Element> {
        let page = &*self.page;
        self.poll_until(&locator.to_string(), timeout, || async move {
            Ok(page.find_all(locator).await?.into_iter().next())
        })
        .await
    }

    /// First match of `locator` under `scope`.
    pub async fn wait_for_element_in(&self, scope: &P::Element, locator: &Locator) -> E2eResult<P::Element> {
        let page = &*self.page;
        self.poll_until(&format!("{} in scope", locator), self.default_timeout, || async move {
            Ok(page.find_all_in(scope, locator).await?.into_iter().next())
        })
        .await
    }

    /// Wait until `element` is rendered visible.
    pub async fn wait_for_element_visible(&self, element: &P::Element) -> E2eResult<()> {
        self.wait_until_visible(element, "element").await
    }

    async fn wait_until_visible(&self, element: &P::Element, what: &str) -> E2eResult<()> {
        let page = &*self.page;
        self.poll_until(&format!("{} to be visible", what), self.default_timeout, || async move {
            Ok(page.is_displayed(element).await?.then_some(()))
        })
        .await
    }

    /// Locate `locator` and wait for it to become visible.
    pub async fn wait_for_visible(&self, locator: &Locator) -> E2eResult<P::Element> {
        let element = self.wait_for_element(locator).await?;
        self.wait_until_visible(&element, &locator.to_string()).await?;
        Ok(element)
    }

    /// Scoped variant of [`Self::wait_for_visible`].
    pub async fn wait_for_visible_in(&self, scope: &P::Element, locator: &Locator) -> E2eResult<P::Element> {
        let element = self.wait_for_element_in(scope, locator).await?;
        self.wait_until_visible(&element, &locator.to_string()).await?;
        Ok(element)
    }

    /// Wait until `element` has been detached from the document.
    pub async fn wait_for_staleness(&self, element: &P::Element) -> E2eResult<()> {
        let page = &*self.page;
        self.poll_until("element to be detached", self.default_timeout, || async move {
            Ok((!page.is_attached(element).await?).then_some(()))
        })
        .await
    }

    /// Wait for a native dialog to open.
    pub async fn wait_for_alert(&self) -> E2eResult<AlertHandle<'_, P>> {
        let page = &*self.page;
        let text = self
            .poll_until("alert to be present", self.default_timeout, || async move {
                page.alert_text().await
            })
            .await?;
        Ok(AlertHandle { page, text })
    }

    /// Wait for `locator` to be present, then require it to be the only match.
    ///
    /// Nothing matching by the deadline is `AmbiguousLookup` with a count of 0.
    pub async fn find_unique(&self, locator: &Locator) -> E2eResult<P::Element> {
        let page = &*self.page;
        let found = self
            .poll_until(&locator.to_string(), self.default_timeout, || async move {
                let found = page.find_all(locator).await?;
                Ok((!found.is_empty()).then_some(found))
            })
            .await;
        let mut matches = match found {
            Ok(matches) => matches,
            Err(E2eError::Timeout { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };

        if matches.len() != 1 {
            return Err(E2eError::AmbiguousLookup {
                locator: locator.to_string(),
                count: matches.len(),
            });
        }
        Ok(matches.remove(0))
    }

    /// True if `locator` matched nothing for the whole of `within`.
    ///
    /// Returns `false` as soon as a match appears. A zero window is a single check.
    pub async fn stays_absent(&self, locator: &Locator, within: Duration) -> E2eResult<bool> {
        let page = &*self.page;
        self.absent_for(within, || async move { Ok(!page.find_all(locator).await?.is_empty()) })
            .await
    }

    /// Scoped variant of [`Self::stays_absent`].
    pub async fn stays_absent_in(&self, scope: &P::Element, locator: &Locator, within: Duration) -> E2eResult<bool> {
        let page = &*self.page;
        self.absent_for(within, || async move {
            Ok(!page.find_all_in(scope, locator).await?.is_empty())
        })
        .await
    }

    async fn absent_for<F, Fut>(&self, within: Duration, mut present: F) -> E2eResult<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<bool>>,
    {
        let deadline = Instant::now() + within;
        loop {
            if present().await? {
                return Ok(false);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(true);
            }
            sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Fail with [`E2eError::UnexpectedElement`] if `locator` shows up within `within`.
    pub async fn assert_element_absent(&self, locator: &Locator, within: Duration, what: &str) -> E2eResult<()> {
        if self.stays_absent(locator, within).await? {
            debug!("Verified absent: {}", what);
            Ok(())
        } else {
            Err(E2eError::UnexpectedElement {
                what: what.to_string(),
                within_ms: within.as_millis() as u64,
            })
        }
    }

    /// Scoped variant of [`Self::assert_element_absent`].
    pub async fn assert_absent_in(
        &self,
        scope: &P::Element,
        locator: &Locator,
        within: Duration,
        what: &str,
    ) -> E2eResult<()> {
        if self.stays_absent_in(scope, locator, within).await? {
            debug!("Verified absent: {}", what);
            Ok(())
        } else {
            Err(E2eError::UnexpectedElement {
                what: what.to_string(),
                within_ms: within.as_millis() as u64,
            })
        }
    }
}
