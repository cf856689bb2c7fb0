//! Upstream HTTP client construction.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

use crate::config::UpstreamConfig;

/// Build the shared upstream client.
///
/// The total timeout is only set when configured; otherwise reqwest's own
/// default applies.
pub fn build_client(config: &UpstreamConfig) -> Result<Client, reqwest::Error> {
    let mut builder = reqwest::ClientBuilder::new()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::limited(5));

    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
}
