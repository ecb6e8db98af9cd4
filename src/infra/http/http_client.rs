use reqwest::Client;
use std::time::Duration;

/// Shared reqwest client for every outbound call.
/// Without a timeout the reqwest defaults apply.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder.build()
}
