use crate::{
    Error,
    Result,
};
use ethers::types::Address;
use serde::Serialize;
use std::time::Duration;
use url::Url;

const FAUCET_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct FundRequest<'a> {
    address: String,
    network: &'a str,
}

/// Testnet faucet top-ups for the dealer's own wallet.
#[derive(Clone, Debug)]
pub struct Faucet {
    url: Url,
    network: String,
    http: reqwest::Client,
}

impl Faucet {
    pub fn new(url: Url, network: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(FAUCET_TIMEOUT)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build faucet client: {e}")))?;
        Ok(Self {
            url,
            network: network.into(),
            http,
        })
    }

    /// Asks for funds. Arrival is asynchronous; success only means the
    /// faucet accepted the request.
    pub async fn request_funds(&self, address: Address) -> Result<()> {
        let body = FundRequest {
            address: format!("{address:#x}"),
            network: &self.network,
        };
        let res = self
            .http
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::transient(format!("faucet request failed: {e}")))?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(Error::transient(format!("faucet returned {status}: {text}")));
        }
        tracing::info!(%address, "faucet accepted funding request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn fund_request__serializes_hex_address_and_network() {
        let body = FundRequest {
            address: format!("{:#x}", Address::repeat_byte(0xab)),
            network: "testnet",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["network"], "testnet");
        assert_eq!(
            json["address"],
            "0xabababababababababababababababababababab"
        );
    }
}
