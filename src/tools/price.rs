//! getBitcoinPrice - Bitcoin quote in USD and INR

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolDescriptor, ToolFailure, ToolHttp, ToolName, ToolOutcome};

const FETCH_FAILED: &str = "Error: Failed to fetch data from the price API.";

pub struct PriceTool {
    http: Arc<ToolHttp>,
}

impl PriceTool {
    pub fn new(http: Arc<ToolHttp>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Tool for PriceTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: ToolName::GetBitcoinPrice,
            description: "Returns the current Bitcoin price.",
            params: vec![],
        }
    }

    async fn execute(&self, _args: &Value) -> ToolOutcome {
        log::info!("[Price] Fetching Bitcoin price");

        let response = self
            .http
            .client
            .get(&self.http.price_url)
            .query(&[("ids", "bitcoin"), ("vs_currencies", "usd,inr")])
            .send()
            .await
            .map_err(|e| ToolFailure::transport(FETCH_FAILED, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolFailure::upstream(
                format!("Error: Could not fetch the Bitcoin price (HTTP {}).", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolFailure::transport(FETCH_FAILED, e))?;

        let usd = &body["bitcoin"]["usd"];
        let inr = &body["bitcoin"]["inr"];
        if !usd.is_number() || !inr.is_number() {
            return Err(ToolFailure::transport(FETCH_FAILED, "price fields missing from response"));
        }

        Ok(format!("Bitcoin's current price is ${} (USD) and ₹{} (INR).", usd, inr))
    }
}
