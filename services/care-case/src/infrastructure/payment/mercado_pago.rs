//! Mercado Pago 支付偏好客户端
//!
//! 单次调用，不重试；非 201 响应把提供方状态码和响应体原样放进错误。

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use vita_config::PaymentConfig;
use vita_errors::{AppError, AppResult};
use vita_ports::{PaymentGateway, PreferenceRequest, PreferenceResponse};

pub struct MercadoPagoClient {
    http: reqwest::Client,
    config: PaymentConfig,
}

impl MercadoPagoClient {
    pub fn new(config: PaymentConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

/// 偏好创建响应中我们关心的字段
#[derive(Debug, Deserialize)]
struct PreferenceBody {
    id: String,
    init_point: Option<String>,
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> AppResult<PreferenceResponse> {
        let payload = json!({
            "items": [
                {
                    "title": request.title,
                    "quantity": 1,
                    "unit_price": request.amount.to_decimal(),
                    "currency_id": request.amount.currency.as_str(),
                }
            ],
            "payer": {
                "email": request.payer_email,
            },
            "payment_methods": {
                "excluded_payment_types": [
                    {"id": "credit_card"},
                    {"id": "debit_card"}
                ],
                "default_payment_method_id": "pix",
            },
            "external_reference": request.external_reference,
            "back_urls": {
                "success": request.back_urls.success,
                "failure": request.back_urls.failure,
                "pending": request.back_urls.pending,
            },
            "auto_return": "approved",
        });

        let url = format!("{}/checkout/preferences", self.config.api_base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                AppError::payment_gateway(format!("preference request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::payment_gateway(format!("unreadable response body: {}", e)))?;

        debug!(%status, external_reference = %request.external_reference, "Preference response");

        if status.as_u16() != 201 {
            return Err(AppError::payment_gateway(format!(
                "provider returned {}: {}",
                status, body
            )));
        }

        let parsed: PreferenceBody = serde_json::from_str(&body).map_err(|e| {
            AppError::payment_gateway(format!("response is not valid JSON ({}): {}", e, body))
        })?;

        let redirect_url = parsed.init_point.ok_or_else(|| {
            AppError::payment_gateway(format!("init_point missing in response: {}", body))
        })?;

        Ok(PreferenceResponse {
            id: parsed.id,
            redirect_url,
        })
    }
}
