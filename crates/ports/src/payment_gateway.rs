//! 支付网关 Port 定义
//!
//! 出站协作方：给定金额和外部关联号，返回跳转地址和网关侧支付标识。
//! 单次调用，不重试；非 2xx 响应原样带回状态码和响应体。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vita_domain_core::Money;
use vita_errors::AppResult;

/// 支付回跳地址
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

/// 创建支付偏好请求
#[derive(Debug, Clone)]
pub struct PreferenceRequest {
    /// 商品描述（如"处方续期 / 医疗报告"）
    pub title: String,
    /// 固定费用
    pub amount: Money,
    /// 付款人邮箱
    pub payer_email: String,
    /// 外部关联号（病例 ID）
    pub external_reference: String,
    /// 支付完成后的回跳地址
    pub back_urls: BackUrls,
}

/// 创建支付偏好响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceResponse {
    /// 网关侧偏好/支付标识
    pub id: String,
    /// 用户跳转地址
    pub redirect_url: String,
}

/// 支付网关 Port
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 创建支付偏好
    async fn create_preference(&self, request: &PreferenceRequest)
    -> AppResult<PreferenceResponse>;
}
