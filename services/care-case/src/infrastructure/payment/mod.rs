//! 支付网关客户端

mod mercado_pago;

pub use mercado_pago::*;
