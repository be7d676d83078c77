//! 命令/查询处理器

mod create_case_handler;
mod initiate_payment_handler;
mod pending_review_handler;
mod reconcile_payment_handler;
mod register_user_handler;
mod submit_review_handler;

pub use create_case_handler::*;
pub use initiate_payment_handler::*;
pub use pending_review_handler::*;
pub use reconcile_payment_handler::*;
pub use register_user_handler::*;
pub use submit_review_handler::*;
