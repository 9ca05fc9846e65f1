//! 类型定义模块

mod billing;
mod domain;
mod filter;
mod response;

pub use billing::{BillingData, RenewalCycle, RenewalFlag};
pub use domain::{
    normalize_domain_name, parse_domain_id, DomainId, DomainRecord, DomainStatus, ListScope,
    NewDomainRecord,
};
pub use filter::DomainFilter;
pub use response::{ApiResponse, DomainView, VerifyResult};
