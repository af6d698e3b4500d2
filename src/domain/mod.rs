pub mod approval;
pub mod membership;
pub mod principal;
pub mod role_request;
pub mod tenant;

pub use approval::DomainApprovalStatus;
pub use membership::{GlobalRole, Membership};
pub use principal::{MemberPrincipal, Principal};
pub use role_request::{RequestStatus, RequestedRole, RoleRequest};
pub use tenant::{AuthMethod, MaturityState, Tenant, TenantSettings, ThresholdUpdate};
