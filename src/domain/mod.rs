mod models;

pub use models::{
    AccessLevel, AccessRecord, Account, AccountRoles, AssignmentType, PermissionScores,
    RiskLevel, Role, RoleAccess, User, UserStatus, UserSummary,
};
