//! Operations, party roles and the table granting one to the other
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    SaveNormal,
    SaveRed,
    Print,
    Accredit,
    Assign,
    Lock,
    Unlock,
    Book,
    Unbook,
    Query,
    Exist,
    /// Reading the ciphertexts carried by authorizations and transfers.
    /// Granted by the table but not reachable through dispatch.
    QueryCiphertext,
}

impl Operation {
    /// Operations reachable through the dispatcher, in registration order.
    pub const DISPATCHED: [Operation; 11] = [
        Operation::SaveNormal,
        Operation::SaveRed,
        Operation::Print,
        Operation::Accredit,
        Operation::Assign,
        Operation::Lock,
        Operation::Unlock,
        Operation::Book,
        Operation::Unbook,
        Operation::Query,
        Operation::Exist,
    ];

    /// Ledger function name
    pub fn name(self) -> &'static str {
        match self {
            Operation::SaveNormal => "saveNormalEInvoice",
            Operation::SaveRed => "saveRedEInvoice",
            Operation::Print => "printEInvoice",
            Operation::Accredit => "accreditEInvoice",
            Operation::Assign => "assignEInvoice",
            Operation::Lock => "lockEInvoice",
            Operation::Unlock => "unlockEInvoice",
            Operation::Book => "bookedEInvoice",
            Operation::Unbook => "unbookedEInvoice",
            Operation::Query => "queryEInvoice",
            Operation::Exist => "exist",
            Operation::QueryCiphertext => "queryCiphertext",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses ledger function names only, so `queryCiphertext` is rejected.
impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::DISPATCHED
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Submitter,
    Superintendent,
    Belonger,
    Inquirer,
    Recorder,
    Locker,
    Producer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Submitter => "submitter",
            Role::Superintendent => "superintendent",
            Role::Belonger => "belonger",
            Role::Inquirer => "inquirer",
            Role::Recorder => "recorder",
            Role::Locker => "locker",
            Role::Producer => "producer",
        };
        f.write_str(name)
    }
}

/// Wire bit of each role in the legacy `relevantList[].type` state mask.
const STATE_BITS: [(Role, u32); 7] = [
    (Role::Submitter, 1),
    (Role::Belonger, 2),
    (Role::Recorder, 4),
    (Role::Inquirer, 8),
    (Role::Superintendent, 16),
    (Role::Locker, 32),
    (Role::Producer, 64),
];

/// Roles allowed to perform each gated operation. Operations absent here are open.
const GRANTS: &[(Operation, &[Role])] = &[
    (Operation::Print, &[Role::Submitter]),
    (Operation::Accredit, &[Role::Belonger]),
    (Operation::Assign, &[Role::Belonger]),
    (Operation::Lock, &[Role::Belonger, Role::Inquirer]),
    (Operation::Unlock, &[Role::Locker]),
    (
        Operation::Book,
        &[Role::Belonger, Role::Inquirer, Role::Locker],
    ),
    (Operation::Unbook, &[Role::Recorder]),
    (
        Operation::QueryCiphertext,
        &[Role::Belonger, Role::Superintendent, Role::Producer],
    ),
];

/// Roles granted `op`, or `None` when the operation is not gated.
pub fn granted_roles(op: Operation) -> Option<&'static [Role]> {
    GRANTS
        .iter()
        .find(|(gated, _)| *gated == op)
        .map(|(_, roles)| *roles)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, role: Role) -> Self {
        self.0.insert(role);
        self
    }
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
    /// Decodes a legacy state mask. Bits outside the role table are returned as the error.
    pub fn from_state_mask(mask: u32) -> Result<Self, u32> {
        let mut roles = RoleSet::new();
        let mut unknown = mask;
        for (role, bit) in STATE_BITS {
            if mask & bit != 0 {
                roles.0.insert(role);
                unknown &= !bit;
            }
        }
        if unknown != 0 {
            return Err(unknown);
        }
        Ok(roles)
    }
    pub fn permits(&self, op: Operation) -> bool {
        match granted_roles(op) {
            None => true,
            Some(granted) => granted.iter().any(|role| self.contains(*role)),
        }
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("{}");
        }
        let names: Vec<String> = self.iter().map(|role| role.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names_round_trip() {
        for op in Operation::DISPATCHED {
            assert_eq!(op.name().parse::<Operation>(), Ok(op));
        }
        assert!("deleteEInvoice".parse::<Operation>().is_err());
    }

    #[test]
    fn undispatched_operation_does_not_parse() {
        assert_eq!(Operation::QueryCiphertext.to_string(), "queryCiphertext");
        assert_eq!(
            "queryCiphertext".parse::<Operation>(),
            Err("queryCiphertext".to_string())
        );
    }

    #[test]
    fn state_mask_decodes_each_bit() {
        let roles = RoleSet::from_state_mask(2 | 8).unwrap();

        assert!(roles.contains(Role::Belonger));
        assert!(roles.contains(Role::Inquirer));
        assert!(!roles.contains(Role::Submitter));
        assert_eq!(roles.to_string(), "{belonger, inquirer}");
    }

    #[test]
    fn state_mask_rejects_unknown_bits() {
        assert_eq!(RoleSet::from_state_mask(1 | 128), Err(128));
    }

    #[test]
    fn grant_table_matches_roles() {
        let locker = RoleSet::new().with(Role::Locker);
        assert!(locker.permits(Operation::Unlock));
        assert!(locker.permits(Operation::Book));
        assert!(!locker.permits(Operation::Lock));
        assert!(!locker.permits(Operation::Print));

        let recorder = RoleSet::new().with(Role::Recorder);
        assert!(recorder.permits(Operation::Unbook));
        assert!(!recorder.permits(Operation::Book));

        let producer = RoleSet::new().with(Role::Producer);
        assert!(producer.permits(Operation::QueryCiphertext));
    }

    #[test]
    fn ungated_operations_need_no_role() {
        let nobody = RoleSet::new();

        assert!(nobody.permits(Operation::SaveNormal));
        assert!(nobody.permits(Operation::SaveRed));
        assert!(nobody.permits(Operation::Query));
        assert!(nobody.permits(Operation::Exist));
        assert!(!nobody.permits(Operation::Print));
    }
}
