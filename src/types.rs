//! Identity and history entry types shared by the aggregate and the payloads
use super::authority::RoleSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary key of every ledger entry belonging to one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvoiceId {
    #[serde(rename = "eInvoiceCode")]
    pub code: String,
    #[serde(rename = "eInvoiceNumber")]
    pub number: String,
}

impl InvoiceId {
    pub fn new(code: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            number: number.into(),
        }
    }
    /// Ledger key of the aggregate snapshot
    pub fn info_key(&self) -> String {
        format!("eInvoiceInfo_{}_{}", self.code, self.number)
    }
    /// Ledger key of the immutable document body
    pub fn document_key(&self) -> String {
        format!("eInvoiceXML_{}_{}", self.code, self.number)
    }
    pub fn is_blank(&self) -> bool {
        self.code.is_empty() || self.number.is_empty()
    }
}

impl fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.code, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperInfo {
    pub paper_code: String,
    pub paper_number: String,
}

/// One booking (or one reversal of a booking) made by an agency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInfo {
    pub agency_code: String,
    pub agency_name: String,
    pub acc_number: String,
    pub acc_amount: i64, // minor units
    pub acc_date_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedInfo {
    pub authorizer_name: String,
    pub authorizer_code: String,
    pub authorizer_code_type: String,
    pub target_account_id: String,
    pub authorized_party_name: String,
    pub authorized_party_code: String,
    // opaque to the engine, decrypted off-ledger
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ciphertext: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignInfo {
    pub assignor_type: String,
    pub assignor_name: String,
    pub assignor_code: String,
    pub assignor_code_type: String,
    pub target_account_id: String,
    pub transferee_name: String,
    pub transferee_code: String,
    pub transferee_code_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ciphertext: String,
}

/// Agency acting on a lock or unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyInfo {
    pub agency_code: String,
    pub agency_name: String,
}

/// A party declared when the invoice was saved, with the roles it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelevantParty {
    pub identity: String,
    pub roles: RoleSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Everything needed to create an invoice, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub id: InvoiceId,
    pub document: String,
    pub related: Option<InvoiceId>,
    pub address: Option<String>,
    pub parties: Vec<RelevantParty>,
}

impl NewInvoice {
    pub fn new(id: InvoiceId, document: impl Into<String>) -> Self {
        Self {
            id,
            document: document.into(),
            related: None,
            address: None,
            parties: vec![],
        }
    }
    pub fn set_related(mut self, related: InvoiceId) -> Self {
        self.related = Some(related);
        self
    }
    pub fn set_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
    pub fn add_party(mut self, party: RelevantParty) -> Self {
        self.parties.push(party);
        self
    }
}
