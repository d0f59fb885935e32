//! JSON argument shapes accepted by the ledger functions
//!
//! Each payload is decoded once at the boundary and turned into the typed
//! values the service works with; nothing past this module sees raw JSON.
use super::authority::{Operation, RoleSet};
use super::error::LedgerError;
use super::types::{
    AgencyInfo, AssignInfo, AuthorizedInfo, InvoiceId, NewInvoice, PaperInfo, RecordInfo,
    RelevantParty,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Decode `raw` as `P`, reporting failures as `MalformedPayload` for `operation`
pub fn decode<P: DeserializeOwned>(operation: Operation, raw: &str) -> Result<P, LedgerError> {
    serde_json::from_str(raw).map_err(|e| LedgerError::malformed(operation, e.to_string()))
}

fn invoice_id(operation: Operation, code: String, number: String) -> Result<InvoiceId, LedgerError> {
    let id = InvoiceId::new(code, number);
    if id.is_blank() {
        return Err(LedgerError::malformed(
            operation,
            "eInvoiceCode and eInvoiceNumber must not be empty",
        ));
    }
    Ok(id)
}

/// A party as it appears on the wire: `type` is the legacy role state mask.
#[derive(Debug, Clone, Deserialize)]
pub struct RelevantData {
    pub identity: String,
    #[serde(rename = "type")]
    pub state: u32,
    #[serde(default)]
    pub value: Option<String>,
}

impl RelevantData {
    fn into_party(self, operation: Operation) -> Result<RelevantParty, LedgerError> {
        let roles = RoleSet::from_state_mask(self.state).map_err(|unknown| {
            LedgerError::malformed(
                operation,
                format!("relevantList entry {} has unknown role bits {unknown:#x}", self.identity),
            )
        })?;
        Ok(RelevantParty {
            identity: self.identity,
            roles,
            value: self.value.filter(|v| !v.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEInvoiceData {
    pub e_invoice_code: String,
    pub e_invoice_number: String,
    pub e_invoice: String,
    #[serde(default)]
    pub related_e_invoice_code: Option<String>,
    #[serde(default)]
    pub related_e_invoice_number: Option<String>,
    #[serde(default)]
    pub relevant_list: Vec<RelevantData>,
    #[serde(default)]
    pub e_invoice_address: Option<String>,
}

impl SaveEInvoiceData {
    pub fn into_new_invoice(self, operation: Operation) -> Result<NewInvoice, LedgerError> {
        let id = invoice_id(operation, self.e_invoice_code, self.e_invoice_number)?;
        let related = match (self.related_e_invoice_code, self.related_e_invoice_number) {
            (Some(code), Some(number)) if !code.is_empty() && !number.is_empty() => {
                Some(InvoiceId::new(code, number))
            }
            _ => None,
        };
        let parties = self
            .relevant_list
            .into_iter()
            .map(|data| data.into_party(operation))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewInvoice {
            id,
            document: self.e_invoice,
            related,
            address: self.e_invoice_address.filter(|a| !a.is_empty()),
            parties,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintEInvoiceData {
    pub e_invoice_code: String,
    pub e_invoice_number: String,
    pub paper_code: String,
    pub paper_number: String,
}

impl PrintEInvoiceData {
    pub fn into_parts(self, operation: Operation) -> Result<(InvoiceId, PaperInfo), LedgerError> {
        let id = invoice_id(operation, self.e_invoice_code, self.e_invoice_number)?;
        Ok((
            id,
            PaperInfo {
                paper_code: self.paper_code,
                paper_number: self.paper_number,
            },
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccreditEInvoiceData {
    pub e_invoice_code: String,
    pub e_invoice_number: String,
    pub authorizer_name: String,
    pub authorizer_code: String,
    pub authorizer_code_type: String,
    pub target_account_id: String,
    pub authorized_party_name: String,
    pub authorized_party_code: String,
    pub ciphertext: String,
}

impl AccreditEInvoiceData {
    pub fn into_parts(self, operation: Operation) -> Result<(InvoiceId, AuthorizedInfo), LedgerError> {
        let id = invoice_id(operation, self.e_invoice_code, self.e_invoice_number)?;
        Ok((
            id,
            AuthorizedInfo {
                authorizer_name: self.authorizer_name,
                authorizer_code: self.authorizer_code,
                authorizer_code_type: self.authorizer_code_type,
                target_account_id: self.target_account_id,
                authorized_party_name: self.authorized_party_name,
                authorized_party_code: self.authorized_party_code,
                ciphertext: self.ciphertext,
            },
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignEInvoiceData {
    pub e_invoice_code: String,
    pub e_invoice_number: String,
    pub assignor_type: String,
    pub assignor_name: String,
    pub assignor_code: String,
    pub assignor_code_type: String,
    pub target_account_id: String,
    pub transferee_name: String,
    pub transferee_code: String,
    pub transferee_code_type: String,
    pub ciphertext: String,
}

impl AssignEInvoiceData {
    pub fn into_parts(self, operation: Operation) -> Result<(InvoiceId, AssignInfo), LedgerError> {
        let id = invoice_id(operation, self.e_invoice_code, self.e_invoice_number)?;
        Ok((
            id,
            AssignInfo {
                assignor_type: self.assignor_type,
                assignor_name: self.assignor_name,
                assignor_code: self.assignor_code,
                assignor_code_type: self.assignor_code_type,
                target_account_id: self.target_account_id,
                transferee_name: self.transferee_name,
                transferee_code: self.transferee_code,
                transferee_code_type: self.transferee_code_type,
                ciphertext: self.ciphertext,
            },
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOrUnlockEInvoiceData {
    pub e_invoice_code: String,
    pub e_invoice_number: String,
    pub agency_code: String,
    pub agency_name: String,
}

impl LockOrUnlockEInvoiceData {
    pub fn into_parts(self, operation: Operation) -> Result<(InvoiceId, AgencyInfo), LedgerError> {
        let id = invoice_id(operation, self.e_invoice_code, self.e_invoice_number)?;
        Ok((
            id,
            AgencyInfo {
                agency_code: self.agency_code,
                agency_name: self.agency_name,
            },
        ))
    }
}

/// Shared by booking and its reversal
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedEInvoiceData {
    pub e_invoice_code: String,
    pub e_invoice_number: String,
    pub agency_code: String,
    pub agency_name: String,
    pub acc_number: String,
    pub acc_amount: i64,
    pub acc_date_time: String,
}

impl BookedEInvoiceData {
    pub fn into_parts(self, operation: Operation) -> Result<(InvoiceId, RecordInfo), LedgerError> {
        let id = invoice_id(operation, self.e_invoice_code, self.e_invoice_number)?;
        Ok((
            id,
            RecordInfo {
                agency_code: self.agency_code,
                agency_name: self.agency_name,
                acc_number: self.acc_number,
                acc_amount: self.acc_amount,
                acc_date_time: self.acc_date_time,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::Role;
    use crate::error::ErrorKind;

    #[test]
    fn save_payload_decodes_parties_and_link() {
        let raw = r#"{
            "eInvoiceCode": "R",
            "eInvoiceNumber": "1",
            "eInvoice": "<EInvoice/>",
            "relatedEInvoiceCode": "E",
            "relatedEInvoiceNumber": "1",
            "relevantList": [{"identity": "org-1", "type": 10, "value": "x"}],
            "eInvoiceAddress": ""
        }"#;

        let data: SaveEInvoiceData = decode(Operation::SaveRed, raw).unwrap();
        let draft = data.into_new_invoice(Operation::SaveRed).unwrap();

        assert_eq!(draft.related, Some(InvoiceId::new("E", "1")));
        assert_eq!(draft.address, None);
        assert!(draft.parties[0].roles.contains(Role::Belonger));
        assert!(draft.parties[0].roles.contains(Role::Inquirer));
    }

    #[test]
    fn unknown_role_bits_are_malformed() {
        let raw = r#"{"eInvoiceCode":"E","eInvoiceNumber":"1","eInvoice":"",
            "relevantList":[{"identity":"org-1","type":256}]}"#;

        let data: SaveEInvoiceData = decode(Operation::SaveNormal, raw).unwrap();
        let err = data.into_new_invoice(Operation::SaveNormal).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = decode::<BookedEInvoiceData>(
            Operation::Book,
            r#"{"eInvoiceCode":"E","eInvoiceNumber":"1","accNumber":"A1"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn missing_ciphertext_is_malformed() {
        let err = decode::<AccreditEInvoiceData>(
            Operation::Accredit,
            r#"{"eInvoiceCode":"E","eInvoiceNumber":"1","authorizerName":"N",
                "authorizerCode":"C","authorizerCodeType":"T","targetAccountId":"ACC",
                "authorizedPartyName":"P","authorizedPartyCode":"PC"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);

        let err = decode::<AssignEInvoiceData>(
            Operation::Assign,
            r#"{"eInvoiceCode":"E","eInvoiceNumber":"1","assignorType":"1","assignorName":"N",
                "assignorCode":"C","assignorCodeType":"T","targetAccountId":"ACC",
                "transfereeName":"P","transfereeCode":"PC","transfereeCodeType":"T"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn fractional_amount_is_malformed() {
        let err = decode::<BookedEInvoiceData>(
            Operation::Book,
            r#"{"eInvoiceCode":"E","eInvoiceNumber":"1","agencyCode":"A","agencyName":"B",
                "accNumber":"A1","accAmount":10.5,"accDateTime":"T1"}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn blank_identity_is_malformed() {
        let data: PrintEInvoiceData = decode(
            Operation::Print,
            r#"{"eInvoiceCode":"","eInvoiceNumber":"1","paperCode":"P","paperNumber":"N"}"#,
        )
        .unwrap();
        let err = data.into_parts(Operation::Print).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    }
}
