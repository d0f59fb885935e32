//! The invoice aggregate and its transitions
//!
//! An [`Invoice`] is an immutable snapshot. Every transition consumes the
//! snapshot and hands back the next one, or the reason it was refused; the
//! caller persists whatever it gets back as a whole.
use super::error::ConflictReason;
use super::reconcile::{self, BookingKey};
use super::types::{
    AgencyInfo, AssignInfo, AuthorizedInfo, InvoiceId, PaperInfo, RecordInfo, RelevantParty,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(rename = "eInvoiceCode")]
    code: String,
    #[serde(rename = "eInvoiceNumber")]
    number: String,
    #[serde(rename = "eInvoiceAddress", default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    is_red: bool,
    #[serde(rename = "relatedEInvoiceCode", default, skip_serializing_if = "Option::is_none")]
    related_code: Option<String>,
    #[serde(rename = "relatedEInvoiceNumber", default, skip_serializing_if = "Option::is_none")]
    related_number: Option<String>,
    lock: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    paper_infos: Vec<PaperInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    record_infos: Vec<RecordInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    unrecord_infos: Vec<RecordInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    authorized_infos: Vec<AuthorizedInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    assign_infos: Vec<AssignInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    lock_infos: Vec<AgencyInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    unlock_infos: Vec<AgencyInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    relevant_parties: Vec<RelevantParty>,
}

impl Invoice {
    /// A fresh blue (normal) invoice with empty history
    pub fn blue(id: InvoiceId) -> Self {
        Self {
            code: id.code,
            number: id.number,
            address: None,
            is_red: false,
            related_code: None,
            related_number: None,
            lock: false,
            paper_infos: vec![],
            record_infos: vec![],
            unrecord_infos: vec![],
            authorized_infos: vec![],
            assign_infos: vec![],
            lock_infos: vec![],
            unlock_infos: vec![],
            relevant_parties: vec![],
        }
    }
    /// A fresh red invoice reversing `related`
    pub fn red(id: InvoiceId, related: InvoiceId) -> Self {
        let mut invoice = Self::blue(id).set_related(related);
        invoice.is_red = true;
        invoice
    }
    pub fn set_address(mut self, address: Option<String>) -> Self {
        self.address = address.filter(|a| !a.is_empty());
        self
    }
    pub fn set_relevant_parties(mut self, parties: Vec<RelevantParty>) -> Self {
        self.relevant_parties = parties;
        self
    }
    /// Points this invoice at `related`. Used for the back-link from a blue
    /// invoice to the red invoice that reverses it.
    pub fn set_related(mut self, related: InvoiceId) -> Self {
        self.related_code = Some(related.code);
        self.related_number = Some(related.number);
        self
    }

    pub fn id(&self) -> InvoiceId {
        InvoiceId::new(self.code.clone(), self.number.clone())
    }
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
    pub fn is_red(&self) -> bool {
        self.is_red
    }
    pub fn related(&self) -> Option<InvoiceId> {
        match (&self.related_code, &self.related_number) {
            (Some(code), Some(number)) => Some(InvoiceId::new(code.clone(), number.clone())),
            _ => None,
        }
    }
    pub fn is_locked(&self) -> bool {
        self.lock
    }
    pub fn is_printed(&self) -> bool {
        !self.paper_infos.is_empty()
    }
    pub fn paper_infos(&self) -> &[PaperInfo] {
        &self.paper_infos
    }
    pub fn record_infos(&self) -> &[RecordInfo] {
        &self.record_infos
    }
    pub fn unrecord_infos(&self) -> &[RecordInfo] {
        &self.unrecord_infos
    }
    pub fn authorized_infos(&self) -> &[AuthorizedInfo] {
        &self.authorized_infos
    }
    pub fn assign_infos(&self) -> &[AssignInfo] {
        &self.assign_infos
    }
    pub fn lock_infos(&self) -> &[AgencyInfo] {
        &self.lock_infos
    }
    pub fn unlock_infos(&self) -> &[AgencyInfo] {
        &self.unlock_infos
    }
    pub fn relevant_parties(&self) -> &[RelevantParty] {
        &self.relevant_parties
    }

    /// Unreversed bookings of `key`
    pub fn outstanding(&self, key: &BookingKey<'_>) -> i64 {
        reconcile::outstanding(&self.record_infos, &self.unrecord_infos, key)
    }
    pub fn has_outstanding_booking(&self) -> bool {
        reconcile::any_outstanding(&self.record_infos, &self.unrecord_infos)
    }

    pub fn print(mut self, paper: PaperInfo) -> Result<Self, ConflictReason> {
        if self.has_outstanding_booking() {
            return Err(ConflictReason::OutstandingBooking);
        }
        if self.lock {
            return Err(ConflictReason::Locked);
        }
        self.paper_infos.push(paper);
        Ok(self)
    }

    pub fn accredit(mut self, info: AuthorizedInfo) -> Result<Self, ConflictReason> {
        if self.lock {
            return Err(ConflictReason::Locked);
        }
        self.authorized_infos.push(info);
        Ok(self)
    }

    pub fn assign(mut self, info: AssignInfo) -> Result<Self, ConflictReason> {
        if self.lock {
            return Err(ConflictReason::Locked);
        }
        self.assign_infos.push(info);
        Ok(self)
    }

    pub fn lock(mut self, agency: AgencyInfo) -> Result<Self, ConflictReason> {
        if self.lock {
            return Err(ConflictReason::AlreadyLocked);
        }
        self.lock_infos.push(agency);
        self.lock = true;
        Ok(self)
    }

    pub fn unlock(mut self, agency: AgencyInfo) -> Result<Self, ConflictReason> {
        if !self.lock {
            return Err(ConflictReason::NotLocked);
        }
        self.unlock_infos.push(agency);
        self.lock = false;
        Ok(self)
    }

    /// Records a booking. Printing and booking exclude each other, and a
    /// successful booking releases any lock.
    pub fn book(mut self, record: RecordInfo) -> Result<Self, ConflictReason> {
        if self.is_printed() {
            return Err(ConflictReason::AlreadyPrinted);
        }
        if self.outstanding(&record.key()) != 0 {
            return Err(ConflictReason::AlreadyRecorded);
        }
        self.record_infos.push(record);
        self.lock = false;
        Ok(self)
    }

    /// Reverses exactly one outstanding booking of the same triple.
    pub fn unbook(mut self, record: RecordInfo) -> Result<Self, ConflictReason> {
        if self.outstanding(&record.key()) != 1 {
            return Err(ConflictReason::NotRecorded);
        }
        self.unrecord_infos.push(record);
        Ok(self)
    }
}
