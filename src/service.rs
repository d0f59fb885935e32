//! Service layer API for invoice lifecycle operations
use super::authority::Operation;
use super::error::{ConflictReason, LedgerError};
use super::invoice::Invoice;
use super::store::{LedgerStore, WriteSet};
use super::types::{
    AgencyInfo, AssignInfo, AuthorizedInfo, InvoiceId, NewInvoice, PaperInfo, RecordInfo,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An invoice aggregate together with its document body, as returned by queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    #[serde(rename = "eInvoiceInfo")]
    pub info: Invoice,
    #[serde(rename = "eInvoiceXML")]
    pub document: String,
}

pub struct InvoiceService<S> {
    store: Arc<S>,
}

impl<S: LedgerStore> InvoiceService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn read(&self, key: &str, operation: Operation) -> Result<Option<Vec<u8>>, LedgerError> {
        self.store
            .get_state(key)
            .map_err(|source| LedgerError::Storage {
                operation,
                key: key.to_string(),
                source,
            })
    }

    /// Load an aggregate snapshot, failing with `NotFound` when absent
    fn load(&self, id: &InvoiceId, operation: Operation) -> Result<Invoice, LedgerError> {
        let key = id.info_key();
        let Some(bytes) = self.read(&key, operation)? else {
            return Err(LedgerError::NotFound {
                operation,
                id: id.clone(),
            });
        };
        debug!(%operation, %key, len = bytes.len(), "loaded invoice");
        serde_json::from_slice(&bytes).map_err(|e| LedgerError::Corrupt {
            operation,
            key,
            reason: e.to_string(),
        })
    }

    fn stage(writes: &mut WriteSet, invoice: &Invoice, operation: Operation) -> Result<(), LedgerError> {
        let key = invoice.id().info_key();
        let bytes = serde_json::to_vec(invoice).map_err(|e| LedgerError::Corrupt {
            operation,
            key: key.clone(),
            reason: e.to_string(),
        })?;
        writes.put(key, bytes);
        Ok(())
    }

    fn commit(&self, writes: WriteSet, operation: Operation) -> Result<(), LedgerError> {
        let key = writes.keys().next().unwrap_or_default().to_string();
        let count = writes.len();
        self.store
            .commit(writes)
            .map_err(|source| LedgerError::Storage {
                operation,
                key: key.clone(),
                source,
            })?;
        debug!(%operation, %key, puts = count, "committed");
        Ok(())
    }

    fn persist(&self, invoice: &Invoice, operation: Operation) -> Result<(), LedgerError> {
        let mut writes = WriteSet::new();
        Self::stage(&mut writes, invoice, operation)?;
        self.commit(writes, operation)
    }

    /// Load, apply `step` to the snapshot, and persist the result.
    /// Nothing is written when `step` refuses the transition.
    fn transition(
        &self,
        id: &InvoiceId,
        operation: Operation,
        step: impl FnOnce(Invoice) -> Result<Invoice, ConflictReason>,
    ) -> Result<Invoice, LedgerError> {
        let current = self.load(id, operation)?;
        let next = step(current).map_err(|reason| {
            warn!(%operation, invoice = %id, %reason, "transition refused");
            LedgerError::Conflict {
                operation,
                id: id.clone(),
                reason,
            }
        })?;
        self.persist(&next, operation)?;
        info!(%operation, invoice = %id, "transition applied");
        Ok(next)
    }

    /// Save a normal (blue) invoice. A related identity in the draft is
    /// ignored; only a red invoice saved against this one links it.
    pub fn save_normal(&self, draft: NewInvoice) -> Result<Invoice, LedgerError> {
        let operation = Operation::SaveNormal;
        self.ensure_absent(&draft.id, operation)?;

        let invoice = Invoice::blue(draft.id.clone());
        self.write_new(invoice, draft, operation)
    }

    /// Save a red invoice reversing `draft.related`, and point the related
    /// invoice back at it.
    ///
    /// The back-link and the new invoice are two separate commits. If the
    /// second one fails, the related invoice is left pointing at a red invoice
    /// that does not exist; the ledger offers no multi-key commit across them.
    pub fn save_red(&self, draft: NewInvoice) -> Result<Invoice, LedgerError> {
        let operation = Operation::SaveRed;
        let related_id = match &draft.related {
            Some(related) if !related.is_blank() => related.clone(),
            _ => {
                return Err(LedgerError::malformed(
                    operation,
                    "red invoice requires relatedEInvoiceCode and relatedEInvoiceNumber",
                ));
            }
        };
        self.ensure_absent(&draft.id, operation)?;

        let related = self
            .load(&related_id, operation)?
            .set_related(draft.id.clone());
        self.persist(&related, operation)?;
        info!(invoice = %draft.id, related = %related_id, "related invoice linked");

        let id = draft.id.clone();
        let invoice = Invoice::red(draft.id.clone(), related_id.clone());
        self.write_new(invoice, draft, operation).inspect_err(|e| {
            warn!(
                invoice = %id,
                related = %related_id,
                error = %e,
                "red invoice not saved after its related invoice was linked"
            );
        })
    }

    fn ensure_absent(&self, id: &InvoiceId, operation: Operation) -> Result<(), LedgerError> {
        if self.read(&id.info_key(), operation)?.is_some() {
            warn!(%operation, invoice = %id, "invoice already exists");
            return Err(LedgerError::AlreadyExists {
                operation,
                id: id.clone(),
            });
        }
        Ok(())
    }

    fn write_new(
        &self,
        invoice: Invoice,
        draft: NewInvoice,
        operation: Operation,
    ) -> Result<Invoice, LedgerError> {
        let invoice = invoice
            .set_address(draft.address)
            .set_relevant_parties(draft.parties);

        // aggregate and document body land together
        let mut writes = WriteSet::new();
        Self::stage(&mut writes, &invoice, operation)?;
        writes.put(draft.id.document_key(), draft.document.into_bytes());
        self.commit(writes, operation)?;

        info!(%operation, invoice = %draft.id, red = invoice.is_red(), "invoice saved");
        Ok(invoice)
    }

    pub fn print(&self, id: &InvoiceId, paper: PaperInfo) -> Result<Invoice, LedgerError> {
        self.transition(id, Operation::Print, |invoice| invoice.print(paper))
    }

    pub fn accredit(&self, id: &InvoiceId, info: AuthorizedInfo) -> Result<Invoice, LedgerError> {
        self.transition(id, Operation::Accredit, |invoice| invoice.accredit(info))
    }

    pub fn assign(&self, id: &InvoiceId, info: AssignInfo) -> Result<Invoice, LedgerError> {
        self.transition(id, Operation::Assign, |invoice| invoice.assign(info))
    }

    pub fn lock(&self, id: &InvoiceId, agency: AgencyInfo) -> Result<Invoice, LedgerError> {
        self.transition(id, Operation::Lock, |invoice| invoice.lock(agency))
    }

    pub fn unlock(&self, id: &InvoiceId, agency: AgencyInfo) -> Result<Invoice, LedgerError> {
        self.transition(id, Operation::Unlock, |invoice| invoice.unlock(agency))
    }

    pub fn book(&self, id: &InvoiceId, record: RecordInfo) -> Result<Invoice, LedgerError> {
        self.transition(id, Operation::Book, |invoice| invoice.book(record))
    }

    pub fn unbook(&self, id: &InvoiceId, record: RecordInfo) -> Result<Invoice, LedgerError> {
        self.transition(id, Operation::Unbook, |invoice| invoice.unbook(record))
    }

    /// The aggregate and its document body
    pub fn query(&self, id: &InvoiceId) -> Result<InvoiceRecord, LedgerError> {
        let operation = Operation::Query;
        let info = self.load(id, operation)?;

        let key = id.document_key();
        let Some(bytes) = self.read(&key, operation)? else {
            return Err(LedgerError::NotFound {
                operation,
                id: id.clone(),
            });
        };
        let document = String::from_utf8(bytes).map_err(|e| LedgerError::Corrupt {
            operation,
            key,
            reason: e.to_string(),
        })?;

        Ok(InvoiceRecord { info, document })
    }

    /// Whether an aggregate is stored for `id`. Read failures are errors, never `false`.
    pub fn exists(&self, id: &InvoiceId) -> Result<bool, LedgerError> {
        Ok(self.read(&id.info_key(), Operation::Exist)?.is_some())
    }
}
