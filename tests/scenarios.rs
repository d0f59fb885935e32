use anyhow::Context;
use einvoice_ledger::{
    error::{ConflictReason, ErrorKind},
    service::InvoiceService,
    store::SledStore,
    types::{AgencyInfo, InvoiceId, NewInvoice, PaperInfo, RecordInfo},
};
use sled::open;
use std::sync::Arc;

use tempfile::{TempDir, tempdir}; // Use for test db cleanup.

// Sled locks its directory, so every test gets its own database under a
// temp dir which is removed when the returned guard drops.
fn sled_service(name: &str) -> anyhow::Result<(TempDir, InvoiceService<SledStore>)> {
    let temp_dir = tempdir()?;
    let db = open(temp_dir.path().join(name))?;
    let service = InvoiceService::new(Arc::new(SledStore::new(Arc::new(db))));
    Ok((temp_dir, service))
}

fn agency() -> AgencyInfo {
    AgencyInfo {
        agency_code: "AG01".into(),
        agency_name: "Municipal Finance Bureau".into(),
    }
}

fn booking(acc_number: &str, acc_amount: i64, acc_date_time: &str) -> RecordInfo {
    RecordInfo {
        agency_code: "AG01".into(),
        agency_name: "Municipal Finance Bureau".into(),
        acc_number: acc_number.into(),
        acc_amount,
        acc_date_time: acc_date_time.into(),
    }
}

fn paper(code: &str, number: &str) -> PaperInfo {
    PaperInfo {
        paper_code: code.into(),
        paper_number: number.into(),
    }
}

#[test]
fn book_twice_unbook_and_book_again() -> anyhow::Result<()> {
    let (_dir, service) = sled_service("book_cycle.db")?;
    let e1 = InvoiceId::new("E", "1");

    service
        .save_normal(NewInvoice::new(e1.clone(), "<EInvoice/>"))
        .context("Invoice failed on save: ")?;

    service
        .book(&e1, booking("A1", 100, "T1"))
        .context("First booking failed: ")?;

    // the same triple is still outstanding
    let err = service.book(&e1, booking("A1", 100, "T1")).unwrap_err();
    assert_eq!(err.conflict(), Some(ConflictReason::AlreadyRecorded));

    service.unbook(&e1, booking("A1", 100, "T1"))?;

    let invoice = service.book(&e1, booking("A1", 100, "T1"))?;
    assert_eq!(invoice.record_infos().len(), 2);
    assert_eq!(invoice.unrecord_infos().len(), 1);
    assert_eq!(invoice.outstanding(&booking("A1", 100, "T1").key()), 1);

    Ok(())
}

#[test]
fn lock_blocks_print_until_unlocked() -> anyhow::Result<()> {
    let (_dir, service) = sled_service("lock_print.db")?;
    let e1 = InvoiceId::new("E", "1");
    service.save_normal(NewInvoice::new(e1.clone(), "<EInvoice/>"))?;

    service.lock(&e1, agency()).context("Lock failed: ")?;

    let err = service.lock(&e1, agency()).unwrap_err();
    assert_eq!(err.conflict(), Some(ConflictReason::AlreadyLocked));

    let err = service.print(&e1, paper("P1", "N1")).unwrap_err();
    assert_eq!(err.conflict(), Some(ConflictReason::Locked));

    service.unlock(&e1, agency()).context("Unlock failed: ")?;

    let invoice = service.print(&e1, paper("P1", "N1"))?;
    assert_eq!(invoice.paper_infos(), &[paper("P1", "N1")]);
    assert!(!invoice.is_locked());

    Ok(())
}

#[test]
fn red_invoice_links_both_ways() -> anyhow::Result<()> {
    let (_dir, service) = sled_service("red_link.db")?;
    let e1 = InvoiceId::new("E", "1");
    let r1 = InvoiceId::new("R", "1");

    service.save_normal(NewInvoice::new(e1.clone(), "<EInvoice blue/>"))?;
    service
        .save_red(NewInvoice::new(r1.clone(), "<EInvoice red/>").set_related(e1.clone()))
        .context("Red invoice failed on save: ")?;

    let blue = service.query(&e1)?;
    let red = service.query(&r1)?;

    assert_eq!(blue.info.related(), Some(r1.clone()));
    assert!(!blue.info.is_red());
    assert_eq!(red.info.related(), Some(e1));
    assert!(red.info.is_red());
    assert_eq!(red.document, "<EInvoice red/>");

    Ok(())
}

#[test]
fn booking_after_lock_releases_it() -> anyhow::Result<()> {
    let (_dir, service) = sled_service("book_unlocks.db")?;
    let e1 = InvoiceId::new("E", "1");
    service.save_normal(NewInvoice::new(e1.clone(), "<EInvoice/>"))?;

    let invoice = service.lock(&e1, agency())?;
    assert!(invoice.is_locked());

    let invoice = service.book(&e1, booking("A1", 100, "T1"))?;
    assert!(!invoice.is_locked());
    assert_eq!(invoice.lock_infos().len(), 1);
    assert!(invoice.unlock_infos().is_empty());

    // the booking now blocks printing even though the lock is gone
    let err = service.print(&e1, paper("P1", "N1")).unwrap_err();
    assert_eq!(err.conflict(), Some(ConflictReason::OutstandingBooking));

    Ok(())
}

#[test]
fn printed_invoice_cannot_be_booked() -> anyhow::Result<()> {
    let (_dir, service) = sled_service("print_then_book.db")?;
    let e1 = InvoiceId::new("E", "1");
    service.save_normal(NewInvoice::new(e1.clone(), "<EInvoice/>"))?;

    service.print(&e1, paper("P1", "N1"))?;
    let err = service.book(&e1, booking("A1", 100, "T1")).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.conflict(), Some(ConflictReason::AlreadyPrinted));

    Ok(())
}

#[test]
fn refused_transition_leaves_stored_bytes_untouched() -> anyhow::Result<()> {
    let (_dir, service) = sled_service("refused.db")?;
    let e1 = InvoiceId::new("E", "1");
    service.save_normal(NewInvoice::new(e1.clone(), "<EInvoice/>"))?;
    service.lock(&e1, agency())?;

    let db = service.store().instance().clone();
    let before = db.get(e1.info_key())?;

    assert!(service.print(&e1, paper("P1", "N1")).is_err());
    assert!(service.unbook(&e1, booking("A1", 100, "T1")).is_err());
    assert!(service.lock(&e1, agency()).is_err());

    assert_eq!(db.get(e1.info_key())?, before);
    Ok(())
}

#[test]
fn query_survives_reopening_the_database() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("reopen.db");
    let e1 = InvoiceId::new("E", "1");

    let saved = {
        let db = open(&db_path)?;
        let service = InvoiceService::new(Arc::new(SledStore::new(Arc::new(db))));
        service.save_normal(NewInvoice::new(e1.clone(), "<EInvoice/>").set_address("oss://bucket/e1"))?;
        service.book(&e1, booking("A1", 100, "T1"))?;
        service.book(&e1, booking("A2", 250, "T2"))?;
        service.unbook(&e1, booking("A1", 100, "T1"))?;
        service.query(&e1)?
    };

    let db = open(&db_path)?;
    let service = InvoiceService::new(Arc::new(SledStore::new(Arc::new(db))));
    let reloaded = service.query(&e1)?;

    assert_eq!(reloaded, saved);
    assert_eq!(reloaded.info.address(), Some("oss://bucket/e1"));
    assert!(service.exists(&e1)?);

    Ok(())
}
