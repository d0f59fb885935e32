//! Counting bookings against their reversals
//!
//! A booking is identified by its `(accNumber, accAmount, accDateTime)` triple.
//! The same triple may be booked again once every earlier booking of it has been
//! reversed, so membership is not enough: the matcher counts.
use super::types::RecordInfo;
use std::collections::HashMap;

/// The triple bookings and reversals are matched on. Agency fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookingKey<'a> {
    pub acc_number: &'a str,
    pub acc_amount: i64,
    pub acc_date_time: &'a str,
}

impl RecordInfo {
    pub fn key(&self) -> BookingKey<'_> {
        BookingKey {
            acc_number: &self.acc_number,
            acc_amount: self.acc_amount,
            acc_date_time: &self.acc_date_time,
        }
    }
}

/// Bookings of `key` not yet offset by a reversal.
pub fn outstanding(records: &[RecordInfo], unrecords: &[RecordInfo], key: &BookingKey<'_>) -> i64 {
    let booked = records.iter().filter(|r| r.key() == *key).count() as i64;
    let reversed = unrecords.iter().filter(|u| u.key() == *key).count() as i64;
    booked - reversed
}

/// Net count per triple. Triples that only appear as reversals show up negative.
pub fn tally<'a>(records: &'a [RecordInfo], unrecords: &'a [RecordInfo]) -> HashMap<BookingKey<'a>, i64> {
    let mut counts = HashMap::new();
    for record in records {
        *counts.entry(record.key()).or_insert(0) += 1;
    }
    for unrecord in unrecords {
        *counts.entry(unrecord.key()).or_insert(0) -= 1;
    }
    counts
}

/// True when at least one booked triple is still outstanding
pub fn any_outstanding(records: &[RecordInfo], unrecords: &[RecordInfo]) -> bool {
    tally(records, unrecords).values().any(|count| *count > 0)
}
