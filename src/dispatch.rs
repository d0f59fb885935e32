//! Registry mapping ledger function names to typed handlers
//!
//! Mutating functions take exactly one JSON argument; `queryEInvoice` and
//! `exist` take the invoice code and number as two plain arguments. Every
//! handler returns the string the ledger hands back to the caller.
use super::authority::{Operation, RoleSet};
use super::error::LedgerError;
use super::payload::{
    self, AccreditEInvoiceData, AssignEInvoiceData, BookedEInvoiceData, LockOrUnlockEInvoiceData,
    PrintEInvoiceData, SaveEInvoiceData,
};
use super::service::InvoiceService;
use super::store::LedgerStore;
use super::types::InvoiceId;
use std::collections::HashMap;
use tracing::{info_span, warn};

pub trait Handler<S>: Send + Sync {
    fn call(&self, service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError>;
}

impl<S, F> Handler<S> for F
where
    F: Fn(&InvoiceService<S>, &[String]) -> Result<String, LedgerError> + Send + Sync,
{
    fn call(&self, service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
        self(service, args)
    }
}

pub struct Dispatcher<S> {
    service: InvoiceService<S>,
    handlers: HashMap<&'static str, (Operation, Box<dyn Handler<S>>)>,
}

impl<S: LedgerStore + 'static> Dispatcher<S> {
    /// A dispatcher with every ledger function registered
    pub fn new(service: InvoiceService<S>) -> Self {
        let mut dispatcher = Self {
            service,
            handlers: HashMap::new(),
        };
        dispatcher.register(Operation::SaveNormal, save_normal::<S>);
        dispatcher.register(Operation::SaveRed, save_red::<S>);
        dispatcher.register(Operation::Print, print::<S>);
        dispatcher.register(Operation::Accredit, accredit::<S>);
        dispatcher.register(Operation::Assign, assign::<S>);
        dispatcher.register(Operation::Lock, lock::<S>);
        dispatcher.register(Operation::Unlock, unlock::<S>);
        dispatcher.register(Operation::Book, book::<S>);
        dispatcher.register(Operation::Unbook, unbook::<S>);
        dispatcher.register(Operation::Query, query::<S>);
        dispatcher.register(Operation::Exist, exist::<S>);
        dispatcher
    }

    /// Register (or replace) the handler behind `operation`'s function name
    pub fn register(&mut self, operation: Operation, handler: impl Handler<S> + 'static) {
        self.handlers
            .insert(operation.name(), (operation, Box::new(handler)));
    }

    pub fn service(&self) -> &InvoiceService<S> {
        &self.service
    }

    pub fn functions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Invoke `function` without a role check
    pub fn invoke(&self, function: &str, args: &[String]) -> Result<String, LedgerError> {
        self.run(None, function, args)
    }

    /// Invoke `function` on behalf of a caller holding `roles`. Operations the
    /// roles are not granted fail before the ledger is touched.
    ///
    /// `roles` are taken as the caller presents them. The `relevantParties`
    /// stored on an invoice are informational only and are not consulted.
    pub fn invoke_as(
        &self,
        roles: &RoleSet,
        function: &str,
        args: &[String],
    ) -> Result<String, LedgerError> {
        self.run(Some(roles), function, args)
    }

    fn run(
        &self,
        roles: Option<&RoleSet>,
        function: &str,
        args: &[String],
    ) -> Result<String, LedgerError> {
        let span = info_span!("invocation", function, id = %uuid7::uuid7());
        let _guard = span.enter();

        let Some((operation, handler)) = self.handlers.get(function) else {
            warn!("unknown function");
            return Err(LedgerError::UnknownOperation(function.to_string()));
        };
        if let Some(roles) = roles {
            if !roles.permits(*operation) {
                warn!(%roles, "operation not granted");
                return Err(LedgerError::Unauthorized {
                    operation: *operation,
                    roles: roles.clone(),
                });
            }
        }
        handler.call(&self.service, args)
    }
}

fn single_arg(operation: Operation, args: &[String]) -> Result<&str, LedgerError> {
    match args {
        [raw] => Ok(raw.as_str()),
        _ => Err(LedgerError::malformed(
            operation,
            format!("expected 1 argument, got {}", args.len()),
        )),
    }
}

fn id_args(operation: Operation, args: &[String]) -> Result<InvoiceId, LedgerError> {
    match args {
        [code, number] => Ok(InvoiceId::new(code.clone(), number.clone())),
        _ => Err(LedgerError::malformed(
            operation,
            format!("expected 2 arguments, got {}", args.len()),
        )),
    }
}

fn save_normal<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::SaveNormal;
    let data: SaveEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    service.save_normal(data.into_new_invoice(op)?)?;
    Ok(String::new())
}

fn save_red<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::SaveRed;
    let data: SaveEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    service.save_red(data.into_new_invoice(op)?)?;
    Ok(String::new())
}

fn print<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Print;
    let data: PrintEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    let (id, paper) = data.into_parts(op)?;
    service.print(&id, paper)?;
    Ok(String::new())
}

fn accredit<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Accredit;
    let data: AccreditEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    let (id, info) = data.into_parts(op)?;
    service.accredit(&id, info)?;
    Ok(String::new())
}

fn assign<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Assign;
    let data: AssignEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    let (id, info) = data.into_parts(op)?;
    service.assign(&id, info)?;
    Ok(String::new())
}

fn lock<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Lock;
    let data: LockOrUnlockEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    let (id, agency) = data.into_parts(op)?;
    service.lock(&id, agency)?;
    Ok(String::new())
}

fn unlock<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Unlock;
    let data: LockOrUnlockEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    let (id, agency) = data.into_parts(op)?;
    service.unlock(&id, agency)?;
    Ok(String::new())
}

fn book<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Book;
    let data: BookedEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    let (id, record) = data.into_parts(op)?;
    service.book(&id, record)?;
    Ok(String::new())
}

fn unbook<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Unbook;
    let data: BookedEInvoiceData = payload::decode(op, single_arg(op, args)?)?;
    let (id, record) = data.into_parts(op)?;
    service.unbook(&id, record)?;
    Ok(String::new())
}

fn query<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Query;
    let record = service.query(&id_args(op, args)?)?;
    serde_json::to_string(&record).map_err(|e| LedgerError::Corrupt {
        operation: op,
        key: record.info.id().info_key(),
        reason: e.to_string(),
    })
}

fn exist<S: LedgerStore>(service: &InvoiceService<S>, args: &[String]) -> Result<String, LedgerError> {
    let op = Operation::Exist;
    Ok(service.exists(&id_args(op, args)?)?.to_string())
}
