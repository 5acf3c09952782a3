//! Shared application state

use crate::email::EmailSender;
use crate::oracle::DeliverabilityOracle;
use crate::registrar::Registrar;
use crate::store::AccountStore;

/// State handed to every route through `Arc`
pub struct AppState<U, D, E>
where
    U: AccountStore,
    D: DeliverabilityOracle,
    E: EmailSender,
{
    pub registrar: Registrar<U, D, E>,
}

impl<U, D, E> AppState<U, D, E>
where
    U: AccountStore,
    D: DeliverabilityOracle,
    E: EmailSender,
{
    pub fn new(registrar: Registrar<U, D, E>) -> Self {
        Self { registrar }
    }
}
