//! Chaincode trait and registry

use crate::error::{ChaincodeError, ChaincodeResult};
use crate::kv_store::KvStore;
use crate::orm::Orm;
use crate::session_store::SimpleSessionStore;
use crate::transfer::SimpleTransfer;
use std::collections::HashMap;
use std::fmt;

/// Deterministic smart contract
///
/// `invoke` must depend only on its arguments and the values read through
/// the `Orm`. Returning `Err` aborts the transaction without retry.
pub trait Chaincode: Send {
    /// Run `func` with `args`, recording reads and writes in `orm`
    fn invoke(&mut self, orm: &mut Orm<'_>, func: &str, args: &[String]) -> ChaincodeResult<()>;
}

/// Constructor of a chaincode instance
pub type ChaincodeFactory = Box<dyn Fn() -> Box<dyn Chaincode> + Send + Sync>;

/// Chaincodes available to the execution engine, by name
#[derive(Default)]
pub struct ChaincodeRegistry {
    factories: HashMap<String, ChaincodeFactory>,
}

impl ChaincodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `transfer`, `session_store` and `kv`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("transfer", || Box::new(SimpleTransfer));
        registry.register("session_store", || Box::new(SimpleSessionStore));
        registry.register("kv", || Box::new(KvStore));
        registry
    }

    /// Register a chaincode; replaces any previous one with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Chaincode> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Create a fresh instance of `name`
    pub fn instantiate(&self, name: &str) -> ChaincodeResult<Box<dyn Chaincode>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ChaincodeError::UnknownChaincode(name.to_string()))
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ChaincodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaincodeRegistry")
            .field("chaincodes", &self.names())
            .finish()
    }
}
