//! Plain key-value chaincode

use crate::chaincode::Chaincode;
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::orm::Orm;

/// `put [k, v]`, `get [k]`, `del [k]`
#[derive(Debug, Default)]
pub struct KvStore;

impl Chaincode for KvStore {
    fn invoke(&mut self, orm: &mut Orm<'_>, func: &str, args: &[String]) -> ChaincodeResult<()> {
        match (func, args) {
            ("put", [key, value]) => orm.put(key.clone(), value.clone()),
            ("get", [key]) => {
                let value = orm
                    .get(key.clone())?
                    .ok_or_else(|| ChaincodeError::MissingKey(key.clone()))?;
                orm.set_result(value);
            }
            ("del", [key]) => orm.del(key.clone()),
            ("put" | "get" | "del", _) => {
                return Err(ChaincodeError::invalid_args(func, "wrong number of args"))
            }
            (other, _) => return Err(ChaincodeError::UnknownFunction(other.to_string())),
        }
        Ok(())
    }
}
