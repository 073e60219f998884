//! Session store chaincode

use crate::chaincode::Chaincode;
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::orm::Orm;
use crate::transfer::parse_count;

/// Reads even keys, writes odd keys
///
/// `init [count]` seeds keys `0..count` with `0`. Any other function takes
/// `[key, value]`: an even numeric key is read (and must exist), an odd one
/// is set to `value`.
#[derive(Debug, Default)]
pub struct SimpleSessionStore;

impl Chaincode for SimpleSessionStore {
    fn invoke(&mut self, orm: &mut Orm<'_>, func: &str, args: &[String]) -> ChaincodeResult<()> {
        if func == "init" && args.len() == 1 {
            let count = parse_count(func, args)?;
            for i in 0..count {
                orm.put(i.to_string(), "0");
            }
            return Ok(());
        }
        let [key, value] = args else {
            return Err(ChaincodeError::invalid_args(func, "expected 2 args"));
        };
        let key_num = key
            .parse::<i64>()
            .map_err(|e| ChaincodeError::invalid_args(func, e.to_string()))?;
        if key_num % 2 == 0 {
            match orm.get(key.clone())? {
                Some(value) => {
                    orm.set_result(value);
                    Ok(())
                }
                None => Err(ChaincodeError::MissingKey(key.clone())),
            }
        } else {
            orm.put(key.clone(), value.clone());
            Ok(())
        }
    }
}
