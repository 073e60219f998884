//! Account transfer chaincode

use crate::chaincode::Chaincode;
use crate::error::{ChaincodeError, ChaincodeResult};
use crate::orm::Orm;
use bytes::Bytes;

/// Default amount moved by `transfer`
pub const DEFAULT_AMOUNT: i64 = 100;

/// Moves balance between accounts
///
/// - `init [count]` seeds accounts `0..count` with balance `0`
/// - `transfer [from, to]` or `[from, to, amount]` moves `amount`
///   (default 100); balances may go negative
///
/// Balances are stored as signed decimal strings.
#[derive(Debug, Default)]
pub struct SimpleTransfer;

impl SimpleTransfer {
    fn init(orm: &mut Orm<'_>, args: &[String]) -> ChaincodeResult<()> {
        let count = parse_count("init", args)?;
        tracing::info!(count, "seeding transfer accounts");
        for i in 0..count {
            orm.put(i.to_string(), "0");
        }
        Ok(())
    }

    fn transfer(orm: &mut Orm<'_>, func: &str, args: &[String]) -> ChaincodeResult<()> {
        let (from, to, amount) = match args {
            [from, to] => (from, to, DEFAULT_AMOUNT),
            [from, to, amount] => {
                let amount = amount
                    .parse::<i64>()
                    .map_err(|e| ChaincodeError::invalid_args(func, e.to_string()))?;
                (from, to, amount)
            }
            _ => return Err(ChaincodeError::invalid_args(func, "expected 2 or 3 args")),
        };
        if from == to {
            return Ok(());
        }
        let from_balance = read_balance(orm, from)?;
        let to_balance = read_balance(orm, to)?;
        let from_new = from_balance
            .checked_sub(amount)
            .ok_or_else(|| overflow(from))?;
        let to_new = to_balance.checked_add(amount).ok_or_else(|| overflow(to))?;
        orm.put(from.clone(), from_new.to_string());
        orm.put(to.clone(), to_new.to_string());
        Ok(())
    }
}

impl Chaincode for SimpleTransfer {
    fn invoke(&mut self, orm: &mut Orm<'_>, func: &str, args: &[String]) -> ChaincodeResult<()> {
        match func {
            "init" => Self::init(orm, args),
            "transfer" => Self::transfer(orm, func, args),
            other => Err(ChaincodeError::UnknownFunction(other.to_string())),
        }
    }
}

fn read_balance(orm: &mut Orm<'_>, account: &str) -> ChaincodeResult<i64> {
    let value = orm
        .get(Bytes::copy_from_slice(account.as_bytes()))?
        .ok_or_else(|| ChaincodeError::MissingKey(account.to_string()))?;
    std::str::from_utf8(&value)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ChaincodeError::InvalidValue {
            key: account.to_string(),
            reason: "balance is not a decimal integer".into(),
        })
}

fn overflow(account: &str) -> ChaincodeError {
    ChaincodeError::InvalidValue {
        key: account.to_string(),
        reason: "balance out of range".into(),
    }
}

pub(crate) fn parse_count(func: &str, args: &[String]) -> ChaincodeResult<u64> {
    match args {
        [count] => count
            .parse::<u64>()
            .map_err(|e| ChaincodeError::invalid_args(func, e.to_string())),
        _ => Err(ChaincodeError::invalid_args(func, "expected 1 arg")),
    }
}
