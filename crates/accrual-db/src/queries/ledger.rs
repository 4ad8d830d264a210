//! Token ledger balance queries.
//!
//! The daemon runs against an in-process ledger; its balances are mirrored
//! here so that a restart resumes with the same custody picture.

use rusqlite::{Connection, OptionalExtension};

use accrual_types::{AccountId, Amount};

use crate::codec::{decode_account, decode_amount, encode_amount};
use crate::Result;

/// Store one account balance. Zero balances delete the row.
pub fn set_balance(conn: &Connection, account: &AccountId, amount: &Amount) -> Result<()> {
    if amount.is_zero() {
        conn.execute(
            "DELETE FROM ledger_balances WHERE account = ?1",
            [&account.as_bytes()[..]],
        )?;
    } else {
        conn.execute(
            "INSERT OR REPLACE INTO ledger_balances (account, amount) VALUES (?1, ?2)",
            rusqlite::params![&account.as_bytes()[..], encode_amount(amount)],
        )?;
    }
    Ok(())
}

/// Balance of one account; missing rows read as zero.
pub fn balance(conn: &Connection, account: &AccountId) -> Result<Amount> {
    let text: Option<String> = conn
        .query_row(
            "SELECT amount FROM ledger_balances WHERE account = ?1",
            [&account.as_bytes()[..]],
            |row| row.get(0),
        )
        .optional()?;
    match text {
        Some(t) => decode_amount(&t),
        None => Ok(Amount::zero()),
    }
}

/// Replace every stored balance with `balances`.
pub fn replace_all<'a>(
    conn: &Connection,
    balances: impl IntoIterator<Item = (&'a AccountId, &'a Amount)>,
) -> Result<()> {
    conn.execute("DELETE FROM ledger_balances", [])?;
    for (account, amount) in balances {
        set_balance(conn, account, amount)?;
    }
    Ok(())
}

/// Every non-zero balance, ordered by account.
pub fn list(conn: &Connection) -> Result<Vec<(AccountId, Amount)>> {
    let mut stmt = conn.prepare("SELECT account, amount FROM ledger_balances ORDER BY account")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (account, amount) = row?;
        out.push((decode_account(&account)?, decode_amount(&amount)?));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_lifecycle() {
        let conn = crate::open_memory().expect("open");
        let vault = AccountId::derive("vault");

        assert_eq!(balance(&conn, &vault).expect("empty"), Amount::zero());
        set_balance(&conn, &vault, &Amount::from(500u64)).expect("set");
        assert_eq!(balance(&conn, &vault).expect("get"), Amount::from(500u64));

        set_balance(&conn, &vault, &Amount::zero()).expect("zero");
        assert!(list(&conn).expect("list").is_empty());
    }

    #[test]
    fn test_replace_all() {
        let conn = crate::open_memory().expect("open");
        let a = AccountId::derive("a");
        let b = AccountId::derive("b");
        set_balance(&conn, &a, &Amount::from(1u64)).expect("seed");

        let fresh = [(b, Amount::from(9u64))];
        replace_all(&conn, fresh.iter().map(|(k, v)| (k, v))).expect("replace");
        assert_eq!(list(&conn).expect("list"), vec![(b, Amount::from(9u64))]);
    }
}
