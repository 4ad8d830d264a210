//! Reward source state queries.
//!
//! Source implementations own their own state shape; it is stored as a JSON
//! document in a single row.

use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{DbError, Result};

/// Store the source state.
pub fn save<S: Serialize>(conn: &Connection, source: &S) -> Result<()> {
    let json =
        serde_json::to_string(source).map_err(|e| DbError::Serialization(e.to_string()))?;
    conn.execute(
        "INSERT OR REPLACE INTO reward_source (id, state_json) VALUES (1, ?1)",
        [json],
    )?;
    Ok(())
}

/// Load the source state, if any was saved.
pub fn load<S: DeserializeOwned>(conn: &Connection) -> Result<Option<S>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT state_json FROM reward_source WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    json.map(|j| serde_json::from_str(&j).map_err(|e| DbError::Serialization(e.to_string())))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrual_engine::FixedRateDripper;
    use accrual_types::{AccountId, Amount, TokenId};

    #[test]
    fn test_dripper_roundtrip() {
        let conn = crate::open_memory().expect("open");
        assert!(load::<FixedRateDripper>(&conn).expect("empty").is_none());

        let dripper = FixedRateDripper::new(
            TokenId::derive("reward"),
            AccountId::derive("source"),
            Amount::from(25u64),
            100,
        );
        save(&conn, &dripper).expect("save");
        let loaded: FixedRateDripper = load(&conn).expect("load").expect("present");
        assert_eq!(loaded, dripper);
    }

    #[test]
    fn test_corrupt_state() {
        let conn = crate::open_memory().expect("open");
        conn.execute(
            "INSERT INTO reward_source (id, state_json) VALUES (1, 'not json')",
            [],
        )
        .expect("seed");
        assert!(matches!(
            load::<FixedRateDripper>(&conn),
            Err(DbError::Serialization(_))
        ));
    }
}
