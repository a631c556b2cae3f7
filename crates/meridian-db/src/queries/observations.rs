//! Observation query functions.

use rusqlite::{Connection, OptionalExtension};

use meridian_types::{Observation, TokenId, UFixed};

use crate::{DbError, Result};

/// Get the stored observation for a token, if any.
pub fn get(conn: &Connection, token: &TokenId) -> Result<Option<Observation>> {
    let row = conn
        .query_row(
            "SELECT price, token_liquidity, quote_token_liquidity, timestamp
             FROM observations WHERE token = ?1",
            [token.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((price, token_liquidity, quote_token_liquidity, timestamp)) = row else {
        return Ok(None);
    };

    Ok(Some(Observation::new(
        parse_ufixed(&price)?,
        parse_ufixed(&token_liquidity)?,
        parse_ufixed(&quote_token_liquidity)?,
        u64::try_from(timestamp)
            .map_err(|_| DbError::Serialization(format!("negative timestamp {timestamp}")))?,
    )))
}

/// Replace the stored observation for a token.
pub fn upsert(conn: &Connection, token: &TokenId, observation: &Observation) -> Result<()> {
    let timestamp = i64::try_from(observation.timestamp).map_err(|_| {
        DbError::Serialization(format!("timestamp {} out of range", observation.timestamp))
    })?;
    conn.execute(
        "INSERT OR REPLACE INTO observations
            (token, price, token_liquidity, quote_token_liquidity, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            token.to_string(),
            observation.price.to_string(),
            observation.token_liquidity.to_string(),
            observation.quote_token_liquidity.to_string(),
            timestamp,
        ],
    )?;
    Ok(())
}

/// Tokens with a stored observation.
pub fn list_tokens(conn: &Connection) -> Result<Vec<TokenId>> {
    let mut stmt = conn.prepare("SELECT token FROM observations ORDER BY token")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut tokens = Vec::new();
    for row in rows {
        let text = row?;
        let token = text
            .parse()
            .map_err(|e: meridian_types::TypesError| DbError::Serialization(e.to_string()))?;
        tokens.push(token);
    }
    Ok(tokens)
}

fn parse_ufixed(text: &str) -> Result<UFixed> {
    text.parse()
        .map_err(|e: std::num::ParseIntError| DbError::Serialization(format!("{text:?}: {e}")))
}
