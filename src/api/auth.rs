use diesel::prelude::*;
use diesel::result::Error;

use crate::schema::users;
use crate::DbConnection;

pub const TOKEN_LENGTH: usize = 32;

/// Tokens are minted from `Alphanumeric`, so anything else is rejected
/// before it reaches the database.
pub fn is_token(token: &str) -> bool {
    token.chars().all(|ch| ch.is_ascii_alphanumeric()) && token.len() == TOKEN_LENGTH
}

pub fn get_user_id(connection: &mut DbConnection, token: &str) -> Result<Option<i64>, Error> {
    if !is_token(token) {
        return Ok(None);
    }
    let user_id: Option<i64> = users::table
        .filter(users::token.eq(token))
        .select(users::id)
        .first(connection)
        .optional()?;
    Ok(user_id)
}

/// The explicit caller identity: an optional token from the request, an
/// optional user id out. Absent or unknown tokens mean an anonymous viewer.
pub fn resolve_viewer(
    connection: &mut DbConnection,
    token: Option<&str>,
) -> Result<Option<i64>, Error> {
    match token {
        Some(token) => get_user_id(connection, token),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_token_checks_length_and_charset() {
        assert!(is_token("AbCdEfGh12345678AbCdEfGh12345678"));
        assert!(!is_token("AbCdEfGh12345678AbCdEfGh1234567"));
        assert!(!is_token("AbCdEfGh12345678AbCdEfGh123456789"));
        assert!(!is_token("AbCdEfGh12345678AbCdEfGh1234567!"));
        assert!(!is_token(""));
    }
}
