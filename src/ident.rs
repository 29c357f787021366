use crate::error::{Error, Result};

/// Prefixes of roles managed by PostgreSQL itself or by RDS. Anything
/// matching these must never be created, altered or dropped by us.
const RESERVED_ROLE_PREFIXES: &[&str] = &["pg_", "rds_"];

/// Returns true for role names owned by the system.
pub fn is_reserved_role(name: &str) -> bool {
    RESERVED_ROLE_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Returns true for schema names owned by the system. Schemas reserve only
/// the `pg_` prefix and information_schema, an `rds_` schema is a regular
/// user schema.
pub fn is_reserved_schema(name: &str) -> bool {
    name.starts_with("pg_") || name == "information_schema"
}

/// Fail with [`Error::ReservedName`] when the target role is system-owned.
pub fn check_role_not_reserved(name: &str) -> Result<()> {
    if is_reserved_role(name) {
        return Err(Error::ReservedName(name.to_string()));
    }

    Ok(())
}

/// Fail with [`Error::ReservedName`] when the target schema is system-owned.
pub fn check_schema_not_reserved(name: &str) -> Result<()> {
    if is_reserved_schema(name) {
        return Err(Error::ReservedName(name.to_string()));
    }

    Ok(())
}

/// Role, database and schema names are interpolated into statements as bare
/// identifiers, so they must match a strict allow-list: letters, digits and
/// underscores, not starting with a digit.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();

    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if !valid {
        return Err(Error::InvalidIdentifier(name.to_string()));
    }

    Ok(())
}

/// Quote a password (or any other data value) as a SQL string literal.
/// `ALTER ROLE ... PASSWORD` cannot take a bind parameter, so the literal
/// has to be escaped by doubling single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
