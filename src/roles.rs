//! Role and user administration: create, drop, passwords and memberships.
//! Every mutation validates its identifiers and the reserved-name guard
//! before a single statement is sent.

use log::debug;
use rand::Rng;

use crate::connection::SqlRunner;
use crate::error::{Error, Result};
use crate::ident;

const PASSWORD_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                                  abcdefghijklmnopqrstuvwxyz\
                                  0123456789)(*&^%$#@!~";

fn check_target(name: &str) -> Result<()> {
    ident::validate_identifier(name)?;
    ident::check_role_not_reserved(name)?;

    Ok(())
}

fn run(runner: &mut dyn SqlRunner, phase: &'static str, target: &str, sql: &str) -> Result<()> {
    runner.run(sql).map_err(|cause| Error::Statement {
        phase,
        target: target.to_string(),
        cause,
    })?;

    Ok(())
}

/// Create a group role (no login).
pub fn create_role(runner: &mut dyn SqlRunner, name: &str) -> Result<()> {
    check_target(name)?;

    let sql = format!("CREATE ROLE {};", name);
    run(runner, "create-role", name, &sql)
}

/// Create a login user with the given password.
pub fn create_user(runner: &mut dyn SqlRunner, name: &str, password: &str) -> Result<()> {
    check_target(name)?;

    let sql = format!(
        "CREATE USER {} WITH PASSWORD {};",
        name,
        ident::quote_literal(password)
    );
    debug!("create user: {}", name); // never log the statement, it holds the password
    run(runner, "create-user", name, &sql)
}

/// Change a user's password. With `use_md5` the password is stored in the
/// PostgreSQL md5 format: "md5" followed by hex md5(password ‖ username).
pub fn update_password(
    runner: &mut dyn SqlRunner,
    name: &str,
    password: &str,
    use_md5: bool,
) -> Result<()> {
    check_target(name)?;

    let literal = if use_md5 {
        ident::quote_literal(&md5_password(name, password))
    } else {
        ident::quote_literal(password)
    };

    let sql = format!("ALTER ROLE {} WITH PASSWORD {};", name, literal);
    debug!("update password: {}", name);
    run(runner, "alter-password", name, &sql)
}

/// Drop a group role.
pub fn drop_role(runner: &mut dyn SqlRunner, name: &str) -> Result<()> {
    check_target(name)?;

    let sql = format!("DROP ROLE IF EXISTS {};", name);
    run(runner, "drop-role", name, &sql)
}

/// Drop a user.
pub fn drop_user(runner: &mut dyn SqlRunner, name: &str) -> Result<()> {
    check_target(name)?;

    let sql = format!("DROP USER IF EXISTS {};", name);
    run(runner, "drop-user", name, &sql)
}

/// Make `user` a member of `role`.
pub fn assign(runner: &mut dyn SqlRunner, user: &str, role: &str) -> Result<()> {
    check_target(user)?;
    check_target(role)?;

    let sql = format!("GRANT {} TO {};", role, user);
    let target = format!("user '{}' in role '{}'", user, role);
    run(runner, "grant-role", &target, &sql)
}

/// Remove `user` from `role`.
pub fn unassign(runner: &mut dyn SqlRunner, user: &str, role: &str) -> Result<()> {
    check_target(user)?;
    check_target(role)?;

    let sql = format!("REVOKE {} FROM {};", role, user);
    let target = format!("user '{}' in role '{}'", user, role);
    run(runner, "revoke-role", &target, &sql)
}

/// Generate a random password of the given length (at least 4) that always
/// contains an uppercase letter, a digit and a special character.
pub fn gen_password(length: u8) -> String {
    let length = length.max(4);
    let mut rng = rand::thread_rng();

    loop {
        let password: String = (0..length)
            .map(|_| {
                let idx = rng.gen_range(0..PASSWORD_CHARSET.len());
                PASSWORD_CHARSET[idx] as char
            })
            .collect();

        if password.chars().any(|c| c.is_ascii_uppercase())
            && password.chars().any(|c| c.is_ascii_digit())
            && password.chars().any(|c| !c.is_ascii_alphanumeric())
        {
            return password;
        }
    }
}

/// PostgreSQL md5 password hash: "md5" + hex md5(password ‖ username).
pub fn md5_password(user: &str, password: &str) -> String {
    format!("md5{:x}", md5::compute(format!("{}{}", password, user)))
}
