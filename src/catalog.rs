//! Read-only queries over pg_catalog and information_schema. The database is
//! the sole source of truth: nothing here is cached between calls.

use anyhow::{anyhow, Context, Result};
use indoc::indoc;

use crate::connection::DbConnection;
use crate::ident;
use crate::report::{
    ColumnGrant, DatabaseGrant, PermissionReport, Role, SchemaGrant, TableGrant,
};

const ROLE_QUERY: &str = indoc! {r#"
    SELECT
        rolname,
        rolsuper,
        rolcreaterole,
        rolcreatedb,
        rolcanlogin
    FROM pg_roles
    WHERE rolcanlogin = $1
    ORDER BY rolname
"#};

fn role_from_row(row: &postgres::row::Row) -> Role {
    Role {
        name: row.get("rolname"),
        is_superuser: row.get("rolsuper"),
        can_create_role: row.get("rolcreaterole"),
        can_create_db: row.get("rolcreatedb"),
        can_login: row.get("rolcanlogin"),
    }
}

fn list_roles_by_login(
    conn: &mut DbConnection,
    can_login: bool,
    include_system: bool,
) -> Result<Vec<Role>> {
    let rows = conn
        .query(ROLE_QUERY, &[&can_login])
        .context("failed to list roles")?;

    Ok(rows
        .iter()
        .map(role_from_row)
        .filter(|r| include_system || !r.is_system())
        .collect())
}

/// All group roles (login disabled), ordered by name. System roles (pg_*,
/// rds_*) are hidden unless `include_system`.
pub fn roles(conn: &mut DbConnection, include_system: bool) -> Result<Vec<Role>> {
    list_roles_by_login(conn, false, include_system)
}

/// All users (login enabled), ordered by name.
pub fn users(conn: &mut DbConnection, include_system: bool) -> Result<Vec<Role>> {
    list_roles_by_login(conn, true, include_system)
}

/// Schema names in the current database. `pg_*` and information_schema are
/// hidden unless `include_system`.
pub fn schemas(conn: &mut DbConnection, include_system: bool) -> Result<Vec<String>> {
    let rows = conn
        .query("SELECT nspname FROM pg_namespace ORDER BY nspname", &[])
        .context("failed to list schemas")?;

    Ok(rows
        .iter()
        .map(|row| row.get::<_, String>("nspname"))
        .filter(|name| include_system || !ident::is_reserved_schema(name))
        .collect())
}

/// Roles the given role is a member of (its parent roles), ordered by name.
pub fn memberships(conn: &mut DbConnection, role: &str) -> Result<Vec<String>> {
    let sql = indoc! {r#"
        SELECT parent.rolname
        FROM pg_auth_members am
        JOIN pg_roles member ON am.member = member.oid
        JOIN pg_roles parent ON am.roleid = parent.oid
        WHERE member.rolname = $1
        ORDER BY parent.rolname
    "#};

    let rows = conn
        .query(sql, &[&role])
        .with_context(|| format!("failed to list memberships of '{}'", role))?;

    Ok(rows.iter().map(|row| row.get("rolname")).collect())
}

/// The attribute snapshot of one role. Errors when the role does not exist.
pub fn role_attributes(conn: &mut DbConnection, role: &str) -> Result<Role> {
    let sql = indoc! {r#"
        SELECT
            rolname,
            rolsuper,
            rolcreaterole,
            rolcreatedb,
            rolcanlogin
        FROM pg_roles
        WHERE rolname = $1
    "#};

    let rows = conn
        .query(sql, &[&role])
        .with_context(|| format!("failed to read attributes of '{}'", role))?;

    rows.first()
        .map(role_from_row)
        .ok_or_else(|| anyhow!("role '{}' does not exist", role))
}

fn table_grants(conn: &mut DbConnection, role: &str) -> Result<Vec<TableGrant>> {
    let sql = indoc! {r#"
        SELECT table_schema, table_name, privilege_type
        FROM information_schema.role_table_grants
        WHERE grantee = $1
        ORDER BY table_schema, table_name, privilege_type
    "#};

    let rows = conn
        .query(sql, &[&role])
        .with_context(|| format!("failed to read table grants of '{}'", role))?;

    Ok(rows
        .iter()
        .map(|row| TableGrant {
            schema: row.get("table_schema"),
            table: row.get("table_name"),
            privilege: row.get("privilege_type"),
        })
        .collect())
}

fn column_grants(conn: &mut DbConnection, role: &str) -> Result<Vec<ColumnGrant>> {
    let sql = indoc! {r#"
        SELECT table_schema, table_name, column_name, privilege_type
        FROM information_schema.role_column_grants
        WHERE grantee = $1
        ORDER BY table_schema, table_name, column_name, privilege_type
    "#};

    let rows = conn
        .query(sql, &[&role])
        .with_context(|| format!("failed to read column grants of '{}'", role))?;

    Ok(rows
        .iter()
        .map(|row| ColumnGrant {
            schema: row.get("table_schema"),
            table: row.get("table_name"),
            column: row.get("column_name"),
            privilege: row.get("privilege_type"),
        })
        .collect())
}

fn schema_grants(conn: &mut DbConnection, role: &str) -> Result<Vec<SchemaGrant>> {
    let sql = indoc! {r#"
        SELECT
            nspname,
            has_schema_privilege($1, nspname, 'usage') AS has_usage,
            has_schema_privilege($1, nspname, 'create') AS has_create
        FROM pg_namespace
        WHERE nspname NOT LIKE 'pg\_%' AND nspname != 'information_schema'
        ORDER BY nspname
    "#};

    let rows = conn
        .query(sql, &[&role])
        .with_context(|| format!("failed to read schema grants of '{}'", role))?;

    Ok(rows
        .iter()
        .map(|row| SchemaGrant {
            schema: row.get("nspname"),
            has_usage: row.get("has_usage"),
            has_create: row.get("has_create"),
        })
        .collect())
}

fn database_grants(conn: &mut DbConnection, role: &str) -> Result<Vec<DatabaseGrant>> {
    let sql = indoc! {r#"
        SELECT
            datname,
            has_database_privilege($1, datname, 'connect') AS has_connect,
            has_database_privilege($1, datname, 'create') AS has_create,
            has_database_privilege($1, datname, 'temp') AS has_temp
        FROM pg_database
        WHERE NOT datistemplate
        ORDER BY datname
    "#};

    let rows = conn
        .query(sql, &[&role])
        .with_context(|| format!("failed to read database grants of '{}'", role))?;

    Ok(rows
        .iter()
        .map(|row| DatabaseGrant {
            database: row.get("datname"),
            has_connect: row.get("has_connect"),
            has_create: row.get("has_create"),
            has_temp: row.get("has_temp"),
        })
        .collect())
}

/// Build the full permission report for one role from six independent
/// catalog reads. Any failing sub-query aborts the whole report, there are
/// no partial reports.
pub fn permission_report(conn: &mut DbConnection, role: &str) -> Result<PermissionReport> {
    let attributes = role_attributes(conn, role)?;

    Ok(PermissionReport {
        table_grants: table_grants(conn, role)?,
        column_grants: column_grants(conn, role)?,
        schema_grants: schema_grants(conn, role)?,
        database_grants: database_grants(conn, role)?,
        member_of: memberships(conn, role)?,
        role: attributes,
    })
}
