use std::collections::{BTreeMap, BTreeSet};

/// A role as read from pg_roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub can_login: bool,
    pub is_superuser: bool,
    pub can_create_role: bool,
    pub can_create_db: bool,
}

impl Role {
    /// System-owned roles (pg_*, rds_*) are listed but never modified.
    pub fn is_system(&self) -> bool {
        crate::ident::is_reserved_role(&self.name)
    }
}

/// One table-level privilege row, as reported by
/// information_schema.role_table_grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGrant {
    pub schema: String,
    pub table: String,
    pub privilege: String,
}

/// One column-level privilege row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGrant {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub privilege: String,
}

/// USAGE/CREATE capability on one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaGrant {
    pub schema: String,
    pub has_usage: bool,
    pub has_create: bool,
}

/// CONNECT/CREATE/TEMP capability on one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseGrant {
    pub database: String,
    pub has_connect: bool,
    pub has_create: bool,
    pub has_temp: bool,
}

/// Everything known about one role's effective privileges, built fresh per
/// request from live catalog reads and discarded after display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionReport {
    pub role: Role,
    pub table_grants: Vec<TableGrant>,
    pub column_grants: Vec<ColumnGrant>,
    pub schema_grants: Vec<SchemaGrant>,
    pub database_grants: Vec<DatabaseGrant>,
    pub member_of: Vec<String>,
}

const WRITE_PRIVILEGES: &[&str] = &["INSERT", "UPDATE", "DELETE"];

impl PermissionReport {
    /// Table privileges grouped by `schema.table`, privilege kinds
    /// deduplicated per object.
    pub fn tables_by_object(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for grant in &self.table_grants {
            grouped
                .entry(format!("{}.{}", grant.schema, grant.table))
                .or_default()
                .insert(grant.privilege.clone());
        }

        grouped
    }

    /// Column privileges grouped by `schema.table`, with the privilege kind
    /// and column joined so one object shows all its column grants.
    pub fn columns_by_object(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for grant in &self.column_grants {
            grouped
                .entry(format!("{}.{}", grant.schema, grant.table))
                .or_default()
                .insert(format!("{} ({})", grant.privilege, grant.column));
        }

        grouped
    }

    /// Any SELECT at table or column level.
    pub fn has_read(&self) -> bool {
        self.table_grants.iter().any(|g| g.privilege == "SELECT")
            || self.column_grants.iter().any(|g| g.privilege == "SELECT")
    }

    /// Any INSERT, UPDATE or DELETE at table or column level.
    pub fn has_write(&self) -> bool {
        self.table_grants
            .iter()
            .any(|g| WRITE_PRIVILEGES.contains(&g.privilege.as_str()))
            || self
                .column_grants
                .iter()
                .any(|g| WRITE_PRIVILEGES.contains(&g.privilege.as_str()))
    }

    /// Superuser, create-db or create-role.
    pub fn has_admin(&self) -> bool {
        self.role.is_superuser || self.role.can_create_db || self.role.can_create_role
    }

    /// Distinct tables with at least one table-level grant.
    pub fn table_count(&self) -> usize {
        self.table_grants
            .iter()
            .map(|g| (g.schema.as_str(), g.table.as_str()))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Distinct columns with at least one column-level grant.
    pub fn column_count(&self) -> usize {
        self.column_grants
            .iter()
            .map(|g| (g.schema.as_str(), g.table.as_str(), g.column.as_str()))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Table grants restricted to one schema, for the grant-then-revoke
    /// round-trip checks.
    pub fn table_grants_in_schema(&self, schema: &str) -> Vec<&TableGrant> {
        self.table_grants
            .iter()
            .filter(|g| g.schema == schema)
            .collect()
    }
}
