use ansi_term::Colour::Green;
use log::info;
use std::fmt;

use crate::connection::SqlRunner;
use crate::error::{Error, Result};
use crate::ident;

/// The phase of a grant/revoke sequence a statement belongs to. Reported in
/// errors so a failure can be traced back to the exact step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    GrantConnect,
    GrantUsage,
    GrantSelect,
    GrantWrite,
    GrantSequence,
    RevokeTables,
    RevokeSequences,
    RevokeSchema,
    RevokeDatabase,
    RevokeDefaults,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::GrantConnect => "grant-connect",
            Phase::GrantUsage => "grant-usage",
            Phase::GrantSelect => "grant-select",
            Phase::GrantWrite => "grant-write",
            Phase::GrantSequence => "grant-sequence",
            Phase::RevokeTables => "revoke-tables",
            Phase::RevokeSequences => "revoke-sequences",
            Phase::RevokeSchema => "revoke-schema",
            Phase::RevokeDatabase => "revoke-database",
            Phase::RevokeDefaults => "revoke-defaults",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One statement of a grant/revoke plan, tagged with its phase and a
/// human-readable target for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub phase: Phase,
    pub target: String,
    pub sql: String,
}

impl Statement {
    fn new(phase: Phase, target: String, sql: String) -> Self {
        Self { phase, target, sql }
    }
}

/// Validate the targets of a grant or revoke call before any statement is
/// built: safe identifiers everywhere, no reserved role or schema, and at
/// least one schema selected.
fn check_targets(role: &str, database: &str, schemas: &[String]) -> Result<()> {
    ident::validate_identifier(role)?;
    ident::check_role_not_reserved(role)?;
    ident::validate_identifier(database)?;

    if schemas.is_empty() {
        return Err(Error::EmptySelection("schema"));
    }

    for schema in schemas {
        ident::validate_identifier(schema)?;
        ident::check_schema_not_reserved(schema)?;
    }

    Ok(())
}

fn on_database(role: &str, database: &str) -> String {
    format!("role '{}' on database '{}'", role, database)
}

fn on_schema(role: &str, schema: &str) -> String {
    format!("role '{}' on schema '{}'", role, schema)
}

fn connect_statement(role: &str, database: &str) -> Statement {
    Statement::new(
        Phase::GrantConnect,
        on_database(role, database),
        format!("GRANT CONNECT ON DATABASE {} TO {};", database, role),
    )
}

/// Per-schema read statements: USAGE on the schema, SELECT on every current
/// table, and SELECT on future tables as a standing default-privilege rule.
fn read_schema_statements(role: &str, schema: &str) -> Vec<Statement> {
    vec![
        Statement::new(
            Phase::GrantUsage,
            on_schema(role, schema),
            format!("GRANT USAGE ON SCHEMA {} TO {};", schema, role),
        ),
        Statement::new(
            Phase::GrantSelect,
            on_schema(role, schema),
            format!("GRANT SELECT ON ALL TABLES IN SCHEMA {} TO {};", schema, role),
        ),
        Statement::new(
            Phase::GrantSelect,
            on_schema(role, schema),
            format!(
                "ALTER DEFAULT PRIVILEGES IN SCHEMA {} GRANT SELECT ON TABLES TO {};",
                schema, role
            ),
        ),
    ]
}

/// Per-schema write statements: everything read grants, then INSERT/UPDATE/
/// DELETE on current and future tables and USAGE on current and future
/// sequences. Write is always a superset of read.
fn write_schema_statements(role: &str, schema: &str) -> Vec<Statement> {
    let mut statements = read_schema_statements(role, schema);

    statements.push(Statement::new(
        Phase::GrantWrite,
        on_schema(role, schema),
        format!(
            "GRANT INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA {} TO {};",
            schema, role
        ),
    ));
    statements.push(Statement::new(
        Phase::GrantWrite,
        on_schema(role, schema),
        format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA {} GRANT INSERT, UPDATE, DELETE ON TABLES TO {};",
            schema, role
        ),
    ));
    statements.push(Statement::new(
        Phase::GrantSequence,
        on_schema(role, schema),
        format!(
            "GRANT USAGE ON ALL SEQUENCES IN SCHEMA {} TO {};",
            schema, role
        ),
    ));
    statements.push(Statement::new(
        Phase::GrantSequence,
        on_schema(role, schema),
        format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA {} GRANT USAGE ON SEQUENCES TO {};",
            schema, role
        ),
    ));

    statements
}

/// Per-schema revoke statements. Revocation always reverses the broadest
/// grant, whether or not it was ever issued: all privileges on tables,
/// sequences, the schema, the database, then the default-privilege rules.
fn revoke_schema_statements(role: &str, database: &str, schema: &str) -> Vec<Statement> {
    vec![
        Statement::new(
            Phase::RevokeTables,
            on_schema(role, schema),
            format!(
                "REVOKE ALL PRIVILEGES ON ALL TABLES IN SCHEMA {} FROM {};",
                schema, role
            ),
        ),
        Statement::new(
            Phase::RevokeSequences,
            on_schema(role, schema),
            format!(
                "REVOKE ALL PRIVILEGES ON ALL SEQUENCES IN SCHEMA {} FROM {};",
                schema, role
            ),
        ),
        Statement::new(
            Phase::RevokeSchema,
            on_schema(role, schema),
            format!("REVOKE ALL PRIVILEGES ON SCHEMA {} FROM {};", schema, role),
        ),
        Statement::new(
            Phase::RevokeDatabase,
            on_database(role, database),
            format!("REVOKE ALL PRIVILEGES ON DATABASE {} FROM {};", database, role),
        ),
        Statement::new(
            Phase::RevokeDefaults,
            on_schema(role, schema),
            format!(
                "ALTER DEFAULT PRIVILEGES IN SCHEMA {} REVOKE ALL ON TABLES FROM {};",
                schema, role
            ),
        ),
        Statement::new(
            Phase::RevokeDefaults,
            on_schema(role, schema),
            format!(
                "ALTER DEFAULT PRIVILEGES IN SCHEMA {} REVOKE ALL ON SEQUENCES FROM {};",
                schema, role
            ),
        ),
    ]
}

/// Build the read-grant plan: CONNECT on the database once, then USAGE,
/// SELECT and the future-table SELECT rule for every schema in order.
pub fn grant_read_plan(role: &str, database: &str, schemas: &[String]) -> Result<Vec<Statement>> {
    check_targets(role, database, schemas)?;

    let mut plan = vec![connect_statement(role, database)];
    for schema in schemas {
        plan.extend(read_schema_statements(role, schema));
    }

    Ok(plan)
}

/// Build the write-grant plan. Issues every statement the read plan would,
/// in the same order, before any write statement per schema.
pub fn grant_write_plan(role: &str, database: &str, schemas: &[String]) -> Result<Vec<Statement>> {
    check_targets(role, database, schemas)?;

    let mut plan = vec![connect_statement(role, database)];
    for schema in schemas {
        plan.extend(write_schema_statements(role, schema));
    }

    Ok(plan)
}

/// Build the revoke-all plan: the full per-schema revoke sequence for every
/// schema in order.
pub fn revoke_all_plan(role: &str, database: &str, schemas: &[String]) -> Result<Vec<Statement>> {
    check_targets(role, database, schemas)?;

    let mut plan = Vec::new();
    for schema in schemas {
        plan.extend(revoke_schema_statements(role, database, schema));
    }

    Ok(plan)
}

/// Execute a plan in order. The first failing statement aborts the rest and
/// is reported with its phase and target.
pub fn execute_statements(runner: &mut dyn SqlRunner, plan: &[Statement]) -> Result<()> {
    for statement in plan {
        runner.run(&statement.sql).map_err(|cause| Error::Statement {
            phase: statement.phase.as_str(),
            target: statement.target.clone(),
            cause,
        })?;

        info!("{}: {}", Green.paint("Success"), statement.sql);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    /// Records every statement it is asked to run, optionally failing at a
    /// given position.
    struct MockRunner {
        executed: Vec<String>,
        fail_on: Option<usize>,
    }

    impl MockRunner {
        fn new() -> Self {
            Self {
                executed: vec![],
                fail_on: None,
            }
        }

        fn failing_on(index: usize) -> Self {
            Self {
                executed: vec![],
                fail_on: Some(index),
            }
        }
    }

    impl SqlRunner for MockRunner {
        fn run(&mut self, sql: &str) -> anyhow::Result<u64> {
            if self.fail_on == Some(self.executed.len()) {
                return Err(anyhow!("boom"));
            }
            self.executed.push(sql.to_string());

            Ok(0)
        }
    }

    fn schemas(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_grant_read_plan_single_schema_sql() {
        let plan = grant_read_plan("analyst", "warehouse", &schemas(&["public"])).unwrap();

        let sqls: Vec<&str> = plan.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sqls,
            vec![
                "GRANT CONNECT ON DATABASE warehouse TO analyst;",
                "GRANT USAGE ON SCHEMA public TO analyst;",
                "GRANT SELECT ON ALL TABLES IN SCHEMA public TO analyst;",
                "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT SELECT ON TABLES TO analyst;",
            ]
        );
        assert_eq!(plan[0].phase, Phase::GrantConnect);
        assert_eq!(plan[1].phase, Phase::GrantUsage);
    }

    #[test]
    fn test_grant_write_plan_single_schema_sql() {
        let plan = grant_write_plan("etl", "warehouse", &schemas(&["staging"])).unwrap();

        let sqls: Vec<&str> = plan.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sqls,
            vec![
                "GRANT CONNECT ON DATABASE warehouse TO etl;",
                "GRANT USAGE ON SCHEMA staging TO etl;",
                "GRANT SELECT ON ALL TABLES IN SCHEMA staging TO etl;",
                "ALTER DEFAULT PRIVILEGES IN SCHEMA staging GRANT SELECT ON TABLES TO etl;",
                "GRANT INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA staging TO etl;",
                "ALTER DEFAULT PRIVILEGES IN SCHEMA staging GRANT INSERT, UPDATE, DELETE ON TABLES TO etl;",
                "GRANT USAGE ON ALL SEQUENCES IN SCHEMA staging TO etl;",
                "ALTER DEFAULT PRIVILEGES IN SCHEMA staging GRANT USAGE ON SEQUENCES TO etl;",
            ]
        );
    }

    #[test]
    fn test_revoke_all_plan_single_schema_sql() {
        let plan = revoke_all_plan("analyst", "warehouse", &schemas(&["public"])).unwrap();

        let sqls: Vec<&str> = plan.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sqls,
            vec![
                "REVOKE ALL PRIVILEGES ON ALL TABLES IN SCHEMA public FROM analyst;",
                "REVOKE ALL PRIVILEGES ON ALL SEQUENCES IN SCHEMA public FROM analyst;",
                "REVOKE ALL PRIVILEGES ON SCHEMA public FROM analyst;",
                "REVOKE ALL PRIVILEGES ON DATABASE warehouse FROM analyst;",
                "ALTER DEFAULT PRIVILEGES IN SCHEMA public REVOKE ALL ON TABLES FROM analyst;",
                "ALTER DEFAULT PRIVILEGES IN SCHEMA public REVOKE ALL ON SEQUENCES FROM analyst;",
            ]
        );
    }

    /// The write plan issues every statement of the read plan, in the same
    /// relative order, as a subsequence.
    #[test]
    fn test_write_plan_is_superset_of_read_plan() {
        let targets = schemas(&["public", "staging"]);
        let read = grant_read_plan("analyst", "warehouse", &targets).unwrap();
        let write = grant_write_plan("analyst", "warehouse", &targets).unwrap();

        assert!(write.len() > read.len());

        let mut write_iter = write.iter();
        for statement in &read {
            assert!(
                write_iter.any(|w| w.sql == statement.sql),
                "read statement missing from write plan: {}",
                statement.sql
            );
        }
    }

    /// Multi-schema plans match the concatenation of single-schema plans,
    /// except CONNECT is issued exactly once for grants.
    #[test]
    fn test_multi_schema_grant_matches_sequential_single_schema() {
        let multi = grant_read_plan("analyst", "warehouse", &schemas(&["s1", "s2"])).unwrap();

        let single_1 = grant_read_plan("analyst", "warehouse", &schemas(&["s1"])).unwrap();
        let single_2 = grant_read_plan("analyst", "warehouse", &schemas(&["s2"])).unwrap();

        let mut expected = single_1;
        // drop the second CONNECT, it is shared in the multi-schema case
        expected.extend(single_2.into_iter().skip(1));

        assert_eq!(multi, expected);
        assert_eq!(
            multi
                .iter()
                .filter(|s| s.phase == Phase::GrantConnect)
                .count(),
            1
        );
    }

    #[test]
    fn test_multi_schema_revoke_matches_sequential_single_schema() {
        let multi = revoke_all_plan("analyst", "warehouse", &schemas(&["s1", "s2"])).unwrap();

        let mut expected = revoke_all_plan("analyst", "warehouse", &schemas(&["s1"])).unwrap();
        expected.extend(revoke_all_plan("analyst", "warehouse", &schemas(&["s2"])).unwrap());

        assert_eq!(multi, expected);
    }

    #[test]
    fn test_reserved_role_is_rejected() {
        for plan in [
            grant_read_plan("pg_monitor", "warehouse", &schemas(&["public"])),
            grant_write_plan("rds_superuser", "warehouse", &schemas(&["public"])),
            revoke_all_plan("pg_monitor", "warehouse", &schemas(&["public"])),
        ] {
            assert!(matches!(plan, Err(Error::ReservedName(_))));
        }
    }

    #[test]
    fn test_reserved_schema_is_rejected() {
        let plan = grant_read_plan("analyst", "warehouse", &schemas(&["information_schema"]));
        assert!(matches!(plan, Err(Error::ReservedName(_))));

        let plan = grant_read_plan("analyst", "warehouse", &schemas(&["pg_temp"]));
        assert!(matches!(plan, Err(Error::ReservedName(_))));
    }

    /// Only roles reserve the rds_ prefix. A schema like rds_tools is a
    /// regular user schema and a valid grant target.
    #[test]
    fn test_rds_prefixed_schema_is_a_valid_target() {
        let plan = grant_read_plan("analyst", "warehouse", &schemas(&["rds_tools"])).unwrap();

        assert!(plan
            .iter()
            .any(|s| s.sql == "GRANT USAGE ON SCHEMA rds_tools TO analyst;"));
    }

    #[test]
    fn test_unsafe_identifiers_are_rejected() {
        let plan = grant_read_plan("analyst; DROP TABLE x", "warehouse", &schemas(&["public"]));
        assert!(matches!(plan, Err(Error::InvalidIdentifier(_))));

        let plan = grant_read_plan("analyst", "ware-house", &schemas(&["public"]));
        assert!(matches!(plan, Err(Error::InvalidIdentifier(_))));
    }

    #[test]
    fn test_empty_schema_selection_is_rejected() {
        let plan = grant_read_plan("analyst", "warehouse", &[]);
        assert!(matches!(plan, Err(Error::EmptySelection("schema"))));
    }

    #[test]
    fn test_execute_statements_runs_in_order() {
        let plan = grant_read_plan("analyst", "warehouse", &schemas(&["public"])).unwrap();

        let mut runner = MockRunner::new();
        execute_statements(&mut runner, &plan).unwrap();

        let expected: Vec<String> = plan.iter().map(|s| s.sql.clone()).collect();
        assert_eq!(runner.executed, expected);
    }

    #[test]
    fn test_execute_statements_halts_on_failure() {
        let plan = grant_write_plan("etl", "warehouse", &schemas(&["staging"])).unwrap();

        let mut runner = MockRunner::failing_on(2);
        let err = execute_statements(&mut runner, &plan).unwrap_err();

        // the first two statements ran, nothing after the failure did
        assert_eq!(runner.executed.len(), 2);
        match err {
            Error::Statement { phase, target, .. } => {
                assert_eq!(phase, "grant-select");
                assert!(target.contains("etl"));
                assert!(target.contains("staging"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
