use ansi_term::Colour::{Green, Red};
use anyhow::Result;
use ascii_table::AsciiTable;
use indoc::indoc;
use log::info;

use crate::catalog;
use crate::connection::DbConnection;
use crate::report::{PermissionReport, Role};

fn yes_no(value: bool) -> String {
    if value {
        Green.paint("yes").to_string()
    } else {
        "no".to_string()
    }
}

fn table() -> AsciiTable {
    let term_width = term_size::dimensions().map(|(w, _)| w).unwrap_or(120) - 5;

    let mut table = AsciiTable::default();
    table.set_max_width(term_width);

    table
}

/// Render a listing of roles or users with their attributes.
pub fn render_roles(kind: &str, roles: &[Role]) {
    let mut rows = vec![
        vec![
            "Name".to_string(),
            "Login".to_string(),
            "Superuser".to_string(),
            "Create Role".to_string(),
            "Create DB".to_string(),
        ],
        vec!["---".to_string(); 5],
    ];

    for role in roles {
        rows.push(vec![
            role.name.clone(),
            yes_no(role.can_login),
            yes_no(role.is_superuser),
            yes_no(role.can_create_role),
            yes_no(role.can_create_db),
        ]);
    }

    info!("{} ({}):\n{}", kind, roles.len(), table().format(rows));
}

/// Build the permission report for one role and render it section by
/// section: attributes, databases, schemas, tables, columns, memberships
/// and the summary flags.
pub fn inspect_role(conn: &mut DbConnection, role: &str) -> Result<()> {
    let report = catalog::permission_report(conn, role)?;

    render_attributes(&report);
    render_database_grants(&report);
    render_schema_grants(&report);
    render_table_grants(&report);
    render_column_grants(&report);
    render_memberships(&report);
    render_summary(&report);

    Ok(())
}

fn render_attributes(report: &PermissionReport) {
    let role = &report.role;
    let rows = vec![
        vec![
            "Role".to_string(),
            "Login".to_string(),
            "Superuser".to_string(),
            "Create Role".to_string(),
            "Create DB".to_string(),
        ],
        vec!["---".to_string(); 5],
        vec![
            role.name.clone(),
            yes_no(role.can_login),
            yes_no(role.is_superuser),
            yes_no(role.can_create_role),
            yes_no(role.can_create_db),
        ],
    ];

    info!("Role attributes:\n{}", table().format(rows));
}

fn render_database_grants(report: &PermissionReport) {
    let mut rows = vec![
        vec![
            "Database".to_string(),
            "Connect".to_string(),
            "Create".to_string(),
            "Temp".to_string(),
        ],
        vec!["---".to_string(); 4],
    ];

    // only databases where the role can do anything at all
    for grant in report
        .database_grants
        .iter()
        .filter(|g| g.has_connect || g.has_create || g.has_temp)
    {
        rows.push(vec![
            grant.database.clone(),
            yes_no(grant.has_connect),
            yes_no(grant.has_create),
            yes_no(grant.has_temp),
        ]);
    }

    info!("Database privileges:\n{}", table().format(rows));
}

fn render_schema_grants(report: &PermissionReport) {
    let mut rows = vec![
        vec![
            "Schema".to_string(),
            "Usage".to_string(),
            "Create".to_string(),
        ],
        vec!["---".to_string(); 3],
    ];

    for grant in report
        .schema_grants
        .iter()
        .filter(|g| g.has_usage || g.has_create)
    {
        rows.push(vec![
            grant.schema.clone(),
            yes_no(grant.has_usage),
            yes_no(grant.has_create),
        ]);
    }

    info!("Schema privileges:\n{}", table().format(rows));
}

fn render_table_grants(report: &PermissionReport) {
    let mut rows = vec![
        vec!["Table".to_string(), "Privileges".to_string()],
        vec!["---".to_string(); 2],
    ];

    for (object, privileges) in report.tables_by_object() {
        rows.push(vec![
            object,
            privileges.into_iter().collect::<Vec<_>>().join(", "),
        ]);
    }

    info!("Table privileges:\n{}", table().format(rows));
}

fn render_column_grants(report: &PermissionReport) {
    let grouped = report.columns_by_object();
    if grouped.is_empty() {
        return;
    }

    let mut rows = vec![
        vec!["Table".to_string(), "Column privileges".to_string()],
        vec!["---".to_string(); 2],
    ];

    for (object, privileges) in grouped {
        rows.push(vec![
            object,
            privileges.into_iter().collect::<Vec<_>>().join(", "),
        ]);
    }

    info!("Column privileges:\n{}", table().format(rows));
}

fn render_memberships(report: &PermissionReport) {
    if report.member_of.is_empty() {
        info!("Member of: (none)");
        return;
    }

    info!("Member of: {}", report.member_of.join(", "));
}

fn render_summary(report: &PermissionReport) {
    let flag = |set: bool| {
        if set {
            Green.paint("true").to_string()
        } else {
            Red.paint("false").to_string()
        }
    };

    info!(
        indoc! {"
            Summary for {}:
              read:  {}
              write: {}
              admin: {}
              tables with grants: {}
              columns with grants: {}
        "},
        report.role.name,
        flag(report.has_read()),
        flag(report.has_write()),
        flag(report.has_admin()),
        report.table_count(),
        report.column_count(),
    );
}
