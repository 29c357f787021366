use ansi_term::Colour::{Purple, Red};
use anyhow::{anyhow, Result};
use dialoguer::Confirm;
use env_logger::Env;
use log::{error, info};

use pgroles::cli::{self, Cli, Command};
use pgroles::connection::DbConnection;
use pgroles::grant::Statement;
use pgroles::{catalog, config, grant, inspect, roles};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(err) = run(cli::parse()) {
        error!("{}: {:#}", Red.paint("Error"), err);
        std::process::exit(1);
    }
}

fn connect(cli: &Cli) -> Result<DbConnection> {
    let connection = config::resolve_connection(cli.conn.as_deref(), cli.config.as_deref())?;
    let conn = DbConnection::new(&connection)?;

    info!("Connected to database: {}", conn.connection_info());

    Ok(conn)
}

/// Ask before destructive commands, unless --yes was passed.
fn confirmed(action: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }

    let confirmed = Confirm::new()
        .with_prompt(format!("{}. Are you sure?", action))
        .default(false)
        .interact()?;

    if !confirmed {
        info!("Aborted");
    }

    Ok(confirmed)
}

fn default_public(schemas: Vec<String>) -> Vec<String> {
    if schemas.is_empty() {
        vec!["public".to_string()]
    } else {
        schemas
    }
}

/// Apply a grant/revoke plan, or just print it for a dry run. A dry run
/// never connects.
fn apply_plan(cli: &Cli, plan: &[Statement], dryrun: bool) -> Result<()> {
    if dryrun {
        for statement in plan {
            info!("{}: {}", Purple.paint("Dry-run"), statement.sql);
        }
        return Ok(());
    }

    let mut conn = connect(cli)?;
    conn.apply(plan)?;

    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match &cli.cmd {
        Command::ListUsers { include_system } => {
            let mut conn = connect(&cli)?;
            let users = catalog::users(&mut conn, *include_system)?;
            inspect::render_roles("Users", &users);
        }

        Command::ListRoles { include_system } => {
            let mut conn = connect(&cli)?;
            let roles = catalog::roles(&mut conn, *include_system)?;
            inspect::render_roles("Roles", &roles);
        }

        Command::ListSchemas { include_system } => {
            let mut conn = connect(&cli)?;
            let schemas = catalog::schemas(&mut conn, *include_system)?;
            for schema in &schemas {
                println!("{}", schema);
            }
        }

        Command::ListUserRoles { name } => {
            let mut conn = connect(&cli)?;
            let memberships = catalog::memberships(&mut conn, name)?;
            if memberships.is_empty() {
                info!("'{}' is not a member of any role", name);
            } else {
                info!("'{}' is a member of: {}", name, memberships.join(", "));
            }
        }

        Command::CreateUser { name, password } => {
            let mut conn = connect(&cli)?;
            let generated = password.is_none();
            let password = password.clone().unwrap_or_else(|| roles::gen_password(16));

            roles::create_user(&mut conn, name, &password)?;
            info!("Created user '{}'", name);
            if generated {
                println!("Generated password: {}", password);
            }
        }

        Command::CreateRole { name } => {
            let mut conn = connect(&cli)?;
            roles::create_role(&mut conn, name)?;
            info!("Created role '{}'", name);
        }

        Command::UpdateUserPassword {
            name,
            password,
            md5,
        } => {
            let mut conn = connect(&cli)?;
            let generated = password.is_none();
            let password = password.clone().unwrap_or_else(|| roles::gen_password(16));

            roles::update_password(&mut conn, name, &password, *md5)?;
            info!("Updated password of '{}'", name);
            if generated {
                println!("Generated password: {}", password);
            }
        }

        Command::DeleteUser { name, yes } => {
            if !confirmed(&format!("This will drop user '{}'", name), *yes)? {
                return Ok(());
            }

            let mut conn = connect(&cli)?;
            roles::drop_user(&mut conn, name)?;
            info!("Dropped user '{}'", name);
        }

        Command::DeleteRole { name, yes } => {
            if !confirmed(&format!("This will drop role '{}'", name), *yes)? {
                return Ok(());
            }

            let mut conn = connect(&cli)?;
            roles::drop_role(&mut conn, name)?;
            info!("Dropped role '{}'", name);
        }

        Command::AssignUserToRole { user, role } => {
            let mut conn = connect(&cli)?;
            roles::assign(&mut conn, user, role)?;
            info!("'{}' is now a member of '{}'", user, role);
        }

        Command::RemoveUserFromRole { user, role } => {
            let mut conn = connect(&cli)?;
            roles::unassign(&mut conn, user, role)?;
            info!("'{}' is no longer a member of '{}'", user, role);
        }

        Command::GrantReadPermissions {
            role,
            database,
            schema,
            dryrun,
        } => {
            let schemas = default_public(schema.clone());
            let plan = grant::grant_read_plan(role, database, &schemas)?;

            apply_plan(&cli, &plan, *dryrun)?;
            if !dryrun {
                info!(
                    "Granted read on {} schema(s) of '{}' to '{}'",
                    schemas.len(),
                    database,
                    role
                );
            }
        }

        Command::GrantWritePermissions {
            role,
            database,
            schema,
            dryrun,
        } => {
            let schemas = default_public(schema.clone());
            let plan = grant::grant_write_plan(role, database, &schemas)?;

            apply_plan(&cli, &plan, *dryrun)?;
            if !dryrun {
                info!(
                    "Granted write on {} schema(s) of '{}' to '{}'",
                    schemas.len(),
                    database,
                    role
                );
            }
        }

        Command::RevokePermissions {
            role,
            database,
            schema,
            dryrun,
            yes,
        } => {
            let schemas = default_public(schema.clone());
            let plan = grant::revoke_all_plan(role, database, &schemas)?;

            if !dryrun
                && !confirmed(
                    &format!(
                        "This will revoke all privileges of '{}' on '{}' ({} schema(s))",
                        role,
                        database,
                        schemas.len()
                    ),
                    *yes,
                )?
            {
                return Ok(());
            }

            apply_plan(&cli, &plan, *dryrun)?;
            if !dryrun {
                info!(
                    "Revoked all privileges of '{}' on {} schema(s) of '{}'",
                    role,
                    schemas.len(),
                    database
                );
            }
        }

        Command::ListPermissions { name } => {
            let mut conn = connect(&cli)?;
            inspect::inspect_role(&mut conn, name)?;
        }

        Command::GenPass {
            length,
            username,
            password,
        } => match (username, password) {
            (Some(username), Some(password)) => {
                println!("md5 hash: {}", roles::md5_password(username, password));
            }
            (None, None) => {
                println!("Generated password: {}", roles::gen_password(*length));
            }
            _ => {
                return Err(anyhow!(
                    "--username and --password must be given together to create an md5 hash"
                ));
            }
        },
    }

    Ok(())
}
