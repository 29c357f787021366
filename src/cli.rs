use std::path::PathBuf;
use structopt::StructOpt;

/// Administer PostgreSQL roles, users and privileges
#[derive(Debug, StructOpt)]
pub struct Cli {
    /// Connection string, overrides --config and DATABASE_URL
    #[structopt(long, global = true)]
    pub conn: Option<String>,

    /// Path to a YAML config file holding the connection
    #[structopt(long, global = true, parse(from_os_str))]
    pub config: Option<PathBuf>,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// List login users
    ListUsers {
        /// Include system users (pg_*, rds_*)
        #[structopt(long)]
        include_system: bool,
    },

    /// List group roles (login disabled)
    ListRoles {
        /// Include system roles (pg_*, rds_*)
        #[structopt(long)]
        include_system: bool,
    },

    /// List schemas in the current database
    ListSchemas {
        /// Include pg_* schemas and information_schema
        #[structopt(long)]
        include_system: bool,
    },

    /// List the roles a user is a member of
    ListUserRoles {
        /// The user name
        #[structopt(short, long)]
        name: String,
    },

    /// Create a login user
    CreateUser {
        /// The user name
        #[structopt(short, long)]
        name: String,

        /// The password, generated when omitted
        #[structopt(short, long)]
        password: Option<String>,
    },

    /// Create a group role
    CreateRole {
        /// The role name
        #[structopt(short, long)]
        name: String,
    },

    /// Change a user's password
    UpdateUserPassword {
        /// The user name
        #[structopt(short, long)]
        name: String,

        /// The new password, generated when omitted
        #[structopt(short, long)]
        password: Option<String>,

        /// Store the password as a PostgreSQL md5 hash
        #[structopt(long)]
        md5: bool,
    },

    /// Drop a user
    DeleteUser {
        /// The user name
        #[structopt(short, long)]
        name: String,

        /// Skip the confirmation prompt
        #[structopt(short, long)]
        yes: bool,
    },

    /// Drop a group role
    DeleteRole {
        /// The role name
        #[structopt(short, long)]
        name: String,

        /// Skip the confirmation prompt
        #[structopt(short, long)]
        yes: bool,
    },

    /// Make a user a member of a role
    AssignUserToRole {
        /// The user name
        #[structopt(short, long)]
        user: String,

        /// The role name
        #[structopt(short, long)]
        role: String,
    },

    /// Remove a user from a role
    RemoveUserFromRole {
        /// The user name
        #[structopt(short, long)]
        user: String,

        /// The role name
        #[structopt(short, long)]
        role: String,
    },

    /// Grant read access (CONNECT, USAGE, SELECT incl. future tables)
    GrantReadPermissions {
        /// The grantee role or user
        #[structopt(short, long)]
        role: String,

        /// The database name
        #[structopt(short, long)]
        database: String,

        /// Schema(s) to grant on, repeatable (default: public)
        #[structopt(short, long)]
        schema: Vec<String>,

        /// Print the statements without executing them
        #[structopt(long)]
        dryrun: bool,
    },

    /// Grant write access (read plus INSERT/UPDATE/DELETE and sequences)
    GrantWritePermissions {
        /// The grantee role or user
        #[structopt(short, long)]
        role: String,

        /// The database name
        #[structopt(short, long)]
        database: String,

        /// Schema(s) to grant on, repeatable (default: public)
        #[structopt(short, long)]
        schema: Vec<String>,

        /// Print the statements without executing them
        #[structopt(long)]
        dryrun: bool,
    },

    /// Revoke all privileges, including default-privilege rules
    RevokePermissions {
        /// The role or user to revoke from
        #[structopt(short, long)]
        role: String,

        /// The database name
        #[structopt(short, long)]
        database: String,

        /// Schema(s) to revoke on, repeatable (default: public)
        #[structopt(short, long)]
        schema: Vec<String>,

        /// Print the statements without executing them
        #[structopt(long)]
        dryrun: bool,

        /// Skip the confirmation prompt
        #[structopt(short, long)]
        yes: bool,
    },

    /// Show the full permission report for a role or user
    ListPermissions {
        /// The role or user name
        #[structopt(short, long)]
        name: String,
    },

    /// Generate a random password
    GenPass {
        /// The password length
        #[structopt(short, long, default_value = "16")]
        length: u8,

        /// The username, using to create md5 hash
        #[structopt(short, long)]
        username: Option<String>,

        /// The password, using to create md5 hash
        #[structopt(short, long)]
        password: Option<String>,
    },
}

impl Command {
    /// Whether the command destroys state and must be confirmed first.
    pub fn confirm_required(&self) -> bool {
        matches!(
            self,
            Command::DeleteUser { .. }
                | Command::DeleteRole { .. }
                | Command::RevokePermissions { .. }
        )
    }
}

// Parse the command line arguments
pub fn parse() -> Cli {
    Cli::from_args()
}
