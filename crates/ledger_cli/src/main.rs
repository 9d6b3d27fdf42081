//! Command-line entry point for the ledger core.
//!
//! # Responsibility
//! - Load configuration, start logging and open the store pair.
//! - Run one command per invocation and print its result as JSON.

mod args;

use args::{Cli, Command};
use ledger_core::{
    init_logging_from_config, BillCategoryService, BillType, BillingError, BillingWorkflow,
    ConfigError, DbError, EntityKind, LedgerConfig, OperationContext, RecordBillRequest,
    RepoError, ReplicatedStore, SqliteBillCategoryRepository, SqliteUserRepository,
    UserRepository, UserService, ValidationError,
};
use log::{error, info};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(String),
    Db(DbError),
    Repo(RepoError),
    Billing(BillingError),
    Validation(ValidationError),
    Output(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "failed to initialize logging: {message}"),
            Self::Db(err) => write!(f, "storage error: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Billing(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to render output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(_) => None,
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Billing(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<BillingError> for CliError {
    fn from(value: BillingError) -> Self {
        Self::Billing(value)
    }
}

impl From<ValidationError> for CliError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() {
    let cli = Cli::parse_args();
    match run(cli) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let config = match &cli.config {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    init_logging_from_config(&config).map_err(CliError::Logging)?;

    let command_name = command_name(&cli.command);
    let result = execute(&config, cli.command);
    match &result {
        Ok(_) => info!("event=cli_command module=cli status=ok command={command_name}"),
        Err(err) => error!("event=cli_command module=cli status=error command={command_name} error={err}"),
    }
    Ok(serde_json::to_string_pretty(&result?)?)
}

fn execute(config: &LedgerConfig, command: Command) -> Result<Value, CliError> {
    let open_store = || ReplicatedStore::open(&config.store);

    match command {
        Command::Ping => Ok(json!({
            "ping": ledger_core::ping(),
            "version": ledger_core::core_version(),
        })),
        Command::AddUser { username, nickname } => {
            let store = open_store()?;
            let id = UserService::new(SqliteUserRepository::new(&store))
                .create_user(username, nickname, None)?;
            Ok(json!({ "id": id }))
        }
        Command::AddCategory { name, description } => {
            let store = open_store()?;
            let id = BillCategoryService::new(SqliteBillCategoryRepository::new(&store))
                .create_category(name, description)?;
            Ok(json!({ "id": id }))
        }
        Command::RecordBill {
            user_id,
            category_id,
            bill_type,
            date,
            amount,
            description,
        } => {
            let request = RecordBillRequest {
                user_id,
                category_id,
                bill_type: bill_type.parse::<BillType>()?,
                bill_date: date,
                amount,
                description,
            };
            let store = open_store()?;
            let result = BillingWorkflow::sqlite(&store).record_bill(&request)?;
            Ok(serde_json::to_value(&result)?)
        }
        Command::ShowUser { id, primary } => {
            let store = open_store()?;
            let user = SqliteUserRepository::new(&store)
                .load_user(&OperationContext::new(), id, primary)?
                .ok_or(RepoError::NotFound {
                    entity: EntityKind::User,
                    id,
                })?;
            Ok(serde_json::to_value(&user)?)
        }
        Command::SyncReplica => {
            open_store()?.sync_replica()?;
            Ok(json!({ "synced": true }))
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Ping => "ping",
        Command::AddUser { .. } => "add-user",
        Command::AddCategory { .. } => "add-category",
        Command::RecordBill { .. } => "record-bill",
        Command::ShowUser { .. } => "show-user",
        Command::SyncReplica => "sync-replica",
    }
}
