use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use spliteasy_core::{
    AuthSession, BillId, Household, HouseholdId, MemberContributionId, NewBill, NewContribution,
    NewHousehold, ReceiptId, ReceiptUpload, Role, SplitBackend, SplitStrategy,
};
use spliteasy_ledger::{
    ContributionReconciler, ReceiptReview, RowFilter, SplitMember, preview_split, summarize,
};
use spliteasy_membership::MembershipResolver;
use spliteasy_platform::config::state_path_from_env;
use spliteasy_platform::{ApiClient, ClientConfig, LocalStore, Session};
use tracing::{info, warn};

mod output;

#[derive(Parser)]
#[command(name = "spliteasy")]
#[command(about = "SplitEasy household expense client")]
struct Cli {
    /// Backend base URL; defaults to SPLITEASY_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Local state file; defaults to SPLITEASY_STATE_PATH or ~/.spliteasy/state.json.
    #[arg(long, global = true)]
    state_path: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Register as the representative of a new household.
        #[arg(long, default_value_t = false)]
        representative: bool,
    },
    Logout,
    Whoami,
    /// Find and remember the household you belong to.
    Household {
        #[command(subcommand)]
        command: Option<HouseholdCommand>,
    },
    Members,
    Bills {
        #[command(subcommand)]
        command: BillCommand,
    },
    /// Contributions requested from the household.
    Charges {
        #[command(subcommand)]
        command: ChargeCommand,
    },
    /// Contributions you still owe.
    Contributions,
    /// Contributions you have paid.
    History,
    Summary,
    Receipts {
        #[command(subcommand)]
        command: ReceiptCommand,
    },
    /// Preview how an amount would be split across the household.
    Split {
        #[arg(long)]
        amount: Decimal,
        #[arg(long, value_enum, default_value_t = StrategyArg::Equal)]
        strategy: StrategyArg,
    },
    Prefs {
        #[command(subcommand)]
        command: PrefsCommand,
    },
}

#[derive(Subcommand)]
enum HouseholdCommand {
    /// The active household.
    Show,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long)]
        description: Option<String>,
    },
    Invite {
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum BillCommand {
    List,
    Add {
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: Decimal,
        /// Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum ChargeCommand {
    List,
    Add {
        #[arg(long)]
        description: String,
        #[arg(long, value_enum, default_value_t = StrategyArg::Equal)]
        strategy: StrategyArg,
        #[arg(long)]
        due: NaiveDate,
        #[arg(long)]
        bill: Option<i64>,
    },
}

#[derive(Subcommand)]
enum ReceiptCommand {
    List {
        #[arg(long)]
        owed: i64,
    },
    Upload {
        #[arg(long)]
        owed: i64,
        #[arg(long)]
        file: PathBuf,
    },
    Approve {
        id: i64,
    },
    Reject {
        id: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Receipts waiting for the representative's decision.
    Pending,
}

#[derive(Subcommand)]
enum PrefsCommand {
    Get { name: String },
    Set { name: String, value: String },
    Unset { name: String },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Equal,
    Income,
}

impl From<StrategyArg> for SplitStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Equal => SplitStrategy::Equal,
            StrategyArg::Income => SplitStrategy::IncomeBased,
        }
    }
}

struct App {
    api_url: Option<String>,
    json: bool,
    store: LocalStore,
    session: Session,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "spliteasy=info".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let state_path = cli.state_path.unwrap_or_else(state_path_from_env);
    let store = LocalStore::open(&state_path)?;
    let session = Session::load(&store);
    let mut app = App {
        api_url: cli.api_url,
        json: cli.json,
        store,
        session,
    };

    app.run(cli.command).await
}

impl App {
    async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Login { email, password } => self.login(&email, &password).await,
            Command::Register {
                name,
                email,
                password,
                representative,
            } => {
                let role = if representative {
                    Role::Representative
                } else {
                    Role::Member
                };
                let client = ApiClient::new(&self.config()?)?;
                let auth = client.register(&name, &email, &password, role).await?;
                self.session = Session::sign_in(&auth);
                self.session.save(&mut self.store)?;
                println!("registered user {} ({})", auth.user_id, auth.role.as_str());
                Ok(())
            }
            Command::Logout => {
                Session::clear(&mut self.store)?;
                self.session = Session::default();
                println!("signed out");
                Ok(())
            }
            Command::Whoami => {
                let view = output::SessionView::from(&self.session);
                let text = output::describe_session(&view);
                self.print(&view, text)
            }
            Command::Household {
                command: Some(command),
            } => self.household(command).await,
            Command::Household { command: None } => {
                let client = self.client()?;
                let resolver = MembershipResolver::new(&client);
                let household = resolver.resolve_active_household(&mut self.session).await?;
                self.session.save(&mut self.store)?;
                match household {
                    Some(household) => {
                        let text = output::describe_household(&household);
                        self.print(&household, text)
                    }
                    None => {
                        println!("you are not a member of any household yet");
                        Ok(())
                    }
                }
            }
            Command::Members => {
                let client = self.client()?;
                let household_id = self.active_household(&client).await?;
                let members = client.list_household_members(household_id).await?;
                let text = output::describe_members(&members);
                self.print(&members, text)
            }
            Command::Bills { command } => self.bills(command).await,
            Command::Charges { command } => self.charges(command).await,
            Command::Contributions => self.contributions(RowFilter::Outstanding).await,
            Command::History => self.contributions(RowFilter::History).await,
            Command::Summary => {
                let client = self.client()?;
                let household_id = self.active_household(&client).await?;
                let user_id = self.session.user_id.context("sign in first")?;
                let rows = ContributionReconciler::new(&client)
                    .list_my_contributions(user_id, Some(household_id), RowFilter::All)
                    .await?;
                let summary = summarize(&rows);
                let text = output::describe_summary(&summary);
                self.print(&summary, text)
            }
            Command::Receipts { command } => self.receipts(command).await,
            Command::Split { amount, strategy } => {
                let client = self.client()?;
                let household_id = self.active_household(&client).await?;
                let members: Vec<SplitMember> = client
                    .list_household_members(household_id)
                    .await?
                    .iter()
                    .filter_map(SplitMember::from_member)
                    .collect();
                let shares = preview_split(amount, &members, strategy.into());
                let text = output::describe_shares(&shares);
                self.print(&shares, text)
            }
            Command::Prefs { command } => self.prefs(command),
        }
    }

    async fn login(&mut self, email: &str, password: &str) -> Result<()> {
        let client = ApiClient::new(&self.config()?)?;
        let auth = client.login(email, password).await?;
        let client = client.with_bearer_token(Some(auth.token.clone()));
        let (session, household) = start_session(&auth, &client, &mut self.store).await?;
        self.session = session;

        println!("signed in as user {} ({})", auth.user_id, auth.role.as_str());
        if let Some(household) = household {
            println!("household: {}", household.name);
        }
        Ok(())
    }

    async fn household(&mut self, command: HouseholdCommand) -> Result<()> {
        let client = self.client()?;
        match command {
            HouseholdCommand::Show => {
                let household_id = self.active_household(&client).await?;
                let household = client.get_household(household_id).await?;
                let text = output::describe_household(&household);
                self.print(&household, text)
            }
            HouseholdCommand::Create {
                name,
                currency,
                description,
            } => {
                self.require_representative()?;
                let household = client
                    .create_household(NewHousehold {
                        name,
                        description,
                        currency: currency.to_uppercase(),
                    })
                    .await?;
                self.session.active_household_id = Some(household.id);
                self.session.save(&mut self.store)?;
                let text = output::describe_household(&household);
                self.print(&household, text)
            }
            HouseholdCommand::Invite { email } => {
                self.require_representative()?;
                let household_id = self.active_household(&client).await?;
                let member = client.add_member(household_id, &email).await?;
                let text = output::describe_members(std::slice::from_ref(&member));
                self.print(&member, text)
            }
        }
    }

    async fn bills(&mut self, command: BillCommand) -> Result<()> {
        let client = self.client()?;
        let household_id = self.active_household(&client).await?;
        match command {
            BillCommand::List => {
                let bills = client.list_bills(Some(household_id)).await?;
                let text = output::describe_bills(&bills);
                self.print(&bills, text)
            }
            BillCommand::Add {
                description,
                amount,
                date,
            } => {
                self.require_representative()?;
                let bill = client
                    .create_bill(NewBill {
                        household_id,
                        description,
                        amount,
                        date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                    })
                    .await?;
                let text = output::describe_bills(std::slice::from_ref(&bill));
                self.print(&bill, text)
            }
        }
    }

    async fn charges(&mut self, command: ChargeCommand) -> Result<()> {
        let client = self.client()?;
        let household_id = self.active_household(&client).await?;
        match command {
            ChargeCommand::List => {
                let charges = client.list_contributions(Some(household_id)).await?;
                let text = output::describe_charges(&charges);
                self.print(&charges, text)
            }
            ChargeCommand::Add {
                description,
                strategy,
                due,
                bill,
            } => {
                self.require_representative()?;
                let charge = client
                    .create_contribution(NewContribution {
                        household_id,
                        bill_id: bill.map(BillId),
                        description,
                        strategy: strategy.into(),
                        due_date: due,
                    })
                    .await?;
                info!(contribution_id = %charge.id, %household_id, "charge created");
                let text = output::describe_charges(std::slice::from_ref(&charge));
                self.print(&charge, text)
            }
        }
    }

    async fn contributions(&mut self, filter: RowFilter) -> Result<()> {
        let client = self.client()?;
        let household_id = self.active_household(&client).await?;
        let user_id = self.session.user_id.context("sign in first")?;
        let rows = ContributionReconciler::new(&client)
            .list_my_contributions(user_id, Some(household_id), filter)
            .await?;
        let text = output::describe_rows(&rows);
        self.print(&rows, text)
    }

    async fn receipts(&mut self, command: ReceiptCommand) -> Result<()> {
        let client = self.client()?;
        let review = ReceiptReview::new(&client);
        match command {
            ReceiptCommand::List { owed } => {
                let receipts = client.list_receipts(MemberContributionId(owed)).await?;
                let text = output::describe_receipts(&receipts);
                self.print(&receipts, text)
            }
            ReceiptCommand::Upload { owed, file } => {
                let upload = read_upload(&file)?;
                let receipt = review.upload(MemberContributionId(owed), upload).await?;
                let text = format!("uploaded receipt {} ({})", receipt.id, receipt.status);
                self.print(&receipt, text)
            }
            ReceiptCommand::Approve { id } => {
                self.require_representative()?;
                let receipt = review.approve(ReceiptId(id)).await?;
                let text = format!("receipt {} approved", receipt.id);
                self.print(&receipt, text)
            }
            ReceiptCommand::Reject { id, notes } => {
                self.require_representative()?;
                let receipt = review.reject(ReceiptId(id), notes).await?;
                let text = format!("receipt {} rejected", receipt.id);
                self.print(&receipt, text)
            }
            ReceiptCommand::Pending => {
                self.require_representative()?;
                let household_id = self.active_household(&client).await?;
                let queue = review.pending_review(household_id).await?;
                let text = output::describe_queue(&queue);
                self.print(&queue, text)
            }
        }
    }

    fn prefs(&mut self, command: PrefsCommand) -> Result<()> {
        match command {
            PrefsCommand::Get { name } => {
                match self.store.preference(&name) {
                    Some(value) => println!("{value}"),
                    None => println!("{name} is not set"),
                }
                Ok(())
            }
            PrefsCommand::Set { name, value } => {
                self.store.set_preference(&name, &value)?;
                println!("{name} = {value}");
                Ok(())
            }
            PrefsCommand::Unset { name } => {
                if !self.store.remove_preference(&name)? {
                    println!("{name} was not set");
                }
                Ok(())
            }
            PrefsCommand::List => {
                let preferences = self.store.preferences();
                let text = preferences
                    .iter()
                    .map(|(name, value)| format!("{name} = {value}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.print(&preferences, text)
            }
        }
    }

    fn config(&self) -> Result<ClientConfig> {
        match &self.api_url {
            Some(url) => ClientConfig::with_api_url(url.as_str()),
            None => ClientConfig::from_env(),
        }
    }

    fn client(&self) -> Result<ApiClient> {
        if !self.session.is_signed_in() {
            anyhow::bail!("not signed in; run `spliteasy login` first");
        }
        let client = ApiClient::new(&self.config()?)?;
        Ok(client.with_bearer_token(self.session.token.clone()))
    }

    /// The remembered household, resolving and storing it on first use.
    async fn active_household(&mut self, client: &ApiClient) -> Result<HouseholdId> {
        if let Some(household_id) = self.session.active_household_id {
            return Ok(household_id);
        }
        MembershipResolver::new(client)
            .resolve_active_household(&mut self.session)
            .await?;
        self.session.save(&mut self.store)?;
        self.session
            .active_household_id
            .context("you are not a member of any household yet")
    }

    fn require_representative(&self) -> Result<()> {
        if !self.session.is_representative() {
            anyhow::bail!("only the household representative can do that");
        }
        Ok(())
    }

    fn print<T: Serialize>(&self, value: &T, text: String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else if !text.is_empty() {
            println!("{text}");
        }
        Ok(())
    }
}

/// Stores the new session before looking up the household, so a failed
/// lookup keeps the login; the household is resolved again on next use.
async fn start_session<B>(
    auth: &AuthSession,
    backend: &B,
    store: &mut LocalStore,
) -> Result<(Session, Option<Household>)>
where
    B: SplitBackend,
{
    let mut session = Session::sign_in(auth);
    session.save(store)?;
    info!(path = %store.path().display(), "session stored");

    match MembershipResolver::new(backend)
        .resolve_active_household(&mut session)
        .await
    {
        Ok(household) => {
            session.save(store)?;
            Ok((session, household))
        }
        Err(err) => {
            warn!(user_id = %auth.user_id, "household lookup failed after sign in: {err}");
            Ok((session, None))
        }
    }
}

fn read_upload(path: &Path) -> Result<ReceiptUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("receipt path has no file name")?
        .to_string();
    Ok(ReceiptUpload {
        content_type: output::content_type_for(&filename).to_string(),
        filename,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use spliteasy_core::{ApiError, HouseholdMember, UserId};
    use spliteasy_memstore::{Call, InMemoryBackend};

    use super::*;

    fn auth() -> AuthSession {
        AuthSession {
            token: "t0k3n".to_string(),
            role: Role::Member,
            user_id: UserId(3),
        }
    }

    #[tokio::test]
    async fn sign_in_survives_a_failed_household_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        let backend =
            InMemoryBackend::new().failing(Call::ListHouseholds, ApiError::http(503, None));

        let (session, household) = start_session(&auth(), &backend, &mut store).await.unwrap();

        assert!(household.is_none());
        assert!(session.is_signed_in());
        assert_eq!(session.active_household_id, None);
        let stored = Session::load(&LocalStore::open(&path).unwrap());
        assert_eq!(stored, Session::sign_in(&auth()));
    }

    #[tokio::test]
    async fn sign_in_stores_the_resolved_household() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        let household = Household {
            id: HouseholdId(7),
            name: "Casa".to_string(),
            description: None,
            currency: "GTQ".to_string(),
            representative_id: None,
        };
        let member = HouseholdMember {
            membership_id: None,
            user_id: Some(UserId(3)),
            household_id: Some(HouseholdId(7)),
            name: None,
            email: None,
            income: None,
        };
        let backend = InMemoryBackend::new().with_household(household, vec![member]);

        let (session, household) = start_session(&auth(), &backend, &mut store).await.unwrap();

        assert_eq!(household.map(|household| household.id), Some(HouseholdId(7)));
        let stored = Session::load(&LocalStore::open(&path).unwrap());
        assert_eq!(stored.active_household_id, Some(HouseholdId(7)));
        assert_eq!(stored, session);
    }
}
