use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{
    AdjustmentCmd, AdjustmentKind, BaseProduct, Context, Engine, LedgerEntryCmd, NewCostCenterCmd,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "giftflow_admin")]
#[command(about = "Operator utilities for giftflow (cost centers, ledger, catalog)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./giftflow.db?mode=rwc"
    )]
    database_url: String,

    /// Operator id written on every ledger entry.
    #[arg(long, env = "GIFTFLOW_OPERATOR", default_value = "admin_cli")]
    operator: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CostCenter(CostCenter),
    Ledger(Ledger),
    BaseProduct(BaseProductCmd),
}

#[derive(Args, Debug)]
struct CostCenter {
    #[command(subcommand)]
    command: CostCenterCommand,
}

#[derive(Subcommand, Debug)]
enum CostCenterCommand {
    Create(CostCenterCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct CostCenterCreateArgs {
    #[arg(long)]
    company: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    code: String,
    /// Opening allocation in minor units.
    #[arg(long)]
    allocated: Option<i64>,
}

#[derive(Args, Debug)]
struct Ledger {
    #[command(subcommand)]
    command: LedgerCommand,
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    Allocate(EntryArgs),
    Refund(RefundArgs),
    Adjust(AdjustArgs),
    /// Rebuild stored balances from the transaction log.
    Recompute {
        #[arg(long)]
        cost_center: Uuid,
    },
}

#[derive(Args, Debug)]
struct EntryArgs {
    #[arg(long)]
    cost_center: Uuid,
    #[arg(long)]
    amount: i64,
    #[arg(long, default_value = "")]
    description: String,
}

#[derive(Args, Debug)]
struct RefundArgs {
    #[command(flatten)]
    entry: EntryArgs,
    /// Budget the refund belongs to.
    #[arg(long, requires = "budget_title")]
    budget: Option<Uuid>,
    #[arg(long)]
    budget_title: Option<String>,
}

#[derive(Args, Debug)]
struct AdjustArgs {
    #[arg(long)]
    cost_center: Uuid,
    #[arg(long, value_parser = parse_adjustment)]
    kind: AdjustmentKind,
    #[arg(long)]
    amount: i64,
    #[arg(long)]
    description: String,
}

#[derive(Args, Debug)]
struct BaseProductCmd {
    #[command(subcommand)]
    command: BaseProductCommand,
}

#[derive(Subcommand, Debug)]
enum BaseProductCommand {
    Add(BaseProductAddArgs),
}

#[derive(Args, Debug)]
struct BaseProductAddArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    sku: String,
    #[arg(long)]
    name: String,
}

fn parse_adjustment(raw: &str) -> Result<AdjustmentKind, String> {
    AdjustmentKind::try_from(raw).map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;
    let ctx = Context::super_admin(cli.operator.clone(), cli.operator, "operations");

    match cli.command {
        Command::CostCenter(CostCenter {
            command: CostCenterCommand::Create(args),
        }) => {
            let mut cmd = NewCostCenterCmd::new(args.company, args.name, args.code);
            if let Some(amount) = args.allocated {
                cmd = cmd.opening_allocation(amount);
            }
            let cc = engine.create_cost_center(&ctx, cmd).await?;
            println!(
                "created cost center: {} {} ({})",
                cc.code, cc.name, cc.id
            );
        }
        Command::CostCenter(CostCenter {
            command: CostCenterCommand::List,
        }) => {
            for cc in engine.list_cost_centers(&ctx).await? {
                println!(
                    "{}\t{}\t{}\tallocated={} used={} available={} pending={}",
                    cc.id,
                    cc.company_id,
                    cc.code,
                    cc.allocated_budget,
                    cc.used_budget,
                    cc.available_budget,
                    cc.pending_requests
                );
            }
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::Allocate(args),
        }) => {
            let entry = engine
                .record_allocation(&ctx, args.cost_center, args.amount, &args.description)
                .await?;
            println!("booked allocation: {} ({})", entry.amount_minor, entry.id);
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::Refund(args),
        }) => {
            let mut cmd = LedgerEntryCmd::new(args.entry.cost_center, args.entry.amount)
                .description(args.entry.description);
            if let (Some(budget), Some(title)) = (args.budget, args.budget_title) {
                cmd = cmd.budget(budget, title);
            }
            let entry = engine.record_refund(&ctx, cmd).await?;
            println!("booked refund: {} ({})", entry.amount_minor, entry.id);
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::Adjust(args),
        }) => {
            let cmd = AdjustmentCmd::new(args.cost_center, args.kind, args.amount, args.description);
            let entry = engine.record_adjustment(&ctx, cmd).await?;
            println!(
                "booked adjustment {}: {} ({})",
                args.kind.as_str(),
                entry.amount_minor,
                entry.id
            );
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::Recompute { cost_center },
        }) => {
            let balances = engine.recompute_balances(&ctx, cost_center).await?;
            println!(
                "allocated={} used={} available={}",
                balances.allocated, balances.used, balances.available
            );
        }
        Command::BaseProduct(BaseProductCmd {
            command: BaseProductCommand::Add(args),
        }) => {
            let product = BaseProduct::new(&args.id, &args.sku, &args.name)?;
            engine.register_base_product(&ctx, product).await?;
            println!("registered base product: {} ({})", args.id, args.sku);
        }
    }

    Ok(())
}
