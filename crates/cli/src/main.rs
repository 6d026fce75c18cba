//! Planboard CLI - plan budgets and review from the terminal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use planboard_api::{ApiError, CachedApi, ClientConfig, JsonDirApi, PlanFilter, PlanningApi};
use planboard_budget::{
    BudgetDashboard, BudgetTotals, DashboardQuery, DashboardReport, PlanBudgetReport,
};
use planboard_core::{
    resolve_org_name, ActivityId, BudgetLine, InitiativeId, InitiativeInput, MeasureId,
    Organization, OrganizationId, Plan, PlanDraft, PlanId, PlanStatus, TargetedItemInput,
};
use planboard_planning::{
    plan_objective_weight, PlanReviewer, PlanSubmitter, PlanningError, TreeEditor,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "planboard")]
#[command(about = "Strategic plan budgets and review", long_about = None)]
struct Cli {
    /// JSON client config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend API root (overrides config and PLANBOARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// API token (overrides config and PLANBOARD_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Read from an exported snapshot directory instead of the backend
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List organizations
    Orgs,
    /// List plans
    Plans {
        /// Only this organization
        #[arg(long)]
        org: Option<OrganizationId>,
    },
    /// Budget summary across plans
    Summary {
        /// Only this organization
        #[arg(long)]
        org: Option<OrganizationId>,
        /// Only these statuses (comma separated)
        #[arg(long, value_delimiter = ',')]
        status: Vec<PlanStatus>,
        /// Grouping
        #[arg(long, value_enum, default_value = "total")]
        group_by: GroupBy,
    },
    /// Budget breakdown of one plan
    Plan {
        /// Plan ID
        id: PlanId,
    },
    /// Data-quality findings for one plan
    Audit {
        /// Plan ID
        id: PlanId,
    },
    /// Submit a plan draft
    Submit {
        /// Draft JSON file
        draft: PathBuf,
    },
    /// Approve a submitted plan
    Approve {
        /// Plan ID
        id: PlanId,
        /// Reviewer feedback
        #[arg(long, default_value = "")]
        feedback: String,
    },
    /// Reject a submitted plan
    Reject {
        /// Plan ID
        id: PlanId,
        /// Reviewer feedback
        #[arg(long)]
        feedback: String,
    },
    /// Add or update an initiative of a plan
    Initiative {
        /// Plan ID
        plan: PlanId,
        /// Initiative JSON file
        input: PathBuf,
        /// Update this initiative instead of adding one
        #[arg(long)]
        id: Option<InitiativeId>,
    },
    /// Add or update a performance measure
    Measure {
        /// Plan ID
        plan: PlanId,
        /// Measure JSON file
        input: PathBuf,
        /// Update this measure instead of adding one
        #[arg(long)]
        id: Option<MeasureId>,
    },
    /// Add or update a main activity
    Activity {
        /// Plan ID
        plan: PlanId,
        /// Activity JSON file
        input: PathBuf,
        /// Update this activity instead of adding one
        #[arg(long)]
        id: Option<ActivityId>,
    },
    /// Add a costed sub-activity to a main activity
    SubActivity {
        /// Sub-activity JSON file
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupBy {
    Total,
    Organization,
    Month,
    Type,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let out = Output { json: cli.json };

    if let Some(dir) = &cli.data_dir {
        debug!("Using snapshot at {}", dir.display());
        let api = Arc::new(JsonDirApi::new(dir).await.map_err(api_error)?);
        return run(api, cli.command, out).await;
    }

    let config = load_config(&cli).await?;
    debug!("Using backend at {}", config.base_url);
    let api = Arc::new(CachedApi::new(config.connect().map_err(api_error)?));
    run(api, cli.command, out).await
}

/// File, then environment, then flags.
async fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ClientConfig::default(),
    }
    .apply_env();

    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    Ok(config)
}

fn api_error(e: ApiError) -> anyhow::Error {
    debug!("{:?}", e);
    anyhow!(e.user_message())
}

fn planning_error(e: PlanningError) -> anyhow::Error {
    debug!("{:?}", e);
    anyhow!(e.user_message())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

struct Output {
    json: bool,
}

impl Output {
    fn json<T: serde::Serialize>(&self, value: &T) -> Result<bool> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(self.json)
    }
}

async fn run<A: PlanningApi + 'static>(api: Arc<A>, command: Commands, out: Output) -> Result<()> {
    match command {
        Commands::Orgs => {
            let orgs = api.list_organizations().await.map_err(api_error)?;
            if out.json(&orgs)? {
                return Ok(());
            }

            println!("Organizations ({})", orgs.len());
            for org in orgs {
                println!(
                    "  {} | {} | {}",
                    org.id,
                    org.name,
                    org.org_type.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Plans { org } => {
            let filter = PlanFilter { organization: org };
            let dashboard = BudgetDashboard::new(api.clone());
            let (orgs, plans) =
                tokio::try_join!(api.list_organizations(), dashboard.visible_plans(&filter))
                    .map_err(api_error)?;
            if out.json(&plans)? {
                return Ok(());
            }

            let orgs = org_map(orgs);
            println!("Plans ({})", plans.len());
            for plan in plans {
                println!(
                    "  {} | {} | {} | {} | {}",
                    plan.id,
                    resolve_org_name(&plan, &orgs),
                    plan.status,
                    plan.submitted_at
                        .map(|t| t.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    plan.planner_name,
                );
            }
        }
        Commands::Summary {
            org,
            status,
            group_by,
        } => {
            let dashboard = BudgetDashboard::new(api);
            let query = DashboardQuery {
                organization: org,
                statuses: status,
            };
            let report = dashboard.load(&query).await.map_err(api_error)?;
            print_summary(&report, group_by, &out)?;
        }
        Commands::Plan { id } => {
            let dashboard = BudgetDashboard::new(api.clone());
            let plan = dashboard.visible_plan(id).await.map_err(api_error)?;
            let report = PlanBudgetReport::build(&plan);
            if out.json(&report)? {
                return Ok(());
            }

            let orgs = org_map(api.list_organizations().await.map_err(api_error)?);
            print_plan(&plan, &report, &orgs);
        }
        Commands::Audit { id } => {
            let dashboard = BudgetDashboard::new(api);
            let warnings = dashboard.audit(id).await.map_err(api_error)?;
            if out.json(&warnings)? {
                return Ok(());
            }

            if warnings.is_empty() {
                println!("No data-quality issues in plan {}", id);
            }
            for warning in warnings {
                println!("  {}", warning);
            }
        }
        Commands::Submit { draft } => {
            let draft: PlanDraft = read_json(&draft).await?;

            let plan = PlanSubmitter::new(api)
                .submit(&draft)
                .await
                .map_err(planning_error)?;
            if out.json(&plan)? {
                return Ok(());
            }
            println!("Submitted plan {} ({})", plan.id, plan.status);
        }
        Commands::Approve { id, feedback } => {
            let status = PlanReviewer::new(api)
                .approve(id, &feedback)
                .await
                .map_err(planning_error)?;
            println!("Plan {} is now {}", id, status);
        }
        Commands::Reject { id, feedback } => {
            let status = PlanReviewer::new(api)
                .reject(id, &feedback)
                .await
                .map_err(planning_error)?;
            println!("Plan {} is now {}", id, status);
        }
        Commands::Initiative { plan, input, id } => {
            let input: InitiativeInput = read_json(&input).await?;
            let saved = TreeEditor::new(api)
                .save_initiative(plan, id, &input)
                .await
                .map_err(planning_error)?;
            if out.json(&saved)? {
                return Ok(());
            }
            println!("Saved initiative {} ({:.2})", saved.id, saved.weight);
        }
        Commands::Measure { plan, input, id } => {
            let input: TargetedItemInput = read_json(&input).await?;
            let saved = TreeEditor::new(api)
                .save_measure(plan, id, &input)
                .await
                .map_err(planning_error)?;
            if out.json(&saved)? {
                return Ok(());
            }
            println!("Saved measure {} ({:.2})", saved.id, saved.weight);
        }
        Commands::Activity { plan, input, id } => {
            let input: TargetedItemInput = read_json(&input).await?;
            let saved = TreeEditor::new(api)
                .save_activity(plan, id, &input)
                .await
                .map_err(planning_error)?;
            if out.json(&saved)? {
                return Ok(());
            }
            println!("Saved main activity {} ({:.2})", saved.id, saved.weight);
        }
        Commands::SubActivity { input } => {
            let line: BudgetLine = read_json(&input).await?;
            let saved = TreeEditor::new(api)
                .add_sub_activity(&line)
                .await
                .map_err(planning_error)?;
            if out.json(&saved)? {
                return Ok(());
            }
            match saved.id {
                Some(id) => println!("Added sub-activity {}", id),
                None => println!("Added sub-activity"),
            }
        }
    }

    Ok(())
}

fn org_map(orgs: Vec<Organization>) -> BTreeMap<OrganizationId, Organization> {
    orgs.into_iter().map(|o| (o.id, o)).collect()
}

fn print_summary(report: &DashboardReport, group_by: GroupBy, out: &Output) -> Result<()> {
    match group_by {
        GroupBy::Total => {
            if out.json(report)? {
                return Ok(());
            }
            print_totals(&report.totals);
            for warning in &report.warnings {
                println!("  warning: {}", warning);
            }
        }
        GroupBy::Organization => {
            if out.json(&report.by_organization)? {
                return Ok(());
            }
            print_header("Organization");
            for row in &report.by_organization {
                print_row(&row.name, &row.totals);
            }
        }
        GroupBy::Month => {
            if out.json(&report.by_month)? {
                return Ok(());
            }
            print_header("Month");
            for (month, totals) in &report.by_month.months {
                print_row(&month.to_string(), totals);
            }
            if report.by_month.undated.plan_count > 0 {
                print_row("undated", &report.by_month.undated);
            }
        }
        GroupBy::Type => {
            if out.json(&report.by_type)? {
                return Ok(());
            }
            print_header("Plan type");
            for row in &report.by_type {
                print_row(row.plan_type.as_str(), &row.totals);
            }
        }
    }
    Ok(())
}

fn print_totals(totals: &BudgetTotals) {
    println!("Plans: {}", totals.plan_count);
    println!("  Total budget:    {:>14.2}", totals.total_budget);
    println!("  Government:      {:>14.2}", totals.total_government);
    println!("  Partners:        {:>14.2}", totals.total_partners);
    println!("  SDG:             {:>14.2}", totals.total_sdg);
    println!("  Other:           {:>14.2}", totals.total_other);
    println!("  Available:       {:>14.2}", totals.total_available);
    println!(
        "  Funding gap:     {:>14.2} ({:.1}%)",
        totals.funding_gap,
        totals.gap_ratio()
    );
    println!("By activity type:");
    for (activity_type, bucket) in &totals.budget_by_activity_type {
        println!(
            "  {:<12} {:>4} {:>14.2}",
            activity_type.as_str(),
            bucket.count,
            bucket.budget
        );
    }
}

fn print_header(label: &str) {
    println!(
        "{:<32} {:>5} {:>14} {:>14} {:>14}",
        label, "Plans", "Budget", "Available", "Gap"
    );
}

fn print_row(label: &str, totals: &BudgetTotals) {
    println!(
        "{:<32} {:>5} {:>14.2} {:>14.2} {:>14.2}",
        label, totals.plan_count, totals.total_budget, totals.total_available, totals.funding_gap
    );
}

fn print_plan(
    plan: &Plan,
    report: &PlanBudgetReport,
    orgs: &BTreeMap<OrganizationId, Organization>,
) {
    println!("Plan: {}", plan.id);
    println!("  Organization: {}", resolve_org_name(plan, orgs));
    println!("  Planner: {}", plan.planner_name);
    println!("  Type: {}", plan.plan_type);
    println!("  Status: {}", plan.status);
    if let (Some(from), Some(to)) = (plan.from_date, plan.to_date) {
        println!("  Period: {} to {}", from, to);
    }
    if let Some(review) = plan.latest_review() {
        println!("  Review: {} - {}", review.status, review.feedback);
    }

    println!();
    print_totals(&report.totals);

    println!();
    for (objective, budget) in plan.objectives().iter().zip(&report.objectives) {
        println!(
            "Objective {} ({:.2}%): {}",
            objective.id,
            plan_objective_weight(plan, objective),
            objective.title
        );
        println!(
            "  budget {:.2} | available {:.2} | gap {:.2}",
            budget.totals.total_budget, budget.totals.total_available, budget.totals.funding_gap
        );
        for row in report.activities.iter().filter(|r| r.objective == objective.id) {
            println!(
                "    {} {} | {} lines | cost {:.2} | gap {:.2}",
                row.activity, row.name, row.line_count, row.funding.cost, row.funding.gap
            );
        }
    }
}
