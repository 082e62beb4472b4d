use std::path::PathBuf;
use std::sync::Arc;
use clap::{Parser, ValueEnum};
use comfy_table::{Cell, Table as ComfyTable, presets::UTF8_FULL};
use postgrust_eval::sample;
use postgrust_eval::{DatabaseError, Engine, EngineConfig, Expr, Plan, RoutineResult, RowSet, Session, Value};

/// Runs the evaluation core against a small in-memory sample schema
#[derive(Parser, Debug)]
#[command(name = "pgr_eval")]
#[command(about = "PostgrustSQL evaluation core demo", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Iteration cap for recursive CTEs (overrides the config)
    #[arg(short, long)]
    max_iterations: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Scenario to run; all of them when omitted
    #[arg(value_enum)]
    scenario: Option<Scenario>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    Hierarchy,
    RunningTotal,
    ProductTotals,
    Transaction,
    Routine,
}

impl Scenario {
    const ALL: [Self; 5] = [
        Self::Hierarchy,
        Self::RunningTotal,
        Self::ProductTotals,
        Self::Transaction,
        Self::Routine,
    ];
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = EngineConfig::load(args.config.as_deref())?;
    if let Some(max) = args.max_iterations {
        config.max_recursion_iterations = max;
        config.validate()?;
    }
    log::info!("engine config: {config:?}");

    let engine = Engine::new(Arc::new(sample::sample_store()?), config);
    let scenarios = args.scenario.map_or_else(|| Scenario::ALL.to_vec(), |s| vec![s]);

    for scenario in scenarios {
        let mut session = engine.session();
        println!("== {scenario:?}");
        run_scenario(scenario, &engine, &mut session, args.format)?;
    }

    Ok(())
}

fn run_scenario(
    scenario: Scenario,
    engine: &Engine,
    session: &mut Session,
    format: OutputFormat,
) -> Result<(), DatabaseError> {
    match scenario {
        Scenario::Hierarchy => render(&session.execute_plan(&sample::department_hierarchy(), None)?, format),
        Scenario::RunningTotal => render(&session.execute_plan(&sample::running_totals(), None)?, format),
        Scenario::ProductTotals => render(&session.execute_plan(&sample::product_totals(), None)?, format),
        Scenario::Transaction => {
            let handle = session.begin()?;
            let updated = session.execute(
                &sample::update_email(Expr::int(1), Expr::text("alice@new.example.com")),
                Some(handle),
            )?;
            println!("updated {} row(s)", updated.rows_affected().unwrap_or_default());

            // Action is NOT NULL
            if let Err(error) = session.execute(
                &sample::audit_insert(Expr::int(1), Expr::int(1), Expr::null()),
                Some(handle),
            ) {
                println!("audit insert failed: {error}");
            }
            if !session.in_transaction() {
                println!("transaction {} was rolled back automatically", handle.id());
                return Ok(());
            }

            let customers = Plan::scan("CUSTOMER");
            println!("inside transaction {}:", handle.id());
            render(&session.execute_plan(&customers, Some(handle))?, format);
            println!("other sessions:");
            render(&engine.session().execute_plan(&customers, None)?, format);

            session.rollback(handle)?;
            println!("rolled back:");
            render(&session.execute_plan(&customers, None)?, format);
        }
        Scenario::Routine => {
            let function = sample::product_total_sales();
            for product in 1..=3 {
                let result = session.invoke_routine(&function, &[Value::Integer(product)], None)?;
                if let RoutineResult::Scalar(total) = result {
                    println!("{}({product}) = {total}", function.name);
                }
            }

            let procedure = sample::update_customer_email();
            let args = [Value::Integer(1), Value::Integer(2), "bob@example.com".into()];
            if let RoutineResult::ResultSet(rows) = session.invoke_routine(&procedure, &args, None)? {
                render(&rows, format);
            }
            render(&session.execute_plan(&Plan::scan("CUSTOMER_AUDIT"), None)?, format);
        }
    }
    Ok(())
}

fn render(rows: &RowSet, format: OutputFormat) {
    match format {
        OutputFormat::Table => println!("{}", format_table(rows)),
        OutputFormat::Json => println!("{}", format_json(rows)),
    }
}

fn format_table(rows: &RowSet) -> String {
    if rows.is_empty() {
        return "(0 rows)".to_string();
    }

    let mut table = ComfyTable::new();
    table.load_preset(UTF8_FULL);
    table.set_header(rows.schema.columns.iter().map(|c| Cell::new(&c.name)));
    for row in &rows.rows {
        table.add_row(row.values.iter().map(Cell::new));
    }

    format!("{}\n({} rows)", table, rows.len())
}

fn format_json(rows: &RowSet) -> String {
    let objects: Vec<serde_json::Value> = rows
        .rows
        .iter()
        .map(|row| {
            let object = rows
                .schema
                .columns
                .iter()
                .zip(&row.values)
                .map(|(column, value)| (column.name.clone(), value.to_json()))
                .collect::<serde_json::Map<_, _>>();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::to_string_pretty(&objects).unwrap_or_else(|_| "[]".to_string())
}
