mod input;
mod loader;
mod reports;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;

use brawn_levels::numbers::{is_unset, usize_to_f64};
use brawn_levels::{
    Activity, ActivityPerformance, CalcRequest, DataLoader, Gender, LevelCalculator, LevelEngine,
    LevelsError, Metrics, Player, StandardsQuery, fit_group,
};
use input::{parse_body_weight, parse_performance};
use loader::FileData;
use reports::{
    ActivityRow, ActivityScore, CalcReport, FitReport, FitStep, Report, TableReport,
};

#[derive(Debug, Parser)]
#[command(name = "brawn-levels", version = "0.1.0")]
#[command(about = "Score athletic performances against percentile standards on a 1-100 scale")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding standards.json and avg-weights.json (bundled data when omitted)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON file with configuration overrides
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output report format
    #[arg(long, global = true, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute attribute and player levels
    Calc(CalcArgs),
    /// Print interpolated standards for one gender and age
    Table(TableArgs),
    /// Fit the level progression curve for one gender and age
    Fit(FitArgs),
    /// List loaded activities
    Activities,
}

#[derive(Debug, clap::Args)]
struct CalcArgs {
    /// Athlete age in years
    #[arg(long, required_unless_present = "request")]
    age: Option<f64>,

    /// Body weight, e.g. 190lb or 86.2kg (kilograms when no unit is given)
    #[arg(long, required_unless_present = "request")]
    weight: Option<String>,

    /// Male or female
    #[arg(long, required_unless_present = "request")]
    gender: Option<Gender>,

    /// Performance as Activity=VALUE[unit], repeatable
    #[arg(long = "perf", value_name = "ACTIVITY=VALUE")]
    perf: Vec<String>,

    /// JSON request body with player metrics and activity performances
    #[arg(long, conflicts_with_all = ["age", "weight", "gender", "perf"])]
    request: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
struct TableArgs {
    #[arg(long)]
    activity: Activity,

    #[arg(long)]
    gender: Gender,

    #[arg(long)]
    age: f64,

    /// Snap body weights to whole pounds
    #[arg(long)]
    lb: bool,
}

#[derive(Debug, clap::Args)]
struct FitArgs {
    #[arg(long)]
    activity: Activity,

    #[arg(long)]
    gender: Gender,

    #[arg(long)]
    age: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.report == "console" {
        announce_banner();
    }

    let loader = FileData::new(args.data_dir.clone(), args.config.clone());
    let engine = LevelEngine::new(loader)?;
    let report = build_report(&args.command, &engine)?;
    write_reports(&args, &report)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn announce_banner() {
    println!("{}", "🏋 Brawn Levels".bright_cyan().bold());
    println!("{}", "================".cyan());
}

fn build_report(command: &Command, engine: &LevelEngine<FileData>) -> Result<Report> {
    match command {
        Command::Calc(calc) => calc_report(calc, engine).map(Report::Calc),
        Command::Table(table) => table_report(table, engine).map(Report::Table),
        Command::Fit(fit) => fit_report(fit, engine).map(Report::Fit),
        Command::Activities => activities_report(engine).map(Report::Activities),
    }
}

fn load_request(calc: &CalcArgs, engine: &LevelEngine<FileData>) -> Result<CalcRequest> {
    if let Some(path) = &calc.request {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        return CalcRequest::from_json(&text)
            .with_context(|| format!("failed to parse {}", path.display()));
    }

    let (Some(age), Some(weight), Some(gender)) = (calc.age, &calc.weight, calc.gender) else {
        bail!("--age, --weight and --gender are required without --request");
    };
    let weight = parse_body_weight(weight)?;
    let standards = engine.standards();
    let activity_performances = calc
        .perf
        .iter()
        .map(|token| {
            parse_performance(token, |activity| {
                standards.metadata(activity).ok().map(|m| m.unit)
            })
            .with_context(|| format!("invalid --perf {token}"))
        })
        .collect::<Result<Vec<ActivityPerformance>>>()?;

    Ok(CalcRequest {
        player: Player {
            metrics: Metrics::new(age, weight, gender),
        },
        activity_performances,
    })
}

fn activity_score(
    calculator: LevelCalculator<'_>,
    player: &Player,
    performance: &ActivityPerformance,
) -> Result<ActivityScore, LevelsError> {
    let metadata = calculator.standards().metadata(performance.activity)?;
    let unscorable = is_unset(player.metrics.age)
        || is_unset(player.metrics.weight)
        || performance.performance.is_nan()
        || performance.performance <= 0.0;
    let level = if unscorable {
        0
    } else {
        calculator.activity_level(player, performance)?
    };
    Ok(ActivityScore {
        activity: performance.activity,
        attribute: metadata.attribute,
        unit: metadata.unit,
        performance: performance.performance,
        level,
    })
}

fn calc_report(calc: &CalcArgs, engine: &LevelEngine<FileData>) -> Result<CalcReport> {
    let request = load_request(calc, engine)?;
    let output = engine.calculate(&request)?;
    let calculator = engine.calculator();
    let activities = request
        .activity_performances
        .iter()
        .map(|performance| activity_score(calculator, &request.player, performance))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CalcReport {
        output,
        metrics: request.player.metrics,
        activities,
    })
}

fn table_report(table: &TableArgs, engine: &LevelEngine<FileData>) -> Result<TableReport> {
    let standards = engine.standards();
    let metadata = standards.metadata(table.activity)?;
    let rows = standards.interpolated_table(table.activity, table.gender, table.age, table.lb)?;
    Ok(TableReport {
        activity: table.activity,
        name: metadata.name.clone(),
        unit: metadata.unit,
        gender: table.gender,
        age: table.age,
        rows,
    })
}

fn fit_report(fit: &FitArgs, engine: &LevelEngine<FileData>) -> Result<FitReport> {
    let raw = engine
        .data_loader()
        .load_standards()
        .context("loading standards")?;
    let entry = raw
        .get(fit.activity)
        .ok_or(LevelsError::UnknownActivity(fit.activity))?;
    let query = StandardsQuery::over(fit.activity, &entry.standards)
        .by_gender(fit.gender)
        .by_age(fit.age);
    let age = query.closest_age()?;
    let group = query.by_age(age).all();
    let result = fit_group(fit.activity, &group)?;
    let steps = result
        .samples
        .iter()
        .enumerate()
        .map(|(step, observed)| FitStep {
            step,
            observed: *observed,
            fitted: result.curve.ratio(usize_to_f64(step)),
        })
        .collect();
    Ok(FitReport {
        activity: fit.activity,
        gender: fit.gender,
        age,
        standards: group.len(),
        increasing: result.increasing,
        a: result.curve.a,
        b: result.curve.b,
        c: result.curve.c,
        converged: result.converged,
        evaluations: result.evaluations,
        max_residual: result.max_residual(),
        steps,
    })
}

fn activities_report(engine: &LevelEngine<FileData>) -> Result<Vec<ActivityRow>> {
    let standards = engine.standards();
    standards
        .activities()
        .map(|activity| -> Result<ActivityRow> {
            let metadata = standards.metadata(activity)?;
            Ok(ActivityRow {
                activity,
                name: metadata.name.clone(),
                attribute: metadata.attribute,
                unit: metadata.unit,
                generators: metadata.generators.iter().map(|g| g.metric).collect(),
                standards: standards.query(activity)?.all().len(),
            })
        })
        .collect()
}

fn write_reports(args: &Args, report: &Report) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => reports::generate_json_report(&mut output_target, report)?,
        "markdown" => reports::generate_markdown_report(&mut output_target, report)?,
        _ => reports::generate_console_report(&mut output_target, report)?,
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
