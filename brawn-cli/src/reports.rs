use anyhow::Result;
use brawn_levels::units::{format_performance, format_time, kg_to_lb};
use brawn_levels::{
    Activity, Attribute, Gender, LevelOutput, Levels, Metric, Metrics, Standard, Unit,
};
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

const CHECKPOINTS: [u32; 6] = [1, 10, 25, 50, 75, 90];

/// Level reached by one submitted performance.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityScore {
    pub activity: Activity,
    pub attribute: Attribute,
    pub unit: Unit,
    pub performance: f64,
    pub level: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcReport {
    #[serde(flatten)]
    pub output: LevelOutput,
    pub metrics: Metrics,
    pub activities: Vec<ActivityScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableReport {
    pub activity: Activity,
    pub name: String,
    pub unit: Unit,
    pub gender: Gender,
    pub age: f64,
    pub rows: Vec<Standard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitStep {
    pub step: usize,
    pub observed: f64,
    pub fitted: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FitReport {
    pub activity: Activity,
    pub gender: Gender,
    /// Sampled age the group was taken from.
    pub age: f64,
    pub standards: usize,
    pub increasing: bool,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub converged: bool,
    pub evaluations: usize,
    pub max_residual: f64,
    pub steps: Vec<FitStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityRow {
    pub activity: Activity,
    pub name: String,
    pub attribute: Attribute,
    pub unit: Unit,
    pub generators: Vec<Metric>,
    pub standards: usize,
}

#[derive(Debug, Clone)]
pub enum Report {
    Calc(CalcReport),
    Table(TableReport),
    Fit(FitReport),
    Activities(Vec<ActivityRow>),
}

fn level_columns(levels: &Levels) -> Vec<u32> {
    let max = levels.keys().last().unwrap_or(1);
    let mut columns: Vec<u32> = CHECKPOINTS.into_iter().filter(|l| *l < max).collect();
    columns.push(max);
    columns
}

fn cell(value: Option<f64>, unit: Unit) -> String {
    match (value, unit) {
        (None, _) => "-".to_string(),
        (Some(ms), Unit::Ms) => format_time(ms, false),
        (Some(v), Unit::Kg | Unit::Cm) => format!("{v:.1}"),
    }
}

fn weight_label(kg: f64) -> String {
    format!("{kg:.1} kg ({:.0} lb)", kg_to_lb(kg))
}

fn generator_names(generators: &[Metric]) -> String {
    if generators.is_empty() {
        "-".to_string()
    } else {
        generators
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub fn generate_json_report(out: &mut dyn Write, report: &Report) -> Result<()> {
    let json_output = match report {
        Report::Calc(calc) => serde_json::to_string_pretty(calc)?,
        Report::Table(table) => serde_json::to_string_pretty(table)?,
        Report::Fit(fit) => serde_json::to_string_pretty(fit)?,
        Report::Activities(rows) => serde_json::to_string_pretty(rows)?,
    };
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_console_report(out: &mut dyn Write, report: &Report) -> Result<()> {
    match report {
        Report::Calc(calc) => console_calc(out, calc),
        Report::Table(table) => console_table(out, table),
        Report::Fit(fit) => console_fit(out, fit),
        Report::Activities(rows) => console_activities(out, rows),
    }
}

pub fn generate_markdown_report(out: &mut dyn Write, report: &Report) -> Result<()> {
    match report {
        Report::Calc(calc) => markdown_calc(out, calc),
        Report::Table(table) => markdown_table(out, table),
        Report::Fit(fit) => markdown_fit(out, fit),
        Report::Activities(rows) => markdown_activities(out, rows),
    }
}

fn console_calc(out: &mut dyn Write, calc: &CalcReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Level Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "================".cyan())?;
    let metrics = &calc.metrics;
    writeln!(
        out,
        "Athlete: {}, age {:.0}, {}",
        metrics.gender,
        metrics.age,
        weight_label(metrics.weight)
    )?;
    let player = calc.output.player.to_string();
    let player = if calc.output.player == 0 {
        player.red()
    } else {
        player.green()
    };
    writeln!(out, "Player level: {}", player.bold())?;
    writeln!(out)?;
    for (attribute, level) in calc.output.attributes.iter() {
        let marker = if level == 0 { "❌" } else { "✅" };
        writeln!(out, "{marker} {:<10} {level:>3}", attribute.to_string())?;
    }
    if !calc.activities.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "🏋 Activities".bright_yellow().bold())?;
        writeln!(out, "{}", "-------------".yellow())?;
        for score in &calc.activities {
            writeln!(
                out,
                "   {:<11} {:<24} level {}",
                score.activity.to_string(),
                format_performance(score.performance, score.unit),
                score.level
            )?;
        }
    }
    if calc.output.player == 0 {
        writeln!(out)?;
        writeln!(
            out,
            "{}",
            "Every attribute needs a scored activity for a player level.".yellow()
        )?;
    }
    Ok(())
}

fn markdown_calc(out: &mut dyn Write, calc: &CalcReport) -> Result<()> {
    writeln!(out, "# Brawn Level Report\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Player level**: {}", calc.output.player)?;
    writeln!(out, "- **Gender**: {}", calc.metrics.gender)?;
    writeln!(out, "- **Age**: {:.0}", calc.metrics.age)?;
    writeln!(out, "- **Weight**: {}\n", weight_label(calc.metrics.weight))?;

    writeln!(out, "## Attributes\n")?;
    writeln!(out, "| Attribute | Level |")?;
    writeln!(out, "|---|---|")?;
    for (attribute, level) in calc.output.attributes.iter() {
        writeln!(out, "| {attribute} | {level} |")?;
    }

    if !calc.activities.is_empty() {
        writeln!(out, "\n## Activities\n")?;
        writeln!(out, "| Activity | Attribute | Performance | Level |")?;
        writeln!(out, "|---|---|---|---|")?;
        for score in &calc.activities {
            writeln!(
                out,
                "| {} | {} | {} | {} |",
                score.activity,
                score.attribute,
                format_performance(score.performance, score.unit),
                score.level
            )?;
        }
    }
    Ok(())
}

fn console_table(out: &mut dyn Write, table: &TableReport) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{}",
        format!("📋 {} standards", table.name).bright_cyan().bold()
    )?;
    writeln!(out, "{}", "=".repeat(30).cyan())?;
    writeln!(
        out,
        "{} at age {:.0}, values in {}",
        table.gender, table.age, table.unit
    )?;
    let Some(first) = table.rows.first() else {
        writeln!(out, "No standards available.")?;
        return Ok(());
    };
    let columns = level_columns(&first.levels);
    let header: String = columns.iter().map(|l| format!("{:>9}", format!("L{l}"))).collect();
    writeln!(out, "{:<22}{}", "Body weight", header.bold())?;
    for row in &table.rows {
        let cells: String = columns
            .iter()
            .map(|l| format!("{:>9}", cell(row.levels.get(*l), table.unit)))
            .collect();
        writeln!(out, "{:<22}{cells}", weight_label(row.metrics.weight))?;
    }
    Ok(())
}

fn markdown_table(out: &mut dyn Write, table: &TableReport) -> Result<()> {
    writeln!(out, "# {} Standards\n", table.name)?;
    writeln!(out, "- **Gender**: {}", table.gender)?;
    writeln!(out, "- **Age**: {:.0}", table.age)?;
    writeln!(out, "- **Unit**: {}\n", table.unit)?;
    let Some(first) = table.rows.first() else {
        writeln!(out, "_No standards available._")?;
        return Ok(());
    };
    let columns = level_columns(&first.levels);
    let header: Vec<String> = columns.iter().map(|l| format!("L{l}")).collect();
    writeln!(out, "| Body weight | {} |", header.join(" | "))?;
    writeln!(out, "|---|{}", "---|".repeat(columns.len()))?;
    for row in &table.rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|l| cell(row.levels.get(*l), table.unit))
            .collect();
        writeln!(
            out,
            "| {} | {} |",
            weight_label(row.metrics.weight),
            cells.join(" | ")
        )?;
    }
    Ok(())
}

fn console_fit(out: &mut dyn Write, fit: &FitReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📈 Progression Fit".bright_cyan().bold())?;
    writeln!(out, "{}", "==================".cyan())?;
    writeln!(
        out,
        "{} {} at age {:.0} over {} standards ({})",
        fit.activity,
        fit.gender,
        fit.age,
        fit.standards,
        if fit.increasing {
            "higher is better"
        } else {
            "lower is better"
        }
    )?;
    writeln!(
        out,
        "f(x) = {:.4}·exp(−{:.4}·x) + {:.4}",
        fit.a, fit.b, fit.c
    )?;
    let status = if fit.converged {
        "✅ converged".green()
    } else {
        "❌ not converged".red()
    };
    writeln!(out, "{status} after {} evaluations", fit.evaluations)?;
    writeln!(out, "Max residual: {:.5}", fit.max_residual)?;
    writeln!(out)?;
    writeln!(out, "{:>6}{:>12}{:>12}", "step", "observed", "fitted")?;
    for step in &fit.steps {
        writeln!(
            out,
            "{:>6}{:>12.5}{:>12.5}",
            step.step, step.observed, step.fitted
        )?;
    }
    Ok(())
}

fn markdown_fit(out: &mut dyn Write, fit: &FitReport) -> Result<()> {
    writeln!(out, "# {} Progression Fit\n", fit.activity)?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Gender**: {}", fit.gender)?;
    writeln!(out, "- **Age**: {:.0}", fit.age)?;
    writeln!(out, "- **Standards**: {}", fit.standards)?;
    writeln!(
        out,
        "- **Curve**: `{:.4}·exp(−{:.4}·x) + {:.4}`",
        fit.a, fit.b, fit.c
    )?;
    writeln!(out, "- **Converged**: {}", fit.converged)?;
    writeln!(out, "- **Evaluations**: {}", fit.evaluations)?;
    writeln!(out, "- **Max residual**: {:.5}\n", fit.max_residual)?;
    writeln!(out, "## Ratios\n")?;
    writeln!(out, "| Step | Observed | Fitted |")?;
    writeln!(out, "|---|---|---|")?;
    for step in &fit.steps {
        writeln!(
            out,
            "| {} | {:.5} | {:.5} |",
            step.step, step.observed, step.fitted
        )?;
    }
    Ok(())
}

fn console_activities(out: &mut dyn Write, rows: &[ActivityRow]) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "🗂 Activities".bright_cyan().bold())?;
    writeln!(out, "{}", "============".cyan())?;
    for row in rows {
        writeln!(
            out,
            "{:<11} {:<10} {:<3} {:>4} standards  generators: {}",
            row.activity.to_string().bold(),
            row.attribute.to_string(),
            row.unit.to_string(),
            row.standards,
            generator_names(&row.generators)
        )?;
    }
    Ok(())
}

fn markdown_activities(out: &mut dyn Write, rows: &[ActivityRow]) -> Result<()> {
    writeln!(out, "# Activities\n")?;
    writeln!(out, "| Activity | Name | Attribute | Unit | Standards | Generators |")?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for row in rows {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            row.activity,
            row.name,
            row.attribute,
            row.unit,
            row.standards,
            generator_names(&row.generators)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brawn_levels::AttributeLevels;

    fn calc_report() -> CalcReport {
        CalcReport {
            output: LevelOutput {
                player: 42,
                attributes: AttributeLevels {
                    strength: 40,
                    power: 44,
                    endurance: 41,
                    agility: 43,
                },
            },
            metrics: Metrics::new(25.0, 86.18, Gender::Male),
            activities: vec![ActivityScore {
                activity: Activity::Run,
                attribute: Attribute::Endurance,
                unit: Unit::Ms,
                performance: 435_000.0,
                level: 41,
            }],
        }
    }

    fn table_report() -> TableReport {
        TableReport {
            activity: Activity::Run,
            name: "1.5 Mile Run".to_string(),
            unit: Unit::Ms,
            gender: Gender::Female,
            age: 30.0,
            rows: vec![Standard {
                metrics: Metrics::new(30.0, 63.0, Gender::Female),
                levels: Levels::from_values((1..=100_u32).map(|l| 900_000.0 - f64::from(l) * 4_000.0)),
            }],
        }
    }

    fn render(report: &Report, format: fn(&mut dyn Write, &Report) -> Result<()>) -> String {
        let mut buffer = Vec::new();
        format(&mut buffer, report).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn calc_json_keeps_output_shape() {
        let text = render(&Report::Calc(calc_report()), generate_json_report);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["player"], 42);
        assert_eq!(value["attributes"]["Strength"], 40);
        assert_eq!(value["attributes"]["Agility"], 43);
        assert_eq!(value["activities"][0]["activity"], "Run");
        assert_eq!(value["metrics"]["gender"], "Male");
    }

    #[test]
    fn calc_markdown_lists_attributes_and_activities() {
        let text = render(&Report::Calc(calc_report()), generate_markdown_report);
        assert!(text.starts_with("# Brawn Level Report"));
        assert!(text.contains("- **Player level**: 42"));
        assert!(text.contains("| Power | 44 |"));
        assert!(text.contains("| Run | Endurance | 7:15 | 41 |"));
    }

    #[test]
    fn table_uses_checkpoint_columns() {
        let text = render(&Report::Table(table_report()), generate_markdown_report);
        assert!(text.contains("| Body weight | L1 | L10 | L25 | L50 | L75 | L90 | L100 |"));
        // Level 50 is 900000 - 200000 ms.
        assert!(text.contains("| 11:40 |"));
        let console = render(&Report::Table(table_report()), generate_console_report);
        assert!(console.contains("1.5 Mile Run standards"));
        assert!(console.contains("63.0 kg (139 lb)"));
    }

    #[test]
    fn empty_table_is_reported() {
        let mut table = table_report();
        table.rows.clear();
        let text = render(&Report::Table(table), generate_markdown_report);
        assert!(text.contains("_No standards available._"));
    }

    #[test]
    fn activities_render_generators() {
        let rows = vec![ActivityRow {
            activity: Activity::BenchPress,
            name: "Bench Press".to_string(),
            attribute: Attribute::Strength,
            unit: Unit::Kg,
            generators: vec![Metric::Age, Metric::Weight],
            standards: 12,
        }];
        let text = render(&Report::Activities(rows), generate_markdown_report);
        assert!(text.contains("| BenchPress | Bench Press | Strength | kg | 12 | age, weight |"));
    }

    #[test]
    fn level_columns_shrink_with_max_level() {
        let levels = Levels::from_values((1..=9_u32).map(f64::from));
        assert_eq!(level_columns(&levels), vec![1, 9]);
        let levels = Levels::from_values((1..=30_u32).map(f64::from));
        assert_eq!(level_columns(&levels), vec![1, 10, 25, 30]);
    }
}
