use clap::Parser;
use rand::Rng;
use rand::rngs::ThreadRng;
use rand::seq::IndexedRandom;
use rulegrid::prelude::*;
use std::fs;

/// A CLI tool to generate rule payloads for exercising decision grid editors
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated JSON file to
    #[arg(short, long, default_value = "generated_rules.json")]
    output: String,

    /// Number of rules (rows) to generate
    #[arg(short, long, default_value_t = 20)]
    rows: usize,

    /// Number of plain condition columns
    #[arg(long, default_value_t = 3)]
    conditions: usize,

    /// Number of group columns, each with two to four inner rules
    #[arg(long, default_value_t = 1)]
    groups: usize,

    /// Number of result fields
    #[arg(long, default_value_t = 2)]
    results: usize,

    /// Decision id stamped on every rule
    #[arg(short, long, default_value = "generated")]
    decision_id: String,
}

const ATTRIBUTES: &[(&str, DataType, SourceType)] = &[
    ("age", DataType::Numeric, SourceType::Input),
    ("income", DataType::Numeric, SourceType::Input),
    ("country", DataType::String, SourceType::Global),
    ("segment", DataType::String, SourceType::Global),
    ("isMember", DataType::Boolean, SourceType::Input),
    ("signupDate", DataType::Date, SourceType::Input),
];

const COUNTRIES: &[&str] = &["DE", "FR", "NL", "US", "JP"];

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut rng = rand::rng();

    if cli.conditions + cli.groups == 0 {
        eprintln!("Error: at least one condition or group column is required");
        std::process::exit(1);
    }

    println!(
        "Generating {} rules ({} conditions, {} groups, {} results)...",
        cli.rows, cli.conditions, cli.groups, cli.results
    );

    let mut templates: Vec<Vec<Binding>> = (0..cli.conditions)
        .map(|_| vec![random_binding(&mut rng)])
        .collect();
    let group_start = templates.len();
    for _ in 0..cli.groups {
        let slots = rng.random_range(2..=4);
        templates.push((0..slots).map(|_| random_binding(&mut rng)).collect());
    }
    let result_keys: Vec<String> = (0..cli.results).map(|i| format!("result{}", i + 1)).collect();
    let outer = if rng.random_bool(0.5) {
        GroupOperator::All
    } else {
        GroupOperator::Any
    };

    let rules: Vec<RuleRow> = (0..cli.rows)
        .map(|i| {
            let nodes = templates
                .iter()
                .enumerate()
                .map(|(column, slots)| {
                    let leaves: Vec<ConditionLeaf> =
                        slots.iter().map(|b| random_leaf(&mut rng, b)).collect();
                    if column >= group_start {
                        RuleNode::Group(GroupNode::new(GroupOperator::All, leaves))
                    } else {
                        RuleNode::Leaf(leaves.into_iter().next().unwrap_or_default())
                    }
                })
                .collect();
            let result = result_keys
                .iter()
                .map(|key| (key.clone(), random_result(&mut rng)))
                .collect();
            RuleRow {
                id: format!("gen-{}", i + 1),
                priority: i as u32 + 1,
                enabled: rng.random_bool(0.9),
                condition_group: rulegrid::model::ConditionGroup {
                    operator: outer,
                    rules: nodes,
                },
                result,
                decision_id: Some(cli.decision_id.clone()),
                sub_id: Some(format!("{}-{}", cli.decision_id, i + 1)),
                created_at: 0,
            }
        })
        .collect();

    let payload = RulePayload {
        rules,
        ..RulePayload::default()
    };
    fs::write(&cli.output, payload.to_json()?)?;

    println!(
        "Successfully generated and saved {} rules to '{}'",
        payload.rules.len(),
        cli.output
    );
    Ok(())
}

fn random_binding(rng: &mut ThreadRng) -> Binding {
    let (name, data_type, source_type) = ATTRIBUTES
        .choose(rng)
        .copied()
        .unwrap_or(("age", DataType::Numeric, SourceType::Input));
    Binding::new(name, Some(source_type), Some(data_type))
}

fn random_leaf(rng: &mut ThreadRng, binding: &Binding) -> ConditionLeaf {
    let mut leaf = ConditionLeaf::from_binding(binding);
    let (operator, raw) = match binding.data_type {
        Some(DataType::Numeric) => match rng.random_range(0..3) {
            0 => {
                let min = rng.random_range(0..50);
                ("between", format!("{},{}", min, min + rng.random_range(1..50)))
            }
            1 => ("greaterThan", rng.random_range(0..100).to_string()),
            _ => ("equal", rng.random_range(0..100).to_string()),
        },
        Some(DataType::String) => {
            if rng.random_bool(0.5) {
                let picked: Vec<&str> = COUNTRIES.choose_multiple(rng, 2).copied().collect();
                ("in", picked.join(","))
            } else {
                ("equal", COUNTRIES.choose(rng).copied().unwrap_or("DE").to_string())
            }
        }
        Some(DataType::Boolean) => ("equal", rng.random_bool(0.5).to_string()),
        Some(DataType::Date | DataType::DateTime) => (
            "greaterThan",
            format!("2024-{:02}-{:02}", rng.random_range(1..=12), rng.random_range(1..=28)),
        ),
        None => ("", String::new()),
    };
    // Leave a few cells unfinished so validation has something to report.
    if rng.random_bool(0.05) {
        return leaf;
    }
    leaf.operator = Operator::new(operator);
    leaf.value =
        rulegrid::convert::convert(&RawInput::from(raw), binding.data_type, &leaf.operator);
    leaf
}

fn random_result(rng: &mut ThreadRng) -> ResultValue {
    match rng.random_range(0..4) {
        0 => ResultValue::Literal(Scalar::Text(
            COUNTRIES.choose(rng).copied().unwrap_or("DE").to_string(),
        )),
        1 => ResultValue::Attribute(AttributeReference::new(
            "segment",
            Some(SourceType::Global),
            Some(DataType::String),
        )),
        _ => ResultValue::Literal(Scalar::Number(rng.random_range(0..100) as f64)),
    }
}
