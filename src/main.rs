use courtlog::{
    stats::{bar_length, DailyReport},
    AppError, DailyState, JsonFileLedgerRepository, LedgerConfig, LedgerService, MatchRecord,
    Registration,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BAR_WIDTH: usize = 20;

const HELP: &str = "\
commands (quote names with spaces, e.g. \"Mary Jane\"):
  add-player NAME
  rename OLD NEW
  remove NAME
  match P1 P2 P3 P4 [REMARK]
  reset
  stats
  history
  quit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    // Logs go to stderr so they never interleave with the console output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courtlog=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = LedgerConfig::from_env();
    info!(
        data_file = %config.data_file.display(),
        utc_offset_minutes = config.utc_offset_minutes,
        counter_policy = %config.counter_policy,
        "Starting badminton ledger"
    );

    let service = LedgerService::builder(
        Arc::new(JsonFileLedgerRepository::new(&config.data_file)),
        Arc::new(config.clock()),
    )
    .with_counter_policy(config.counter_policy)
    .with_report_settings(config.report.clone())
    .build();

    // Surface a corrupt or unreadable snapshot before taking any input
    let state = service.current_state().await?;
    let mut out = tokio::io::stdout();
    write_out(
        &mut out,
        &format!(
            "{} - {} players, {} matches today\n{HELP}\n",
            state.date(),
            state.registry().len(),
            state.matches().len()
        ),
    )
    .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words = split_args(&line);
        let Some((verb, args)) = words.split_first() else {
            continue;
        };
        let verb = verb.as_str();
        if verb == "quit" || verb == "exit" {
            break;
        }

        let reply = match run(&service, verb, args).await {
            Ok(reply) => reply,
            Err(err) if err.is_validation() => format!("rejected: {err}"),
            Err(err) => {
                error!(error = %err, command = verb, "Command failed");
                format!("error: {err}")
            }
        };
        write_out(&mut out, &format!("{reply}\n")).await?;
    }

    info!("Console closed");
    Ok(())
}

/// Splits a console line on whitespace, keeping double-quoted runs together.
///
/// An unterminated quote runs to the end of the line.
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for ch in line.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}

async fn run(service: &LedgerService, verb: &str, args: &[String]) -> Result<String, AppError> {
    match (verb, args) {
        ("add-player", [_, ..]) => match service.register_player(&args.join(" ")).await? {
            Registration::Created(key) => Ok(format!("registered {key}")),
            Registration::Existing(key) => Ok(format!("{key} is already registered")),
        },
        ("rename", [old, new]) => {
            let key = service.rename_player(old, new).await?;
            Ok(format!("renamed {} to {key}", old.trim().to_uppercase()))
        }
        ("remove", [_, ..]) => {
            let record = service.remove_player(&args.join(" ")).await?;
            Ok(format!("removed {}", record.key))
        }
        ("match", [a, b, c, d, remark @ ..]) => {
            let remark = remark.join(" ");
            let record = service
                .add_match(&[a, b, c, d], Some(remark.as_str()))
                .await?;
            Ok(format!(
                "match #{} at {}: {}",
                record.id,
                record.time.format("%H:%M"),
                describe_teams(&record)
            ))
        }
        ("reset", []) => {
            let state = service.reset_day().await?;
            Ok(format!(
                "day reset, {} players kept",
                state.registry().len()
            ))
        }
        ("stats", []) => Ok(render_report(&service.report().await?)),
        ("history", []) => Ok(render_history(&service.current_state().await?)),
        ("help", _) => Ok(HELP.to_string()),
        _ => Ok(format!("unrecognised input\n{HELP}")),
    }
}

fn describe_teams(record: &MatchRecord) -> String {
    match record.teams() {
        Some(([a, b], [c, d])) => format!("{a} & {b} vs {c} & {d}"),
        None => record
            .players
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn render_report(report: &DailyReport) -> String {
    let mut lines = vec![format!(
        "{} - {} matches",
        report.date, report.total_matches
    )];

    lines.push("games played:".to_string());
    for (key, count) in &report.ranked {
        let cells = bar_length(*count, report.max_count, BAR_WIDTH);
        lines.push(format!(
            "  {:<12} {:<width$} {count}",
            key.as_str(),
            "#".repeat(cells),
            width = BAR_WIDTH
        ));
    }

    lines.push(format!("most active (top {}):", report.top_active.len()));
    for (rank, (key, count)) in report.top_active.iter().enumerate() {
        lines.push(format!("  {}. {key} ({count})", rank + 1));
    }

    lines.push("by time window:".to_string());
    for bucket in &report.histogram.buckets {
        let players: Vec<String> = bucket
            .players
            .iter()
            .map(|(key, count)| format!("{key} {count}"))
            .collect();
        lines.push(format!(
            "  {:<10} {} matches  {}",
            bucket.label,
            bucket.matches,
            players.join(", ")
        ));
    }
    if report.histogram.unclassified > 0 {
        lines.push(format!(
            "  {} matches outside every window",
            report.histogram.unclassified
        ));
    }
    lines.join("\n")
}

fn render_history(state: &DailyState) -> String {
    if state.matches().is_empty() {
        return "no matches yet today".to_string();
    }
    state
        .history()
        .map(|record| {
            format!(
                "#{:<3} {}  {}  {}",
                record.id,
                record.time.format("%H:%M"),
                describe_teams(record),
                record.remark.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn write_out(out: &mut tokio::io::Stdout, text: &str) -> Result<(), AppError> {
    out.write_all(text.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("stats", vec!["stats"])]
    #[case("  rename  bob   rob ", vec!["rename", "bob", "rob"])]
    #[case(r#"rename "Mary Jane" "Mary Ann""#, vec!["rename", "Mary Jane", "Mary Ann"])]
    #[case(r#"match "Mary Jane" bob carol dave long rally"#, vec!["match", "Mary Jane", "bob", "carol", "dave", "long", "rally"])]
    #[case(r#"add-player "Mary Jane"#, vec!["add-player", "Mary Jane"])]
    #[case(r#"match a b "" d"#, vec!["match", "a", "b", "", "d"])]
    #[case("", vec![])]
    fn splits_console_arguments(#[case] line: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_args(line), expected);
    }
}
