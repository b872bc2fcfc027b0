//! The `memtrain play` command.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use memtrain_client::config::{create_api, create_offline_api, load_config_from};
use memtrain_core::model::{ExerciseKind, ExerciseSession, Item, RecallMode, SessionPhase};
use memtrain_core::reconcile::normalize;
use memtrain_core::scheduler::PlaybackEvent;
use memtrain_core::session::{ApiCall, SessionController, SessionObserver};
use memtrain_core::summary::SessionSummary;

type Input = Lines<BufReader<Stdin>>;

/// Console observer for service calls and recoverable errors.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_phase_change(&self, from: SessionPhase, to: SessionPhase) {
        tracing::debug!(%from, %to, "phase change");
    }

    fn on_loading(&self, call: ApiCall, loading: bool) {
        if !loading {
            return;
        }
        match call {
            ApiCall::Start => eprintln!("  Starting session..."),
            ApiCall::Submit => eprintln!("  Submitting answers..."),
        }
    }

    fn on_error(&self, message: &str) {
        eprintln!("  ERROR: {message}");
    }
}

pub async fn execute(
    kind: Option<ExerciseKind>,
    offline: bool,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config.as_deref())?;
    let kind = kind.unwrap_or(config.default_kind);
    let api = if offline {
        create_offline_api(&config)
    } else {
        create_api(&config)?
    };

    let mut controller = SessionController::new(api, config.controller_config())
        .with_observer(Arc::new(ConsoleObserver));
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if !start(&mut controller, kind, &mut input).await? {
        return Ok(());
    }
    if !study(&mut controller, &mut input).await? {
        controller.reset();
        println!("Session abandoned.");
        return Ok(());
    }
    recall(&mut controller, &mut input).await?;
    submit(&mut controller, &mut input).await?;

    let summary = controller
        .summary()
        .context("session finished without a summary")?;
    print_summary(summary);

    if let Some(dir) = output {
        let path = summary.save_to_dir(&dir)?;
        eprintln!("Summary saved to: {}", path.display());
    }
    Ok(())
}

/// Returns `false` if the user gave up after a failure.
async fn start(
    controller: &mut SessionController,
    kind: ExerciseKind,
    input: &mut Input,
) -> Result<bool> {
    loop {
        let err = match controller.start_session(kind).await {
            Ok(session) => {
                announce(session);
                return Ok(true);
            }
            Err(err) => err,
        };
        if !err.is_retryable() {
            return Err(err.into());
        }
        if !confirm(input, "Could not start a session. Retry? [Y/n] ").await? {
            return Ok(false);
        }
        controller.dismiss_error();
    }
}

fn announce(session: &ExerciseSession) {
    let pacing = session.pacing();
    println!(
        "\n{} items ({}), {}ms each with {}ms gaps, about {:.0}s",
        session.item_count(),
        session.exercise_kind(),
        pacing.per_item_show_ms,
        pacing.inter_item_gap_ms,
        pacing.total_study_seconds
    );
    println!("Study: p pause, r resume, n next item while paused, q quit\n");
}

/// Play the study phase. Returns `false` if the user quit.
async fn study(controller: &mut SessionController, input: &mut Input) -> Result<bool> {
    let mut stdin_open = true;

    while controller.phase() == SessionPhase::Study {
        tokio::select! {
            event = controller.next_study_event() => match event {
                Some(event) => render(controller, &event.event),
                None => break,
            },
            line = input.next_line(), if stdin_open => match line? {
                Some(command) => {
                    if !handle_study_command(controller, command.trim()) {
                        return Ok(false);
                    }
                }
                None => {
                    stdin_open = false;
                    // Nobody is left to resume.
                    if let Some(event) = controller.resume_study() {
                        render(controller, &event.event);
                    }
                }
            },
        }
    }

    Ok(controller.phase() == SessionPhase::Recall)
}

fn handle_study_command(controller: &mut SessionController, command: &str) -> bool {
    let event = match command {
        "" => return true,
        "q" => return false,
        "p" => controller.pause_study().or_else(|| {
            println!("  already paused");
            None
        }),
        "r" => controller.resume_study().or_else(|| {
            println!("  not paused");
            None
        }),
        "n" => controller.skip_ahead().or_else(|| {
            println!("  pause first (p) to step through items");
            None
        }),
        other => {
            println!("  unknown command `{other}`");
            None
        }
    };
    if let Some(event) = event {
        render(controller, &event.event);
    }
    true
}

fn render(controller: &SessionController, event: &PlaybackEvent) {
    let Some(session) = controller.session() else {
        return;
    };
    let total = session.item_count();
    match *event {
        PlaybackEvent::Show { index } | PlaybackEvent::Skipped { index } => {
            if let Some(item) = session.target_items().get(index) {
                println!("  [{}/{total}] {}", index + 1, describe(item));
            }
        }
        PlaybackEvent::Gap { .. } => {}
        PlaybackEvent::Paused { index } => {
            println!("  paused on item {}", index + 1);
        }
        PlaybackEvent::Resumed { .. } => println!("  resumed"),
        PlaybackEvent::Complete => println!("\nStudy complete."),
    }
}

fn describe(item: &Item) -> String {
    match item {
        Item::Word { word } => word.clone(),
        Item::Digit { digit, hint } if hint.is_empty() => digit.to_string(),
        Item::Digit { digit, hint } => format!("{digit}  ({hint})"),
        Item::Face {
            identity_label,
            image_reference,
        } => format!("{identity_label}  [{image_reference}]"),
    }
}

async fn recall(controller: &mut SessionController, input: &mut Input) -> Result<()> {
    let session = controller
        .session()
        .context("recall started without a session")?;
    let items = session.target_items().to_vec();

    match session.recall_mode() {
        RecallMode::FreeForm => recall_free_form(controller, input, items.len()).await,
        RecallMode::FixedSlot => recall_fixed_slot(controller, input, &items).await,
    }
}

async fn recall_free_form(
    controller: &mut SessionController,
    input: &mut Input,
    item_count: usize,
) -> Result<()> {
    println!("\nRecall: type the {item_count} items, one per line, in order if you can.");
    println!("  :undo removes the last entry, :rm N removes entry N, :list shows entries");
    println!("  an empty line submits\n");

    loop {
        let recall = controller.recall_mut().context("recall is not active")?;
        prompt(&format!("{:>3}> ", recall.len() + 1))?;

        let Some(line) = input.next_line().await? else {
            break;
        };
        let recall = controller.recall_mut().context("recall is not active")?;
        let command = line.trim();

        if command.is_empty() {
            break;
        } else if command == ":undo" {
            match recall.pop() {
                Some(value) => println!("  removed {value}"),
                None => println!("  nothing to undo"),
            }
        } else if command == ":list" {
            for (i, entry) in recall.entries().iter().enumerate() {
                println!("  {:>3}. {entry}", i + 1);
            }
        } else if let Some(arg) = command.strip_prefix(":rm") {
            let removed = arg
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| recall.remove(i));
            match removed {
                Some(value) => println!("  removed {value}"),
                None => println!("  usage: :rm N, where N is an entry number"),
            }
        } else {
            recall.push(line);
        }
    }
    Ok(())
}

async fn recall_fixed_slot(
    controller: &mut SessionController,
    input: &mut Input,
    items: &[Item],
) -> Result<()> {
    println!("\nRecall: answer each position, leave blank to skip.\n");

    for (i, item) in items.iter().enumerate() {
        match item {
            Item::Face {
                image_reference, ..
            } => prompt(&format!("{:>3} [{image_reference}]: ", i + 1))?,
            _ => prompt(&format!("{:>3}: ", i + 1))?,
        }
        let Some(line) = input.next_line().await? else {
            break;
        };
        let recall = controller.recall_mut().context("recall is not active")?;
        recall.set_slot(i, line);
    }
    Ok(())
}

async fn submit(controller: &mut SessionController, input: &mut Input) -> Result<()> {
    loop {
        let err = match controller.submit().await {
            Ok(_) => return Ok(()),
            Err(err) => err,
        };
        if !err.is_retryable()
            || !confirm(input, "Submission failed, your answers are kept. Retry? [Y/n] ").await?
        {
            return Err(err.into());
        }
        controller.dismiss_error();
    }
}

fn print_summary(summary: &SessionSummary) {
    let server = &summary.server;

    let mut table = Table::new();
    table.set_header(vec!["#", "Target", "Your answer", ""]);
    for (i, (item, answer)) in summary
        .shown_targets
        .iter()
        .zip(&summary.local.positioned_answers)
        .enumerate()
    {
        let label = item.label();
        let mark = if answer.trim().is_empty() {
            "missed"
        } else if normalize(answer) == normalize(&label) {
            "ok"
        } else {
            "wrong"
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(label),
            Cell::new(answer),
            Cell::new(mark),
        ]);
    }
    println!("\n{table}");

    println!(
        "Recalled {}/{} ({:.0}%), {} in order, {} point(s)",
        server.unordered_correct_count,
        server.total,
        summary.accuracy() * 100.0,
        server.ordered_correct_count,
        server.points_earned
    );
    // Free-form extras never reach the service, so list the local ones.
    if !summary.local.extra_answers.is_empty() {
        let extras: Vec<&str> = summary.local.extra_answers.iter().map(String::as_str).collect();
        println!("Not in the sequence: {}", extras.join(", "));
    }
    if let Some(level) = server.updated_skill_level {
        println!("Skill level: {level}");
    }
    if !server.new_badges.is_empty() {
        println!("New badges: {}", server.new_badges.join(", "));
    }
    if summary.has_discrepancy() {
        println!("(scores shown are the service's; the local preview differed)");
    }
}

fn prompt(text: &str) -> Result<()> {
    print!("{text}");
    std::io::stdout().flush()?;
    Ok(())
}

async fn confirm(input: &mut Input, question: &str) -> Result<bool> {
    prompt(question)?;
    let answer = input.next_line().await?.unwrap_or_else(|| "n".into());
    Ok(!matches!(
        answer.trim().to_lowercase().as_str(),
        "n" | "no"
    ))
}
