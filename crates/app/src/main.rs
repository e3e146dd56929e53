use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use exam_core::geometry::{ContainerSize, PixelDelta, ResizeCorner};
use exam_core::model::{
    Answer, AuthoringSettings, ExamId, ExamSettingsDraft, ExerciseId, HotspotFields, HotspotKind,
    ItemPayload, QuestionKind, StepImage,
};
use exam_core::sequencer::TextTrigger;
use services::authoring::{DetachedPointer, HotspotAuthoringController, HotspotWriter, Tool};
use services::exam::{
    Countdown, EvaluatorConfig, HttpEvaluator, ItemSelectionEngine, SessionController,
    SubmissionPipeline, SubmissionTicket, TICK_PERIOD,
};
use services::{Clock, SessionError};
use storage::repository::{InMemoryRepository, Storage};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod demo;

/// Delay between simulated learner actions.
const LEARNER_PACE: Duration = Duration::from_millis(250);

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse().ok())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- exam   [--questions <n>] [--exercises <n>] [--duration <minutes>]");
    eprintln!("                             [--seed <u64>] [--evaluator-url <url>]");
    eprintln!("  cargo run -p app -- author");
    eprintln!();
    eprintln!("Defaults for exam:");
    eprintln!("  --questions 3 --exercises 1, untimed");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_QUESTIONS, EXAM_EXERCISES, EXAM_DURATION_MINUTES, EXAM_SEED,");
    eprintln!("  EXAM_EVALUATOR_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Exam,
    Author,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "exam" => Some(Self::Exam),
            "author" => Some(Self::Author),
            _ => None,
        }
    }
}

struct ExamArgs {
    questions: usize,
    exercises: usize,
    duration_minutes: Option<u32>,
    seed: Option<u64>,
    evaluator_url: Option<String>,
}

impl ExamArgs {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            questions: env_number("EXAM_QUESTIONS").unwrap_or(3),
            exercises: env_number("EXAM_EXERCISES").unwrap_or(1),
            duration_minutes: env_number("EXAM_DURATION_MINUTES"),
            seed: env_number("EXAM_SEED"),
            evaluator_url: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--questions" => {
                    parsed.questions =
                        parse_number("--questions", require_value(args, "--questions")?)?;
                }
                "--exercises" => {
                    parsed.exercises =
                        parse_number("--exercises", require_value(args, "--exercises")?)?;
                }
                "--duration" => {
                    parsed.duration_minutes =
                        Some(parse_number("--duration", require_value(args, "--duration")?)?);
                }
                "--seed" => {
                    parsed.seed = Some(parse_number("--seed", require_value(args, "--seed")?)?);
                }
                "--evaluator-url" => {
                    parsed.evaluator_url = Some(require_value(args, "--evaluator-url")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Exam,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Exam,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let repo = InMemoryRepository::new();
    demo::seed(&repo).await?;

    let mut iter = argv.into_iter();
    match cmd {
        Command::Exam => {
            let args = ExamArgs::parse(&mut iter).map_err(|e| {
                eprintln!("{e}");
                print_usage();
                e
            })?;
            run_exam(Storage::from_repository(repo), args).await
        }
        Command::Author => {
            if let Some(arg) = iter.next() {
                return Err(ArgsError::UnknownArg(arg).into());
            }
            run_author(repo).await
        }
    }
}

//
// ─── EXAM ──────────────────────────────────────────────────────────────────────
//

async fn run_exam(storage: Storage, args: ExamArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = ExamSettingsDraft {
        duration_minutes: args.duration_minutes,
        question_count: args.questions,
        exercise_count: args.exercises,
    }
    .validate()?;
    let evaluator = match args.evaluator_url.as_deref() {
        Some(url) => Some(EvaluatorConfig::new(url)?),
        None => EvaluatorConfig::from_env()?,
    };
    let pipeline = SubmissionPipeline::new(Arc::new(HttpEvaluator::new(evaluator)));

    let engine = ItemSelectionEngine::from_storage(&storage).with_seed(args.seed);
    let mut session =
        SessionController::start(ExamId::new(1), &settings, &engine, Clock::default()).await?;

    let (countdown, mut ticks) = Countdown::start(TICK_PERIOD);
    let mut pace = tokio::time::interval(LEARNER_PACE);
    let ticket: SubmissionTicket = loop {
        tokio::select! {
            Some(()) = ticks.recv() => {
                if let Some(ticket) = session.tick() {
                    break ticket;
                }
            }
            _ = pace.tick() => {
                if let Some(ticket) = learner_step(&mut session)? {
                    break ticket;
                }
            }
        }
    };
    drop(countdown);

    let outcome = pipeline.run(ticket).await;
    let outcome = session.complete(outcome)?;
    match (&outcome.evaluation, &outcome.evaluation_error) {
        (Some(evaluation), _) => println!("Score: {:.2}", evaluation.score),
        (None, Some(err)) => println!("Results are unevaluated: {err}"),
        (None, None) => println!("Results are unevaluated"),
    }
    println!("{}", serde_json::to_string_pretty(&outcome.bundle)?);
    Ok(())
}

/// Answer the current item, then move on. Submits after the last item.
fn learner_step(
    session: &mut SessionController,
) -> Result<Option<SubmissionTicket>, SessionError> {
    answer_current(session)?;
    let progress = session.progress();
    tracing::info!(
        item = progress.current_index + 1,
        total = progress.total,
        answered = progress.answered,
        remaining_seconds = ?progress.remaining_seconds,
        "Learner answered item"
    );
    if session.next_item()? {
        return Ok(None);
    }
    session.request_submit()?;
    session.confirm_submit()
}

fn answer_current(session: &mut SessionController) -> Result<(), SessionError> {
    let Some(item) = session.current_item().cloned() else {
        return Ok(());
    };
    let key = item.key();
    match item.payload() {
        ItemPayload::Question(question) => match question.kind() {
            QuestionKind::TrueFalse => session.answer_question(key, Answer::Boolean(true)),
            QuestionKind::SingleChoice { options } => match options.first() {
                Some(option) => session.answer_question(key, Answer::Single(option.id)),
                None => Ok(()),
            },
            QuestionKind::MultipleChoice { options } => {
                let picked = options.iter().step_by(2).map(|o| o.id).collect();
                session.answer_question(key, Answer::Multiple(picked))
            }
            QuestionKind::Ordering { options } => {
                session.move_option(key, 0, options.len().saturating_sub(1))
            }
        },
        ItemPayload::Exercise(exercise) => {
            for (index, step) in exercise.steps().iter().enumerate() {
                session.go_to_step(key, index)?;
                for hotspot in step.hotspots() {
                    let target = session
                        .exercise_progress(key)
                        .and_then(|progress| progress.hit_test(exercise, demo::center(hotspot)))
                        .map_or(hotspot.id(), |hit| hit.id());
                    let Some(target) = step.hotspot(target) else {
                        continue;
                    };
                    match target.kind() {
                        HotspotKind::Button => {
                            session.press_hotspot(key, step.id(), target.id())?;
                        }
                        HotspotKind::Textbox => {
                            let value = target.correct_answer().unwrap_or("n/a");
                            session.enter_hotspot_text(
                                key,
                                step.id(),
                                target.id(),
                                value,
                                TextTrigger::Enter,
                            )?;
                        }
                    }
                }
            }
            Ok(())
        }
    }
}

//
// ─── AUTHORING ─────────────────────────────────────────────────────────────────
//

async fn run_author(repo: InMemoryRepository) -> Result<(), Box<dyn std::error::Error>> {
    let exercise = demo::exercise(&repo, ExerciseId::new(2)).await?;
    let writer = HotspotWriter::new(Arc::new(repo.clone()));
    let mut ctl = HotspotAuthoringController::new(
        exercise,
        AuthoringSettings::default(),
        Arc::new(DetachedPointer),
    );
    let container = ContainerSize::new(1280.0, 800.0)?;

    ctl.select_tool(Tool::Textbox);
    if let Some(request) = ctl.click_container(640.0, 400.0, container)? {
        ctl.reconcile(writer.send(request).await);
    }
    let id = ctl.selected().ok_or("placed hotspot was not selected")?;

    ctl.begin_drag(id, container)?;
    for i in 1..=5 {
        ctl.pointer_move(PixelDelta::new(20.0 * f64::from(i), -10.0 * f64::from(i)))?;
    }
    if let Some(request) = ctl.release()? {
        ctl.reconcile(writer.send(request).await);
    }

    ctl.begin_resize(id, ResizeCorner::SouthEast, container)?;
    ctl.pointer_move(PixelDelta::new(64.0, 16.0))?;
    if let Some(request) = ctl.release()? {
        ctl.reconcile(writer.send(request).await);
    }

    ctl.open_editor(id)?;
    let request = ctl.save_edit(HotspotFields {
        label: Some("Search".into()),
        placeholder: Some("Type here".into()),
        correct_answer: Some("printer settings".into()),
        case_sensitive: false,
    })?;
    ctl.reconcile(writer.send(request).await);

    let image = StepImage::new("https://cdn.example.com/print-dialog.png", 1280, 800)?;
    let step_id = ctl.add_step(&repo, image).await?;
    ctl.set_active_step(step_id)?;
    ctl.select_tool(Tool::Button);
    if let Some(request) = ctl.click_container(1100.0, 700.0, container)? {
        ctl.reconcile(writer.send(request).await);
    }

    for notice in ctl.take_notices() {
        eprintln!("{:?}: {}", notice.level, notice.message);
    }
    println!("{}", ctl.exercise().title());
    for step in ctl.exercise().steps() {
        println!("Step {} ({})", step.step_number(), step.image().url());
        for hotspot in step.hotspots() {
            let rect = hotspot.rect();
            println!(
                "  #{} {:?} at ({:.2}, {:.2}) size {:.2} x {:.2}",
                hotspot.display_number(),
                hotspot.kind(),
                rect.x,
                rect.y,
                rect.width,
                rect.height
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
