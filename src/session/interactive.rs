//! Interactive terminal session
//!
//! Generate a record, get a summary, edit it, save, and watch preferences
//! accumulate into rules.

use anyhow::Result;
use crossterm::{execute, style::{Color, Print, ResetColor, SetForegroundColor}};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::Helper;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::oracle::Oracle;
use crate::source::{DocumentSource, FileSource, MedicalRecordGenerator};
use crate::types::LearningRate;

use super::view::{self, Notice, NoticeLevel};
use super::{CycleOutcome, Session};

const COMMANDS: &[&str] = &[
    "/record", "/load", "/show", "/summarize", "/edit", "/prefer", "/save",
    "/rules", "/observations", "/delete", "/rate", "/help", "/quit",
    "/rate slow", "/rate normal", "/rate fast",
];

/// Command completion and hints
struct SessionHelper;

impl Completer for SessionHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let partial = &line[..pos];
        if !partial.starts_with('/') {
            return Ok((pos, Vec::new()));
        }
        let matches = COMMANDS
            .iter()
            .filter(|c| c.starts_with(partial))
            .map(|c| Pair {
                display: c.to_string(),
                replacement: c[partial.len()..].to_string(),
            })
            .collect();
        Ok((pos, matches))
    }
}

impl Hinter for SessionHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if !line.starts_with('/') || pos < line.len() {
            return None;
        }
        COMMANDS
            .iter()
            .find(|c| c.starts_with(line) && **c != line)
            .map(|c| c[line.len()..].to_string())
    }
}

impl Validator for SessionHelper {
    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Highlighter for SessionHelper {}

impl Helper for SessionHelper {}

type Editor = rustyline::Editor<SessionHelper, rustyline::history::DefaultHistory>;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Record,
    Load(String),
    Show,
    Summarize,
    Edit,
    Prefer(Option<String>),
    Save,
    Rules,
    Observations,
    Delete(String),
    Rate(String),
    Help,
    Quit,
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    fn parse(input: &str) -> Self {
        let input = input.trim();
        let (name, arg) = match input.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (input, ""),
        };
        match name {
            "/record" => Command::Record,
            "/load" if arg.is_empty() => Command::Usage("Usage: /load <path>"),
            "/load" => Command::Load(arg.to_string()),
            "/show" => Command::Show,
            "/summarize" => Command::Summarize,
            "/edit" => Command::Edit,
            "/prefer" => Command::Prefer(Some(arg.to_string()).filter(|a| !a.is_empty())),
            "/save" => Command::Save,
            "/rules" => Command::Rules,
            "/observations" => Command::Observations,
            "/delete" => Command::Delete(arg.to_string()),
            "/rate" => Command::Rate(arg.to_string()),
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// What the read loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    ReadEdit,
    Quit,
}

/// REPL state around the learning session
struct Workbench {
    session: Session,
    generator: Box<dyn DocumentSource>,
    document: Option<String>,
    edited: Option<String>,
    preference: Option<String>,
}

impl Workbench {
    fn new(session: Session, generator: Box<dyn DocumentSource>) -> Self {
        Self {
            session,
            generator,
            document: None,
            edited: None,
            preference: None,
        }
    }

    /// Replace the document with a fresh synthetic record
    fn record(&mut self) -> Result<()> {
        let document = self.generator.generate_document()?;
        self.set_document(document);
        Ok(())
    }

    /// Replace the document with a file's contents; on error nothing changes
    fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let document = FileSource::new(path).generate_document()?;
        self.set_document(document);
        Ok(())
    }

    fn set_document(&mut self, document: String) {
        self.document = Some(document);
        self.edited = None;
        self.preference = None;
        self.session.clear_draft();
    }
}

fn print_colored(text: &str, color: Color) {
    let _ = execute!(
        io::stdout(),
        SetForegroundColor(color),
        Print(text),
        ResetColor
    );
}

fn print_dim(text: &str) {
    print_colored(text, Color::DarkGrey);
    println!();
}

fn print_header(text: &str) {
    print_colored(&format!("\n{}\n", text), Color::Cyan);
}

fn print_error(text: &str) {
    print_colored(text, Color::Red);
    println!();
}

fn print_notice(notice: &Notice) {
    let (marker, color) = match notice.level {
        NoticeLevel::Success => ("✓", Color::Green),
        NoticeLevel::Info => ("·", Color::Cyan),
        NoticeLevel::Warning => ("!", Color::Yellow),
        NoticeLevel::Error => ("✗", Color::Red),
    };
    print_colored(&format!("{} {}", marker, notice.message), color);
    println!();
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.dim} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn print_banner(session: &Session, oracle: &str) {
    println!();
    println!("  \x1b[1mtractorbeam v{}\x1b[0m", crate::VERSION);
    println!();
    println!("  \x1b[90moracle\x1b[0m   \x1b[36m{}\x1b[0m", oracle);
    println!(
        "  \x1b[90mrate\x1b[0m     \x1b[32m{}\x1b[0m (promote at {})",
        session.learning_rate(),
        session.threshold()
    );
    println!("  \x1b[90mrules\x1b[0m    {}", session.rules().len());
    println!();
    println!("  \x1b[90m/help for commands · Tab for autocomplete\x1b[0m");
    println!();
}

fn print_help() {
    print_header("Document");
    println!("  /record          Generate a new synthetic record");
    println!("  /load <path>     Use a text file as the document");
    println!("  /show            Show the document, summary and pending edit");
    println!();
    print_header("Feedback");
    println!("  /summarize       Summarize the document under the current rules");
    println!("  /edit            Enter an edited summary (finish with a line containing '.')");
    println!("  /prefer <text>   Attach a direct preference to the next save");
    println!("  /save            Analyze the edit and preference, update observations");
    println!();
    print_header("Learning");
    println!("  /rules           List active rules");
    println!("  /observations    List observations by count");
    println!("  /delete <n>      Delete rule number n");
    println!("  /rate [name]     Show or set the learning rate: slow, normal, fast");
    println!();
    println!("  /help            Show this help");
    println!("  /quit            Exit");
    println!();
}

fn print_rules(session: &Session) {
    print_header("Active rules");
    let rules = view::rules_view(session.store());
    if rules.is_empty() {
        print_dim("  (none)");
    }
    for (i, rule) in rules.iter().enumerate() {
        println!("  {}. {}", i + 1, rule.display);
    }
    println!();
}

fn print_observations(session: &Session) {
    print_header(&format!("Observations (promote at {})", session.threshold()));
    let observations = view::observations_view(session.store());
    if observations.is_empty() {
        print_dim("  (none yet)");
    }
    for obs in observations {
        println!("  \x1b[33m{:>3}\x1b[0m  {}", obs.count, obs.display);
    }
    println!();
}

fn print_show(bench: &Workbench) {
    match &bench.document {
        Some(doc) => {
            print_header("Document");
            println!("{}", doc);
        }
        None => print_dim("  No document. Use /record or /load <path>."),
    }
    if let Some(draft) = bench.session.draft() {
        print_header("Summary");
        println!("{}", draft.initial_summary);
    }
    if let Some(edited) = &bench.edited {
        print_header("Edited summary");
        println!("{}", edited);
    }
    if let Some(pref) = &bench.preference {
        print_header("Pending preference");
        println!("{}", pref);
    }
    println!();
}

/// Collect lines until a line holding only '.'
fn read_multiline(rl: &mut Editor) -> Result<Option<String>> {
    print_dim("  Enter the edited summary. Finish with a line containing only '.'");
    let mut lines = Vec::new();
    loop {
        match rl.readline("  ") {
            Ok(line) if line.trim() == "." => break,
            Ok(line) => lines.push(line),
            Err(rustyline::error::ReadlineError::Interrupted) => return Ok(None),
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(lines.join("\n")))
}

async fn summarize(bench: &mut Workbench) {
    let Some(document) = bench.document.clone() else {
        print_error("No document to summarize. Use /record or /load <path> first.");
        return;
    };
    let spinner = create_spinner("Summarizing...");
    let result = bench.session.summarize(&document).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            bench.edited = None;
            print_header("Summary");
            println!("{}", summary);
            println!();
            print_dim("  /edit to revise it, /prefer to add a preference, then /save.");
        }
        Err(e) => print_notice(&view::error_notice(&e)),
    }
}

async fn save(bench: &mut Workbench) {
    let Some(draft) = bench.session.draft() else {
        print_error("Nothing to save. Use /summarize first.");
        return;
    };
    let edited = bench
        .edited
        .clone()
        .unwrap_or_else(|| draft.initial_summary.clone());

    let spinner = create_spinner("Analyzing feedback...");
    let result = bench.session.save(&edited, bench.preference.clone()).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            print_notice(&view::outcome_notice(&outcome));
            if let CycleOutcome::Completed(report) = &outcome {
                for rule in &report.promoted {
                    print_colored(&format!("  ★ New rule: {}", rule.display()), Color::Magenta);
                    println!();
                }
            }
            if !matches!(outcome, CycleOutcome::OracleFailed(_)) {
                bench.preference = None;
            }
        }
        Err(e) => print_notice(&view::error_notice(&e)),
    }
}

fn set_rate(session: &mut Session, arg: &str) {
    if arg.is_empty() {
        let names: Vec<String> = LearningRate::all()
            .iter()
            .map(|r| format!("{} ({})", r, r.threshold()))
            .collect();
        println!(
            "  Learning rate: {} · available: {}",
            session.learning_rate(),
            names.join(", ")
        );
        return;
    }
    match LearningRate::parse_name(arg) {
        Some(rate) => {
            session.set_learning_rate(rate);
            print_notice(&Notice {
                level: NoticeLevel::Success,
                message: format!("Learning rate set to {} (promote at {})", rate, rate.threshold()),
            });
        }
        None => print_error(&format!("Unknown learning rate '{}'. Use slow, normal or fast.", arg)),
    }
}

fn delete_rule(session: &mut Session, arg: &str) {
    let index = match arg.parse::<usize>() {
        Ok(n) if n >= 1 => n - 1,
        _ => {
            print_error("Usage: /delete <n> (see /rules for numbers)");
            return;
        }
    };
    match session.delete_rule_at(index) {
        Some(rule) => print_notice(&Notice {
            level: NoticeLevel::Success,
            message: format!("Deleted rule: {}", rule.display()),
        }),
        None => print_error(&format!("No rule number {}", index + 1)),
    }
}

/// Apply one command to the workbench
async fn dispatch(bench: &mut Workbench, command: Command) -> Step {
    match command {
        Command::Record => match bench.record() {
            Ok(()) => print_show(bench),
            Err(e) => print_error(&format!("Could not generate a record: {:#}", e)),
        },
        Command::Load(path) => match bench.load(&path) {
            Ok(()) => print_show(bench),
            Err(e) => print_error(&format!("{:#}", e)),
        },
        Command::Show => print_show(bench),
        Command::Summarize => summarize(bench).await,
        Command::Edit => {
            if bench.session.draft().is_none() {
                print_error("Nothing to edit. Use /summarize first.");
            } else {
                return Step::ReadEdit;
            }
        }
        Command::Prefer(None) => {
            bench.preference = None;
            print_dim("  Pending preference cleared.");
        }
        Command::Prefer(Some(text)) => {
            bench.preference = Some(text);
            print_dim("  Preference attached to the next save.");
        }
        Command::Save => save(bench).await,
        Command::Rules => print_rules(&bench.session),
        Command::Observations => print_observations(&bench.session),
        Command::Delete(arg) => delete_rule(&mut bench.session, &arg),
        Command::Rate(arg) => set_rate(&mut bench.session, &arg),
        Command::Help => print_help(),
        Command::Quit => return Step::Quit,
        Command::Usage(usage) => print_error(usage),
        Command::Unknown(name) => print_error(&format!("Unknown command '{}'. Type /help.", name)),
    }
    Step::Continue
}

/// Run the interactive session.
///
/// `/record` always draws from `generator`; `/load` and `initial_file` read a
/// file once without replacing it.
pub async fn run(
    config: Config,
    oracle: Arc<dyn Oracle>,
    generator: Box<dyn DocumentSource>,
    initial_file: Option<PathBuf>,
) -> Result<()> {
    let oracle_name = oracle.name();
    let mut bench = Workbench::new(Session::new(&config, oracle), generator);

    print_banner(&bench.session, oracle_name);

    if let Some(path) = initial_file {
        match bench.load(&path) {
            Ok(()) => print_show(&bench),
            Err(e) => print_error(&format!("{:#}", e)),
        }
    }

    let rl_config = rustyline::Config::builder()
        .completion_type(rustyline::CompletionType::List)
        .edit_mode(rustyline::EditMode::Emacs)
        .auto_add_history(true)
        .build();
    let mut rl = Editor::with_config(rl_config)?;
    rl.set_helper(Some(SessionHelper));

    loop {
        let line = match rl.readline("\x1b[32m❯\x1b[0m ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                print_error(&format!("Error: {}", e));
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match dispatch(&mut bench, Command::parse(&line)).await {
            Step::Continue => {}
            Step::Quit => break,
            Step::ReadEdit => match read_multiline(&mut rl)? {
                Some(text) => {
                    bench.edited = Some(text);
                    print_dim("  Edit stored. /save to submit it.");
                }
                None => print_dim("  Edit cancelled."),
            },
        }
    }

    print_dim("  Session ended. Rules are not persisted between sessions.");
    Ok(())
}

/// Default document source for a session
pub fn default_source(words: usize, seed: Option<u64>) -> Box<dyn DocumentSource> {
    let generator = match seed {
        Some(seed) => MedicalRecordGenerator::seeded(seed),
        None => MedicalRecordGenerator::new(),
    };
    Box::new(generator.word_count(words))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ScriptedOracle;

    fn bench() -> Workbench {
        let session = Session::new(&Config::default(), Arc::new(ScriptedOracle::new()));
        Workbench::new(session, default_source(200, Some(11)))
    }

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/record"), Command::Record);
        assert_eq!(Command::parse("  /load  notes/a.txt "), Command::Load("notes/a.txt".to_string()));
        assert!(matches!(Command::parse("/load"), Command::Usage(_)));
        assert_eq!(Command::parse("/prefer"), Command::Prefer(None));
        assert_eq!(
            Command::parse("/prefer Put the plan last"),
            Command::Prefer(Some("Put the plan last".to_string()))
        );
        assert_eq!(Command::parse("/rate fast"), Command::Rate("fast".to_string()));
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/bogus x"), Command::Unknown("/bogus".to_string()));
    }

    #[tokio::test]
    async fn test_record_after_load_generates_new_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "Patient is stable.\n").unwrap();

        let mut bench = bench();
        let step = dispatch(&mut bench, Command::Load(path.display().to_string())).await;
        assert_eq!(step, Step::Continue);
        assert_eq!(bench.document.as_deref(), Some("Patient is stable.\n"));

        dispatch(&mut bench, Command::Record).await;
        let record = bench.document.clone().unwrap();
        assert_ne!(record, "Patient is stable.\n");
        assert!(record.split_whitespace().count() > 50);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_document_and_generator() {
        let dir = tempfile::tempdir().unwrap();
        let mut bench = bench();
        dispatch(&mut bench, Command::Record).await;
        let before = bench.document.clone();

        dispatch(&mut bench, Command::Load(dir.path().join("missing.txt").display().to_string())).await;
        assert_eq!(bench.document, before);

        dispatch(&mut bench, Command::Record).await;
        assert!(bench.document.is_some());
        assert_ne!(bench.document, before);
    }

    #[tokio::test]
    async fn test_new_document_clears_pending_feedback() {
        let mut bench = bench();
        dispatch(&mut bench, Command::Record).await;
        dispatch(&mut bench, Command::Summarize).await;
        assert!(bench.session.draft().is_some());
        assert_eq!(dispatch(&mut bench, Command::Edit).await, Step::ReadEdit);

        bench.edited = Some("edited".to_string());
        dispatch(&mut bench, Command::Prefer(Some("Be brief".to_string()))).await;
        dispatch(&mut bench, Command::Record).await;

        assert!(bench.session.draft().is_none());
        assert!(bench.edited.is_none());
        assert!(bench.preference.is_none());
        assert_eq!(dispatch(&mut bench, Command::Edit).await, Step::Continue);
    }

    #[tokio::test]
    async fn test_quit() {
        assert_eq!(dispatch(&mut bench(), Command::Quit).await, Step::Quit);
    }
}
