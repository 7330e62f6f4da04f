//! CLI command definitions for interview-coach.
//!
//! Each view of the coach is a subcommand. Commands sign in with the
//! identity given through `--user-id` (or `COACH_USER_ID`), run one
//! operation and print the result. Notifications go to stderr.

use crate::capture::{Camera, ConsoleSynthesizer, NullCamera, SpeechSynthesizer, StdinTranscriber};
use crate::config::{CoachConfig, LlmBackend};
use crate::error::{CoachError, LlmError};
use crate::interview::{
    AnswerContext, AnswerScorer, AnswerState, Devices, FeedbackReport, InterviewForm,
    InterviewService, InterviewSpec, QuestionGenerator,
};
use crate::llm::{GenerationRequest, GenerationResponse, LlmProvider};
use crate::notify::{surface, ConsoleNotifier, Notifier};
use crate::routes::Route;
use crate::session::{CurrentUser, SessionContext, StaticIdentity};
use crate::storage::{DocumentStore, SqliteStore};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

/// Mock interview coach backed by an LLM.
#[derive(Parser)]
#[command(name = "interview-coach")]
#[command(about = "Generate mock interviews, answer them and get scored feedback")]
#[command(version)]
#[command(
    long_about = "interview-coach asks an LLM for interview questions tailored to a job, records your answers and scores them.\n\nExample usage:\n  interview-coach --user-id me create --position \"Backend Engineer\" --description \"Builds REST APIs in Rust\" --experience 3 --tech-stack \"Rust, Postgres\""
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Id of the signed-in user.
    #[arg(long, env = "COACH_USER_ID", global = true)]
    pub user_id: Option<String>,

    /// Full name stored on the user's profile at first sign-in.
    #[arg(long, env = "COACH_USER_NAME", global = true)]
    pub user_name: Option<String>,

    /// Email stored on the user's profile at first sign-in.
    #[arg(long, env = "COACH_USER_EMAIL", global = true)]
    pub user_email: Option<String>,

    /// Database URL, overrides COACH_DATABASE_URL.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// LLM backend (litellm, gemini), overrides COACH_LLM_PROVIDER.
    #[arg(long, global = true)]
    pub provider: Option<LlmBackend>,

    /// Model name, overrides COACH_MODEL.
    #[arg(short = 'm', long, global = true)]
    pub model: Option<String>,

    /// Print results as JSON.
    #[arg(short = 'j', long, global = true)]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Sign in and create the user profile if it does not exist yet.
    Signin,

    /// Sign out.
    Signout,

    /// List your interviews, marking those that have feedback.
    #[command(alias = "ls")]
    Dashboard,

    /// Create an interview and generate its questions.
    Create(FormArgs),

    /// Change an interview and regenerate its questions.
    Edit(EditArgs),

    /// Delete an interview.
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Show an interview and its questions.
    Show(InterviewArg),

    /// Print the interview list every time it changes, until Ctrl-C.
    Watch,

    /// Answer the questions of an interview.
    Start(StartArgs),

    /// Show the scored answers of an interview.
    Feedback(InterviewArg),

    /// Resolve a path such as /feedback/<id> and open that view.
    Route(RouteArgs),
}

/// The interview form.
#[derive(Parser, Debug, Clone)]
pub struct FormArgs {
    /// Job position or role.
    #[arg(short = 'p', long)]
    pub position: String,

    /// Job description.
    #[arg(short = 'd', long)]
    pub description: String,

    /// Years of experience.
    #[arg(short = 'e', long)]
    pub experience: String,

    /// Comma-separated tech stack.
    #[arg(short = 't', long)]
    pub tech_stack: String,
}

impl From<FormArgs> for InterviewForm {
    fn from(args: FormArgs) -> Self {
        InterviewForm::new(args.position, args.description, args.experience, args.tech_stack)
    }
}

/// Arguments for `interview-coach edit`. Omitted fields keep their value.
#[derive(Parser, Debug)]
pub struct EditArgs {
    /// Interview id.
    pub id: String,

    #[arg(short = 'p', long)]
    pub position: Option<String>,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[arg(short = 'e', long)]
    pub experience: Option<String>,

    #[arg(short = 't', long)]
    pub tech_stack: Option<String>,
}

impl EditArgs {
    /// The full form to resubmit, prefilled from `existing`.
    pub fn form_for(&self, existing: &InterviewSpec) -> InterviewForm {
        InterviewForm::new(
            self.position
                .clone()
                .unwrap_or_else(|| existing.position.clone()),
            self.description
                .clone()
                .unwrap_or_else(|| existing.description.clone()),
            self.experience
                .clone()
                .unwrap_or_else(|| existing.experience_years.to_string()),
            self.tech_stack
                .clone()
                .unwrap_or_else(|| existing.tech_stack_display()),
        )
    }
}

/// Arguments for `interview-coach delete`.
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Interview id.
    pub id: String,

    /// Confirm the deletion.
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// A single interview id.
#[derive(Parser, Debug)]
pub struct InterviewArg {
    /// Interview id.
    pub id: String,
}

/// Arguments for `interview-coach start`.
#[derive(Parser, Debug)]
pub struct StartArgs {
    /// Interview id.
    pub id: String,

    /// Turn the camera on. Required to start.
    #[arg(long)]
    pub camera: bool,

    /// Answer only this question (1-based).
    #[arg(short = 'q', long)]
    pub question: Option<usize>,
}

/// Arguments for `interview-coach route`.
#[derive(Parser, Debug)]
pub struct RouteArgs {
    /// Path such as `/generate` or `/feedback/<id>`.
    pub path: String,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
///
/// Errors of type [`CoachError`] have already been shown as notifications
/// when they reach the caller.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let mut config = CoachConfig::from_env()?;
    if let Some(url) = &cli.database_url {
        config = config.with_database_url(url.clone());
    }
    if let Some(backend) = cli.provider {
        config = config.with_backend(backend);
    }
    if let Some(model) = &cli.model {
        config = config.with_model(model.clone());
    }

    let app = App::open(&cli, config).await?;
    app.dispatch(cli.command).await
}

/// Everything a command needs: configuration, storage, notifications and
/// the identity the session is built from.
struct App {
    config: CoachConfig,
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    identity: StaticIdentity,
    json: bool,
}

impl App {
    async fn open(cli: &Cli, config: CoachConfig) -> anyhow::Result<Self> {
        let store = SqliteStore::open(&config.database_url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", config.database_url, e))?;
        info!(database = %config.database_url, "Store opened");

        let identity = match &cli.user_id {
            Some(id) => {
                let mut user = CurrentUser::new(id.clone());
                if let Some(name) = &cli.user_name {
                    user = user.with_full_name(name.clone());
                }
                if let Some(email) = &cli.user_email {
                    user = user.with_email(email.clone());
                }
                StaticIdentity::signed_in(user)
            }
            None => StaticIdentity::anonymous(),
        };

        Ok(Self {
            config,
            store: Arc::new(store),
            notifier: Arc::new(ConsoleNotifier),
            identity,
            json: cli.json,
        })
    }

    async fn dispatch(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Signin => self.signin().await,
            Commands::Signout => self.signout().await,
            Commands::Dashboard => self.dashboard().await,
            Commands::Create(args) => self.create(args).await,
            Commands::Edit(args) => self.edit(args).await,
            Commands::Delete(args) => self.delete(args).await,
            Commands::Show(args) => self.show(&args.id).await,
            Commands::Watch => self.watch().await,
            Commands::Start(args) => self.start(args).await,
            Commands::Feedback(args) => self.feedback(&args.id).await,
            Commands::Route(args) => self.route(&args.path).await,
        }
    }

    async fn session(&self) -> anyhow::Result<SessionContext> {
        let result = SessionContext::sign_in(&self.identity, self.store.as_ref()).await;
        Ok(surface(self.notifier.as_ref(), result)?)
    }

    fn llm(&self) -> anyhow::Result<Arc<dyn LlmProvider>> {
        let llm = self.config.build_llm().map_err(|e| {
            anyhow::anyhow!(
                "Failed to initialize LLM client: {}. Set GEMINI_API_KEY, or COACH_LLM_PROVIDER=litellm with LITELLM_API_BASE.",
                e
            )
        })?;
        info!(backend = %self.config.llm_backend, model = %self.config.effective_model(), "LLM client ready");
        Ok(llm)
    }

    /// Service for commands that never call the LLM.
    fn reader(&self) -> InterviewService {
        let llm: Arc<dyn LlmProvider> = Arc::new(OfflineLlm);
        self.service_with(llm)
    }

    fn service_with(&self, llm: Arc<dyn LlmProvider>) -> InterviewService {
        InterviewService::new(
            Arc::clone(&self.store),
            QuestionGenerator::new(llm, self.config.generator_config()),
            Arc::clone(&self.notifier),
        )
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let json_output = serde_json::to_string_pretty(value)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
        Ok(())
    }

    async fn signin(&self) -> anyhow::Result<()> {
        let session = self.session().await?;
        let user = session.require_user()?;
        if self.json {
            return self.print_json(&serde_json::json!({
                "id": user.id,
                "name": user.display_name(),
                "signedIn": true,
            }));
        }
        println!("Signed in as {} ({})", user.display_name(), user.id);
        Ok(())
    }

    async fn signout(&self) -> anyhow::Result<()> {
        let mut session = if self.identity.is_anonymous() {
            SessionContext::SignedOut
        } else {
            self.session().await?
        };
        session.sign_out();
        println!("Signed out.");
        Ok(())
    }

    async fn dashboard(&self) -> anyhow::Result<()> {
        let session = self.session().await?;
        let dashboard = self.reader().dashboard(&session).await?;

        if self.json {
            let rows: Vec<_> = dashboard
                .interviews
                .iter()
                .map(|i| {
                    serde_json::json!({
                        "interview": i,
                        "hasFeedback": dashboard.has_answers(&i.id),
                    })
                })
                .collect();
            return self.print_json(&rows);
        }

        if dashboard.interviews.is_empty() {
            println!("No mock interviews yet. Create one with `interview-coach create`.");
            return Ok(());
        }
        for interview in &dashboard.interviews {
            print_summary(interview);
            let next = if dashboard.has_answers(&interview.id) {
                Route::Feedback(interview.id.clone())
            } else {
                Route::PreStart(interview.id.clone())
            };
            println!("    next: {}", next);
        }
        Ok(())
    }

    async fn create(&self, args: FormArgs) -> anyhow::Result<()> {
        let session = self.session().await?;
        let service = self.service_with(self.llm()?);
        let spec = service.create(&session, &args.into()).await?;
        self.print_interview(&spec)
    }

    async fn edit(&self, args: EditArgs) -> anyhow::Result<()> {
        let session = self.session().await?;
        let existing = self.reader().get(&session, &args.id).await?;
        let service = self.service_with(self.llm()?);
        let spec = service
            .edit(&session, &args.id, &args.form_for(&existing))
            .await?;
        self.print_interview(&spec)
    }

    async fn delete(&self, args: DeleteArgs) -> anyhow::Result<()> {
        if !args.yes {
            anyhow::bail!(
                "This permanently deletes interview {}. Re-run with --yes to confirm.",
                args.id
            );
        }
        let session = self.session().await?;
        self.reader().delete(&session, &args.id).await?;
        Ok(())
    }

    async fn show(&self, id: &str) -> anyhow::Result<()> {
        let session = self.session().await?;
        let spec = self.reader().get(&session, id).await?;
        self.print_interview(&spec)
    }

    async fn watch(&self) -> anyhow::Result<()> {
        let session = self.session().await?;
        let mut subscription = self.reader().subscribe(&session).await?;
        info!(owner = %subscription.owner_id(), "Watching interviews, Ctrl-C to stop");

        loop {
            tokio::select! {
                snapshot = subscription.next() => {
                    let Some(snapshot) = snapshot else { break };
                    if self.json {
                        self.print_json(&snapshot)?;
                    } else {
                        println!("--- {} interview(s)", snapshot.len());
                        snapshot.iter().for_each(print_summary);
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        Ok(())
    }

    async fn start(&self, args: StartArgs) -> anyhow::Result<()> {
        let session = self.session().await?;
        let mut camera = NullCamera::new();
        if args.camera {
            camera.enable()?;
        }

        let reader = self.reader();
        let spec = reader.prepare_start(&session, &args.id, &camera).await?;

        let llm = self.llm()?;
        let ctx = AnswerContext {
            store: Arc::clone(&self.store),
            scorer: Arc::new(AnswerScorer::new(llm, self.config.scorer_config())),
            notifier: Arc::clone(&self.notifier),
            min_answer_chars: self.config.min_answer_chars,
        };
        let voice: Arc<dyn SpeechSynthesizer> = Arc::new(ConsoleSynthesizer::new());
        let transcriber = StdinTranscriber::new();

        let selected: Vec<(usize, String)> = spec
            .questions
            .iter()
            .enumerate()
            .filter(|(n, _)| args.question.map_or(true, |q| q == n + 1))
            .map(|(n, q)| (n + 1, q.question.clone()))
            .collect();
        if selected.is_empty() {
            anyhow::bail!("Interview {} has no question to answer", spec.id);
        }

        let mut saved = 0usize;
        for (number, question) in selected {
            println!("\nQuestion #{}: {}", number, question);
            let devices = Devices {
                speech: Box::new(transcriber.clone()),
                voice: Arc::clone(&voice),
                camera: Box::new(NullCamera::enabled()),
            };
            let mut answer = reader
                .answer(&session, &spec.id, &question, devices, ctx.clone())
                .await?;
            answer.speak_question();

            answer.toggle_recording().await?;
            let state = match answer.toggle_recording().await {
                Ok(state) => state,
                Err(e) => {
                    warn!(question = number, error = %e, "Answer not scored, moving on");
                    continue;
                }
            };
            answer.stop_speaking();

            if let (AnswerState::Scored, Some(score)) = (state, answer.score()) {
                println!("Rating: {}/10", score.rating);
                println!("Feedback: {}", score.feedback);
            }
            if answer.save(&session).await.is_ok() {
                saved += 1;
            }
        }

        println!("\nSaved {} answer(s). Next: {}", saved, Route::Feedback(spec.id));
        Ok(())
    }

    async fn feedback(&self, id: &str) -> anyhow::Result<()> {
        let session = self.session().await?;
        let result = FeedbackReport::load(Arc::clone(&self.store), &session, id).await;
        let report = surface(self.notifier.as_ref(), result)?;

        if self.json {
            return self.print_json(&serde_json::json!({
                "interview": report.interview,
                "overallRating": report.overall_rating(),
                "answers": report.answers,
            }));
        }

        if !report.is_complete() {
            println!("It looks like you haven't completed this mock interview yet.");
            return Ok(());
        }
        println!("Congratulations!");
        println!("Your overall interview rating: {}/10", report.overall_rating());
        for answer in &report.answers {
            println!("\n{}", answer.question);
            println!("  Rating: {}", answer.rating);
            println!("  Your answer: {}", answer.submitted_answer);
            println!("  Expected answer: {}", answer.expected_answer);
            println!("  Feedback: {}", answer.feedback_text);
        }
        Ok(())
    }

    async fn route(&self, path: &str) -> anyhow::Result<()> {
        let route: Route = path.parse()?;
        info!(route = %route, requires_auth = route.requires_auth(), "Route resolved");
        match route {
            Route::Home => {
                println!("interview-coach: run `interview-coach --help` to get started.");
                Ok(())
            }
            Route::SignIn => self.signin().await,
            Route::SignOut => self.signout().await,
            Route::Dashboard => self.dashboard().await,
            Route::PreStart(id) => self.show(&id).await,
            Route::Feedback(id) => self.feedback(&id).await,
            Route::Create => {
                println!("Run: interview-coach create --position .. --description .. --experience .. --tech-stack ..");
                Ok(())
            }
            Route::Edit(id) => {
                println!("Run: interview-coach edit {} [--position ..]", id);
                Ok(())
            }
            Route::Session(id) => {
                println!("Run: interview-coach start {} --camera", id);
                Ok(())
            }
        }
    }

    fn print_interview(&self, spec: &InterviewSpec) -> anyhow::Result<()> {
        if self.json {
            return self.print_json(spec);
        }
        print_summary(spec);
        println!("    {}", spec.description);
        for (n, question) in spec.questions.iter().enumerate() {
            println!("  #{} {}", n + 1, question.question);
        }
        Ok(())
    }
}

fn print_summary(interview: &InterviewSpec) {
    println!(
        "{}  {} ({} yrs) [{}]  created {}",
        interview.id,
        interview.position,
        interview.experience_years,
        interview.tech_stack_display(),
        interview.created_at.format("%Y-%m-%d %H:%M"),
    );
}

/// Stands in for the LLM on commands that only read or delete, so they run
/// without credentials.
struct OfflineLlm;

#[async_trait::async_trait]
impl LlmProvider for OfflineLlm {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        Err(LlmError::RequestFailed(
            "no LLM configured for this command".to_string(),
        ))
    }
}

/// Whether `err` was already shown to the user as a notification.
pub fn is_reported(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CoachError>().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_create_command() {
        let args = vec![
            "interview-coach",
            "--user-id",
            "u1",
            "create",
            "-p",
            "Backend Engineer",
            "-d",
            "Builds REST APIs in Rust",
            "-e",
            "3",
            "-t",
            "Rust, Postgres",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");
        assert_eq!(cli.user_id.as_deref(), Some("u1"));
        assert_eq!(cli.log_level, "info");

        match cli.command {
            Commands::Create(args) => {
                let form: InterviewForm = args.into();
                assert_eq!(form.position, "Backend Engineer");
                assert_eq!(form.experience, "3");
                assert_eq!(form.tech_stack, "Rust, Postgres");
            }
            _ => panic!("Expected Create command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = vec![
            "interview-coach",
            "dashboard",
            "--provider",
            "litellm",
            "-m",
            "gpt-4o",
            "-j",
        ];
        let cli = Cli::try_parse_from(args).expect("should parse");
        assert_eq!(cli.provider, Some(LlmBackend::LiteLlm));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o"));
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Dashboard));
    }

    #[test]
    fn test_start_and_delete_flags() {
        let cli = Cli::try_parse_from(vec!["interview-coach", "start", "abc", "--camera", "-q", "2"])
            .expect("should parse");
        match cli.command {
            Commands::Start(args) => {
                assert_eq!(args.id, "abc");
                assert!(args.camera);
                assert_eq!(args.question, Some(2));
            }
            _ => panic!("Expected Start command"),
        }

        let cli = Cli::try_parse_from(vec!["interview-coach", "rm", "abc"]).expect("should parse");
        match cli.command {
            Commands::Delete(args) => assert!(!args.yes),
            _ => panic!("Expected Delete command"),
        }
    }

    #[test]
    fn test_invalid_provider_rejected() {
        let result = Cli::try_parse_from(vec!["interview-coach", "dashboard", "--provider", "bard"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_edit_prefills_from_existing() {
        let now = Utc::now();
        let existing = InterviewSpec {
            id: "i1".to_string(),
            position: "Frontend Developer".to_string(),
            description: "Builds the web app".to_string(),
            experience_years: 2,
            tech_stack: vec!["React".to_string(), "TypeScript".to_string()],
            questions: vec![],
            owner_id: "u1".to_string(),
            created_at: now,
            updated_at: now,
        };
        let cli = Cli::try_parse_from(vec!["interview-coach", "edit", "i1", "-e", "4"])
            .expect("should parse");
        match cli.command {
            Commands::Edit(args) => {
                let form = args.form_for(&existing);
                assert_eq!(form.position, "Frontend Developer");
                assert_eq!(form.experience, "4");
                assert_eq!(form.tech_stack, "React, TypeScript");
            }
            _ => panic!("Expected Edit command"),
        }
    }

    #[test]
    fn test_reported_errors() {
        let err: anyhow::Error = CoachError::Unauthenticated.into();
        assert!(is_reported(&err));
        assert!(!is_reported(&anyhow::anyhow!("plain failure")));
    }
}
