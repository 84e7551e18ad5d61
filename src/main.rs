use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Write};

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use simplelog::{ConfigBuilder, WriteLogger};
use tokio_util::sync::CancellationToken;

use citechat::api::{ApiClient, ApiError, ChatMessage, Citation, DocumentSection, StreamEvent};
use citechat::api::{error_for_status, read_conversation};
use citechat::chat::{MessageRenderer, RenderKind};
use citechat::core::config::{self, CliOverrides, ResolvedConfig};
use citechat::core::{Action, App, Effect, update};
use citechat::term;

#[derive(Parser)]
#[command(name = "citechat", about = "Research assistant with cited answers")]
struct Args {
    /// Backend base URL (overrides config and CITECHAT_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question and print the cited answer
    Ask {
        question: String,
        /// Search index ("articles" or "grants")
        #[arg(long)]
        index: Option<String>,
        /// Show the details of footnote N of the answer
        #[arg(long, value_name = "N")]
        show_citation: Option<usize>,
    },
    /// Show the signed-in user
    Whoami,
    /// Print the frontend settings
    Settings,
    /// Draft document sections for a research topic
    Draft {
        #[arg(long)]
        topic: String,
        /// Section title; drafts every configured section when omitted
        #[arg(long)]
        title: Option<String>,
        /// Guidance for the section; derived from the topic when omitted
        #[arg(long)]
        prompt: Option<String>,
    },
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let config_path = config::config_path();
    let config_existed = config_path.as_ref().is_some_and(|p| p.exists());
    let (file_config, config_error) = match config::load_config() {
        Ok(c) => (c, None),
        Err(e) => (config::CitechatConfig::default(), Some(e)),
    };
    let index_override = match &args.command {
        Command::Ask { index, .. } => index.as_deref(),
        _ => None,
    };
    let resolved = config::resolve(
        &file_config,
        CliOverrides {
            base_url: args.base_url.as_deref(),
            index_name: index_override,
        },
    );

    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(resolved.log_level, log_config, log_file);
    }
    // Config was read before logging existed; report it now.
    match (&config_path, config_existed) {
        (Some(path), true) => info!("Loaded config from {}", path.display()),
        (Some(path), false) => info!("No config file found, generated default at {}", path.display()),
        (None, _) => warn!("Could not determine home directory, using default config"),
    }
    if let Some(e) = config_error {
        warn!("{}; using defaults", e);
        eprintln!("warning: {e}; using defaults");
    }
    for warning in &resolved.warnings {
        warn!("{}", warning);
    }

    info!("citechat starting up against {}", resolved.base_url);

    let client = ApiClient::new(&resolved.base_url).with_object_id_claim(&resolved.object_id_claim);
    let mut app = App::new();
    let mut stdout = io::stdout().lock();

    match args.command {
        Command::Ask {
            question,
            show_citation,
            ..
        } => ask(&client, &resolved, &mut app, &question, show_citation, &mut stdout).await,
        Command::Whoami => {
            let users = client.fetch_user_info().await;
            term::write_user_info(&mut stdout, &users)
        }
        Command::Settings => {
            let settings = client.fetch_frontend_settings().await;
            update(&mut app, Action::FrontendSettingsLoaded(settings));
            term::write_settings(&mut stdout, app.frontend_settings.as_ref())
        }
        Command::Draft {
            topic,
            title,
            prompt,
        } => {
            let sections = match title {
                Some(title) => vec![DocumentSection {
                    title,
                    meta_prompt: prompt.unwrap_or_default(),
                }],
                None => resolved.sections.clone(),
            };
            draft(&client, &mut app, topic, sections, &mut stdout).await
        }
    }
}

async fn ask(
    client: &ApiClient,
    resolved: &ResolvedConfig,
    app: &mut App,
    question: &str,
    show_citation: Option<usize>,
    out: &mut impl Write,
) -> io::Result<()> {
    if update(app, Action::Submit(question.to_string())) != Effect::SpawnRequest {
        eprintln!("Nothing to ask.");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, cancelling");
            ctrl_c.cancel();
        }
    });

    let turn = run_turn(client, &resolved.index_name, app.messages(), &cancel).await;
    match turn {
        Ok((messages, cancelled)) => {
            update(app, Action::AppendMessages(messages));
            if cancelled {
                eprintln!("\n(cancelled)");
            }
        }
        Err(e) => {
            error!("Conversation failed: {}", e);
            update(app, Action::AppendMessages(vec![ChatMessage::error(e.to_string())]));
        }
    }
    update(app, Action::SetLoading(false));
    eprintln!();

    let clicked: RefCell<Option<Citation>> = RefCell::new(None);
    let on_citation = |c: &Citation| *clicked.borrow_mut() = Some(c.clone());
    let renderer = MessageRenderer::new(app.messages(), &on_citation);
    let width = term::terminal_width();
    term::write_conversation(out, renderer, width)?;

    if let Some(k) = show_citation {
        let last_answer = renderer
            .iter()
            .filter(|item| matches!(item.kind, RenderKind::Assistant { .. }))
            .last();
        let shown = last_answer
            .as_ref()
            .and_then(|item| term::footnote_target(item, k).map(|i| item.click_citation(i)))
            .unwrap_or(false);
        writeln!(out)?;
        match clicked.into_inner() {
            Some(citation) if shown => term::write_citation(out, &citation, width)?,
            _ => writeln!(out, "No citation [{k}] in the last answer.")?,
        }
    }
    Ok(())
}

/// Submits the chat and streams the reply to stderr as it arrives.
async fn run_turn(
    client: &ApiClient,
    index_name: &str,
    messages: &[ChatMessage],
    cancel: &CancellationToken,
) -> Result<(Vec<ChatMessage>, bool), ApiError> {
    let response = client.submit_conversation(messages, index_name, cancel).await?;
    let response = error_for_status(response).await?;

    let mut stderr = io::stderr();
    let turn = read_conversation(response, cancel, |event| {
        if let StreamEvent::AssistantDelta(text) = event {
            let _ = write!(stderr, "{text}");
            let _ = stderr.flush();
        }
    })
    .await?;
    Ok((turn.messages, turn.cancelled))
}

async fn draft(
    client: &ApiClient,
    app: &mut App,
    topic: String,
    sections: Vec<DocumentSection>,
    out: &mut impl Write,
) -> io::Result<()> {
    // Topic first, so explicit prompts on the new sections survive.
    update(app, Action::UpdateResearchTopic(topic));
    update(app, Action::UpdateDocumentSections(sections));
    if update(app, Action::GenerateSections) != Effect::GenerateSections {
        eprintln!("{}", app.status_message);
        return Ok(());
    }

    let width = term::terminal_width();
    for (i, section) in app.document_sections.iter().enumerate() {
        info!("Drafting section '{}'", section.title);
        let content = client
            .generate_section_content(&app.research_topic, section)
            .await;
        if i > 0 {
            writeln!(out)?;
        }
        writeln!(out, "## {}", section.title)?;
        writeln!(out)?;
        if content.is_empty() {
            writeln!(out, "(no content generated)")?;
        } else {
            for line in term::markdown::render(&content, width) {
                writeln!(out, "{line}")?;
            }
        }
    }
    Ok(())
}
