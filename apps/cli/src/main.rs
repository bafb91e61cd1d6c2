use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, load_settings_from, AppContext, ProjectScreen, ScreenView, TracingNavigator,
};
use shared::{
    domain::ProjectId,
    protocol::{SignInInput, SignInStep},
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "projects", about = "Manage projects from the command line")]
struct Args {
    /// Configuration file; defaults to ./projects.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    /// Answer to a forced password change on first sign-in.
    #[arg(long)]
    new_password: Option<String>,
    /// User attribute sent with the new password, as name=value.
    #[arg(long = "attr", value_parser = parse_attribute)]
    attributes: Vec<(String, String)>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Whoami,
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Delete {
        #[arg(long)]
        id: String,
    },
    Open {
        #[arg(long)]
        id: String,
    },
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got `{raw}`")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => load_settings_from(path),
        None => load_settings(),
    };
    let context = AppContext::start(&settings).await?;
    let result = run(&context, &args).await;
    context.shutdown().await;
    result
}

async fn run(context: &AppContext, args: &Args) -> Result<()> {
    sign_in(context, args).await?;

    if let Command::Whoami = args.command {
        let user = context
            .session()
            .user()
            .await
            .ok_or_else(|| anyhow!("sign-in did not produce a current user"))?;
        println!("{} ({})", user.username, user.user_id);
        return Ok(());
    }

    let screen = context.project_screen(Arc::new(TracingNavigator));
    screen.load_projects().await;

    let succeeded = match &args.command {
        Command::Whoami | Command::List => true,
        Command::Create { name, description } => screen.create_project(name, description).await,
        Command::Update {
            id,
            name,
            description,
        } => {
            screen
                .update_project(&ProjectId::new(id.as_str()), name, description)
                .await
        }
        Command::Delete { id } => screen.delete_project(&ProjectId::new(id.as_str())).await,
        Command::Open { id } => return open_project(&screen, id).await,
    };

    print_view(&screen.view().await);
    if !succeeded {
        bail!("request was not applied");
    }
    Ok(())
}

async fn sign_in(context: &AppContext, args: &Args) -> Result<()> {
    let session = context.session();
    let output = session
        .sign_in(SignInInput::new(&args.username, &args.password))
        .await?;

    match output.next_step {
        SignInStep::Done => {}
        SignInStep::ConfirmSignInWithNewPasswordRequired => {
            let new_password = args
                .new_password
                .as_deref()
                .ok_or_else(|| anyhow!("a new password is required; pass --new-password"))?;
            let attributes: BTreeMap<String, String> = args.attributes.iter().cloned().collect();
            let output = session.confirm_challenge(new_password, attributes).await?;
            if !output.next_step.is_done() {
                bail!("sign-in needs a further step: {:?}", output.next_step);
            }
        }
        other => bail!("sign-in needs a step this client cannot complete: {other:?}"),
    }

    info!(username = %args.username, "signed in");
    Ok(())
}

async fn open_project(screen: &ProjectScreen, id: &str) -> Result<()> {
    let projects = screen.projects().await;
    let project = projects
        .iter()
        .find(|project| project.id.as_str() == id)
        .ok_or_else(|| anyhow!("no project with id {id}"))?;
    screen.open_project(project);
    Ok(())
}

fn print_view(view: &ScreenView) {
    match view {
        ScreenView::Loading => println!("Loading..."),
        ScreenView::LoadFailed { message } => {
            println!("{message} Run `projects list` to retry.")
        }
        ScreenView::Ready {
            projects,
            error_message,
            ..
        } => {
            if let Some(message) = error_message {
                eprintln!("error: {message}");
            }
            if let Some(empty) = view.empty_state() {
                println!("{empty}");
            }
            for project in projects {
                println!(
                    "{}\t{}\t{}\t{}",
                    project.id,
                    project.name,
                    project.created_at.format("%Y-%m-%d"),
                    project.description
                );
            }
        }
    }
}
