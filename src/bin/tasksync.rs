//! A command-line front end to a task store.
//!
//! The store URL and policies are read from the environment, see [`Config::from_env`].

use std::error::Error;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use tasksync::client::HttpClient;
use tasksync::config::Config;
use tasksync::session::{FileSessionStore, Session};
use tasksync::utils::print_task_list;
use tasksync::{TaskDraft, TaskId, TaskSyncClient};


#[derive(Debug, Parser)]
#[command(name = "tasksync", version, about = "Manage the tasks of a remote to-do list")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the tasks
    List {
        #[arg(long)]
        important: bool,
        /// Only list tasks that are not completed
        #[arg(long, conflicts_with = "completed")]
        pending: bool,
        #[arg(long)]
        completed: bool,
    },
    /// Create a task
    Add {
        text: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        /// Scheduled date (YYYY-MM-DD)
        #[arg(long)]
        scheduled: Option<NaiveDate>,
        #[arg(long)]
        important: bool,
    },
    /// Change the text, dates or importance of a task
    Edit {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        scheduled: Option<NaiveDate>,
        #[arg(long)]
        important: Option<bool>,
    },
    /// Mark a task as completed, or back as not completed
    Toggle { id: String },
    /// Mark a task as important, or back as not important
    Important { id: String },
    /// Delete a task
    Delete { id: String },
    /// Log in, and remember the session for the next commands
    Login {
        email: String,
        #[arg(long, env = "TASKSYNC_PASSWORD")]
        password: String,
    },
    /// Forget the current session
    Logout,
    /// Create an account
    Register {
        email: String,
        #[arg(long, env = "TASKSYNC_PASSWORD")]
        password: String,
    },
}


#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let http = HttpClient::from_config(&config)?;
    let session = Arc::new(Session::new(Box::new(FileSessionStore::from_file(&config.session_file)?)));
    let client = TaskSyncClient::from_config(http.clone(), &config, session);

    match cli.command {
        Command::Login{ email, password } => {
            client.login(&http, &email, &password).await?;
            println!("Logged in as {}", email);
            return Ok(());
        },
        Command::Logout => {
            client.logout()?;
            println!("Logged out");
            return Ok(());
        },
        Command::Register{ email, password } => {
            client.register(&http, &email, &password).await?;
            println!("Account created, you can now log in");
            return Ok(());
        },
        _ => {},
    }

    // Every other command needs the current tasks
    client.load_all().await?;

    match cli.command {
        Command::List{ important, pending, completed } => {
            let tasks = if pending {
                client.pending()
            } else if completed {
                client.completed()
            } else {
                client.tasks()
            };
            let tasks: Vec<_> = tasks.into_iter()
                .filter(|t| important == false || t.is_important())
                .collect();
            print_task_list(&tasks);
        },
        Command::Add{ text, due, scheduled, important } => {
            let mut draft = TaskDraft::new(text).important(important);
            draft.due_date = due;
            draft.scheduled_date = scheduled;
            let task = client.create(draft).await?;
            println!("Created {}", task.id());
        },
        Command::Edit{ id, text, due, scheduled, important } => {
            client.begin_edit(&TaskId::from(id))?;
            client.modify_edit(|buffer| {
                if let Some(text) = text { buffer.text = text; }
                if let Some(due) = due { buffer.due_date = Some(due); }
                if let Some(scheduled) = scheduled { buffer.scheduled_date = Some(scheduled); }
                if let Some(important) = important { buffer.is_important = important; }
            });
            let task = client.submit_edit().await?;
            print_task_list(&[task]);
        },
        Command::Toggle{ id } => {
            let task = client.toggle_completed(&TaskId::from(id)).await?;
            print_task_list(&[task]);
        },
        Command::Important{ id } => {
            let task = client.toggle_important(&TaskId::from(id)).await?;
            print_task_list(&[task]);
        },
        Command::Delete{ id } => {
            let id = TaskId::from(id);
            client.remove(&id).await?;
            println!("Deleted {}", id);
        },
        Command::Login{..} | Command::Logout | Command::Register{..} => unreachable!("handled above"),
    }

    Ok(())
}
