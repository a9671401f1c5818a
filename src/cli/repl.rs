//! Interactive REPL for agentflow
//!
//! Reads a line, runs it through the current workflow, and prints the events
//! as they stream in.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use futures::StreamExt;

use crate::cli::commands::{handle_command, CommandResult};
use crate::cli::demo::DemoWorkflow;
use crate::cli::{format_event, session_service};
use crate::core::{Config, Result};
use crate::session::{Session, SessionService};
use crate::workflow::{RunStatus, Runner};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    config: Config,
    demo: DemoWorkflow,
    sessions: Arc<dyn SessionService>,
    runner: Runner,
    session: Session,
    json: bool,
}

impl Repl {
    /// Create a REPL for `demo`, resuming `session_id` when it exists
    pub async fn new(
        config: Config,
        demo: DemoWorkflow,
        session_id: Option<&str>,
        json: bool,
    ) -> Result<Self> {
        let sessions = session_service(&config.storage);
        let runner = Runner::with_config(
            demo.build()?,
            Arc::clone(&sessions),
            config.runner.clone(),
        );
        let session = open_session(sessions.as_ref(), &config, session_id).await?;

        Ok(Self {
            config,
            demo,
            sessions,
            runner,
            session,
            json,
        })
    }

    /// Run one message through the workflow, printing events as they arrive
    pub async fn send(&self, message: &str) -> Result<RunStatus> {
        let mut stream = self.runner.run(&self.session, message);
        let mut stdout = io::stdout();

        while let Some(event) = stream.next().await {
            if self.json {
                writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
            } else {
                writeln!(stdout, "{}", format_event(&event))?;
            }
        }

        Ok(stream.finish().await.status)
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &self.session) {
                CommandResult::Exit => {
                    println!("\nGoodbye!");
                    break;
                }
                CommandResult::Handled(output) => println!("{}\n", output),
                CommandResult::NewSession => {
                    let created = self
                        .sessions
                        .create(&self.config.session.app_name, &self.config.session.user_id, None)
                        .await;
                    match created {
                        Ok(session) => {
                            println!("Started session {}\n", session.id);
                            self.session = session;
                        }
                        Err(e) => eprintln!("Could not create session: {}\n", e),
                    }
                }
                CommandResult::SwitchWorkflow(demo) => match demo.build() {
                    Ok(workflow) => {
                        self.runner = Runner::with_config(
                            workflow,
                            Arc::clone(&self.sessions),
                            self.config.runner.clone(),
                        );
                        self.demo = demo;
                        println!("Workflow: {}\n", demo);
                    }
                    Err(e) => eprintln!("Could not build workflow: {}\n", e),
                },
                CommandResult::Continue(message) => match self.send(&message).await {
                    Ok(RunStatus::Failed { kind, message }) => {
                        eprintln!("\nRun failed ({}): {}\n", kind, message)
                    }
                    Ok(_) => println!(),
                    Err(e) => eprintln!("\nError: {}\n", e),
                },
            }
        }

        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!("agentflow {}", env!("CARGO_PKG_VERSION"));
        println!("Workflow:  {}", self.demo);
        println!("Session:   {} (user {})", self.session.id, self.session.user_id);
        println!("Storage:   {:?}", self.config.storage.backend);
        println!();
        println!("Commands: help, state, history, workflow <name>, new, exit");
        println!("Try: {}", self.demo.sample_prompt());
        println!("─────────────────────────────────────────────");
    }
}

/// Resume an existing session or create one
async fn open_session(
    sessions: &dyn SessionService,
    config: &Config,
    session_id: Option<&str>,
) -> Result<Session> {
    let user_id = &config.session.user_id;
    if let Some(id) = session_id {
        if let Ok(session) = sessions.get(user_id, id).await {
            return Ok(session);
        }
    }
    sessions
        .create(&config.session.app_name, user_id, session_id)
        .await
}
