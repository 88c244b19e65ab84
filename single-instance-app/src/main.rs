use clap::Parser;
use single_instance::AppId;
use single_instance::Coordinator;
use single_instance::Job;
use single_instance::Options;
use single_instance::Scope;
use single_instance::make_activator;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
mod terminal_window;
use crate::terminal_window::TerminalWindow;

const DEFAULT_APP_ID: &str = "{3f1c9a52-7be4-4d0e-9a61-52c8e0b4d7a9}";

#[derive(Parser)]
#[command(name = "single-instance-app")]
#[command(about = "Runs at most once and raises itself when launched again", long_about = None)]
struct Cli {
    /// Application id shared by every instance (a uuid)
    #[arg(short, long, default_value = DEFAULT_APP_ID)]
    app_id: AppId,

    /// Allow one instance per user session instead of one per machine
    #[arg(short, long)]
    session: bool,

    /// Directory for the lock file and the socket (unix only)
    #[arg(short, long)]
    runtime_dir: Option<PathBuf>,

    /// How long a later launch waits for the running instance, in
    /// milliseconds
    #[arg(short = 't', long, default_value_t = 100)]
    connect_timeout_ms: u64,
}

impl Cli {
    fn options(&self) -> Options {
        let mut options = Options::default()
            .scope(if self.session {
                Scope::Session
            } else {
                Scope::Machine
            })
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms));
        if let Some(dir) = &self.runtime_dir {
            options = options.runtime_dir(dir);
        }
        options
    }
}

enum AppMessage {
    AnotherInstanceTriedToStart,
    RunOnWindow(Job),
    ListenerFault(String),
    Minimize,
    ToggleAlwaysOnTop,
    ShowState,
    Exit,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(debug_assertions)]
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("single_instance_app=trace,single_instance=trace"),
    )
    .init();

    #[cfg(not(debug_assertions))]
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("single_instance_app=warn,single_instance=warn"),
    )
    .init();

    let cli = Cli::parse();
    let (appmsg_sender, mut appmsgs) = tokio::sync::mpsc::unbounded_channel::<AppMessage>();
    let window = Arc::new(TerminalWindow::new("single-instance-app"));

    // The activator runs its job on the message loop, which owns the window
    let sender_for_window = appmsg_sender.clone();
    let activate = make_activator(Arc::downgrade(&window), move |job: Job| {
        let _ = sender_for_window.send(AppMessage::RunOnWindow(job));
    });

    let mut coordinator = Coordinator::with_options(cli.app_id, cli.options());
    let sender_for_attempts = appmsg_sender.clone();
    let sender_for_faults = appmsg_sender.clone();
    coordinator
        .on_started(|| log::info!("Application starts"))
        .on_attempt_detected(move || {
            let _ = sender_for_attempts.send(AppMessage::AnotherInstanceTriedToStart);
            activate();
        })
        .on_listener_fault(move |e| {
            let _ = sender_for_faults.send(AppMessage::ListenerFault(e.to_string()));
        });

    // A secondary instance notifies the primary and exits in here
    coordinator.run()?;

    spawn_stdin_reader(appmsg_sender.clone());
    loop {
        match appmsgs.recv().await {
            Some(AppMessage::Exit) | None => break,
            Some(event) => handle_app_message(&window, event),
        }
    }

    coordinator.shutdown();
    Ok(())
}

fn handle_app_message(window: &TerminalWindow, event: AppMessage) {
    match event {
        AppMessage::AnotherInstanceTriedToStart => {
            println!("Another instance tried to start");
        }
        AppMessage::RunOnWindow(job) => job(),
        AppMessage::ListenerFault(e) => {
            log::warn!("Later launches may go unnoticed: {}", e);
        }
        AppMessage::Minimize => window.minimize(),
        AppMessage::ToggleAlwaysOnTop => window.toggle_always_on_top(),
        AppMessage::ShowState => println!("{:?}", window.state()),
        AppMessage::Exit => {}
    }
}

fn spawn_stdin_reader(app_message_sender: UnboundedSender<AppMessage>) {
    fn print_info() {
        println!("Commands:");
        println!("Q: Exit");
        println!("1: Minimize the window");
        println!("2: Toggle always on top");
        println!("3: Show window state");
        println!("Start another instance to bring this one to front.");
    }
    thread::spawn(move || {
        print_info();
        for line in std::io::stdin().lines() {
            let Ok(line) = line else {
                break;
            };
            let message = match line.trim().to_lowercase().as_str() {
                "q" => AppMessage::Exit,
                "1" => AppMessage::Minimize,
                "2" => AppMessage::ToggleAlwaysOnTop,
                "3" => AppMessage::ShowState,
                _ => {
                    print_info();
                    continue;
                }
            };
            let exit = matches!(message, AppMessage::Exit);
            if app_message_sender.send(message).is_err() || exit {
                break;
            }
        }
    });
}
