use single_instance::*;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("single_instance=debug"))
        .init();

    let app_id = AppId::from_name("org.example.MyApp");

    match only_single_instance(app_id, move || {
        println!("A later launch of {} was detected and has exited", app_id);
    }) {
        Ok(mut coordinator) => {
            println!("Running as the primary instance of {}", app_id);
            println!("Launch this example again to notify it, Ctrl+C exits");

            let running = Arc::new(AtomicBool::new(true));
            let running_ = running.clone();
            ctrlc::set_handler(move || running_.store(false, Ordering::SeqCst))?;
            while running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(100));
            }

            coordinator.shutdown();
        }
        Err(Error::AlreadyRunning) => {
            println!("{} is already running, the primary has been notified", app_id);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
