use crate::channel;
use crate::channel::Callback;
use crate::channel::FaultCallback;
use crate::channel::Handlers;
use crate::channel::Listener;
use crate::gate;
use crate::gate::Ownership;
use crate::AppId;
use crate::Error;
use crate::IdentityKey;
use crate::Options;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Role a process ends up with after the election
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// First instance, keeps running and receives notifications
    Primary,
    /// Later instance, has notified the primary and must terminate
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unstarted,
    Electing,
    Primary,
    Secondary,
}

enum Worker {
    Task(tokio::task::JoinHandle<()>),
    Thread(std::thread::JoinHandle<()>),
}

struct ListenerTask {
    stop: oneshot::Sender<()>,
    worker: Worker,
}

/// Decides whether this process is the single instance of an application.
///
/// Subscribe to the notifications first, then call [`Coordinator::run`]
/// once, before allocating any other application resources.
///
/// On the primary instance the coordinator owns the exclusive-ownership
/// primitive and the notification listener. Both are released when the
/// coordinator is shut down or dropped, so keep it alive for the lifetime
/// of the application.
pub struct Coordinator {
    app_id: AppId,
    key: IdentityKey,
    options: Options,
    state: State,

    on_started: Option<Box<dyn FnOnce() + Send + 'static>>,
    on_attempt: Option<Callback>,
    on_fault: Option<FaultCallback>,
    on_terminate: Option<Box<dyn FnOnce() + Send + 'static>>,

    ownership: Option<Ownership>,
    listener: Option<ListenerTask>,
}

impl Coordinator {
    pub fn new(app_id: AppId) -> Self {
        Self::with_options(app_id, Options::default())
    }

    pub fn with_options(app_id: AppId, options: Options) -> Self {
        let key = IdentityKey::derive(&app_id, &options);
        Self {
            app_id,
            key,
            options,
            state: State::Unstarted,
            on_started: None,
            on_attempt: None,
            on_fault: None,
            on_terminate: Some(Box::new(|| {
                std::process::exit(0);
            })),
            ownership: None,
            listener: None,
        }
    }

    /// Called once on the primary instance, before `run` returns. The
    /// application is clear to start up from here.
    pub fn on_started(&mut self, callback: impl FnOnce() + Send + 'static) -> &mut Self {
        self.on_started = Some(Box::new(callback));
        self
    }

    /// Called on the primary instance every time a later launch is
    /// detected. Runs on the listener task, one call at a time.
    pub fn on_attempt_detected(
        &mut self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_attempt = Some(Arc::new(callback));
        self
    }

    /// Called when the listener cannot be armed or keeps failing. The
    /// primary instance keeps running regardless.
    ///
    /// A run of consecutive accept failures is reported once, when it
    /// reaches `Options::max_rearm_failures`. The listener keeps retrying
    /// with backoff, and after the next successful accept a new run of
    /// failures is reported again.
    pub fn on_listener_fault(
        &mut self,
        callback: impl Fn(&Error) + Send + Sync + 'static,
    ) -> &mut Self {
        self.on_fault = Some(Arc::new(callback));
        self
    }

    /// Replaces the default termination of a secondary instance, which is
    /// `std::process::exit(0)`. The replacement must still end the process.
    pub fn on_terminate(&mut self, callback: impl FnOnce() + Send + 'static) -> &mut Self {
        self.on_terminate = Some(Box::new(callback));
        self
    }

    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the primary instance currently has a live listener
    pub fn is_listening(&self) -> bool {
        match &self.listener {
            Some(ListenerTask {
                worker: Worker::Task(handle),
                ..
            }) => !handle.is_finished(),
            Some(ListenerTask {
                worker: Worker::Thread(handle),
                ..
            }) => !handle.is_finished(),
            None => false,
        }
    }

    /// Runs the election. Only blocks for the ownership check and the
    /// `Started` notification; the listener runs in the background.
    ///
    /// When called inside a tokio runtime the listener is spawned on that
    /// runtime, which must keep being driven. Otherwise it gets a thread of
    /// its own.
    ///
    /// Errors only when ownership could not be determined at all. Can be
    /// called once; later calls return `Error::AlreadyElected`.
    pub fn run(&mut self) -> Result<Role, Error> {
        if self.state != State::Unstarted {
            return Err(Error::AlreadyElected);
        }
        self.state = State::Electing;
        log::debug!("Electing primary instance for {}", self.key.name());

        #[cfg(feature = "dbus")]
        if self.options.gate_backend == crate::GateBackend::DBus
            && self.options.scope == crate::Scope::Machine
        {
            log::warn!("The D-Bus gate only covers the current session, not the machine");
        }

        let ownership = gate::try_acquire(&self.key, self.options.gate_backend).map_err(|e| {
            log::error!("Could not determine single instance status: {}", e);
            e
        })?;

        match ownership {
            Some(ownership) => {
                self.ownership = Some(ownership);
                self.state = State::Primary;
                log::info!("This is the primary instance of {}", self.app_id);

                if let Some(on_started) = self.on_started.take() {
                    on_started();
                }
                self.arm();
                Ok(Role::Primary)
            }
            None => {
                self.state = State::Secondary;
                log::info!("Another instance of {} is already running", self.app_id);

                // Failing to notify is no reason to keep a second instance
                channel::try_notify(&self.key, self.options.connect_timeout);

                if let Some(terminate) = self.on_terminate.take() {
                    terminate();
                }
                Ok(Role::Secondary)
            }
        }
    }

    /// Stops the listener and releases ownership. A later process with the
    /// same application id can then become the primary instance.
    pub fn shutdown(&mut self) {
        if let Some(listener) = self.listener.take() {
            let _ = listener.stop.send(());
        }
        if self.ownership.take().is_some() {
            log::debug!("Released ownership of {}", self.key.name());
        }
    }

    fn arm(&mut self) {
        let handlers = Handlers {
            on_attempt: self.on_attempt.clone(),
            on_fault: self.on_fault.clone(),
        };
        let (stop, shutdown) = oneshot::channel();
        let options = self.options.clone();

        let worker = match tokio::runtime::Handle::try_current() {
            Ok(handle) => Listener::bind(&self.key).map(|listener| {
                Worker::Task(handle.spawn(channel::serve(listener, handlers, options, shutdown)))
            }),
            Err(_) => spawn_listener_thread(&self.key, handlers, options, shutdown),
        };

        match worker {
            Ok(worker) => self.listener = Some(ListenerTask { stop, worker }),
            Err(e) => {
                log::error!("Could not listen for other instances: {}", e);
                if let Some(on_fault) = &self.on_fault {
                    channel::guarded("fault handler", || on_fault(&e));
                }
            }
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Outside of a tokio runtime the listener gets a thread with a runtime of
/// its own. The endpoint is bound before this returns.
fn spawn_listener_thread(
    key: &IdentityKey,
    handlers: Handlers,
    options: Options,
    shutdown: oneshot::Receiver<()>,
) -> Result<Worker, Error> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::Listener)?;

    let listener = {
        let _guard = runtime.enter();
        Listener::bind(key)?
    };

    let thread = std::thread::Builder::new()
        .name("single-instance-listener".to_string())
        .spawn(move || runtime.block_on(channel::serve(listener, handlers, options, shutdown)))
        .map_err(Error::Listener)?;

    Ok(Worker::Thread(thread))
}

/// Runs the election with the default options and returns the coordinator
/// of the primary instance.
///
/// - `app_id`: Unique id of the application
/// - `callback`: The callback to invoke when a secondary instance tries to
///   start (this is used in primary instance only)
///
/// On a secondary instance the primary is notified and
/// `Error::AlreadyRunning` is returned instead of exiting; the caller must
/// then end the process.
pub fn only_single_instance(
    app_id: AppId,
    callback: impl Fn() + Send + Sync + 'static,
) -> Result<Coordinator, Error> {
    let mut coordinator = Coordinator::new(app_id);
    coordinator.on_attempt_detected(callback).on_terminate(|| {});

    match coordinator.run()? {
        Role::Primary => Ok(coordinator),
        Role::Secondary => Err(Error::AlreadyRunning),
    }
}
