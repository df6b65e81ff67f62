use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn, Level};
use rustyline::error::ReadlineError;
use tokio::{
    sync::{mpsc::Sender, Notify},
    task::JoinHandle,
};

use vrcaa_cache::{
    api::{http::HttpApi, Api},
    cache::{CacheListener, SessionCache},
    friends::{FriendRegistry, FRIENDS},
    logging,
    pipeline,
    types::{config::Config, location::Location, world::World},
};

#[derive(Debug, PartialEq)]
enum Command {
    Friends,
    Recent,
    World(String),
    Profile,
    Refresh,
}

#[derive(Debug, PartialEq)]
enum Input {
    Command(Command),
    Level(Level),
    Usage(&'static str),
    Unknown(String),
    Quit,
    Empty,
}

fn parse_input(line: &str) -> Input {
    let command: Vec<_> = line.trim().splitn(2, ' ').collect();
    let arg = command.get(1).map(|arg| arg.trim()).filter(|arg| !arg.is_empty());

    match (command[0], arg) {
        ("exit" | "quit", _) => Input::Quit,
        ("friends", _) => Input::Command(Command::Friends),
        ("recent", _) => Input::Command(Command::Recent),
        ("profile", _) => Input::Command(Command::Profile),
        ("refresh", _) => Input::Command(Command::Refresh),
        ("world", Some(id)) => Input::Command(Command::World(id.to_string())),
        ("world", None) => Input::Usage("usage: world <id>"),
        ("log" | "level", Some(level)) => match Level::from_str(level) {
            Ok(level) => Input::Level(level),
            Err(_) => Input::Usage("invalid log level"),
        },
        ("log" | "level", None) => Input::Usage("usage: log <trace|debug|info|warn|error>"),
        ("", _) => Input::Empty,
        (x, _) => Input::Unknown(x.to_string()),
    }
}

/// Logs cache changes and wakes whoever waits for the first complete friend list.
#[derive(Default)]
struct ConsoleListener {
    ready: Arc<Notify>,
}

impl CacheListener for ConsoleListener {
    fn updated_last_visited(&self, worlds: &[World]) {
        if let Some(world) = worlds.last() {
            info!("now in {} ({} recent worlds)", world.name, worlds.len());
        }
    }

    fn initial_cache_created(&self) {
        info!("friend list ready: {} friends", FRIENDS.len());
        self.ready.notify_one();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup()?;

    // get config
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config_toml = std::fs::read_to_string(config_path)
        .context("couldn't read config file")?;
    let config: Config = toml::from_str(&config_toml)
        .context("couldn't parse config file")?;
    let config = Arc::new(config);

    let api: Arc<dyn Api> = Arc::new(HttpApi::new(&config.api)?);
    let registry: Arc<FriendRegistry> = FRIENDS.clone();
    let cache = Arc::new(SessionCache::new(api, Arc::clone(&registry), config.cache.page_size));
    let listener = ConsoleListener::default();
    let ready = Arc::clone(&listener.ready);
    cache.set_cache_listener(Arc::new(listener));

    let mut bootstrap = cache.spawn_bootstrap();

    // events applied before the first set_friends would hit an empty registry
    if config.pipeline.enabled {
        let config = Arc::clone(&config);
        let cache = Arc::clone(&cache);
        let registry = Arc::clone(&registry);
        tokio::task::spawn(async move {
            ready.notified().await;
            if let Err(e) = pipeline::run(&config, cache, registry).await {
                error!("pipeline error: {:?}", e);
            }
        });
    }

    let (quit_tx, mut quit_rx) = tokio::sync::mpsc::channel(1);
    let (command_tx, mut command_rx) = tokio::sync::mpsc::channel(8);

    std::thread::spawn(move || console(quit_tx, command_tx));

    loop {
        tokio::select! {
            _ = quit_rx.recv() => break,
            _ = tokio::signal::ctrl_c() => break,
            command = command_rx.recv() => match command {
                Some(Command::Refresh) => {
                    bootstrap.abort();
                    bootstrap = cache.spawn_bootstrap();
                }
                Some(command) => {
                    spawn_command(&cache, &registry, command);
                }
                None => break,
            },
        }
    }

    bootstrap.abort();
    info!("quitting");
    Ok(())
}

fn console(quit_tx: Sender<()>, command_tx: Sender<Command>) {
    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            error!("error creating line editor: {:#?}", e);
            return;
        }
    };

    loop {
        let line = match editor.readline("> ") {
            Ok(l) => l,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                quit_tx.blocking_send(()).ok();
                return;
            }
            Err(e) => {
                error!("error reading input: {:#?}", e);
                continue;
            }
        };

        match parse_input(&line) {
            Input::Command(command) => {
                if command_tx.blocking_send(command).is_err() {
                    return;
                }
            }
            Input::Level(level) => *logging::LOG_LEVEL.write() = level,
            Input::Usage(usage) => info!("{}", usage),
            Input::Unknown(x) => warn!("unknown command: {}", x),
            Input::Quit => {
                quit_tx.blocking_send(()).ok();
                return;
            }
            Input::Empty => {}
        }
    }
}

fn spawn_command(cache: &Arc<SessionCache>, registry: &Arc<FriendRegistry>, command: Command) -> JoinHandle<()> {
    let cache = Arc::clone(cache);
    let registry = Arc::clone(registry);
    tokio::task::spawn(async move {
        if let Err(e) = handle(&cache, &registry, command).await {
            error!("command failed: {:?}", e);
        }
    })
}

async fn handle(cache: &SessionCache, registry: &FriendRegistry, command: Command) -> Result<()> {
    match command {
        Command::Friends => {
            for friend in registry.sorted() {
                let location = Location::parse(&friend.location);
                let location = match location.world_id() {
                    Some(world_id) => cache.get_world(world_id),
                    None => location.to_string(),
                };

                info!(
                    "{}{} - {} - {}",
                    if friend.is_favorite { "* " } else { "" },
                    friend.display_name,
                    friend.status_line(),
                    location,
                );
            }
        }
        Command::Recent => {
            for world in cache.get_recent().await? {
                info!("{} ({})", world.name, world.id);
            }
        }
        Command::World(id) => info!("{}: {}", id, cache.get_world(&id)),
        Command::Profile => match cache.profile() {
            Some(profile) => {
                let status = if profile.status_description.is_empty() {
                    &profile.status
                } else {
                    &profile.status_description
                };
                let world = profile.current_world()
                    .map(|id| cache.get_world(id))
                    .unwrap_or_else(|| "not in a world".to_string());

                info!("{} ({}) - {} - {} - {} friends", profile.display_name, profile.id, status, world, profile.friends.len());
                if !profile.bio.is_empty() {
                    info!("{}", profile.bio);
                }
            }
            None => info!("profile not loaded yet"),
        },
        // handled by the main loop
        Command::Refresh => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use vrcaa_cache::types::{
        favorite::{Favorite, FavoriteKind},
        user::{LimitedUser, User},
    };

    use super::*;

    // an api whose requests never complete
    struct StalledApi;

    #[async_trait]
    impl Api for StalledApi {
        async fn get_self(&self) -> Result<User> {
            std::future::pending().await
        }

        async fn get_friends(&self, _offline: bool, _n: u32, _offset: u32) -> Result<Option<Vec<LimitedUser>>> {
            std::future::pending().await
        }

        async fn get_favorites(&self, _kind: FavoriteKind) -> Result<Option<Vec<Favorite>>> {
            std::future::pending().await
        }

        async fn get_world(&self, _id: &str) -> Result<World> {
            std::future::pending().await
        }

        async fn get_recent_worlds(&self) -> Result<Option<Vec<World>>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn stalled_command_does_not_block_caller() {
        let registry = Arc::new(FriendRegistry::default());
        let cache = Arc::new(SessionCache::new(Arc::new(StalledApi), Arc::clone(&registry), 50));

        let recent = spawn_command(&cache, &registry, Command::Recent);
        let world = spawn_command(&cache, &registry, Command::World("wrld_a".into()));

        world.await.unwrap();
        tokio::task::yield_now().await;
        assert!(!recent.is_finished());
        recent.abort();
    }

    #[tokio::test]
    async fn listener_releases_pipeline_once_friends_are_ready() {
        let listener = ConsoleListener::default();
        let ready = Arc::clone(&listener.ready);

        listener.initial_cache_created();
        // the permit is kept even though nobody was waiting yet
        ready.notified().await;
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input("friends"), Input::Command(Command::Friends));
        assert_eq!(parse_input("  recent "), Input::Command(Command::Recent));
        assert_eq!(parse_input("world wrld_abc"), Input::Command(Command::World("wrld_abc".into())));
        assert_eq!(parse_input("world"), Input::Usage("usage: world <id>"));
        assert_eq!(parse_input("refresh"), Input::Command(Command::Refresh));
        assert_eq!(parse_input("quit"), Input::Quit);
        assert_eq!(parse_input(""), Input::Empty);
        assert_eq!(parse_input("dance"), Input::Unknown("dance".into()));
    }

    #[test]
    fn parses_log_level() {
        assert_eq!(parse_input("log debug"), Input::Level(Level::Debug));
        assert_eq!(parse_input("level warn"), Input::Level(Level::Warn));
        assert_eq!(parse_input("log loud"), Input::Usage("invalid log level"));
        assert!(matches!(parse_input("log"), Input::Usage(_)));
    }
}
