use std::{io, thread};

use clap::{command, Parser, Subcommand};
use log::{error, info, warn};
use wakey::{
    alarm::{parse_time, NewAlarm, Sound, Tone},
    app::App,
    audio::{Audio, Player, Silent},
    communication::UserEvent,
    config::{Config, ConfigError},
    presentation::{Presenter, Terminal},
    session::Session,
    store::{AlarmStore, Friends, HttpStore, Identity},
    Error, Result,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write a default config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    Signup {
        username: String,
        password: String,
    },
    Login {
        username: String,
        password: String,
    },
    Logout,
    /// list your alarms
    Alarms,
    /// set an alarm for you and a friend
    NewAlarm {
        friend: String,
        /// HH:MM, local time
        time: String,
        #[clap(long, short, default_value = "Wake up!")]
        label: String,
        #[clap(long, short, default_value = "baddie")]
        sound: String,
        /// soft, playful or strict, escalates with snoozes if left out
        #[clap(long, short)]
        tone: Option<Tone>,
    },
    /// wait for alarms and ring them (the default)
    Run,
}

fn main() {
    // initilize the logger
    if let Err(err) = simple_file_logger::init_logger!("wakey") {
        eprintln!("couldn't initialize logger: {err:?}");
    }
    let args = Args::parse();
    if let Err(err) = run(args.command.unwrap_or(Command::Run)) {
        error!("{err}");
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    let path = Config::config_path()?;
    if let Command::Init { force } = command {
        if force || !Config::is_config_present()? {
            Config::new().save(&path)?;
            let sounds = Config::sounds_path()?;
            std::fs::create_dir_all(&sounds).map_err(|source| ConfigError::Io {
                path: sounds.clone(),
                source,
            })?;
            println!("wrote {}", path.display());
            println!(
                "put {} into {} to hear them, otherwise alarms beep",
                Sound::ALL.map(Sound::file_name).join(", "),
                sounds.display()
            );
        } else {
            println!("{} already exists, use --force to overwrite", path.display());
        }
        return Ok(());
    }

    let mut config = Config::load(&path)?;
    let store = HttpStore::new(config.api_url.clone());
    match command {
        Command::Signup { username, password } => {
            let user = store.signup(&username, &password)?;
            println!("welcome {}!", user.username);
            config.user = Some(user);
            config.save(&path)?;
        }
        Command::Login { username, password } => {
            let user = store.login(&username, &password)?;
            println!("logged in as {}", user.username);
            config.user = Some(user);
            config.save(&path)?;
        }
        Command::Logout => {
            if let Some(user) = config.user.take() {
                info!("{} logged out", user.username);
                config.save(&path)?;
            }
        }
        Command::Alarms => {
            let user = config.user.ok_or(Error::NotLoggedIn)?;
            let session = Session::start(user, &store, config.timing.delays())?;
            Terminal::new(io::stdout()).list(
                session.alarms(),
                session.user().id,
                session.friends(),
            );
        }
        Command::NewAlarm {
            friend,
            time,
            label,
            sound,
            tone,
        } => {
            let user = config.user.ok_or(Error::NotLoggedIn)?;
            let friends = Friends::from(store.friends(user.id)?);
            let friend_id = friends
                .id_of(&friend)
                .ok_or_else(|| Error::UnknownFriend(friend.clone()))?;
            let time = parse_time(&time).map_err(|_| Error::InvalidTime(time))?;
            let alarm = store.create_alarm(&NewAlarm {
                user_id: user.id,
                friend_id,
                time,
                label,
                sound: Sound::from(sound),
                tone,
            })?;
            println!(
                "alarm #{} set for {} with {friend}",
                alarm.id,
                alarm.time.format("%H:%M")
            );
        }
        Command::Run => {
            let user = config.user.clone().ok_or(Error::NotLoggedIn)?;
            let session = Session::start(user, &store, config.timing.delays())?;
            match Audio::open(Config::sounds_path()?, config.volume) {
                Ok(audio) => ring(store, session, audio, &config),
                Err(err) => {
                    warn!("{err}, alarms will only be shown");
                    ring(store, session, Silent, &config);
                }
            }
        }
        Command::Init { .. } => {}
    }
    Ok(())
}

fn ring<A: Player>(store: HttpStore, session: Session, player: A, config: &Config) {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else { break };
            match line.parse::<UserEvent>() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(err) => eprintln!("{err}"),
            }
        }
    });
    App::new(store, session, Terminal::new(io::stdout()), player, config.timing).run(&rx);
}
