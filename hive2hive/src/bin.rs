use clap::{App, Arg, SubCommand};
use hive2hive::{Config, FileManager, LocalRecursionPlanner, Session};
use hive2hive_model::Path;
use std::path::PathBuf;
use std::sync::Arc;

fn path_from_str(raw: &str) -> Path {
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    Path::from_segments(segments)
}

fn main() {
    tracing_subscriber::fmt::init();

    let matches = App::new("hive2hive")
        .about("Peer-to-peer encrypted file synchronization (illustrative CLI)")
        .arg(
            Arg::with_name("root")
                .long("root")
                .takes_value(true)
                .default_value(".")
                .help("local directory backing the session root"),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .takes_value(true)
                .help("path to a TOML config file"),
        )
        .subcommand(
            SubCommand::with_name("add")
                .about("add a file or folder under the session root")
                .arg(Arg::with_name("path").required(true))
                .arg(Arg::with_name("folder").long("folder")),
        )
        .subcommand(
            SubCommand::with_name("delete")
                .about("delete a file or folder")
                .arg(Arg::with_name("path").required(true))
                .arg(Arg::with_name("folder").long("folder")),
        )
        .subcommand(SubCommand::with_name("list").about("list every known path"))
        .get_matches();

    let root_dir = PathBuf::from(matches.value_of("root").unwrap());
    let config = match matches.value_of("config") {
        Some(path) => Config::load(&PathBuf::from(path)).unwrap_or_else(|e| {
            eprintln!("error loading config: {e:?}");
            std::process::exit(1);
        }),
        None => Config::default(),
    };

    let planner = Arc::new(LocalRecursionPlanner::new(root_dir.clone()));
    let session = Session::open(Path::root(), &root_dir, planner).unwrap_or_else(|e| {
        eprintln!("error opening session: {e:?}");
        std::process::exit(1);
    });
    let manager = FileManager::new(&session, &config);

    let outcome = match matches.subcommand() {
        ("add", Some(sub)) => {
            let path = path_from_str(sub.value_of("path").unwrap());
            manager
                .add(path, sub.is_present("folder"))
                .and_then(|handle| handle.await_result())
        }
        ("delete", Some(sub)) => {
            let path = path_from_str(sub.value_of("path").unwrap());
            manager
                .delete(path, sub.is_present("folder"))
                .and_then(|handle| handle.await_result())
        }
        ("list", _) => {
            let handle = manager.get_file_list();
            match handle.await_result() {
                Ok(Some(paths)) => {
                    for path in paths {
                        println!("{path}");
                    }
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            }
        }
        _ => {
            eprintln!("{}", matches.usage());
            std::process::exit(2);
        }
    };

    if let Err(e) = outcome {
        eprintln!("operation failed: {e:?}");
        std::process::exit(1);
    }
}
