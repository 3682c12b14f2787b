use flatdir::{Directory, Location, SectorHeaders};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::{Format, Severity};
use sloggers::Build;
use slog::Logger;
use std::fs::{File, OpenOptions};
use std::io;

const USAGE: &str = "usage: flatdir <image> <command>

commands:
    format [entries]      write an empty directory
    add <name> <sector>   add a file
    remove <name>         remove a file
    list                  list file names
    print <disk>          dump every file's header from <disk>";

fn main() {
    std::process::exit(real_main());
}

fn real_main() -> i32 {
    let mut builder = TerminalLoggerBuilder::new();
    builder.level(Severity::Info);
    builder.destination(Destination::Stderr);
    builder.format(Format::Compact);
    let logger = match builder.build() {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("unable to create logger: {}", e);
            return 1;
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match run(&args, &logger) {
        Ok(Outcome::Done) => 0,
        Ok(Outcome::Refused) => 1,
        Ok(Outcome::Usage) => {
            eprintln!("{}", USAGE);
            2
        }
        Err(e) => {
            slog::crit!(logger, "{}", e);
            1
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Outcome {
    Done,
    /// The directory refused the change: the file exists, or does not
    Refused,
    /// The arguments were not understood
    Usage,
}

fn run(args: &[&str], logger: &Logger) -> flatdir::Result<Outcome> {
    let (image, command, rest) = match args {
        [image, command, rest @ ..] => (*image, *command, rest),
        _ => return Ok(Outcome::Usage),
    };
    let logger = logger.new(slog::o!("image" => image.to_string()));

    match (command, rest) {
        ("format", rest) => {
            let size = match rest {
                [] => repr::directory::ENTRIES_PER_SECTOR,
                [size] => match size.parse() {
                    Ok(size) if size > 0 => size,
                    _ => return Ok(Outcome::Usage),
                },
                _ => return Ok(Outcome::Usage),
            };
            let mut builder = flatdir::DirectoryBuilder::new();
            builder.set_logger(logger);
            let mut file = File::create(image)?;
            builder.build(size).persist(&mut file)?;
        }
        ("add", [name, sector]) => {
            let sector = match sector.parse() {
                Ok(sector) => Location(sector),
                Err(_) => return Ok(Outcome::Usage),
            };
            let mut file = open_rw(image)?;
            let mut directory = load(&file, logger.clone())?;
            if directory.insert(name, sector)? {
                directory.persist(&mut file)?;
            } else {
                slog::error!(logger, "File exists"; "name" => *name);
                return Ok(Outcome::Refused);
            }
        }
        ("remove", [name]) => {
            let mut file = open_rw(image)?;
            let mut directory = load(&file, logger.clone())?;
            if directory.remove(name) {
                directory.persist(&mut file)?;
            } else {
                slog::error!(logger, "No such file"; "name" => *name);
                return Ok(Outcome::Refused);
            }
        }
        ("list", []) => {
            let directory = load(&File::open(image)?, logger)?;
            directory.list(io::stdout().lock())?;
        }
        ("print", [disk]) => {
            let directory = load(&File::open(image)?, logger)?;
            let headers = SectorHeaders::new(File::open(disk)?);
            directory.print(&headers, io::stdout().lock())?;
        }
        _ => return Ok(Outcome::Usage),
    }
    Ok(Outcome::Done)
}

fn open_rw(path: &str) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(path)
}

fn load(file: &File, logger: Logger) -> flatdir::Result<Directory> {
    let mut builder = flatdir::DirectoryBuilder::new();
    builder.set_logger(logger);
    builder.load(file)
}
