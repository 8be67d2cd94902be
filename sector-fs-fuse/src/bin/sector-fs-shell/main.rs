mod cli;

use std::io::{self, Write};

use clap::Parser;
use cli::{Cli, Command};
use sector_fs_fuse::{copy_in, format_image, mount_image, read_all, recover_to};

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut fs = match cli.command {
        Command::Format => format_image(&cli.disk)?,
        _ => mount_image(&cli.disk)?,
    };

    match cli.command {
        Command::Format => println!("formatted {}", cli.disk.display()),
        Command::Create { path, size } => fs.create(&path, size).map_err(io::Error::other)?,
        Command::Mkdir { path } => fs.create_folder(&path).map_err(io::Error::other)?,
        Command::Cp { host, path } => copy_in(&mut fs, &host, &path)?,
        Command::Cat { path } => io::stdout().write_all(&read_all(&mut fs, &path)?)?,
        Command::Rm { path } => fs.remove(&path).map_err(io::Error::other)?,
        Command::Recover { path, host } => recover_to(&fs, &path, &host)?,
        Command::Ls { path, recursive } if recursive => {
            let prefix = format!("/{}", path.trim_matches('/'));
            for node in fs.walk() {
                if prefix == "/" || node.path.starts_with(&format!("{prefix}/")) {
                    let kind = if node.is_dir { 'd' } else { '-' };
                    println!("{kind} {:>6} {}", node.size, node.path);
                }
            }
        }
        Command::Ls { path, .. } => {
            for entry in fs.list_dir(&path).map_err(io::Error::other)? {
                let kind = if entry.is_dir() { 'd' } else { '-' };
                println!("{kind} {}", entry.name());
            }
        }
        Command::Print => print!("{}", fs.print()),
    }

    Ok(())
}
