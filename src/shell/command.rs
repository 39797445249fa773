use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::{error::Error, sync::Arc};

use crate::{
    fs::{directory::DirEntryType, FileSystem},
    utils::printable,
};

#[derive(Debug)]
pub enum Command {
    Help,
    Ls { path: Option<String>, recursive: bool },
    Pwd,
    Cd(String),
    Mkdir(String),
    Create(String, usize),
    Rm { path: String, recursive: bool },
    Cat(String),
    Write(String, usize, String),
    Stat(String),
    Print,
    Df,
    Open(String),
    Close(usize),
    FRead(usize, usize),
    FWrite(usize, String),
    FSeek(usize, usize),
    Files,
    Format,
    Exit,
}

pub fn execute_command(
    cmd: &Command,
    fs: &mut FileSystem,
    current_dir: &mut String,
) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Help => print_help(),
        Command::Ls { path, recursive } => {
            let target = match path {
                Some(p) => resolve(current_dir, p),
                None => current_dir.clone(),
            };
            let lines = fs.list(&target, *recursive)?;
            if lines.is_empty() {
                println!("{}", "(empty)".bright_black());
            }
            for line in lines {
                if line.contains("[D]") {
                    println!("{}", line.blue());
                } else {
                    println!("{}", line);
                }
            }
        }
        Command::Pwd => println!("📍 {}", current_dir.cyan()),
        Command::Cd(path) => {
            let target = resolve(current_dir, path);
            let stat = fs.stat(&target)?;
            if stat.entry_type != DirEntryType::Directory {
                return Err(format!("{} is not a directory", target).into());
            }
            *current_dir = target;
            println!("📂 Moved to {}", current_dir.blue());
        }
        Command::Mkdir(path) => {
            let target = resolve(current_dir, path);
            fs.make_directory(&target)?;
            println!("✅ Created directory: {}", target.green());
        }
        Command::Create(path, size) => {
            let target = resolve(current_dir, path);
            fs.create(&target, *size)?;
            println!("📝 Created file: {} ({} bytes)", target.green(), size);
        }
        Command::Rm { path, recursive } => {
            let target = resolve(current_dir, path);
            fs.remove(&target, *recursive)?;
            println!("❌ Deleted: {}", target.red());
        }
        Command::Cat(path) => {
            let target = resolve(current_dir, path);
            let file = fs.open(&target)?;
            let mut buf = vec![0u8; file.length()];
            let read = file.read_at(&mut buf, 0)?;
            println!("{}", printable(&buf[..read]));
        }
        Command::Write(path, offset, content) => {
            let target = resolve(current_dir, path);
            let file = fs.open(&target)?;
            let written = file.write_at(content.as_bytes(), *offset)?;
            println!(
                "✏️  Wrote {} of {} bytes to {} at offset {}",
                written,
                content.len(),
                target.cyan(),
                offset
            );
        }
        Command::Stat(path) => {
            let target = resolve(current_dir, path);
            let stat = fs.stat(&target)?;
            let blocks: Vec<String> = stat.blocks.iter().map(|b| b.to_string()).collect();
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {} bytes\n{}: {}\n{}: {}\n",
                "📊 File Info".bright_yellow().bold(),
                "Name".blue(),
                target,
                "Type".blue(),
                stat.entry_type.tag(),
                "Size".blue(),
                stat.length,
                "Header".blue(),
                stat.header_sector,
                "Blocks".blue(),
                blocks.join(" -> ")
            );
        }
        Command::Print => print!("{}", fs.print()?),
        Command::Df => {
            let total = fs.device().num_sectors();
            let free = fs.free_sectors()?;
            println!(
                "💾 {} of {} sectors free ({} bytes per sector)",
                free.to_string().green(),
                total,
                fs.device().sector_size()
            );
        }
        Command::Open(path) => {
            let target = resolve(current_dir, path);
            let id = fs.open_file_id(&target)?;
            println!("📂 Opened {} as id {}", target.cyan(), id.to_string().green());
        }
        Command::Close(id) => {
            fs.close_file(*id)?;
            println!("🔒 Closed id {}", id);
        }
        Command::FRead(id, n) => {
            let n = (*n).min(fs.remaining_bytes(*id)?);
            let mut buf = vec![0u8; n];
            let read = fs.read_file(*id, &mut buf)?;
            println!("{}", printable(&buf[..read]));
            println!("{}", format!("({} bytes)", read).bright_black());
        }
        Command::FWrite(id, content) => {
            let written = fs.write_file(*id, content.as_bytes())?;
            println!("✏️  Wrote {} bytes to id {}", written, id);
        }
        Command::FSeek(id, position) => {
            fs.seek_file(*id, *position)?;
            println!("↪️  id {} now at {}", id, position);
        }
        Command::Files => {
            let ids = fs.open_file_ids();
            if ids.is_empty() {
                println!("{}", "(no open files)".bright_black());
            }
            for (id, sector) in ids {
                println!("{:>3}  header sector {}", id, sector);
            }
        }
        Command::Format => {
            let confirmed = Confirm::new()
                .with_prompt("This erases every file on the disk. Continue?")
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{}", "Format cancelled.".yellow());
                return Ok(());
            }

            println!("💾 Formatting virtual disk...");
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.set_message("writing bitmap and root directory");
            *fs = FileSystem::format(Arc::clone(fs.device()))?;
            *current_dir = "/".to_string();
            pb.finish_with_message("✅ Disk formatted successfully!");
        }
        Command::Exit => println!("{}", "👋 Exiting chainfs shell...".yellow().bold()),
    }

    Ok(())
}

/// 把相对路径接到当前目录上，并处理 `.` 与 `..`
pub fn resolve(current_dir: &str, path: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", current_dir, path)
    };

    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

fn print_help() {
    println!("{}", "📘 chainfs Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls [-r] [dir]           List directory (-r: whole tree)
  pwd                     Print current path
  cd <dir>                Change directory
  mkdir <dir>             Create directory
  create <file> <size>    Create a zero-filled file of <size> bytes
  rm [-r] <path>          Remove file or directory (-r: with contents)
  cat <file>              Print file content
  write <file> <off> <s>  Write string into file at offset
  stat <path>             Show header sector, size and block chain
  print                   Dump bitmap, headers and all file contents
  df                      Show free sectors
  open <file>             Open file, print its id
  fread <id> <n>          Read n bytes from an open file
  fwrite <id> <s>         Write string to an open file
  fseek <id> <pos>        Move an open file's position
  close <id>              Close an open file
  files                   List open file ids
  format                  Format virtual disk
  help                    Show this help message
  exit                    Quit the shell
"
        .bright_black()
    );
}
