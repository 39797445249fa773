pub mod command;
pub mod logger;
pub mod parse;

use crate::{
    disk::{
        init::{perform_disk_initialization, DiskOptions},
        NUM_SECTORS,
    },
    fs::{error::FileSystemError, FileSystem},
    shell::{command::execute_command, parse::parse_command},
};
use clap::Parser;
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use indicatif::{ProgressBar, ProgressStyle};
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
};
use std::{io::stdout, path::PathBuf, sync::mpsc, thread};

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "chainfs", version, about = "Linked-sector teaching file system shell")]
pub struct Args {
    /// Disk image to open (created if missing)
    #[arg(short, long, default_value = "disk.img")]
    pub disk: PathBuf,

    /// Number of sectors when creating a new image
    #[arg(long, default_value_t = NUM_SECTORS)]
    pub sectors: u32,

    /// Reformat the image even if it already holds a file system
    #[arg(long)]
    pub format: bool,

    /// Log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// 启动线程向 UI 汇报的进度
pub enum BootProgress {
    Step(&'static str),
    Progress(u64),
    Finished(Result<FileSystem, FileSystemError>),
}

pub fn start_shell(args: Args) {
    logger::init_logger(args.verbose);

    let mut fs = match boot(&args) {
        Some(fs) => fs,
        None => return,
    };

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
    let mut current_dir = String::from("/");

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chainfs_history");

    let mut line_editor = Reedline::create();
    match FileBackedHistory::with_file(100, history_path) {
        Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
        Err(e) => log::warn!("history disabled: {}", e),
    }

    // 命令补全
    let commands: Vec<String> = [
        "help", "ls", "pwd", "cd", "mkdir", "create", "rm", "cat", "write", "stat", "print",
        "df", "open", "close", "fread", "fwrite", "fseek", "files", "format", "exit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let completer = DefaultCompleter::new_with_wordlen(commands, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(format!(
                "{}:{}",
                format!("{}@{}", username, hostname).green(),
                current_dir.blue()
            )),
            DefaultPromptSegment::Basic("chainfs".bright_blue().bold().to_string()),
        );

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut fs, &mut current_dir) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if matches!(cmd, command::Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command or missing arguments. Type 'help' for command list."
                            .yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting chainfs...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
}

/// 在后台线程中打开/格式化磁盘，前台显示进度条
fn boot(args: &Args) -> Option<FileSystem> {
    let mut stdout = stdout();
    let _ = execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0));
    println!("{}", "[chainfs Booting...]".bright_yellow().bold());

    let (tx, rx) = mpsc::channel();
    let options = DiskOptions {
        path: args.disk.clone(),
        num_sectors: args.sectors,
        force_format: args.format,
    };
    let worker = thread::spawn(move || perform_disk_initialization(tx, options));

    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut result = None;
    for progress in rx {
        match progress {
            BootProgress::Step(step) => pb.set_message(step),
            BootProgress::Progress(i) => pb.set_position(i),
            BootProgress::Finished(r) => {
                result = Some(r);
                break;
            }
        }
    }
    let _ = worker.join();

    match result {
        Some(Ok(fs)) => {
            pb.finish_with_message("✅ Ready!");
            let _ = execute!(
                stdout,
                SetForegroundColor(Color::Cyan),
                Print(format!("Welcome to chainfs v{}\n", env!("CARGO_PKG_VERSION"))),
                ResetColor
            );
            Some(fs)
        }
        Some(Err(e)) => {
            pb.abandon_with_message("boot failed");
            println!("{} {}", "❌ Cannot mount disk:".red().bold(), e);
            None
        }
        None => {
            pb.abandon_with_message("boot failed");
            println!("{}", "❌ Disk initialization stopped unexpectedly".red().bold());
            None
        }
    }
}
