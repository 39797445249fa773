use crate::shell::command::Command;

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let cmd = tokens[0];
    let args = &tokens[1..];
    let recursive = args.first() == Some(&"-r");
    let rest = if recursive { &args[1..] } else { args };

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls {
            path: rest.first().map(|p| p.to_string()),
            recursive,
        }),
        "pwd" => Some(Command::Pwd),
        "cd" => args.first().map(|&p| Command::Cd(p.to_string())),
        "mkdir" => args.first().map(|&p| Command::Mkdir(p.to_string())),
        "create" => {
            let path = args.first()?;
            let size = args.get(1)?.parse().ok()?;
            Some(Command::Create(path.to_string(), size))
        }
        "rm" => rest.first().map(|&p| Command::Rm {
            path: p.to_string(),
            recursive,
        }),
        "cat" => args.first().map(|&p| Command::Cat(p.to_string())),
        "write" => {
            if args.len() < 3 {
                return None;
            }
            let offset = args[1].parse().ok()?;
            Some(Command::Write(args[0].to_string(), offset, args[2..].join(" ")))
        }
        "stat" => args.first().map(|&p| Command::Stat(p.to_string())),
        "print" => Some(Command::Print),
        "df" => Some(Command::Df),
        "open" => args.first().map(|&p| Command::Open(p.to_string())),
        "close" => Some(Command::Close(args.first()?.parse().ok()?)),
        "fread" => Some(Command::FRead(
            args.first()?.parse().ok()?,
            args.get(1)?.parse().ok()?,
        )),
        "fwrite" => {
            if args.len() < 2 {
                return None;
            }
            Some(Command::FWrite(args[0].parse().ok()?, args[1..].join(" ")))
        }
        "fseek" => Some(Command::FSeek(
            args.first()?.parse().ok()?,
            args.get(1)?.parse().ok()?,
        )),
        "files" => Some(Command::Files),
        "format" => Some(Command::Format),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}
