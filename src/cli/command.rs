use dragonball_admin::{PageMove, View};

#[derive(Debug, Clone, PartialEq)]
pub enum PageTarget {
    Number(u64),
    Move(PageMove),
}

/// One line typed into the console input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: String, password: String },
    Logout,
    Help,
    Quit,
    Switch(Option<View>),
    Filter { field: String, value: String },
    Clear,
    Page(PageTarget),
    Reload,
    Show(u64),
    Create(Vec<String>),
    Edit { id: u64, assignments: Vec<String> },
    Delete { id: u64, confirmed: bool },
}

pub const COMMANDS: &[&str] = &[
    "login", "logout", "help", "quit", "view", "filter", "clear", "page", "reload", "show",
    "new", "edit", "delete",
];

pub const HELP: &[&str] = &[
    "login <username> <password>     sign in",
    "logout                          sign out",
    "view [characters|planets]       switch listing (Tab when input is empty)",
    "filter <field>=<value>          narrow the listing; empty value clears the field",
    "clear                           drop all filters",
    "page <n>|first|prev|next|last   move through pages (PageUp/PageDown)",
    "reload                          fetch the current page again",
    "show <id>                       print one record",
    "new <field>=<value>; ...        create a local record",
    "edit <id> <field>=<value>; ...  change a record",
    "delete <id> [--yes]             remove a record (asks first without --yes)",
    "quit                            leave (Esc)",
];

fn parse_id(raw: Option<&str>) -> Result<u64, String> {
    let raw = raw.ok_or_else(|| "Missing record id".to_string())?;
    raw.parse::<u64>()
        .map_err(|_| format!("Invalid record id '{}'", raw))
}

/// Splits `a=1; b=two words` into its assignments.
fn split_assignments(rest: &str) -> Vec<String> {
    rest.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

impl Command {
    pub fn parse(input: &str) -> Result<Command, String> {
        let input = input.trim();
        let (head, rest) = match input.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (input, ""),
        };
        let mut args = rest.split_whitespace();

        match head.to_lowercase().as_str() {
            "login" => {
                let username = args.next().ok_or("Usage: login <username> <password>")?;
                let password = args.next().ok_or("Usage: login <username> <password>")?;
                Ok(Command::Login {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            "logout" => Ok(Command::Logout),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "view" => match args.next().map(str::to_lowercase).as_deref() {
                None => Ok(Command::Switch(None)),
                Some("characters") | Some("character") => Ok(Command::Switch(Some(View::Characters))),
                Some("planets") | Some("planet") => Ok(Command::Switch(Some(View::Planets))),
                Some(other) => Err(format!("Unknown view '{}'", other)),
            },
            "filter" => {
                let (field, value) = rest
                    .split_once('=')
                    .ok_or("Usage: filter <field>=<value>")?;
                Ok(Command::Filter {
                    field: field.trim().to_string(),
                    value: value.trim().to_string(),
                })
            }
            "clear" => Ok(Command::Clear),
            "page" => {
                let target = match args.next().map(str::to_lowercase).as_deref() {
                    Some("first") => PageTarget::Move(PageMove::First),
                    Some("prev") | Some("previous") => PageTarget::Move(PageMove::Previous),
                    Some("next") => PageTarget::Move(PageMove::Next),
                    Some("last") => PageTarget::Move(PageMove::Last),
                    Some(number) => PageTarget::Number(
                        number
                            .parse()
                            .map_err(|_| format!("Invalid page '{}'", number))?,
                    ),
                    None => return Err("Usage: page <n>|first|prev|next|last".to_string()),
                };
                Ok(Command::Page(target))
            }
            "reload" => Ok(Command::Reload),
            "show" => Ok(Command::Show(parse_id(args.next())?)),
            "new" | "create" => {
                let assignments = split_assignments(rest);
                if assignments.is_empty() {
                    return Err("Usage: new <field>=<value>; ...".to_string());
                }
                Ok(Command::Create(assignments))
            }
            "edit" => {
                let id = parse_id(args.next())?;
                let fields = rest
                    .split_once(char::is_whitespace)
                    .map(|(_, fields)| fields)
                    .unwrap_or("");
                let assignments = split_assignments(fields);
                if assignments.is_empty() {
                    return Err("Usage: edit <id> <field>=<value>; ...".to_string());
                }
                Ok(Command::Edit { id, assignments })
            }
            "delete" | "rm" => {
                let id = parse_id(args.next())?;
                let confirmed = match args.next() {
                    None => false,
                    Some("--yes") | Some("-y") => true,
                    Some(other) => return Err(format!("Unexpected argument '{}'", other)),
                };
                Ok(Command::Delete { id, confirmed })
            }
            "" => Err("Empty command".to_string()),
            other => Err(format!("Unknown command '{}'. Type 'help'", other)),
        }
    }
}
