use std::{error::Error, io::Write, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use ledger::{Category, Ledger, MenuItem, MoneyCents, Student};
use migration::MigratorTrait;
use sea_orm::{ActiveValue::Set, Database, DatabaseConnection, EntityTrait};

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
        pub password: String,
        pub role: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "mensa_admin")]
#[command(about = "Admin utilities for the canteen backend (bootstrap users/students/menu)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./mensa.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Student(StudentCmd),
    Menu(Menu),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Admin,
    Parent,
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    /// `parent` logins also get a wallet with a zero balance.
    #[arg(long, value_enum, default_value = "parent")]
    role: RoleArg,
}

#[derive(Args, Debug)]
struct StudentCmd {
    #[command(subcommand)]
    command: StudentCommand,
}

#[derive(Subcommand, Debug)]
enum StudentCommand {
    Create(StudentCreateArgs),
}

#[derive(Args, Debug)]
struct StudentCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    grade: String,
    /// Parent username to link the student to.
    #[arg(long)]
    parent: Option<String>,
    #[arg(long)]
    dietary_notes: Option<String>,
}

#[derive(Args, Debug)]
struct Menu {
    #[command(subcommand)]
    command: MenuCommand,
}

#[derive(Subcommand, Debug)]
enum MenuCommand {
    Add(MenuAddArgs),
}

#[derive(Args, Debug)]
struct MenuAddArgs {
    #[arg(long)]
    name: String,
    /// Price in euros, e.g. `4.50`.
    #[arg(long)]
    price: String,
    #[arg(long, default_value = "main")]
    category: String,
    /// Omit for unlimited stock.
    #[arg(long)]
    stock: Option<i32>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let first = prompt_password("Password: ")?;
        if first.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let second = prompt_password("Confirm password: ")?;
        if first == second {
            return Ok(first);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let ledger = Ledger::builder().database(db.clone()).build();

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let role = match args.role {
                RoleArg::Admin => "admin",
                RoleArg::Parent => "parent",
            };
            users::Entity::insert(users::ActiveModel {
                username: Set(args.username.clone()),
                password: Set(password),
                role: Set(role.to_string()),
            })
            .exec(&db)
            .await?;

            if matches!(args.role, RoleArg::Parent) {
                ledger.create_parent(&args.username).await?;
            }
            println!("Created {role} login {:?}", args.username);
        }
        Command::Student(StudentCmd {
            command: StudentCommand::Create(args),
        }) => {
            let mut student = Student::new(args.name, args.grade, args.dietary_notes);
            student.parent_id = args.parent;
            ledger.add_student(&student).await?;
            println!("Created student {} ({})", student.name, student.id);
        }
        Command::Menu(Menu {
            command: MenuCommand::Add(args),
        }) => {
            let price = MoneyCents::from_str(&args.price)?;
            let category = Category::try_from(args.category.as_str())?;
            let item = MenuItem::new(args.name, price, category, args.stock)?;
            ledger.add_menu_item(&item).await?;
            println!("Added {} at {} ({})", item.name, item.price, item.id);
        }
    }

    Ok(())
}
