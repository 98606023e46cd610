use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::OffsetDateTime;

use khata::{PasswordHash, ValidatedPassword, initialize_db};

/// A utility for creating a test database for the khata web server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user 'test' with password 'test'...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    conn.execute(
        "INSERT INTO user (name, email, password) VALUES (?1, ?2, ?3)",
        ("test", "test@example.com", password_hash.to_string()),
    )?;
    let user_id = conn.last_insert_rowid();

    println!("Recording sample expenses...");

    let today = OffsetDateTime::now_utc().date();
    let month_prefix = format!("{:04}-{:02}", today.year(), today.month() as u8);

    let sample_expenses = [
        ("Food", 240.0, "Groceries", "UPI", 2),
        ("Food", 180.0, "Lunch out", "Cash", 5),
        ("Travel", 320.0, "Train tickets", "Card", 8),
        ("Rent", 12000.0, "Monthly rent", "Bank transfer", 1),
        ("Movies", 450.0, "Cinema", "UPI", 12),
        ("Food", 95.5, "Snacks", "Cash", 14),
    ];

    for (category, amount, description, payment_method, day) in sample_expenses {
        conn.execute(
            "INSERT INTO expense (user_id, amount, category, description, payment_method, date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                user_id,
                amount,
                category,
                description,
                payment_method,
                format!("{month_prefix}-{day:02}"),
            ),
        )?;
    }

    println!("Setting a budget plan for {month_prefix}...");

    let ceilings = [("food", 1000.0), ("travel", 500.0), ("rent", 12000.0)];
    let total: f64 = ceilings.iter().map(|(_, ceiling)| ceiling).sum();

    conn.execute(
        "INSERT INTO budget (user_id, day, month, year, total) VALUES (?1, ?2, ?3, ?4, ?5)",
        (user_id, 1, today.month() as u8, today.year(), total),
    )?;
    let budget_id = conn.last_insert_rowid();

    for (category, ceiling) in ceilings {
        conn.execute(
            "INSERT INTO budget_category (budget_id, category, amount) VALUES (?1, ?2, ?3)",
            (budget_id, category, ceiling),
        )?;
    }

    println!("Success!");

    Ok(())
}
