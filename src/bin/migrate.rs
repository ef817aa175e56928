use anyhow::{Result, anyhow};
use promo_code_bot::config::Config;
use promo_code_bot::database::connection::DatabaseManager;
use promo_code_bot::database::models::{Code, MessageTemplate};
use promo_code_bot::store::{MessagePool, PoolKind};
use std::env;
use std::io;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize basic logging for the migration
    env_logger::init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("migrate");

    match command {
        "migrate" | "up" => run_migrations().await,
        "check" => check_database().await,
        "reset" => reset_database().await,
        "seed-codes" => {
            let (pool, file) = seed_args(&args)?;
            seed_codes(pool.parse::<PoolKind>().map_err(|e| anyhow!(e))?, file).await
        }
        "seed-messages" => {
            let (pool, file) = seed_args(&args)?;
            seed_messages(pool.parse::<MessagePool>().map_err(|e| anyhow!(e))?, file).await
        }
        "stock" => show_stock().await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {command}");
            print_help();
            std::process::exit(1);
        }
    }
}

fn seed_args(args: &[String]) -> Result<(&str, &str)> {
    match (args.get(2), args.get(3)) {
        (Some(pool), Some(file)) => Ok((pool.as_str(), file.as_str())),
        _ => Err(anyhow!("Usage: migrate {} <pool> <file>", args.get(1).map(|s| s.as_str()).unwrap_or(""))),
    }
}

async fn connect() -> Result<DatabaseManager> {
    dotenvy::dotenv().ok();
    let database_url = Config::database_url_from_env();

    println!("📊 Database URL: {}", mask_url(&database_url));

    // Ensure data directory exists for SQLite
    if let Some(db_path) = sqlite_path(&database_url) {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                println!("📁 Creating directory: {}", parent.display());
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    DatabaseManager::new(&database_url).await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))
}

async fn run_migrations() -> Result<()> {
    println!("🔧 Promo Code Bot - Database Migration Tool");
    println!("============================================");

    let db_manager = connect().await?;

    println!("🚀 Running database migrations...");

    match db_manager.run_migrations().await {
        Ok(_) => {
            println!("✅ Migrations completed successfully!");
            println!("\n🍕 Next: load codes with 'migrate seed-codes discount codes.txt'");
        }
        Err(e) => {
            eprintln!("❌ Migration failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn check_database() -> Result<()> {
    println!("🔍 Checking database connection and schema...");

    let db_manager = connect().await?;

    // Try to query the database to check if tables exist
    match check_tables(&db_manager).await {
        Ok(tables) => {
            println!("✅ Database connection successful!");
            println!("📋 Found tables:");
            for table in tables {
                println!("  • {table}");
            }
        }
        Err(e) => {
            println!("⚠️  Database check failed: {e}");
            println!("💡 Try running 'migrate up' to create the schema");
        }
    }

    Ok(())
}

async fn reset_database() -> Result<()> {
    println!("⚠️  WARNING: This will delete ALL codes, claims and messages!");
    println!("🤔 Are you sure you want to continue? (yes/no)");

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    if input.trim().to_lowercase() != "yes" {
        println!("❌ Reset cancelled.");
        return Ok(());
    }

    dotenvy::dotenv().ok();
    let database_url = Config::database_url_from_env();

    // For SQLite, we can just delete the file
    match sqlite_path(&database_url) {
        Some(db_path) => {
            if Path::new(db_path).exists() {
                std::fs::remove_file(db_path)?;
                println!("🗑️  Deleted database file: {db_path}");
            }
        }
        None => return Err(anyhow!("Reset is only supported for SQLite databases")),
    }

    // Run migrations to recreate the schema
    println!("🔄 Recreating database schema...");
    run_migrations().await?;

    println!("✅ Database reset completed!");

    Ok(())
}

async fn seed_codes(pool: PoolKind, file: &str) -> Result<()> {
    let values = read_entries(file)?;
    let db_manager = connect().await?;
    db_manager.run_migrations().await?;

    let inserted = Code::insert_many(&db_manager.pool, pool.as_str(), &values).await?;
    println!(
        "✅ Added {} new {} codes ({} already present)",
        inserted,
        pool,
        values.len() as u64 - inserted
    );

    Ok(())
}

async fn seed_messages(pool: MessagePool, file: &str) -> Result<()> {
    let texts = read_entries(file)?;
    let db_manager = connect().await?;
    db_manager.run_migrations().await?;

    let stored = MessageTemplate::replace_pool(&db_manager.pool, pool.as_str(), &texts).await?;
    println!("✅ Stored {stored} {pool} messages");

    Ok(())
}

async fn show_stock() -> Result<()> {
    let db_manager = connect().await?;

    for pool in PoolKind::ALL {
        let level = Code::stock(&db_manager.pool, pool.as_str()).await?;
        println!("🎟️  {:<9} available: {:>6}  issued: {:>6}", pool.as_str(), level.available, level.issued);
    }

    Ok(())
}

/// One entry per non-blank line; `\n` inside a line becomes a line break
fn read_entries(file: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| anyhow!("Failed to read {}: {}", file, e))?;

    let entries: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.replace("\\n", "\n"))
        .collect();

    if entries.is_empty() {
        return Err(anyhow!("{} contains no entries", file));
    }

    Ok(entries)
}

async fn check_tables(db_manager: &DatabaseManager) -> Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table'")
        .fetch_all(&db_manager.pool)
        .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

fn sqlite_path(url: &str) -> Option<&str> {
    url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:"))
}

fn mask_url(url: &str) -> String {
    // Simple URL masking for security (don't show full paths in production)
    match sqlite_path(url) {
        Some(path) => match Path::new(path).file_name() {
            Some(filename) => format!("sqlite:.../{}", filename.to_string_lossy()),
            None => url.to_string(),
        },
        None => url.to_string(),
    }
}

fn print_help() {
    println!("🍕 Promo Code Bot - Database Tool");
    println!();
    println!("USAGE:");
    println!("    migrate [COMMAND]");
    println!();
    println!("COMMANDS:");
    println!("    migrate, up                   Run database migrations (default)");
    println!("    check                         Check database connection and schema");
    println!("    reset                         Reset database (SQLite only) - DESTRUCTIVE!");
    println!("    seed-codes <pool> <file>      Add codes (one per line) to 'discount' or 'drink'");
    println!("    seed-messages <pool> <file>   Replace 'filler' or 'drink_prompt' messages");
    println!("    stock                         Show available and issued codes per pool");
    println!("    help                          Show this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    DATABASE_URL   Database connection string (default: sqlite:./data/promo.db)");
    println!();
    println!("EXAMPLES:");
    println!("    migrate                                  # Run migrations");
    println!("    migrate seed-codes discount codes.txt    # Load discount codes");
    println!("    migrate seed-messages filler chat.txt    # Load filler replies");
    println!("    migrate stock                            # How many codes are left");
    println!();
}
