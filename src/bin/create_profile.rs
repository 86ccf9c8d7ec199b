//! CLI tool to create user profiles.
//!
//! Usage:
//!   cargo run --bin create-profile -- --name "Ms. Rivera" --email rivera@example.com --role observer --password <password>

use std::env;

use sproutlog_lib::auth;
use sproutlog_lib::config::Config;
use sproutlog_lib::db::{migrations, DbPool};
use sproutlog_lib::models::UserRole;

fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let mut name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut role = "observer".to_string();
    let mut password: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--name" | "-n" => {
                i += 1;
                if i < args.len() {
                    name = Some(args[i].clone());
                }
            }
            "--email" | "-e" => {
                i += 1;
                if i < args.len() {
                    email = Some(args[i].clone());
                }
            }
            "--role" | "-r" => {
                i += 1;
                if i < args.len() {
                    role = args[i].clone();
                }
            }
            "--password" | "-p" => {
                i += 1;
                if i < args.len() {
                    password = Some(args[i].clone());
                }
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // Validate required arguments
    let name = match name {
        Some(n) => n,
        None => {
            eprintln!("Error: --name is required");
            print_usage();
            std::process::exit(1);
        }
    };

    let email = match email {
        Some(e) => e,
        None => {
            eprintln!("Error: --email is required");
            print_usage();
            std::process::exit(1);
        }
    };

    let password = match password {
        Some(p) => p,
        None => {
            eprintln!("Error: --password is required");
            print_usage();
            std::process::exit(1);
        }
    };

    // Parse role
    let role_enum = match UserRole::parse(&role) {
        Some(r) => r,
        None => {
            eprintln!(
                "Error: Invalid role '{}'. Must be: admin, observer, parent",
                role
            );
            std::process::exit(1);
        }
    };

    // Load config and initialize database
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config.database_url) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    // Run migrations
    if let Err(e) = migrations::run_migrations(&pool) {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    // Create the profile
    let profile = match auth::create_profile(&pool, &name, &email, role_enum, &password) {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("Error creating profile: {}", e);
            std::process::exit(1);
        }
    };

    // Output
    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("  Profile Created");
    println!("════════════════════════════════════════════════════════════════");
    println!();
    println!("  ID:    {}", profile.id);
    println!("  Name:  {}", profile.name);
    println!("  Email: {}", profile.email);
    println!("  Role:  {}", profile.role);
    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!();
}

fn print_usage() {
    eprintln!();
    eprintln!(
        "Usage: create-profile --name <name> --email <email> --password <password> [--role <role>]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --name, -n      Display name for the profile (required)");
    eprintln!("  --email, -e     Login email (required)");
    eprintln!("  --password, -p  Login password (required)");
    eprintln!("  --role, -r      Role: admin, observer, parent (default: observer)");
    eprintln!("  --help, -h      Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  create-profile --name \"Ms. Rivera\" --email rivera@example.com --role observer --password s3cret");
    eprintln!("  create-profile --name \"Site Admin\" --email admin@example.com --role admin --password s3cret");
    eprintln!();
}
