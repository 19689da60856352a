use anyhow::{bail, Context, Result};
use log::info;
use std::env;
use std::path::Path;

// Use library instead of local modules
use wedding_rsvp::{
    create_group, get_group, import_guests, list_members, load_guests_csv, open_database,
    CodeType, Config, InvitationRegistry,
};

const USAGE: &str = "\
Usage: wedding-rsvp <command> [args]

Commands:
  import <guests.csv>                  Register guests from a CSV file
  issue <guest_id> [code_type]         Issue an invitation code (default PRIMARY)
  replace <guest_id>                   Issue a replacement code
  codes <guest_id>                     List every code a guest owns
  validate <code>                      Resolve a code to its guest
  mark-used <code>                     Flag a code as used
  revoke <guest_id>                    Expire and mark used all of a guest's codes
  family <guest_id> <max> <name...>    Create a family group for a primary contact
  roster <family_group_id>             Show a family group's roster";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = Config::from_env().context("Invalid configuration")?;
    info!("Using database {:?}", config.db_path);
    let conn = open_database(&config.db_path).context("Failed to open database")?;
    let registry = InvitationRegistry::from_config(&config);

    match (command.as_str(), &args[1..]) {
        ("import", [path]) => {
            println!("📂 Loading guests from {}...", path);
            let guests = load_guests_csv(Path::new(path))?;
            let stats = import_guests(&conn, &guests)?;
            println!("✓ Inserted: {} guests", stats.inserted);
            println!("✓ Skipped duplicates: {}", stats.duplicates);
        }
        ("issue", [guest_id, rest @ ..]) => {
            let code_type = rest
                .first()
                .map(|t| CodeType::parse(t))
                .transpose()?
                .unwrap_or(CodeType::Primary);
            let code = registry.issue(&conn, parse_id(guest_id)?, code_type)?;
            println!("🎟️  {} ({}), expires {}", code.code, code.code_type, code.expiry_at.format("%Y-%m-%d"));
        }
        ("replace", [guest_id]) => {
            let code = registry.issue_replacement(&conn, parse_id(guest_id)?)?;
            println!("🎟️  {} (REPLACEMENT), expires {}", code.code, code.expiry_at.format("%Y-%m-%d"));
        }
        ("codes", [guest_id]) => {
            let codes = registry.list_for_guest(&conn, parse_id(guest_id)?)?;
            for code in &codes {
                println!(
                    "{}  {:<12} created {}  expires {}  used: {}",
                    code.code,
                    code.code_type,
                    code.created_at.format("%Y-%m-%d"),
                    code.expiry_at.format("%Y-%m-%d"),
                    code.used
                );
            }
            println!("✓ {} codes", codes.len());
        }
        ("validate", [code]) => {
            let guest = registry.validate(&conn, code)?;
            println!("✅ {} belongs to {} (guest {})", code, guest.full_name(), guest.id);
        }
        ("mark-used", [code]) => {
            registry.mark_used(&conn, code)?;
            println!("✓ {} marked as used", code);
        }
        ("revoke", [guest_id]) => {
            let revoked = registry.invalidate_all(&conn, parse_id(guest_id)?)?;
            println!("✓ Revoked {} codes", revoked);
        }
        ("family", [guest_id, max, name @ ..]) if !name.is_empty() => {
            let max_attendees: u32 = max.parse().context("max attendees must be a number")?;
            let group = create_group(&conn, &name.join(" "), parse_id(guest_id)?, max_attendees)?;
            println!("👨‍👩‍👧 Created family group {} ({}), capacity {}", group.id, group.name, group.max_attendees);
        }
        ("roster", [group_id]) => {
            let group = get_group(&conn, parse_id(group_id)?)?;
            let members = list_members(&conn, group.id)?;
            println!("{} (capacity {})", group.name, group.max_attendees);
            for member in &members {
                println!(
                    "  {} {:<24} {:<8} {}{}",
                    if member.is_attending { "✅" } else { "❌" },
                    member.full_name(),
                    member.age_group,
                    member.dietary_restrictions.as_deref().unwrap_or(""),
                    member.id.map(|id| format!(" (#{})", id)).unwrap_or_default()
                );
            }
        }
        _ => bail!("Unknown command or wrong arguments\n\n{}", USAGE),
    }

    Ok(())
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse::<i64>()
        .with_context(|| format!("{:?} is not a valid id", raw))
}
