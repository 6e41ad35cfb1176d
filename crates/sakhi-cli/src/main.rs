//! Sakhi CLI - Command-line interface for Krishi Sakhi
//!
//! Log farm activities and manage a farmer profile from the terminal,
//! online or offline.

mod config_file;
mod session_file;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use sakhi_core::auth::registration::Registration;
use sakhi_core::auth::{AuthError, IdentityApi, SessionPersistence, SupabasePhoneAuth};
use sakhi_core::config::RemoteConfig;
use sakhi_core::models::{
    ActivityCategory, ActivityDraft, ActivityLogEntry, FarmDetails, Language, Location, Profile,
    RecentActivity,
};
use sakhi_core::search::{filter_entries, format_entry_date, CategoryFilter};
use sakhi_core::session::SessionGate;
use sakhi_core::store::{
    ActivityStore, CropStore, JsonFileStore, ProfileStore, StoreError, SupabaseRest,
};
use sakhi_core::util::{is_http_url, normalize_text_option};
use thiserror::Error;

use config_file::CliConfig;
use session_file::SessionFileStore;

/// Profile key used for local fallback storage when no backend is configured.
const LOCAL_PROFILE_ID: &str = "local";

#[derive(Parser)]
#[command(name = "sakhi")]
#[command(about = "Track farm activities and crops from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Supabase project URL (overrides env and config file)
    #[arg(long, global = true, value_name = "URL")]
    supabase_url: Option<String>,

    /// Supabase anon key (overrides env and config file)
    #[arg(long, global = true, value_name = "KEY")]
    anon_key: Option<String>,

    /// Directory for the session and local fallback storage
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with a phone number
    Login {
        /// 10-digit phone number
        phone: String,
    },
    /// Create an account and profile interactively
    Register {
        /// Interface language
        #[arg(long, value_enum, default_value_t = CliLanguage::En)]
        language: CliLanguage,
    },
    /// Show the signed-in profile
    Profile {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log and list farm activities
    Activity {
        #[command(subcommand)]
        command: ActivityCommands,
    },
    /// Replay locally saved activities to the remote store
    Sync,
    /// Sign out and clear the stored session
    Logout,
    /// Show or update the stored remote configuration
    Config {
        /// Set the Supabase project URL
        #[arg(long, value_name = "URL")]
        set_url: Option<String>,
        /// Set the Supabase anon key
        #[arg(long, value_name = "KEY")]
        set_key: Option<String>,
    },
}

#[derive(Subcommand)]
enum ActivityCommands {
    /// Log a new activity
    Add {
        /// Crop the activity was performed on
        #[arg(long)]
        crop: String,
        /// Activity category (irrigation, fertilizer, pesticide, weeding,
        /// mulching, harvest, sowing)
        #[arg(long)]
        category: String,
        /// What was done
        #[arg(long)]
        description: String,
        /// Amount used or produced
        #[arg(long)]
        quantity: Option<String>,
        /// Unit for the quantity, e.g. liters
        #[arg(long)]
        unit: Option<String>,
        /// Date of the activity (YYYY-MM-DD, today when omitted)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Additional notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// List activities, most recent first
    List {
        /// Case-insensitive search over description and category
        #[arg(long)]
        search: Option<String>,
        /// Restrict to one category
        #[arg(long)]
        filter: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum CliLanguage {
    En,
    Ml,
}

impl From<CliLanguage> for Language {
    fn from(value: CliLanguage) -> Self {
        match value {
            CliLanguage::En => Self::En,
            CliLanguage::Ml => Self::Ml,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] sakhi_core::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Config(String),
    #[error(
        "Remote backend is not configured. Set SAKHI_SUPABASE_URL and SAKHI_SUPABASE_ANON_KEY or run `sakhi config`."
    )]
    RemoteNotConfigured,
    #[error("Not signed in. Run `sakhi login <phone>` first.")]
    NotSignedIn,
    #[error("{0}")]
    InvalidArgument(String),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sakhi=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let env = Env::resolve(&cli);

    match cli.command {
        Commands::Login { phone } => run_login(&phone, &env).await?,
        Commands::Register { language } => run_register(language.into(), &env).await?,
        Commands::Profile { json } => run_profile(json, &env).await?,
        Commands::Activity { command } => match command {
            ActivityCommands::Add {
                crop,
                category,
                description,
                quantity,
                unit,
                date,
                notes,
            } => {
                let category = category
                    .parse::<ActivityCategory>()
                    .map_err(CliError::InvalidArgument)?;
                let draft = ActivityDraft {
                    crop,
                    category,
                    description,
                    quantity,
                    unit,
                    date: date.unwrap_or_else(|| Local::now().date_naive()),
                    notes,
                };
                run_activity_add(draft, &env).await?;
            }
            ActivityCommands::List {
                search,
                filter,
                json,
            } => run_activity_list(search.as_deref(), filter.as_deref(), json, &env).await?,
        },
        Commands::Sync => run_sync(&env).await?,
        Commands::Logout => run_logout(&env).await?,
        Commands::Config { set_url, set_key } => run_config(set_url, set_key)?,
    }

    Ok(())
}

/// Resolved runtime environment: remote configuration plus local paths.
struct Env {
    remote: RemoteConfig,
    data_dir: PathBuf,
    session_store: SessionFileStore,
}

impl Env {
    fn resolve(cli: &Cli) -> Self {
        let file_config = CliConfig::load().unwrap_or_else(|error| {
            tracing::warn!("Ignoring unreadable config file: {error}");
            CliConfig::default()
        });
        let remote = merge_remote_config(
            cli.supabase_url.clone(),
            cli.anon_key.clone(),
            &RemoteConfig::from_env(),
            &file_config,
        );
        let data_dir = resolve_data_dir(cli.data_dir.clone());
        let session_store = SessionFileStore::new(data_dir.join("session.json"));

        Self {
            remote,
            data_dir,
            session_store,
        }
    }

    fn auth(&self) -> Result<Option<SupabasePhoneAuth<SessionFileStore>>, CliError> {
        Ok(SupabasePhoneAuth::from_config(
            &self.remote,
            self.session_store.clone(),
        )?)
    }

    fn require_auth(&self) -> Result<SupabasePhoneAuth<SessionFileStore>, CliError> {
        self.auth()?.ok_or(CliError::RemoteNotConfigured)
    }

    fn local(&self) -> JsonFileStore {
        JsonFileStore::new(&self.data_dir)
    }

    /// Data API client, authenticated with the restored session when there
    /// is one.
    async fn data_api(&self) -> Result<Option<SupabaseRest>, CliError> {
        let Some(rest) = SupabaseRest::from_config(&self.remote)? else {
            return Ok(None);
        };

        if let Some(auth) = self.auth()? {
            if let Some(session) = auth.restore_session().await? {
                return Ok(Some(rest.with_access_token(session.access_token)));
            }
        }
        Ok(Some(rest))
    }

    async fn resolve_user_id(&self) -> Result<String, CliError> {
        if let Some(auth) = self.auth()? {
            let session = auth
                .restore_session()
                .await?
                .ok_or(CliError::NotSignedIn)?;
            return Ok(session.user.id);
        }

        // Local-only mode still gets a stable profile key.
        Ok(LOCAL_PROFILE_ID.to_string())
    }
}

async fn run_login(phone: &str, env: &Env) -> Result<(), CliError> {
    let auth = env.require_auth()?;

    auth.send_otp(phone).await?;
    println!("Verification code sent.");

    let code = prompt("Verification code: ")?;
    let identity = auth.verify_otp(phone, &code).await?;
    println!("Signed in as {}", identity.id);
    Ok(())
}

async fn run_register(language: Language, env: &Env) -> Result<(), CliError> {
    let auth = env.require_auth()?;
    let mut registration = Registration::new(language);

    let phone = prompt("Phone number (10 digits): ")?;
    registration.submit_phone(&phone)?;
    auth.send_otp(&phone).await?;
    println!("Verification code sent.");

    let code = prompt("Verification code: ")?;
    let identity = auth.verify_otp(&phone, &code).await?;
    let user_id = identity.id.clone();
    registration.submit_code(identity)?;

    let name = prompt("Name: ")?;
    registration.submit_name(&name)?;

    let location = Location {
        state: prompt("State: ")?,
        district: prompt("District: ")?,
        village: prompt("Village: ")?,
    };
    registration.submit_location(location)?;

    let farm = FarmDetails {
        land_size: prompt("Land size (e.g. 1-2 acres): ")?,
        soil_type: prompt("Soil type: ")?,
        irrigation_type: prompt("Irrigation type: ")?,
        crops: parse_crop_list(&prompt("Crops (comma separated): ")?),
    };
    let draft = registration.submit_farm_details(farm)?;

    let rest = env.data_api().await?.ok_or(CliError::RemoteNotConfigured)?;
    let profiles = ProfileStore::new(Some(auth), Some(rest));
    let profile = profiles.create_profile(&user_id, draft).await?;
    registration.complete()?;

    println!("Welcome, {}! Your profile is ready.", profile.name);
    Ok(())
}

async fn run_profile(as_json: bool, env: &Env) -> Result<(), CliError> {
    let gate = SessionGate::new(env.auth()?, env.data_api().await?);

    match gate.resolve().await {
        Some(profile) => {
            if as_json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                for line in format_profile_lines(&profile) {
                    println!("{line}");
                }
            }
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

async fn run_activity_add(draft: ActivityDraft, env: &Env) -> Result<(), CliError> {
    let user_id = env.resolve_user_id().await?;

    let store = ActivityStore::new(env.data_api().await?, env.local());
    let entry = store.log_activity(&user_id, draft).await?;

    let crops = CropStore::new(env.data_api().await?);
    crops
        .record_recent_activity(
            &user_id,
            &entry.crop,
            RecentActivity {
                category: entry.category,
                date: entry.date,
                quantity: entry.quantity.clone(),
            },
        )
        .await;

    println!("{}", entry.id);
    Ok(())
}

async fn run_activity_list(
    search: Option<&str>,
    filter: Option<&str>,
    as_json: bool,
    env: &Env,
) -> Result<(), CliError> {
    let user_id = env.resolve_user_id().await?;

    let store = ActivityStore::new(env.data_api().await?, env.local());
    let entries = store.list_activities(&user_id).await?;

    let category_filter = match filter {
        Some(raw) => CategoryFilter::Only(
            raw.parse::<ActivityCategory>()
                .map_err(CliError::InvalidArgument)?,
        ),
        None => CategoryFilter::All,
    };
    let matched = filter_entries(&entries, search.unwrap_or(""), category_filter);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&matched)?);
    } else {
        let today = Local::now().date_naive();
        for line in format_activity_lines(&matched, today) {
            println!("{line}");
        }
    }
    Ok(())
}

async fn run_sync(env: &Env) -> Result<(), CliError> {
    let user_id = env.resolve_user_id().await?;
    let store = ActivityStore::new(env.data_api().await?, env.local());
    let report = store.sync_pending(&user_id).await?;

    if store.is_remote_configured() {
        println!(
            "Pushed {} entries, {} remaining.",
            report.pushed, report.remaining
        );
    } else {
        println!(
            "Remote store is not configured; {} entries waiting.",
            report.remaining
        );
    }
    Ok(())
}

async fn run_logout(env: &Env) -> Result<(), CliError> {
    if let Some(auth) = env.auth()? {
        auth.sign_out().await?;
    } else {
        env.session_store.clear()?;
    }
    println!("Signed out.");
    Ok(())
}

fn run_config(set_url: Option<String>, set_key: Option<String>) -> Result<(), CliError> {
    let mut config = CliConfig::load().map_err(CliError::Config)?;

    if set_url.is_none() && set_key.is_none() {
        let url = config.supabase_url();
        println!("Supabase URL: {}", url.as_deref().unwrap_or("(not set)"));
        println!(
            "Anon key:     {}",
            if config.supabase_anon_key().is_some() {
                "(set)"
            } else {
                "(not set)"
            }
        );
        return Ok(());
    }

    if let Some(url) = set_url {
        config.supabase_url = Some(url);
    }
    if let Some(key) = set_key {
        config.supabase_anon_key = Some(key);
    }

    let path = config.save().map_err(CliError::Config)?;
    println!("{}", path.display());
    Ok(())
}

/// Merge remote configuration sources: flags beat env beats the config file.
fn merge_remote_config(
    flag_url: Option<String>,
    flag_key: Option<String>,
    env_config: &RemoteConfig,
    file_config: &CliConfig,
) -> RemoteConfig {
    let url = normalize_text_option(flag_url)
        .or_else(|| env_config.supabase_url.clone())
        .or_else(|| file_config.supabase_url());
    let anon_key = normalize_text_option(flag_key)
        .or_else(|| env_config.anon_key.clone())
        .or_else(|| file_config.supabase_anon_key());

    RemoteConfig {
        supabase_url: url
            .filter(|value| is_http_url(value))
            .map(|value| value.trim_end_matches('/').to_string()),
        anon_key,
    }
}

fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var_os("SAKHI_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(default_data_dir)
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sakhi")
}

fn prompt(label: &str) -> Result<String, CliError> {
    print!("{label}");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn parse_crop_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|crop| !crop.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn format_profile_lines(profile: &Profile) -> Vec<String> {
    vec![
        format!("Name        {}", profile.name),
        format!("Phone       {}", profile.phone),
        format!(
            "Location    {}, {}, {}",
            profile.location.village, profile.location.district, profile.location.state
        ),
        format!(
            "Farm        {} | {} soil | {} irrigation",
            profile.farm.land_size, profile.farm.soil_type, profile.farm.irrigation_type
        ),
        format!("Crops       {}", profile.farm.crops.join(", ")),
        format!("Language    {}", profile.language.code()),
    ]
}

fn format_activity_lines(entries: &[&ActivityLogEntry], today: NaiveDate) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let when = format_entry_date(entry.date, today);
            let quantity = entry
                .quantity
                .as_deref()
                .map(|value| format!("  [{value}]"))
                .unwrap_or_default();
            format!(
                "{when:<12}  {category:<10}  {crop:<12}  {description}{quantity}",
                category = entry.category.label(),
                crop = entry.crop,
                description = entry.description,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn merge_prefers_flags_over_env_over_file() {
        let env_config = RemoteConfig::new("https://env.supabase.co", "env-key");
        let file_config = CliConfig {
            supabase_url: Some("https://file.supabase.co".to_string()),
            supabase_anon_key: Some("file-key".to_string()),
        };

        let merged = merge_remote_config(
            Some("https://flag.supabase.co".to_string()),
            None,
            &env_config,
            &file_config,
        );
        assert_eq!(
            merged.supabase_url.as_deref(),
            Some("https://flag.supabase.co")
        );
        assert_eq!(merged.anon_key.as_deref(), Some("env-key"));

        let from_file = merge_remote_config(None, None, &RemoteConfig::default(), &file_config);
        assert_eq!(
            from_file.supabase_url.as_deref(),
            Some("https://file.supabase.co")
        );
        assert_eq!(from_file.anon_key.as_deref(), Some("file-key"));
    }

    #[test]
    fn merge_rejects_non_http_url() {
        let merged = merge_remote_config(
            Some("flag.supabase.co".to_string()),
            Some("key".to_string()),
            &RemoteConfig::default(),
            &CliConfig::default(),
        );
        assert_eq!(merged.supabase_url, None);
        assert!(!merged.is_configured());
    }

    #[test]
    fn parse_crop_list_splits_and_trims() {
        assert_eq!(
            parse_crop_list(" Rice , Banana ,, "),
            vec!["Rice".to_string(), "Banana".to_string()]
        );
        assert!(parse_crop_list("  ").is_empty());
    }

    #[test]
    fn resolve_data_dir_prefers_flag() {
        let resolved = resolve_data_dir(Some(PathBuf::from("/tmp/sakhi-test")));
        assert_eq!(resolved, PathBuf::from("/tmp/sakhi-test"));
    }

    #[test]
    fn cli_parses_activity_add() {
        let cli = Cli::try_parse_from([
            "sakhi",
            "activity",
            "add",
            "--crop",
            "Rice",
            "--category",
            "irrigation",
            "--description",
            "Watered the paddy",
            "--quantity",
            "20",
            "--unit",
            "liters",
            "--date",
            "2025-06-01",
        ])
        .unwrap();

        let Commands::Activity {
            command:
                ActivityCommands::Add {
                    crop,
                    category,
                    description,
                    quantity,
                    unit,
                    date,
                    notes,
                },
        } = cli.command
        else {
            panic!("expected activity add");
        };
        assert_eq!(crop, "Rice");
        assert_eq!(category, "irrigation");
        assert_eq!(description, "Watered the paddy");
        assert_eq!(quantity.as_deref(), Some("20"));
        assert_eq!(unit.as_deref(), Some("liters"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(notes, None);
    }

    #[test]
    fn cli_parses_activity_list_filters() {
        let cli = Cli::try_parse_from([
            "sakhi", "activity", "list", "--search", "paddy", "--filter", "irrigation", "--json",
        ])
        .unwrap();

        let Commands::Activity {
            command: ActivityCommands::List {
                search,
                filter,
                json,
            },
        } = cli.command
        else {
            panic!("expected activity list");
        };
        assert_eq!(search.as_deref(), Some("paddy"));
        assert_eq!(filter.as_deref(), Some("irrigation"));
        assert!(json);
    }

    #[test]
    fn cli_rejects_malformed_date() {
        assert!(Cli::try_parse_from([
            "sakhi",
            "activity",
            "add",
            "--crop",
            "Rice",
            "--category",
            "irrigation",
            "--description",
            "x",
            "--date",
            "01-06-2025",
        ])
        .is_err());
    }

    #[test]
    fn profile_lines_cover_all_fields() {
        let profile = Profile {
            user_id: "user-1".to_string(),
            name: "Lakshmi".to_string(),
            phone: "9876543210".to_string(),
            location: Location {
                state: "Kerala".to_string(),
                district: "Thrissur".to_string(),
                village: "Ollur".to_string(),
            },
            farm: FarmDetails {
                land_size: "1-2 acres".to_string(),
                soil_type: "laterite".to_string(),
                irrigation_type: "drip".to_string(),
                crops: vec!["Rice".to_string(), "Banana".to_string()],
            },
            language: Language::Ml,
            created_at: chrono::Utc::now(),
        };

        let lines = format_profile_lines(&profile);
        assert_eq!(lines.len(), 6);
        assert!(lines[2].contains("Ollur, Thrissur, Kerala"));
        assert!(lines[4].contains("Rice, Banana"));
        assert!(lines[5].ends_with("ml"));
    }

    #[test]
    fn activity_lines_include_relative_date_and_quantity() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let entry = ActivityLogEntry::from_draft(
            "user-1",
            ActivityDraft {
                crop: "Rice".to_string(),
                category: ActivityCategory::Irrigation,
                description: "Watered the paddy".to_string(),
                quantity: Some("20".to_string()),
                unit: Some("liters".to_string()),
                date: today,
                notes: None,
            },
        );

        let lines = format_activity_lines(&[&entry], today);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Today"));
        assert!(lines[0].contains("irrigation"));
        assert!(lines[0].ends_with("[20 liters]"));
    }
}
