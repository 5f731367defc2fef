use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use common::{
    distance_km, is_valid_otp, parse_tags, Coordinate, CreateJobRequest, Role, SearchRadius,
    SignupRequest, User,
};
use fieldhand_client::config::LoggingConfig;
use fieldhand_client::session::{self, FileSessionStore, SessionStore};
use fieldhand_client::{ApiClient, Config, ManualLocation, NearbyJobRetriever, NearbyJobs, RetrieverSettings};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (.yaml, .yml or .toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List jobs near a position, closest first
    Nearby {
        /// Search radius in km (1-10)
        #[arg(short, long)]
        radius: Option<SearchRadius>,
        /// Latitude of the search origin
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        /// Longitude of the search origin
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
        /// Hide results the server returned beyond the radius
        #[arg(long)]
        strict: bool,
        /// Print the jobs as JSON
        #[arg(long)]
        json: bool,
    },
    /// Great-circle distance between two points in km
    Distance {
        #[arg(allow_negative_numbers = true)]
        from_lat: f64,
        #[arg(allow_negative_numbers = true)]
        from_lon: f64,
        #[arg(allow_negative_numbers = true)]
        to_lat: f64,
        #[arg(allow_negative_numbers = true)]
        to_lon: f64,
    },
    /// Post a new job
    CreateJob {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
        /// Number of labourers needed
        #[arg(short, long)]
        labourers: u32,
        /// Daily wage per labourer
        #[arg(short, long)]
        wage: f64,
        /// Comma separated skills, e.g. "harvesting, tractor"
        #[arg(long)]
        skills: Option<String>,
        /// Comma separated perks, e.g. "lunch, transport"
        #[arg(long)]
        perks: Option<String>,
        /// First working day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last working day (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,
    },
    /// Register a new account
    Signup {
        #[arg(short, long)]
        name: String,
        #[arg(long, conflicts_with = "phone", required_unless_present = "phone")]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, value_enum)]
        role: RoleArg,
    },
    /// Request a one-time code by email
    Login {
        #[arg(long)]
        email: String,
    },
    /// Complete sign-in with a one-time code
    Verify {
        #[command(subcommand)]
        method: VerifyMethod,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum VerifyMethod {
    /// Verify the code sent by email
    Email {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
        #[arg(long, value_enum)]
        role: RoleArg,
        /// Name the account was registered with
        #[arg(long)]
        name: String,
    },
    /// Exchange the identity token from SMS verification
    Phone {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        id_token: String,
        #[arg(long, value_enum)]
        role: RoleArg,
        /// Name the account was registered with
        #[arg(long)]
        name: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    Farmer,
    Labour,
}

impl From<RoleArg> for Role {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Farmer => Role::Farmer,
            RoleArg::Labour => Role::Labour,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    setup_logging(&config.logging, cli.verbose)?;

    let store = FileSessionStore::new(config.session.path.clone());
    let mut api = ApiClient::new(&config.api)?;
    session::restore(&store, &mut api)?;

    match cli.command {
        Commands::Nearby { radius, lat, lon, strict, json } => {
            let radius = radius.unwrap_or(config.search.default_radius);
            let position = resolve_position(lat, lon, &config)?;
            let mut settings = RetrieverSettings::from(&config.search);
            settings.strict_radius |= strict;

            let retriever = NearbyJobRetriever::new(ManualLocation::new(position), api, settings);

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            match retriever.fetch_cancellable(radius, &cancel).await {
                Ok(found) if json => println!("{}", serde_json::to_string_pretty(&found.jobs)?),
                Ok(found) => print_jobs(&found),
                Err(e) if e.is_retryable() => return Err(anyhow!("{}. Run the command again to retry", e)),
                Err(e) => return Err(e.into()),
            }
        },
        Commands::Distance { from_lat, from_lon, to_lat, to_lon } => {
            let from = Coordinate::new(from_lat, from_lon)?;
            let to = Coordinate::new(to_lat, to_lon)?;
            println!("{:.2} km", distance_km(from, to));
        },
        Commands::CreateJob { title, description, labourers, wage, skills, perks, start, end, lat, lon } => {
            let position = resolve_position(lat, lon, &config)?
                .ok_or_else(|| anyhow!("Location is required. Pass --lat and --lon or set [location] in the config"))?;

            let mut request = CreateJobRequest {
                title,
                description,
                number_of_labourers: labourers,
                required_skills: skills.as_deref().and_then(parse_tags),
                latitude: position.latitude(),
                longitude: position.longitude(),
                daily_wage: wage,
                perks: perks.as_deref().and_then(parse_tags),
                start_date: start,
                end_date: end,
            };
            request.normalize();
            if let Err(errors) = request.validate() {
                for e in &errors.0 {
                    eprintln!("  - {}", e);
                }
                bail!("Job not created");
            }

            let created = api.create_job(&request).await?;
            match created.get("id") {
                Some(id) => println!("Job created (id {})", id),
                None => println!("Job created"),
            }
        },
        Commands::Signup { name, email, phone, role } => {
            let request = SignupRequest {
                name,
                email,
                phone,
                role: role.into(),
            };
            api.signup(&request).await?;
            println!("Signup successful. Check for your one-time code, then run `fieldhand verify`.");
        },
        Commands::Login { email } => {
            api.send_email_otp(&email).await?;
            println!("One-time code sent to {}", email);
        },
        Commands::Verify { method } => {
            let (token, user) = match method {
                VerifyMethod::Email { email, otp, role, name } => {
                    if !is_valid_otp(otp.trim()) {
                        bail!("Please enter a valid 6-digit OTP");
                    }
                    let response = api.verify_email_otp(&email, otp.trim()).await?;
                    let user = User { name, email: Some(email), phone: None, role: role.into() };
                    (response.token, user)
                },
                VerifyMethod::Phone { phone, id_token, role, name } => {
                    let response = api.verify_phone_otp(&id_token).await?;
                    let user = User { name, email: None, phone: Some(phone), role: role.into() };
                    (response.token, user)
                },
            };
            let saved = session::login(&store, &mut api, token, user)?;
            if let Some(user) = saved.user {
                println!("Signed in as {} ({})", user.name, user.role);
            }
        },
        Commands::Logout => {
            session::logout(&store, &mut api)?;
            println!("Signed out");
        },
        Commands::Whoami => {
            let current = store.load()?;
            match current.user {
                Some(user) if current.token.is_some() => {
                    println!("Name:  {}", user.name);
                    println!("Role:  {}", user.role);
                    if let Some(email) = user.email {
                        println!("Email: {}", email);
                    }
                    if let Some(phone) = user.phone {
                        println!("Phone: {}", phone);
                    }
                },
                _ => println!("Not signed in."),
            }
        },
    }

    Ok(())
}

/// Flags win over the configured position. Neither is not an error here;
/// the location step reports it.
fn resolve_position(lat: Option<f64>, lon: Option<f64>, config: &Config) -> anyhow::Result<Option<Coordinate>> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some(Coordinate::new(lat, lon)?)),
        (None, None) => config.location.coordinate(),
        _ => bail!("--lat and --lon must be given together"),
    }
}

fn print_jobs(found: &NearbyJobs) {
    if found.jobs.is_empty() {
        println!("No jobs within {} of {}.", found.radius, found.origin);
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Title", "Distance", "Daily wage", "Labourers", "Starts", "Farmer"]);

    for job in &found.jobs {
        table.add_row(vec![
            job.id.to_string(),
            job.title.clone(),
            job.distance.map(|d| format!("{:.2} km", d)).unwrap_or_else(|| "-".to_string()),
            format!("₹{:.0}", job.daily_wage),
            job.number_of_labourers.to_string(),
            job.start_date.format("%d %b %Y").to_string(),
            job.farmer_name.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!("{table}");
    println!("{} jobs within {} of {}", found.jobs.len(), found.radius, found.origin);
}

fn setup_logging(config: &LoggingConfig, verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => config.level.parse().unwrap_or(log::LevelFilter::Warn),
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d][%H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        // Connection pool chatter drowns out our own messages
        .level_for("hyper", log::LevelFilter::Warn)
        .chain(std::io::stderr());

    if let Some(path) = &config.output {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory: {:?}", parent))?;
            }
        }
        dispatch = dispatch.chain(
            fern::log_file(path).with_context(|| format!("Failed to open log file: {:?}", path))?,
        );
    }

    dispatch.apply()?;
    Ok(())
}
