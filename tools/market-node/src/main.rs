//! MyMarket command-line node.
//!
//! Every subcommand except `serve` turns into one [`MarketRequest`] against the
//! store file in the data directory and prints the response. `serve` exposes
//! the read-only feeds over HTTP.

mod server;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mymarket_catalog::{CredentialsUpdate, Market, MarketRequest, MarketResponse};
use mymarket_common::feed::FeedSnapshot;
use mymarket_common::identity::UserId;
use mymarket_common::listing::{Listing, ListingDraft, ListingId};
use mymarket_common::price::Price;
use mymarket_common::profile::{Profile, ProfileUpdate};
use mymarket_store::FileStore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const STORE_FILE: &str = "store.json";

#[derive(Parser)]
#[command(name = "market-node", about = "MyMarket listing catalog")]
struct Cli {
    /// Directory holding the store file (default: <platform data dir>/mymarket).
    #[arg(long, env = "MYMARKET_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Print responses as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and sign in.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MYMARKET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long, env = "MYMARKET_PASSWORD", hide_env_values = true)]
        password: String,
    },
    SignOut,
    /// Show the signed-in user id.
    Whoami,
    /// List an item for sale. Every field is required.
    Upload {
        /// Local image path or URI.
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Characters other than digits and '.' are dropped.
        #[arg(long)]
        price: Option<String>,
        /// Food, Clothes, Gadgets or Furniture.
        #[arg(long)]
        category: Option<String>,
    },
    /// Unsold listings from everyone, newest first.
    Feed,
    /// Unsold listings in one category.
    Category { name: String },
    /// Your own listings, sold ones included.
    Mine,
    ToggleSold { id: String },
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Change email and/or password. Signs you out on success.
    Security {
        #[arg(long, env = "MYMARKET_PASSWORD", hide_env_values = true)]
        current_password: String,
        #[arg(long)]
        new_email: Option<String>,
        #[arg(long)]
        new_password: Option<String>,
    },
    /// Serve the feeds over HTTP.
    Serve {
        #[arg(long, default_value_t = 3080)]
        port: u16,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Show a profile (default: your own).
    Show { user: Option<String> },
    /// Replace your name, contact and picture.
    Edit {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        contact: String,
        /// Omit to remove the current picture.
        #[arg(long)]
        picture: Option<String>,
    },
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mymarket")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
    let store_path = data_dir.join(STORE_FILE);
    let store = FileStore::open(&store_path)
        .await
        .with_context(|| format!("opening store at {}", store_path.display()))?;
    let market = Market::new(Arc::new(store));

    let request = match cli.command {
        Command::Serve { port } => {
            info!(store = %store_path.display(), "serving feeds");
            return server::serve(market, port).await;
        }
        Command::SignUp { email, password } => MarketRequest::SignUp { email, password },
        Command::SignIn { email, password } => MarketRequest::SignIn { email, password },
        Command::SignOut => MarketRequest::SignOut,
        Command::Whoami => MarketRequest::WhoAmI,
        Command::Upload {
            image,
            description,
            price,
            category,
        } => MarketRequest::Upload(ListingDraft {
            image_url: image,
            description,
            price: price.map(|p| Price::sanitize(&p)),
            category,
        }),
        Command::Feed => MarketRequest::GlobalFeed,
        Command::Category { name } => MarketRequest::CategoryFeed(name),
        Command::Mine => MarketRequest::MyListings,
        Command::ToggleSold { id } => MarketRequest::ToggleSold(ListingId(id)),
        Command::Profile {
            action: ProfileCommand::Show { user },
        } => MarketRequest::GetProfile(user.map(UserId)),
        Command::Profile {
            action:
                ProfileCommand::Edit {
                    name,
                    contact,
                    picture,
                },
        } => MarketRequest::EditProfile(ProfileUpdate {
            name,
            contact,
            picture,
        }),
        Command::Security {
            current_password,
            new_email,
            new_password,
        } => MarketRequest::UpdateCredentials(CredentialsUpdate {
            current_password,
            new_email,
            new_password,
        }),
    };

    let response = market.handle_request(request).await;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    match response {
        MarketResponse::Error { message, retryable } => {
            if retryable {
                anyhow::bail!("{message} (try again)");
            }
            anyhow::bail!(message);
        }
        response if !cli.json => print_human(&response),
        _ => {}
    }
    Ok(())
}

fn print_human(response: &MarketResponse) {
    match response {
        MarketResponse::Session(session) => {
            println!("Signed in as {} ({})", session.email, session.user_id)
        }
        MarketResponse::SignedOut => println!("Signed out"),
        MarketResponse::CurrentUser(Some(user)) => println!("{user}"),
        MarketResponse::CurrentUser(None) => println!("Not signed in"),
        MarketResponse::CredentialsUpdated => {
            println!("Credentials updated. Please sign in again.")
        }
        MarketResponse::Listing(listing) => {
            println!("Uploaded successfully!");
            print_listing(listing);
        }
        MarketResponse::Feed(snapshot) => print_feed(snapshot),
        MarketResponse::Toggled(outcome) => {
            print_listing(&outcome.listing);
            if !outcome.persisted {
                println!("Warning: change could not be saved");
            }
        }
        MarketResponse::Profile(profile) => print_profile(profile),
        MarketResponse::ProfileSaved => println!("Profile saved"),
        MarketResponse::Error { .. } => {}
    }
}

fn print_listing(listing: &Listing) {
    let status = if listing.sold { "  [SOLD]" } else { "" };
    println!(
        "{}  {:<9}  N${:<8}  {}{}",
        listing.id, listing.category, listing.price, listing.description, status
    );
}

fn print_feed(snapshot: &FeedSnapshot) {
    if snapshot.is_empty() {
        println!("No items found.");
        return;
    }
    for item in &snapshot.listings {
        print_listing(&item.listing);
        println!(
            "    seller: {} ({})",
            item.seller.display_name(),
            item.seller.display_contact()
        );
    }
}

fn print_profile(profile: &Profile) {
    println!("{}", profile.display_name());
    println!("  id:      {}", profile.user_id);
    println!("  contact: {}", profile.display_contact());
    if let Some(picture) = &profile.picture {
        println!("  picture: {picture}");
    }
}
