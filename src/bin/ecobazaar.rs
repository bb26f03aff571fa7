use clap::{Arg, ArgMatches, Command};
use serde::Serialize;
use serde_json::json;
use std::error::Error as StdError;
use tracing::error;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ecobazaar::accounting::CarbonTotals;
use ecobazaar::account::LoyaltyTier;
use ecobazaar::cart::{clamp_quantity, AddToCart, Choice};
use ecobazaar::checkout::IdempotencyKey;
use ecobazaar::config::{ShopOptions, StoreConfig};
use ecobazaar::recommend::RecommendationRules;
use ecobazaar::session::{Role, Session};
use ecobazaar::EcoBazaar;

type CliResult<T> = Result<T, Box<dyn StdError>>;

fn command() -> Command<'static> {
    Command::new("ecobazaar")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Shop the EcoBazaar catalog from the terminal")
        .subcommand_required(true)
        .subcommand(Command::new("catalog").about("List products, newest first"))
        .subcommand(Command::new("cart").about("Show the cart with its totals"))
        .subcommand(
            Command::new("add")
                .about("Add one unit of a product to the cart")
                .arg(Arg::new("product").required(true).help("Product id"))
                .arg(
                    Arg::new("choice")
                        .long("choice")
                        .takes_value(true)
                        .value_name("ALTERNATIVE|original|dismiss")
                        .help("Answer to a lower-carbon suggestion"),
                ),
        )
        .subcommand(
            Command::new("quantity")
                .about("Set the quantity of a cart line")
                .arg(Arg::new("item").required(true).help("Cart line id"))
                .arg(Arg::new("quantity").required(true).allow_hyphen_values(true)),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a cart line")
                .arg(Arg::new("item").required(true).help("Cart line id")),
        )
        .subcommand(
            Command::new("checkout")
                .about("Place an order for the cart")
                .arg(
                    Arg::new("key")
                        .long("key")
                        .takes_value(true)
                        .value_name("UUID")
                        .help("Idempotency key; reuse it to retry a failed checkout"),
                ),
        )
        .subcommand(Command::new("orders").about("Show order history and loyalty tier"))
        .subcommand(Command::new("report").about("Seller dashboard or platform overview"))
}

fn print<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn uuid_arg(matches: &ArgMatches, name: &str) -> CliResult<Uuid> {
    let raw = matches
        .value_of(name)
        .ok_or_else(|| format!("missing <{}>", name))?;
    Ok(Uuid::parse_str(raw).map_err(|e| format!("invalid <{}> {}: {}", name, raw, e))?)
}

fn parse_choice(raw: &str) -> CliResult<Choice> {
    Ok(match raw {
        "original" => Choice::KeepOriginal,
        "dismiss" => Choice::Dismiss,
        id => Choice::Alternative(
            Uuid::parse_str(id).map_err(|e| format!("invalid --choice {}: {}", id, e))?,
        ),
    })
}

fn quantity_arg(matches: &ArgMatches) -> CliResult<i32> {
    let raw = matches.value_of("quantity").ok_or("missing <quantity>")?;
    Ok(clamp_quantity(raw.parse()?))
}

async fn sign_in(shop: &EcoBazaar) -> CliResult<Session> {
    let user_id = std::env::var("SUPABASE_USER_ID")
        .map_err(|_| "SUPABASE_USER_ID environment variable not found")?;
    let user_id = Uuid::parse_str(&user_id)?;

    let mut session = Session::new(user_id);
    if let Some(token) = shop.store().config().access_token.as_deref() {
        session = session.with_access_token(token);
    }
    Ok(shop.account().refresh_profile(Some(&session)).await?)
}

async fn run(matches: ArgMatches) -> CliResult<()> {
    let config = StoreConfig::from_env()?;
    let shop = EcoBazaar::from_config(config, ShopOptions::default())?;

    let (name, args) = matches.subcommand().ok_or("a subcommand is required")?;
    if name == "catalog" {
        return print(&shop.catalog().list_products().await?);
    }

    let session = sign_in(&shop).await?;
    let session = Some(&session);

    match name {
        "cart" => {
            let cart = shop.cart().refresh(session).await?;
            let totals = CarbonTotals::compute(&cart, shop.options().points_per_eco_unit);
            print(&json!({ "items": cart, "totals": totals }))
        }
        "add" => {
            let product_id = uuid_arg(args, "product")?;
            let catalog = shop.catalog().list_products().await?;
            let product = catalog
                .iter()
                .find(|p| p.id == product_id)
                .ok_or_else(|| format!("no product {}", product_id))?;

            match args.value_of("choice") {
                None => match shop.cart().request_add(session, product, &catalog).await? {
                    AddToCart::Added => print(&json!({ "added": product.id })),
                    AddToCart::Suggested(recommendation) => {
                        print(&json!({ "suggestion": recommendation }))
                    }
                },
                Some(raw) => {
                    let choice = parse_choice(raw)?;
                    match RecommendationRules::from(shop.options()).decide(product, &catalog) {
                        Some(recommendation) => {
                            shop.cart().resolve(session, &recommendation, choice).await?
                        }
                        None => shop.cart().add(session, product.id).await?,
                    }
                    print(&shop.cart().refresh(session).await?)
                }
            }
        }
        "quantity" => {
            let item_id = uuid_arg(args, "item")?;
            let quantity = quantity_arg(args)?;
            shop.cart().set_quantity(session, item_id, quantity).await?;
            print(&shop.cart().refresh(session).await?)
        }
        "remove" => {
            let item_id = uuid_arg(args, "item")?;
            shop.cart().remove(session, item_id).await?;
            print(&shop.cart().refresh(session).await?)
        }
        "checkout" => {
            let key = match args.value_of("key") {
                Some(raw) => IdempotencyKey(Uuid::parse_str(raw)?),
                None => IdempotencyKey::new(),
            };
            let cart = shop.cart().refresh(session).await?;
            let outcome = shop.checkout().place_order(session, &cart, key).await?;
            print(&outcome.receipt)
        }
        "orders" => {
            let refreshed = shop.account().refresh_profile(session).await?;
            let orders = shop.account().order_history(session).await?;
            print(&json!({
                "carbon_points": refreshed.carbon_points(),
                "tier": LoyaltyTier::for_points(refreshed.carbon_points()),
                "orders": orders,
            }))
        }
        "report" => match session.and_then(|s| s.role()) {
            Some(Role::Admin) => print(&shop.reports().platform_overview(session).await?),
            _ => print(&shop.reports().seller_dashboard(session).await?),
        },
        other => Err(format!("unknown subcommand {}", other).into()),
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ecobazaar=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(command().get_matches()).await {
        error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
