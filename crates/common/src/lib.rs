use clap::Parser;
use database::Database;
use reconcile::{CategoryRoles, Exclusions, ReconcilePolicy, WeekStart};
use std::time::Duration;

pub mod auth;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub policy: ReconcilePolicy,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        let policy = config.policy();
        Self { db, config, policy }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:plotline.db")]
    pub database_url: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    #[arg(long, env = "APP_PASSWORD")]
    pub app_password: Option<String>,

    /// User that owns the data when no password is configured.
    #[arg(long, env = "DEFAULT_USER", default_value = "local")]
    pub default_user: String,

    #[arg(long, env = "WEEK_START", default_value = "sunday")]
    pub week_start: WeekStart,

    /// Transfer lines left out of utilization and warnings.
    #[arg(
        long,
        env = "EXCLUDED_CATEGORIES",
        value_delimiter = ',',
        default_values_t = vec!["401(k)".to_string(), "401(k) Contribution".to_string()]
    )]
    pub excluded_categories: Vec<String>,

    #[arg(long, env = "RENT_CATEGORY", default_value = "Rent")]
    pub rent_category: String,

    #[arg(long, env = "SAVINGS_CATEGORY", default_value = "Savings")]
    pub savings_category: String,

    #[arg(long, env = "EATING_OUT_CATEGORY", default_value = "Eating Out")]
    pub eating_out_category: String,

    /// Upper bound for the reads that feed a feedback computation.
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "10")]
    pub fetch_timeout_secs: u64,
}

impl Config {
    pub fn policy(&self) -> ReconcilePolicy {
        ReconcilePolicy {
            week_start: self.week_start,
            exclusions: Exclusions::new(self.excluded_categories.iter().map(|c| c.trim().to_string())),
            roles: CategoryRoles {
                rent: self.rent_category.clone(),
                savings: self.savings_category.clone(),
                eating_out: self.eating_out_category.clone(),
            },
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
