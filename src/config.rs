// Runtime settings, resolved once at startup.
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_DATA_PATH: &str = "all_data.csv";
pub const DEFAULT_REPORT_YEAR: i32 = 2018;
pub const DEFAULT_CURRENCY: &str = "AUD";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Orders file to load.
    pub data_path: PathBuf,
    /// Year shown on the Sales Performance tab.
    pub report_year: i32,
    /// Currency code printed in front of payment totals.
    pub currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            report_year: DEFAULT_REPORT_YEAR,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl Config {
    /// First CLI argument wins for the data path, then `DASHBOARD_DATA`.
    /// `DASHBOARD_YEAR` and `DASHBOARD_CURRENCY` override the rest.
    pub fn from_env() -> Self {
        Self::resolve(std::env::args().nth(1), |key| std::env::var(key).ok())
    }

    fn resolve<F>(arg: Option<String>, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = arg.or_else(|| var("DASHBOARD_DATA")) {
            config.data_path = PathBuf::from(path);
        }

        if let Some(raw) = var("DASHBOARD_YEAR") {
            match raw.trim().parse::<i32>() {
                Ok(year) => config.report_year = year,
                Err(_) => warn!(value = %raw, "ignoring invalid DASHBOARD_YEAR"),
            }
        }

        if let Some(code) = var("DASHBOARD_CURRENCY") {
            let code = code.trim();
            if code.is_empty() {
                warn!("ignoring empty DASHBOARD_CURRENCY");
            } else {
                config.currency = code.to_string();
            }
        }

        config
    }
}
