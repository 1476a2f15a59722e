//! Runtime configuration, read from CLI flags or the environment.

use anyhow::bail;
use clap::Parser;
use geotally_core::PipelineSettings;
use geotally_core::paging::{DEFAULT_PAGE_SIZE, DEFAULT_ROW_CAP};
use geotally_core::schedule::{DEFAULT_CONCURRENCY, DEFAULT_LOOKBACK_SECS, DEFAULT_WINDOW_SECS};
use geotally_core::service::DEFAULT_RETAIL_CATEGORY;
use geotally_core::window::DEFAULT_CHUNK_SIZE;
use geotally_provider_factual::DEFAULT_BASE_URL as FACTUAL_BASE_URL;
use geotally_provider_instagram::DEFAULT_BASE_URL as INSTAGRAM_BASE_URL;

/// Settings for the `geotally-server` binary.
///
/// Every value can be passed as a flag or through the environment variable
/// named next to it. A `.env` file in the working directory is loaded first.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "geotally-server",
    version,
    about = "Places GeoJSON, retail opening counts, and photo history CSV for a mapping client"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:3000"))]
    pub server_addr: String,

    /// Factual read key.
    ///
    /// Environment variable: `FACTUAL_KEY`
    #[arg(long, env = "FACTUAL_KEY")]
    pub factual_key: String,

    /// Factual API base URL.
    ///
    /// Environment variable: `FACTUAL_BASE_URL`
    #[arg(long, env = "FACTUAL_BASE_URL", default_value_t = String::from(FACTUAL_BASE_URL))]
    pub factual_base_url: String,

    /// Instagram client id.
    ///
    /// Environment variable: `INSTAGRAM_CLIENT_ID`
    #[arg(long, env = "INSTAGRAM_CLIENT_ID")]
    pub instagram_client_id: String,

    /// Instagram access token.
    ///
    /// Environment variable: `INSTAGRAM_ACCESS_TOKEN`
    #[arg(long, env = "INSTAGRAM_ACCESS_TOKEN")]
    pub instagram_access_token: String,

    /// Instagram API base URL.
    ///
    /// Environment variable: `INSTAGRAM_BASE_URL`
    #[arg(long, env = "INSTAGRAM_BASE_URL", default_value_t = String::from(INSTAGRAM_BASE_URL))]
    pub instagram_base_url: String,

    /// Rows requested per places page.
    ///
    /// Environment variable: `PLACES_PAGE_SIZE`
    #[arg(long, env = "PLACES_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub places_page_size: u32,

    /// Upper bound on rows walked per places query; `0` walks the full
    /// reported total.
    ///
    /// Bounds upstream load for dense areas at the cost of completeness.
    ///
    /// Environment variable: `PLACES_ROW_CAP`
    #[arg(long, env = "PLACES_ROW_CAP", default_value_t = DEFAULT_ROW_CAP)]
    pub places_row_cap: u64,

    /// Items requested per photo chunk.
    ///
    /// Environment variable: `PHOTOS_PAGE_SIZE`
    #[arg(long, env = "PHOTOS_PAGE_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub photos_page_size: u32,

    /// Length of one photo window in seconds.
    ///
    /// Environment variable: `PHOTOS_WINDOW_SECS`
    #[arg(long, env = "PHOTOS_WINDOW_SECS", default_value_t = DEFAULT_WINDOW_SECS)]
    pub photos_window_secs: i64,

    /// Total photo history in seconds.
    ///
    /// Environment variable: `PHOTOS_LOOKBACK_SECS`
    #[arg(long, env = "PHOTOS_LOOKBACK_SECS", default_value_t = DEFAULT_LOOKBACK_SECS)]
    pub photos_lookback_secs: i64,

    /// Photo windows swept at once.
    ///
    /// Environment variable: `PHOTOS_CONCURRENCY`
    #[arg(long, env = "PHOTOS_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub photos_concurrency: usize,

    /// Places category counted by the retail route.
    ///
    /// Environment variable: `RETAIL_CATEGORY`
    #[arg(long, env = "RETAIL_CATEGORY", default_value_t = DEFAULT_RETAIL_CATEGORY)]
    pub retail_category: u32,
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub server_addr: String,
    /// Factual read key.
    pub factual_key: String,
    /// Factual API base URL.
    pub factual_base_url: String,
    /// Instagram client id.
    pub instagram_client_id: String,
    /// Instagram access token.
    pub instagram_access_token: String,
    /// Instagram API base URL.
    pub instagram_base_url: String,
    /// Pipeline tunables handed to the service.
    pub pipeline: PipelineSettings,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.places_page_size == 0 {
            bail!("PLACES_PAGE_SIZE must be greater than 0");
        }
        if args.photos_page_size == 0 {
            bail!("PHOTOS_PAGE_SIZE must be greater than 0");
        }
        if args.photos_window_secs <= 0 {
            bail!("PHOTOS_WINDOW_SECS must be greater than 0");
        }
        if args.photos_lookback_secs < args.photos_window_secs {
            bail!(
                "PHOTOS_LOOKBACK_SECS ({}) must cover at least one window of {} seconds",
                args.photos_lookback_secs,
                args.photos_window_secs
            );
        }
        if args.photos_concurrency == 0 {
            bail!("PHOTOS_CONCURRENCY must be greater than 0");
        }

        Ok(Self {
            server_addr: args.server_addr,
            factual_key: args.factual_key,
            factual_base_url: args.factual_base_url,
            instagram_client_id: args.instagram_client_id,
            instagram_access_token: args.instagram_access_token,
            instagram_base_url: args.instagram_base_url,
            pipeline: PipelineSettings {
                places_page_size: args.places_page_size,
                places_row_cap: (args.places_row_cap > 0).then_some(args.places_row_cap),
                photos_page_size: args.photos_page_size,
                photos_window_secs: args.photos_window_secs,
                photos_lookback_secs: args.photos_lookback_secs,
                photos_concurrency: args.photos_concurrency,
                retail_category: args.retail_category,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 7] = [
        "geotally-server",
        "--factual-key",
        "k",
        "--instagram-client-id",
        "id",
        "--instagram-access-token",
        "token",
    ];

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let args = CliArgs::try_parse_from(REQUIRED.iter().chain(extra))?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.pipeline.places_page_size, 50);
        assert_eq!(config.pipeline.places_row_cap, Some(500));
        assert_eq!(config.pipeline.photos_page_size, 200);
        assert_eq!(config.pipeline.photos_window_secs, 21_600);
        assert_eq!(config.pipeline.photos_lookback_secs, 2_419_200);
        assert_eq!(config.pipeline.photos_concurrency, 10);
        assert_eq!(config.pipeline.retail_category, 123);
    }

    #[test]
    fn zero_row_cap_disables_the_cap() {
        let config = parse(&["--places-row-cap", "0"]).unwrap();
        assert_eq!(config.pipeline.places_row_cap, None);
    }

    #[test]
    fn rejects_zero_concurrency() {
        assert!(parse(&["--photos-concurrency", "0"]).is_err());
    }

    #[test]
    fn rejects_lookback_shorter_than_a_window() {
        assert!(parse(&["--photos-window-secs", "3600", "--photos-lookback-secs", "60"]).is_err());
    }
}
