use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use ravn_config::ToolsConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::schema::{ParamKind, ParamSpec, ToolSchema};
use crate::tool::{ExecutionResult, ExitStatus, Tool, ValidatedCall};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// `get_weather`: current temperature for a city from a wttr.in-compatible
/// service (`GET {base}/{city}?format=j1`).
pub struct WeatherTool {
    schema: ToolSchema,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    current_condition: Vec<CurrentCondition>,
}

#[derive(Debug, Deserialize)]
struct CurrentCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "temp_F")]
    temp_f: String,
    #[serde(rename = "weatherDesc", default)]
    weather_desc: Vec<Description>,
}

#[derive(Debug, Deserialize)]
struct Description {
    value: String,
}

impl WeatherTool {
    pub const NAME: &'static str = "get_weather";

    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ravn/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        let schema = ToolSchema::new(Self::NAME, "Get the current temperature in a given city.")
            .param(ParamSpec::required(
                "city",
                ParamKind::String,
                "Name of the city, e.g. \"Stockholm\".",
            ))
            .param(ParamSpec::optional(
                "metric",
                ParamKind::Enum(vec!["celsius".into(), "fahrenheit".into(), "kelvin".into()]),
                Some(json!("celsius")),
                "Temperature unit.",
            ));
        Ok(Self {
            schema,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(cfg: &ToolsConfig) -> anyhow::Result<Self> {
        Self::new(&cfg.weather_base_url)
    }

    fn url_for(&self, city: &str) -> anyhow::Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("invalid weather base URL `{}`", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("weather base URL `{}` cannot take a path", self.base_url))?
            .pop_if_empty()
            .push(city);
        url.query_pairs_mut().append_pair("format", "j1");
        Ok(url)
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, call: &ValidatedCall) -> ExecutionResult {
        let Some(city) = call.str_arg("city") else {
            return ExecutionResult::rejected("missing required parameter `city` for tool `get_weather`");
        };
        let metric = call.str_arg("metric").unwrap_or("celsius");

        let url = match self.url_for(city) {
            Ok(u) => u,
            Err(e) => return ExecutionResult::launch_error(format!("{e:#}")),
        };
        debug!(url = %url, "weather lookup");

        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => return ExecutionResult::launch_error(format!("weather service unreachable: {e}")),
        };
        if !resp.status().is_success() {
            return failure(format!("weather service returned {}", resp.status()));
        }
        let report: Report = match resp.json().await {
            Ok(r) => r,
            Err(e) => return failure(format!("malformed weather report: {e}")),
        };
        match summarize(city, metric, &report) {
            Ok(text) => ExecutionResult::new(text, "", ExitStatus::Code(0)),
            Err(e) => failure(format!("{e:#}")),
        }
    }
}

fn failure(msg: String) -> ExecutionResult {
    ExecutionResult::new("", msg, ExitStatus::Code(1))
}

fn summarize(city: &str, metric: &str, report: &Report) -> anyhow::Result<String> {
    let cond = report
        .current_condition
        .first()
        .context("weather report has no current conditions")?;
    let parse = |s: &str| -> anyhow::Result<f64> {
        s.trim()
            .parse::<f64>()
            .with_context(|| format!("unreadable temperature `{s}`"))
    };
    let (value, unit) = match metric {
        "fahrenheit" => (parse(&cond.temp_f)?, "°F"),
        "kelvin" => (parse(&cond.temp_c)? + 273.15, "K"),
        _ => (parse(&cond.temp_c)?, "°C"),
    };
    let mut text = format!("Current temperature in {city}: {value:.1} {unit}\n");
    if let Some(desc) = cond.weather_desc.first() {
        text.push_str(&format!("Conditions: {}\n", desc.value.trim()));
    }
    Ok(text)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
