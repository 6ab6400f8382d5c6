use anyhow::Result;
use reqwest::Client;
use safepoint_core::{Coordinates, RouteResult};
use serde::Deserialize;
use tracing::debug;

/// Seam for the external routing provider.
pub trait RoutePlanning: Send + Sync {
    async fn plan(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Option<RouteResult>>;
}

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Driving route with full step detail between two coordinates. Only the
/// first returned route's first leg is used. No retries; failures are the
/// orchestrator's problem.
#[derive(Debug, Clone)]
pub struct RoutePlanner {
    client: Client,
    config: RoutingConfig,
}

impl RoutePlanner {
    pub fn new(client: Client, config: RoutingConfig) -> Self {
        Self { client, config }
    }
}

impl RoutePlanning for RoutePlanner {
    async fn plan(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Option<RouteResult>> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.config.base_url.trim_end_matches('/'),
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude,
        );

        let response = self
            .client
            .get(url)
            .query(&[
                ("steps", "true"),
                ("overview", "false"),
                ("access_token", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("routing returned status {}", status.as_u16());
        }

        let body: RoutesResponse = response.json().await?;
        let route = first_leg_route(body);
        debug!(found = route.is_some(), "route lookup finished");

        Ok(route)
    }
}

/// Whole minutes for a reply, rounded, never reported as zero.
pub fn duration_to_minutes(duration_seconds: f64) -> u64 {
    let minutes = (duration_seconds / 60.0).round() as i64;
    minutes.max(1) as u64
}

#[derive(Debug, Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    legs: Vec<RouteLeg>,
}

#[derive(Debug, Default, Deserialize)]
struct RouteLeg {
    #[serde(default)]
    steps: Vec<RouteStep>,
}

#[derive(Debug, Deserialize)]
struct RouteStep {
    instruction: Option<String>,
}

fn first_leg_route(response: RoutesResponse) -> Option<RouteResult> {
    let route = response.routes.into_iter().next()?;
    let leg = route.legs.into_iter().next().unwrap_or_default();

    let steps = leg
        .steps
        .into_iter()
        .filter_map(|step| step.instruction)
        .filter(|instruction| !instruction.trim().is_empty())
        .collect();

    Some(RouteResult {
        duration_seconds: route.duration,
        duration_minutes: duration_to_minutes(route.duration),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> RoutesResponse {
        serde_json::from_value(value).expect("payload should deserialize")
    }

    #[test]
    fn minutes_round_with_a_floor_of_one() {
        assert_eq!(duration_to_minutes(59.0), 1);
        assert_eq!(duration_to_minutes(60.0), 1);
        assert_eq!(duration_to_minutes(61.0), 1);
        assert_eq!(duration_to_minutes(119.0), 2);
        assert_eq!(duration_to_minutes(930.0), 16);
        assert_eq!(duration_to_minutes(0.0), 1);
    }

    #[test]
    fn no_routes_means_none() {
        assert!(first_leg_route(parse(json!({ "routes": [] }))).is_none());
        assert!(first_leg_route(parse(json!({}))).is_none());
    }

    #[test]
    fn extracts_the_first_route_and_first_leg() {
        let route = first_leg_route(parse(json!({
            "routes": [
                {
                    "duration": 930.0,
                    "legs": [
                        { "steps": [
                            { "instruction": "Head north on Main St" },
                            { "instruction": "Turn right onto 2nd Ave" },
                            { "instruction": "Arrive at destination" }
                        ] },
                        { "steps": [ { "instruction": "ignored second leg" } ] }
                    ]
                },
                { "duration": 9999.0, "legs": [] }
            ]
        })))
        .expect("route expected");

        assert_eq!(route.duration_seconds, 930.0);
        assert_eq!(route.duration_minutes, 16);
        assert_eq!(route.steps.len(), 3);
        assert_eq!(route.steps[0], "Head north on Main St");
    }

    #[test]
    fn empty_instructions_are_filtered_out() {
        let route = first_leg_route(parse(json!({
            "routes": [
                {
                    "duration": 45.0,
                    "legs": [
                        { "steps": [
                            { "instruction": "Go straight" },
                            { "instruction": "" },
                            { "instruction": "   " },
                            {}
                        ] }
                    ]
                }
            ]
        })))
        .expect("route expected");

        assert_eq!(route.steps, vec!["Go straight".to_string()]);
        assert_eq!(route.duration_minutes, 1);
    }
}
