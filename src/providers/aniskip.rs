use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::SkipIntervalProvider;
use crate::config::Config;
use crate::models::{EpisodeKey, SkipInterval, SkipKind};
use crate::utils::{PlayerError, PlayerResult};

const SKIP_TYPES: [&str; 5] = ["op", "ed", "mixed-op", "mixed-ed", "recap"];

/// Skip times from an aniskip-compatible API
#[derive(Debug, Clone)]
pub struct AniSkipProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SkipTimesResponse {
    found: bool,
    #[serde(default)]
    results: Vec<SkipTimeResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkipTimeResult {
    interval: SkipTimeInterval,
    skip_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkipTimeInterval {
    start_time: f64,
    end_time: f64,
}

impl AniSkipProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PlayerResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> PlayerResult<Self> {
        Self::new(
            config.providers.skip_times_base_url.clone(),
            config.network.timeout(),
        )
    }

    fn build_url(&self, episode: &EpisodeKey) -> String {
        format!(
            "{}/v2/skip-times/{}/{}",
            self.base_url, episode.content_id, episode.episode
        )
    }
}

fn skip_kind(skip_type: &str) -> Option<SkipKind> {
    match skip_type {
        "op" => Some(SkipKind::Opening),
        "ed" => Some(SkipKind::Ending),
        "recap" => Some(SkipKind::Recap),
        "mixed-op" => Some(SkipKind::MixedOpening),
        "mixed-ed" => Some(SkipKind::MixedEnding),
        _ => None,
    }
}

fn to_interval(result: SkipTimeResult) -> Option<SkipInterval> {
    let Some(kind) = skip_kind(&result.skip_type) else {
        debug!("Ignoring unknown skip type '{}'", result.skip_type);
        return None;
    };
    let SkipTimeInterval {
        start_time,
        end_time,
    } = result.interval;
    if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 || end_time <= start_time
    {
        warn!("Ignoring malformed {} interval {}..{}", result.skip_type, start_time, end_time);
        return None;
    }

    let (Ok(start), Ok(end)) = (
        Duration::try_from_secs_f64(start_time),
        Duration::try_from_secs_f64(end_time),
    ) else {
        warn!("Ignoring out of range {} interval {}..{}", result.skip_type, start_time, end_time);
        return None;
    };

    Some(SkipInterval::new(start, end, kind))
}

#[async_trait]
impl SkipIntervalProvider for AniSkipProvider {
    async fn skip_intervals(&self, episode: &EpisodeKey) -> PlayerResult<Vec<SkipInterval>> {
        let url = self.build_url(episode);
        let mut query: Vec<(&str, &str)> = SKIP_TYPES.iter().map(|t| ("types", *t)).collect();
        query.push(("episodeLength", "0"));

        let response = self.client.get(&url).query(&query).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No skip times published for {}", episode);
            return Ok(vec![]);
        }
        if !response.status().is_success() {
            return Err(PlayerError::Provider(format!(
                "skip times request for {} failed: {}",
                episode,
                response.status()
            )));
        }

        let body: SkipTimesResponse = response.json().await?;
        if !body.found {
            debug!("No skip times found for {}", episode);
            return Ok(vec![]);
        }

        // Provider order is kept; the tracker picks the first match on overlap
        let intervals: Vec<SkipInterval> = body.results.into_iter().filter_map(to_interval).collect();
        info!("Found {} skip intervals for {}", intervals.len(), episode);
        Ok(intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn provider(server: &Server) -> AniSkipProvider {
        AniSkipProvider::new(format!("{}/", server.url()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_parses_skip_times() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/skip-times/154587/3")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "found": true,
                    "results": [
                        {"interval": {"startTime": 0.0, "endTime": 89.5}, "skipType": "op", "skipId": "a", "episodeLength": 1420.0},
                        {"interval": {"startTime": 1330.2, "endTime": 1420.0}, "skipType": "ed", "skipId": "b", "episodeLength": 1420.0},
                        {"interval": {"startTime": 10.0, "endTime": 20.0}, "skipType": "preview", "skipId": "c", "episodeLength": 1420.0}
                    ],
                    "message": "Successfully found skip times",
                    "statusCode": 200
                }"#,
            )
            .create_async()
            .await;

        let intervals = provider(&server)
            .skip_intervals(&EpisodeKey::new("154587", 3))
            .await
            .unwrap();

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].kind, SkipKind::Opening);
        assert_eq!(intervals[0].end_time, Duration::from_secs_f64(89.5));
        assert_eq!(intervals[1].kind, SkipKind::Ending);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_means_no_intervals() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/skip-times/1/1")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"found": false, "results": [], "statusCode": 404}"#)
            .create_async()
            .await;

        let intervals = provider(&server)
            .skip_intervals(&EpisodeKey::new("1", 1))
            .await
            .unwrap();
        assert!(intervals.is_empty());
    }

    #[tokio::test]
    async fn test_found_false_means_no_intervals() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/skip-times/1/2")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"found": false, "results": []}"#)
            .create_async()
            .await;

        let intervals = provider(&server)
            .skip_intervals(&EpisodeKey::new("1", 2))
            .await
            .unwrap();
        assert!(intervals.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/skip-times/1/3")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let result = provider(&server)
            .skip_intervals(&EpisodeKey::new("1", 3))
            .await;
        assert!(matches!(result, Err(PlayerError::Provider(_))));
    }

    #[test]
    fn test_malformed_interval_is_dropped() {
        let result = SkipTimeResult {
            interval: SkipTimeInterval {
                start_time: 30.0,
                end_time: 10.0,
            },
            skip_type: "op".to_string(),
        };
        assert!(to_interval(result).is_none());

        let huge = SkipTimeResult {
            interval: SkipTimeInterval {
                start_time: 0.0,
                end_time: 1e300,
            },
            skip_type: "ed".to_string(),
        };
        assert!(to_interval(huge).is_none());

        let nan = SkipTimeResult {
            interval: SkipTimeInterval {
                start_time: f64::NAN,
                end_time: 90.0,
            },
            skip_type: "op".to_string(),
        };
        assert!(to_interval(nan).is_none());
    }
}
