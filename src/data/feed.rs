use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use crate::data::types::{Market, MarketCategory, MarketStatus, PrivacyTier};

/// Source of market cards for the swipe queue.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn fetch_more_markets(&self, count: usize) -> Result<Vec<Market>>;
}

pub struct GammaFeed {
    client: Client,
    base_url: String,
    offset: AtomicUsize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    id: String,
    question: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    outcome_prices: Option<String>,
    #[serde(default)]
    volume: Option<String>,
}

impl GammaFeed {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url,
            offset: AtomicUsize::new(0),
        })
    }

    /// Convert Gamma API market format to our internal Market type
    fn convert_gamma_market(gm: GammaMarket) -> Market {
        let resolves_at = gm.end_date.as_deref().and_then(parse_timestamp);
        let created_at = gm.created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        // outcomePrices is a JSON-encoded string array: "[\"0.62\", \"0.38\"]"
        let yes_price = gm.outcome_prices
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .and_then(|prices| prices.first().and_then(|p| p.parse::<f64>().ok()))
            .unwrap_or(0.5);

        let volume = gm.volume
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0);

        Market {
            id: gm.id,
            question: gm.question,
            category: parse_category(gm.category.as_deref()),
            status: if gm.closed { MarketStatus::Resolved } else { MarketStatus::Active },
            yes_price: yes_price.clamp(0.0, 1.0),
            volume,
            participants: 0,
            created_at,
            resolves_at,
            privacy: PrivacyTier::Public,
        }
    }
}

#[async_trait]
impl MarketFeed for GammaFeed {
    async fn fetch_more_markets(&self, count: usize) -> Result<Vec<Market>> {
        let offset = self.offset.load(Ordering::SeqCst);
        let url = format!(
            "{}/markets?active=true&closed=false&limit={}&offset={}",
            self.base_url, count, offset
        );

        let response: Vec<GammaMarket> = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch markets")?
            .error_for_status()
            .context("Market feed returned an error status")?
            .json()
            .await
            .context("Failed to parse markets response")?;

        self.offset.fetch_add(response.len(), Ordering::SeqCst);

        Ok(response
            .into_iter()
            .map(Self::convert_gamma_market)
            .collect())
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_category(raw: Option<&str>) -> MarketCategory {
    match raw.map(|c| c.to_lowercase()).as_deref() {
        Some("sports") => MarketCategory::Sports,
        Some("politics") => MarketCategory::Politics,
        Some("economics") | Some("business") => MarketCategory::Economics,
        Some("technology") | Some("tech") | Some("science") => MarketCategory::Technology,
        Some("entertainment") | Some("pop culture") => MarketCategory::Entertainment,
        Some("weather") => MarketCategory::Weather,
        Some("crypto") => MarketCategory::Crypto,
        _ => MarketCategory::Custom,
    }
}

const SIM_QUESTIONS: &[(&str, MarketCategory)] = &[
    ("Will BTC close above $100k this Friday?", MarketCategory::Crypto),
    ("Will the home team win the derby?", MarketCategory::Sports),
    ("Will the central bank cut rates this month?", MarketCategory::Economics),
    ("Will it snow in London before March?", MarketCategory::Weather),
    ("Will the new phone ship on schedule?", MarketCategory::Technology),
    ("Will the sequel top the box office?", MarketCategory::Entertainment),
    ("Will the incumbent lead the next poll?", MarketCategory::Politics),
];

/// Random market generator for local play.
pub struct SimulatedFeed {
    next_id: AtomicU64,
}

impl SimulatedFeed {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    fn generate(&self, count: usize) -> Vec<Market> {
        let mut rng = rand::thread_rng();
        let now = Utc::now();

        (0..count)
            .map(|_| {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let (question, category) = SIM_QUESTIONS[rng.gen_range(0..SIM_QUESTIONS.len())];
                let privacy = match rng.gen_range(0..3) {
                    0 => PrivacyTier::Public,
                    1 => PrivacyTier::SemiPrivate,
                    _ => PrivacyTier::Private,
                };

                Market {
                    id: format!("sim-{}", id),
                    question: question.to_string(),
                    category,
                    status: MarketStatus::Active,
                    yes_price: rng.gen_range(0.05..0.95),
                    volume: rng.gen_range(100.0..50_000.0),
                    participants: rng.gen_range(1..500),
                    created_at: now,
                    resolves_at: Some(now + Duration::hours(rng.gen_range(1..240))),
                    privacy,
                }
            })
            .collect()
    }
}

impl Default for SimulatedFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketFeed for SimulatedFeed {
    async fn fetch_more_markets(&self, count: usize) -> Result<Vec<Market>> {
        Ok(self.generate(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_gamma_market() {
        let raw = r#"{
            "id": "512",
            "question": "Will it rain in Seoul tomorrow?",
            "category": "Weather",
            "endDate": "2026-05-01T12:00:00Z",
            "closed": false,
            "outcomePrices": "[\"0.62\", \"0.38\"]",
            "volume": "12345.5"
        }"#;
        let gm: GammaMarket = serde_json::from_str(raw).unwrap();
        let market = GammaFeed::convert_gamma_market(gm);

        assert_eq!(market.id, "512");
        assert_eq!(market.category, MarketCategory::Weather);
        assert_eq!(market.status, MarketStatus::Active);
        assert!((market.yes_price - 0.62).abs() < 1e-9);
        assert!((market.volume - 12345.5).abs() < 1e-9);
        assert!(market.resolves_at.is_some());
    }

    #[test]
    fn test_convert_gamma_market_missing_fields() {
        let raw = r#"{"id": "7", "question": "Unknown?"}"#;
        let gm: GammaMarket = serde_json::from_str(raw).unwrap();
        let market = GammaFeed::convert_gamma_market(gm);

        assert_eq!(market.category, MarketCategory::Custom);
        assert!((market.yes_price - 0.5).abs() < 1e-9);
        assert_eq!(market.volume, 0.0);
        assert!(market.resolves_at.is_none());
    }

    #[test]
    fn test_closed_market_maps_to_resolved() {
        let raw = r#"{"id": "9", "question": "Done?", "closed": true, "category": "Crypto"}"#;
        let gm: GammaMarket = serde_json::from_str(raw).unwrap();
        let market = GammaFeed::convert_gamma_market(gm);

        assert_eq!(market.status, MarketStatus::Resolved);
        assert_eq!(market.category, MarketCategory::Crypto);
    }

    /// Serve one canned HTTP response per connection and hand back the request lines.
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut requests = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap();
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                requests.push(request.lines().next().unwrap_or("").to_string());

                let reason = if status == 200 { "OK" } else { "Internal Server Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
            }
            requests
        });

        (format!("http://{}", addr), handle)
    }

    fn local_feed(base_url: String) -> GammaFeed {
        GammaFeed {
            client: Client::builder().no_proxy().build().unwrap(),
            base_url,
            offset: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_gamma_feed_pages_by_offset() {
        let page = r#"[{"id": "1", "question": "A?"}, {"id": "2", "question": "B?"}]"#;
        let (url, handle) = serve(vec![(200, page), (200, "[]")]).await;
        let feed = local_feed(url);

        let first = feed.fetch_more_markets(2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].id, "2");

        let second = feed.fetch_more_markets(2).await.unwrap();
        assert!(second.is_empty());

        let requests = handle.await.unwrap();
        assert!(requests[0].contains("limit=2&offset=0"));
        assert!(requests[1].contains("limit=2&offset=2"));
    }

    #[tokio::test]
    async fn test_gamma_feed_error_status_keeps_offset() {
        let (url, handle) = serve(vec![(500, "{}")]).await;
        let feed = local_feed(url);

        assert!(feed.fetch_more_markets(3).await.is_err());
        assert_eq!(feed.offset.load(Ordering::SeqCst), 0);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_simulated_feed_unique_ids() {
        let feed = SimulatedFeed::new();
        let first = feed.fetch_more_markets(3).await.unwrap();
        let second = feed.fetch_more_markets(2).await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, "sim-4");
        assert!(first.iter().all(|m| (0.0..=1.0).contains(&m.yes_price)));
    }
}
