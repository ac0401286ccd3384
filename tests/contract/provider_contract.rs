//! Contract tests every provider adapter must satisfy.
//!
//! Adapters talk to a local mock server through the real reqwest transport,
//! so URL building, headers, status handling and decoding are all covered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rumbo_core::{
    AstronomicalTides, CircuitBreaker, CircuitBreakerConfig, Coordinates, HttpClient, HttpError,
    HttpRequest, HttpSettings, OpenMeteoAdapter, OpenWeatherAdapter, ProviderErrorKind,
    ProviderId, ReqwestHttpClient, StormglassAdapter, TideSource, UtcDateTime, WeatherSource,
    WindyAdapter,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Transport that must never be reached.
#[derive(Default)]
struct UnreachableHttpClient {
    calls: AtomicUsize,
}

impl HttpClient for UnreachableHttpClient {
    fn execute<'a>(&'a self, _request: HttpRequest) -> rumbo_core::http_client::HttpFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Err(HttpError::connect("network disabled in contract tests")) })
    }
}

fn http() -> Arc<dyn HttpClient> {
    Arc::new(ReqwestHttpClient::new(&HttpSettings::default()).expect("reqwest client"))
}

fn tides() -> Arc<dyn TideSource> {
    Arc::new(AstronomicalTides)
}

fn mar_del_plata() -> Coordinates {
    Coordinates::new(-38.014, -57.530).expect("valid coordinates")
}

fn hour(offset: i64) -> UtcDateTime {
    UtcDateTime::now().truncate_to_hour().plus_hours(offset)
}

fn keyed_adapter(
    provider: ProviderId,
    http_client: Arc<dyn HttpClient>,
    key: Option<&str>,
) -> Arc<dyn WeatherSource> {
    let key = key.map(str::to_owned);
    match provider {
        ProviderId::Stormglass => Arc::new(StormglassAdapter::new(http_client, key, tides())),
        ProviderId::Windy => Arc::new(WindyAdapter::new(http_client, key, tides())),
        ProviderId::OpenWeather => Arc::new(OpenWeatherAdapter::new(http_client, key, tides())),
        ProviderId::OpenMeteo => Arc::new(OpenMeteoAdapter::new(http_client, tides())),
    }
}

// =============================================================================
// Missing credentials
// =============================================================================

#[tokio::test]
async fn keyed_providers_report_not_configured_without_network_calls() {
    for provider in ProviderId::ALL.into_iter().filter(|p| p.requires_api_key()) {
        for key in [None, Some(""), Some("   ")] {
            let transport = Arc::new(UnreachableHttpClient::default());
            let adapter = keyed_adapter(provider, transport.clone(), key);

            let conditions = adapter
                .get_conditions(mar_del_plata())
                .await
                .expect_err("no key configured");
            let forecast = adapter
                .get_forecast(mar_del_plata(), 6)
                .await
                .expect_err("no key configured");

            assert_eq!(
                conditions.kind(),
                ProviderErrorKind::NotConfigured,
                "provider '{provider}' key {key:?}"
            );
            assert_eq!(forecast.kind(), ProviderErrorKind::NotConfigured);
            assert_eq!(adapter.name(), provider.as_str());
            assert_eq!(
                transport.calls.load(Ordering::SeqCst),
                0,
                "provider '{provider}' touched the network"
            );
        }
    }
}

// =============================================================================
// Canned upstream payloads
// =============================================================================

#[tokio::test]
async fn stormglass_payload_yields_valid_reading() {
    let server = MockServer::start().await;
    let hours = (0..3)
        .map(|offset| {
            json!({
                "time": hour(offset).format_rfc3339(),
                "windSpeed": { "sg": 5.0 },
                "windDirection": { "sg": 90.0 },
                "waveHeight": { "sg": 0.6 },
                "wavePeriod": { "noaa": 8.0 },
                "airTemperature": { "sg": 19.0 }
            })
        })
        .collect::<Vec<_>>();
    Mock::given(method("GET"))
        .and(path("/v2/weather/point"))
        .and(header("authorization", "sg-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "hours": hours })))
        .mount(&server)
        .await;

    let adapter =
        StormglassAdapter::new(http(), Some(String::from("sg-key")), tides()).with_base_url(server.uri());

    let reading = adapter.get_conditions(mar_del_plata()).await.expect("conditions");
    assert_eq!(reading.provider, "stormglass");
    assert_eq!(reading.timestamp, hour(0));
    assert_eq!(reading.wind.speed_kmh, Some(18.0));
    assert_eq!(reading.waves.height_m, Some(0.6));
    assert!(!reading.is_zombie());

    let forecast = adapter.get_forecast(mar_del_plata(), 2).await.expect("forecast");
    assert_eq!(
        forecast.iter().map(|r| r.timestamp).collect::<Vec<_>>(),
        vec![hour(0), hour(1)]
    );
}

#[tokio::test]
async fn windy_payload_yields_valid_reading() {
    let server = MockServer::start().await;
    let ts = (0..3)
        .map(|offset| hour(offset * 3).unix_seconds() * 1_000)
        .collect::<Vec<_>>();
    Mock::given(method("POST"))
        .and(path("/api/point-forecast/v2"))
        .and(body_partial_json(json!({ "model": "gfs" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ts": ts,
            "wind_u-surface": [0.0, 0.0, 0.0],
            "wind_v-surface": [-5.0, -5.0, -5.0],
            "temp-surface": [288.15, 288.15, 288.15],
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/point-forecast/v2"))
        .and(body_partial_json(json!({ "model": "gfsWave" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ts": ts,
            "waves_height-surface": [0.6, 0.7, 0.8],
        })))
        .mount(&server)
        .await;

    let adapter =
        WindyAdapter::new(http(), Some(String::from("windy-key")), tides()).with_base_url(server.uri());
    let reading = adapter.get_conditions(mar_del_plata()).await.expect("conditions");

    assert_eq!(reading.provider, "windy");
    assert_eq!(reading.wind.speed_kmh, Some(18.0));
    assert_eq!(reading.wind.direction_deg, Some(0.0));
    assert_eq!(reading.waves.height_m, Some(0.6));
    assert_eq!(reading.atmosphere.temperature_c, Some(15.0));
}

#[tokio::test]
async fn openweather_payload_yields_valid_reading() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("appid", "ow-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "dt": hour(0).unix_seconds(),
            "wind": { "speed": 5.0, "deg": 45 },
            "main": { "temp": 12.5 },
            "weather": [{ "id": 800 }],
            "clouds": { "all": 0 }
        })))
        .mount(&server)
        .await;

    let adapter = OpenWeatherAdapter::new(http(), Some(String::from("ow-key")), tides())
        .with_base_url(server.uri());
    let reading = adapter.get_conditions(mar_del_plata()).await.expect("conditions");

    assert_eq!(reading.provider, "openweather");
    assert_eq!(reading.wind.speed_kmh, Some(18.0));
    assert_eq!(reading.waves.height_m, None);
    assert_eq!(reading.atmosphere.precipitation_mm, None);
    assert_eq!(reading.atmosphere.weather_code, Some(800));
}

#[tokio::test]
async fn openmeteo_payload_yields_valid_reading() {
    let server = MockServer::start().await;
    let time = (0..4)
        .map(|offset| hour(offset).format_rfc3339()[..16].to_owned())
        .collect::<Vec<_>>();
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hourly": {
                "time": time,
                "wind_speed_10m": [18.3, 19.0, 20.0, 21.0],
                "wind_direction_10m": [200.0, 200.0, 200.0, 200.0],
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/marine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hourly": {
                "time": time,
                "wave_height": [0.6, 0.6, 0.7, 0.7],
            }
        })))
        .mount(&server)
        .await;

    let adapter = OpenMeteoAdapter::new(http(), tides()).with_base_urls(server.uri(), server.uri());
    let forecast = adapter.get_forecast(mar_del_plata(), 3).await.expect("forecast");

    assert_eq!(forecast.len(), 3);
    assert_eq!(forecast[0].provider, "openmeteo");
    assert_eq!(forecast[0].wind.speed_kmh, Some(18.3));
    assert_eq!(forecast[0].waves.height_m, Some(0.6));
}

// =============================================================================
// Upstream failures
// =============================================================================

#[tokio::test]
async fn quota_and_server_errors_are_classified() {
    let server = MockServer::start().await;
    Mock::given(path("/v2/weather/point"))
        .respond_with(ResponseTemplate::new(402))
        .mount(&server)
        .await;
    Mock::given(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let stormglass =
        StormglassAdapter::new(http(), Some(String::from("sg-key")), tides()).with_base_url(server.uri());
    let openweather = OpenWeatherAdapter::new(http(), Some(String::from("bad-key")), tides())
        .with_base_url(server.uri());

    let quota = stormglass
        .get_conditions(mar_del_plata())
        .await
        .expect_err("402");
    let rejected = openweather
        .get_conditions(mar_del_plata())
        .await
        .expect_err("401");

    assert_eq!(quota.kind(), ProviderErrorKind::RateLimited);
    assert_eq!(rejected.kind(), ProviderErrorKind::UpstreamStatus);
    assert!(!rejected.retryable());
}

#[tokio::test]
async fn undecodable_payload_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let adapter = OpenWeatherAdapter::new(http(), Some(String::from("ow-key")), tides())
        .with_base_url(server.uri());
    let error = adapter
        .get_conditions(mar_del_plata())
        .await
        .expect_err("not json");

    assert_eq!(error.kind(), ProviderErrorKind::Malformed);
}

#[tokio::test]
async fn open_circuit_fails_fast_without_network_calls() {
    let breaker = Arc::new(CircuitBreaker::new(
        "windy",
        CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::from_secs(300),
        },
    ));
    breaker.record_failure();
    let transport = Arc::new(UnreachableHttpClient::default());
    let adapter = WindyAdapter::new(transport.clone(), Some(String::from("windy-key")), tides())
        .with_circuit_breaker(breaker);

    let error = adapter
        .get_conditions(mar_del_plata())
        .await
        .expect_err("circuit is open");

    assert_eq!(error.kind(), ProviderErrorKind::Unavailable);
    assert!(error.message().contains("circuit is open"));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}
