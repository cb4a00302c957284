//! OpenWeather provider and client behaviour against a mock HTTP server.

use std::{sync::Arc, time::Duration};

use skycast_core::{
    BundleCache, ClientSettings, Coordinates, FetchError, OpenWeatherProvider, Pollutant,
    WeatherClient, WeatherProvider, WeatherQuery,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const LAHORE_LAT: f64 = 31.5497;
const LAHORE_LON: f64 = 74.3436;
const LAHORE: Coordinates = Coordinates {
    lat: LAHORE_LAT,
    lon: LAHORE_LON,
};

fn current_body(temp: f64, humidity: u8) -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": LAHORE_LON, "lat": LAHORE_LAT },
        "weather": [{ "id": 721, "main": "Haze", "description": "haze", "icon": "50d" }],
        "base": "stations",
        "main": {
            "temp": temp,
            "feels_like": temp + 1.2,
            "temp_min": temp - 1.0,
            "temp_max": temp + 1.0,
            "pressure": 1008,
            "humidity": humidity
        },
        "visibility": 4000,
        "wind": { "speed": 3.09, "deg": 300 },
        "clouds": { "all": 0 },
        "dt": 1_700_030_000,
        "sys": {
            "type": 1,
            "id": 7585,
            "country": "PK",
            "sunrise": 1_700_013_600,
            "sunset": 1_700_052_000
        },
        "timezone": 18000,
        "id": 1_172_451,
        "name": "Lahore",
        "cod": 200
    })
}

fn forecast_body(entries: i64) -> serde_json::Value {
    let list: Vec<serde_json::Value> = (0..entries)
        .map(|i| {
            serde_json::json!({
                "dt": 1_700_038_800 + i * 10_800,
                "main": {
                    "temp": 25.0 + (i % 8) as f64,
                    "feels_like": 25.0,
                    "pressure": 1010,
                    "humidity": 45
                },
                "weather": [{
                    "id": 800,
                    "main": "Clear",
                    "description": "clear sky",
                    "icon": "01d"
                }],
                "wind": { "speed": 2.5, "deg": 180 }
            })
        })
        .collect();

    serde_json::json!({
        "cod": "200",
        "message": 0,
        "cnt": entries,
        "list": list,
        "city": { "name": "Lahore", "country": "PK", "timezone": 18000 }
    })
}

fn air_body() -> serde_json::Value {
    serde_json::json!({
        "coord": { "lon": LAHORE_LON, "lat": LAHORE_LAT },
        "list": [{
            "main": { "aqi": 5 },
            "components": {
                "co": 1842.5, "no": 12.1, "no2": 61.0, "o3": 20.3,
                "so2": 35.8, "pm2_5": 182.0, "pm10": 240.4, "nh3": 18.9
            },
            "dt": 1_700_030_000
        }]
    })
}

fn provider(server: &MockServer) -> OpenWeatherProvider {
    OpenWeatherProvider::new(server.uri(), Duration::from_secs(5)).expect("provider")
}

fn client(server: &MockServer) -> WeatherClient {
    let settings = ClientSettings {
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
        ..ClientSettings::default()
    };
    WeatherClient::open_weather(&settings).expect("client")
}

async fn mount_current(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(response)
        .mount(server)
        .await;
}

// ============================================================================
// Provider: current conditions
// ============================================================================

#[tokio::test]
async fn current_sends_expected_query_and_decodes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Lahore"))
        .and(query_param("appid", "VALID"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(30.0, 40)))
        .expect(1)
        .mount(&server)
        .await;

    let current = provider(&server).current("Lahore", "VALID").await.expect("current");

    assert_eq!(current.location_name, "Lahore");
    assert_eq!(current.country_code, "PK");
    assert_eq!(current.coordinates, LAHORE);
    assert_eq!(current.temperature_c, 30.0);
    assert_eq!(current.humidity_pct, 40);
    assert_eq!(current.pressure_hpa, 1008.0);
    assert_eq!(current.wind_direction_deg, Some(300.0));
    assert_eq!(current.cloudiness_pct, Some(0));
    assert_eq!(current.visibility_m, Some(4000));
    assert_eq!(current.condition_code, 721);
    assert_eq!(current.condition_main, "Haze");
    assert_eq!(current.utc_offset_secs, 18000);
}

#[tokio::test]
async fn current_404_is_not_found() {
    let server = MockServer::start().await;
    mount_current(
        &server,
        ResponseTemplate::new(404)
            .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
    )
    .await;

    let err = provider(&server).current("Nowhereville", "VALID").await.unwrap_err();
    assert_eq!(err, FetchError::NotFound("Nowhereville".into()));
}

#[tokio::test]
async fn current_not_found_code_in_success_body() {
    let server = MockServer::start().await;
    mount_current(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
    )
    .await;

    let err = provider(&server).current("Nowhereville", "VALID").await.unwrap_err();
    assert_eq!(err, FetchError::NotFound("Nowhereville".into()));
}

#[tokio::test]
async fn current_401_is_unauthorized() {
    let server = MockServer::start().await;
    mount_current(
        &server,
        ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key. Please see https://openweathermap.org/faq#error401"
        })),
    )
    .await;

    let err = provider(&server).current("Lahore", "BAD").await.unwrap_err();
    assert_eq!(err, FetchError::Unauthorized);
}

#[tokio::test]
async fn current_server_error_is_upstream_with_message() {
    let server = MockServer::start().await;
    mount_current(&server, ResponseTemplate::new(502).set_body_string("Bad Gateway")).await;

    let err = provider(&server).current("Lahore", "VALID").await.unwrap_err();
    assert_eq!(
        err,
        FetchError::Upstream {
            status: 502,
            message: "Bad Gateway".into()
        }
    );
}

#[tokio::test]
async fn current_malformed_json_is_decode_error() {
    let server = MockServer::start().await;
    mount_current(&server, ResponseTemplate::new(200).set_body_string("{\"cod\":200")).await;

    let err = provider(&server).current("Lahore", "VALID").await.unwrap_err();
    assert!(
        matches!(
            err,
            FetchError::Decode {
                endpoint: "current weather",
                ..
            }
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let server = MockServer::start().await;
    mount_current(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(current_body(30.0, 40))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let provider =
        OpenWeatherProvider::new(server.uri(), Duration::from_millis(200)).expect("provider");
    let err = provider.current("Lahore", "VALID").await.unwrap_err();

    assert_eq!(err, FetchError::Timeout);
    assert!(err.is_network());
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    let provider =
        OpenWeatherProvider::new("http://127.0.0.1:1", Duration::from_secs(2)).expect("provider");
    let err = provider.current("Lahore", "VALID").await.unwrap_err();

    assert!(matches!(err, FetchError::Network { .. }), "{err:?}");
}

// ============================================================================
// Provider: forecast and air quality
// ============================================================================

#[tokio::test]
async fn forecast_by_coordinates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("lat", "31.5497"))
        .and(query_param("lon", "74.3436"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(40)))
        .expect(1)
        .mount(&server)
        .await;

    let at = LAHORE;
    let forecast = provider(&server).forecast(at, "VALID").await.expect("forecast");

    assert_eq!(forecast.len(), 40);
    assert_eq!(forecast[0].condition_description, "clear sky");
    assert_eq!(forecast[1].timestamp_epoch - forecast[0].timestamp_epoch, 10_800);
}

#[tokio::test]
async fn forecast_404_is_plain_upstream_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
        )
        .mount(&server)
        .await;

    let at = Coordinates { lat: 0.0, lon: 0.0 };
    let err = provider(&server).forecast(at, "VALID").await.unwrap_err();

    assert_eq!(
        err,
        FetchError::Upstream {
            status: 404,
            message: "city not found".into()
        }
    );
}

#[tokio::test]
async fn air_quality_decodes_all_pollutants() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body()))
        .mount(&server)
        .await;

    let at = LAHORE;
    let sample = provider(&server)
        .air_quality(at, "VALID")
        .await
        .expect("request ok")
        .expect("sample present");

    assert_eq!(sample.aqi_category.value(), 5);
    assert_eq!(sample.aqi_category.label(), "Very Poor");
    assert_eq!(sample.pollutant_concentrations.len(), Pollutant::all().len());
    assert_eq!(sample.pollutant_concentrations[&Pollutant::Pm2_5], 182.0);
}

#[tokio::test]
async fn air_quality_empty_or_malformed_is_absent() {
    for body in [
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "list": [] })),
        ResponseTemplate::new(200).set_body_json(serde_json::json!({})),
        ResponseTemplate::new(200).set_body_string("<html>oops</html>"),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/air_pollution"))
            .respond_with(body)
            .mount(&server)
            .await;

        let at = Coordinates { lat: 1.0, lon: 2.0 };
        let result = provider(&server).air_quality(at, "VALID").await;
        assert_eq!(result, Ok(None));
    }
}

// ============================================================================
// Client: full bundle
// ============================================================================

#[tokio::test]
async fn lahore_bundle_from_stubbed_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Lahore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(30.0, 40)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .and(query_param("lat", "31.5497"))
        .and(query_param("lon", "74.3436"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(40)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .and(query_param("lat", "31.5497"))
        .and(query_param("lon", "74.3436"))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let query = WeatherQuery::new("Lahore", "VALID").unwrap();

    let bundle = client.fetch(&query).await.expect("bundle");
    assert_eq!(bundle.current().temperature_c, 30.0);
    assert_eq!(bundle.current().humidity_pct, 40);
    assert_eq!(bundle.forecast().len(), 40);
    assert!(
        bundle
            .forecast()
            .windows(2)
            .all(|w| w[0].timestamp_epoch <= w[1].timestamp_epoch)
    );
    assert!(bundle.air_quality().is_some());

    // Served from cache: the `expect(1)` above fails on drop if this hits the server.
    let again = client.fetch(&query).await.expect("cached bundle");
    assert!(Arc::ptr_eq(&bundle, &again));
    assert_eq!(*bundle, *again);
}

#[tokio::test]
async fn nowhereville_is_not_found_and_nothing_else_is_called() {
    let server = MockServer::start().await;

    mount_current(
        &server,
        ResponseTemplate::new(404)
            .set_body_json(serde_json::json!({ "cod": "404", "message": "city not found" })),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(40)))
        .expect(0)
        .mount(&server)
        .await;

    let query = WeatherQuery::new("Nowhereville", "VALID").unwrap();
    let err = client(&server).fetch(&query).await.unwrap_err();

    assert_eq!(err, FetchError::NotFound("Nowhereville".into()));
}

#[tokio::test]
async fn air_quality_outage_still_yields_bundle() {
    let server = MockServer::start().await;

    mount_current(&server, ResponseTemplate::new(200).set_body_json(current_body(12.0, 80))).await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(8)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let query = WeatherQuery::new("Lahore", "VALID").unwrap();
    let bundle = client(&server).fetch(&query).await.expect("bundle");

    assert!(bundle.air_quality().is_none());
    assert_eq!(bundle.forecast().len(), 8);
}

#[tokio::test]
async fn injected_cache_is_shared_between_clients() {
    let server = MockServer::start().await;

    mount_current(&server, ResponseTemplate::new(200).set_body_json(current_body(30.0, 40))).await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body(40)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body()))
        .mount(&server)
        .await;

    let cache = Arc::new(BundleCache::new(Duration::from_secs(60)));
    let first = WeatherClient::new(Arc::new(provider(&server)), Arc::clone(&cache));
    let second = WeatherClient::new(Arc::new(provider(&server)), Arc::clone(&cache));
    let query = WeatherQuery::new("Lahore", "VALID").unwrap();

    first.fetch(&query).await.expect("first");
    second.fetch(&query).await.expect("second from shared cache");

    assert_eq!(cache.entry_count().await, 1);
}
