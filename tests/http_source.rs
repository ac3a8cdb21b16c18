use budget_analytics::channels::{ChannelCatalog, ChannelId};
use budget_analytics::kpi::channel::best_channel_by_category;
use budget_analytics::kpi::summary::summary_kpis;
use budget_analytics::store::{load_store, DataOrigin, HttpSource, Resource};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn payload(resource: Resource) -> Value {
    match resource {
        Resource::MonthlyData => json!([
            { "month": "Aug 23", "gmv": 368000, "units": 3680, "totalInvestment": 27500,
              "TV_Spend": 11000, "Digital_Spend": 4800, "TV_ROI": 3.1, "Digital_ROI": 4.4,
              "Overall_ROI": 13.2, "nps": 72, "spt_cod": 46 },
            { "month": "Jul 23", "gmv": 384000, "units": 3840, "totalInvestment": 29000,
              "TV_Spend": 12000, "Digital_Spend": 5000, "TV_ROI": 2.9, "Digital_ROI": 4.1,
              "Overall_ROI": 12.5, "nps": 75, "spt_cod": 42 }
        ]),
        Resource::BudgetOptimization => json!([
            { "Channel": "TV", "Current_Percentage": 39.0, "Optimized_Percentage": 42.0 },
            { "Channel": "Radio", "Current_Percentage": 2.0, "Optimized_Percentage": 2.0 }
        ]),
        Resource::CategoryRevenue => json!({ "data": [
            { "product_analytic_category": "Camera", "gmv": 300000, "units": 1000 },
            { "product_analytic_category": "GameCDDVD", "gmv": 100000, "units": 2000 }
        ]}),
        Resource::ChannelResponse => json!([
            { "category": "Camera", "channel": "TV", "Response_Factor": 0.8 },
            { "category": "Camera", "channel": "Digital", "Response_Factor": 0.8 },
            { "category": "GameCDDVD", "channel": "SEM", "Response_Factor": 0.5 }
        ]),
        Resource::TopChannels => json!([
            { "category": "Camera", "channel": "TV", "Effectiveness_Score": 240000 }
        ]),
        Resource::SummaryStats => json!({
            "ytd_revenue": 752000, "marketing_spend": 56500, "overall_roi": 12.8,
            "previous_ytd_revenue": 700000, "previous_marketing_spend": 0,
            "previous_overall_roi": 12.0
        }),
    }
}

async fn serve_all(server: &MockServer) {
    for resource in Resource::ALL {
        Mock::given(method("GET"))
            .and(path(format!("/data/{}", resource.file_name())))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload(resource)))
            .mount(server)
            .await;
    }
}

fn id(name: &str) -> ChannelId {
    name.parse().unwrap()
}

#[tokio::test]
async fn loads_all_six_resources_over_http() {
    let server = MockServer::start().await;
    serve_all(&server).await;

    let source = HttpSource::new(format!("{}/data/", server.uri()));
    let outcome = load_store(&source, ChannelCatalog::with_defaults()).await;
    assert_eq!(outcome.origin, DataOrigin::Loaded);
    assert!(outcome.warning.is_none());

    let store = &outcome.store;
    let months: Vec<String> = store.monthly().iter().map(|r| r.period.label()).collect();
    assert_eq!(months, ["Jul 23", "Aug 23"]);

    let latest = store.latest().unwrap();
    assert_eq!(latest.spend_for(&id("TV")), 11_000.0);
    assert_eq!(latest.roi_for(&id("Digital")), Some(4.4));
    assert!((latest.payment_split.cod - 0.46).abs() < 1e-9);

    let camera = store.category("camera").unwrap();
    assert_eq!(camera.revenue_share, 75.0);
    assert_eq!(camera.average_price, 300.0);

    let shift = &store.budget_shifts()[0];
    assert_eq!(shift.change_percentage, 3.0);

    let best = best_channel_by_category(store.channel_responses());
    let camera_best = best.iter().find(|r| r.category == "Camera").unwrap();
    assert_eq!(camera_best.channel, id("TV"));

    let kpis = summary_kpis(store);
    assert_eq!(kpis.marketing_spend_change, None);
    assert!((kpis.roi_change - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn server_error_on_one_resource_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/top_channels.json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;
    serve_all(&server).await;

    let source = HttpSource::new(format!("{}/data", server.uri()));
    let outcome = load_store(&source, ChannelCatalog::with_defaults()).await;
    assert!(outcome.is_fallback());
    let warning = outcome.warning.unwrap();
    assert!(warning.contains("top_channels.json"));
    assert!(warning.contains("500"));
    assert_eq!(outcome.store.monthly().len(), 12);
}

#[tokio::test]
async fn malformed_body_falls_back() {
    let server = MockServer::start().await;
    for resource in Resource::ALL {
        let template = if resource == Resource::SummaryStats {
            ResponseTemplate::new(200).set_body_string("{not json")
        } else {
            ResponseTemplate::new(200).set_body_json(payload(resource))
        };
        Mock::given(method("GET"))
            .and(path(format!("/data/{}", resource.file_name())))
            .respond_with(template)
            .mount(&server)
            .await;
    }

    let source = HttpSource::new(format!("{}/data", server.uri()));
    let outcome = load_store(&source, ChannelCatalog::with_defaults()).await;
    assert_eq!(outcome.origin, DataOrigin::Fallback);
    assert!(outcome.warning.unwrap().contains("invalid JSON"));
}
