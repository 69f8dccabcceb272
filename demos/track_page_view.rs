use std::sync::Arc;
use tirreno_tracker::prelude::*;
use tirreno_tracker::tracker::NullSubmitter;
use tirreno_tracker::Payload;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Reads TIRRENO_API_URL and TIRRENO_API_KEY; without them events are dumped but not sent
    let tracker = match Tracker::from_env() {
        Ok(tracker) => tracker,
        Err(e) => {
            println!("No sensor configured ({}), events will not be sent", e);
            let config = TrackerConfig::new("https://localhost/tirreno/sensor/", "demo");
            Tracker::with_submitter(&config, Arc::new(NullSubmitter::new()))
        }
    };

    let event = tracker.create_event();
    event
        .lock()
        .set_user_name("alice")
        .set_ip_address("1.2.3.4")
        .set_user_agent("Mozilla/5.0")
        .set_browser_language("en-GB")
        .set_http_method("GET")
        .set_http_referer("https://example.com/")
        .set_url("https://example.com/profile")
        .set_page_title("Profile")
        .set_http_code(200);

    println!("Tracking page view {}", event.id());
    let outcome = tracker.track(&event).await;
    println!("Outcome: {:?}", outcome);

    let edit = tracker.create_event();
    let mut change = Payload::new();
    change
        .set_field_name("email")
        .set_old_value("alice@old.example")
        .set_new_value("alice@example.com");
    edit.lock()
        .set_user_name("alice")
        .set_ip_address("1.2.3.4")
        .set_user_agent("Mozilla/5.0")
        .set_browser_language("en-GB")
        .set_http_method("POST")
        .set_http_referer("https://example.com/profile")
        .set_url("https://example.com/profile/edit")
        .set_event_type_field_edit()
        .add_field_history(change);

    println!("Tracking field edit {}", edit.id());
    println!("Outcome: {:?}", tracker.track(&edit).await);

    Ok(())
}
