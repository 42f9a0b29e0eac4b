use genesyscloud::api::speechandtextanalytics::programs::{Program, ProgramsApi, ProgramsProxy};
use genesyscloud::api::ApiClient;
use std::sync::Arc;
use tfplug::context::Context;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    // Get environment variables
    let access_token = std::env::var("GENESYSCLOUD_ACCESS_TOKEN")
        .expect("GENESYSCLOUD_ACCESS_TOKEN environment variable is required");
    let environment = std::env::var("GENESYSCLOUD_ENVIRONMENT")
        .unwrap_or_else(|_| "mypurecloud.com".to_string());
    let base_url = std::env::var("GENESYSCLOUD_API_URL")
        .unwrap_or_else(|_| format!("https://api.{}", environment));

    info!("Base URL: {}", base_url);
    info!("Access token set: {}", !access_token.is_empty());

    let client = Arc::new(ApiClient::new(&base_url, &access_token)?);
    let programs = ProgramsApi::new(client);
    let ctx = Context::new();

    // Create a program
    let request = Program {
        name: Some("example-program".to_string()),
        description: Some("Program created by standalone example".to_string()),
        ..Default::default()
    };

    info!("Creating program '{}'", request.name.as_deref().unwrap_or(""));
    let created = match programs.create(&ctx, &request).await {
        Ok(program) => program,
        Err(e) => {
            error!("Create failed: {}", e);
            return Err(e.into());
        }
    };

    let id = created.id.clone().unwrap_or_default();
    info!("Created program with id: {}", id);

    // Read it back
    match programs.get_by_id(&ctx, &id).await {
        Ok(program) => {
            info!(
                "Read back program: name={:?} description={:?}",
                program.name, program.description
            );
        }
        Err(e) if e.is_not_found() => {
            info!("Program not visible yet (read-after-write lag): {}", e);
        }
        Err(e) => {
            error!("Read failed: {}", e);
            return Err(e.into());
        }
    }

    // Clean up
    info!("Deleting program {}", id);
    programs.delete(&ctx, &id).await?;

    match programs.get_by_id(&ctx, &id).await {
        Err(e) if e.is_not_found() => info!("Program deleted"),
        Ok(_) => info!("Program still listed; deletion completes asynchronously"),
        Err(e) => error!("Verification read failed: {}", e),
    }

    Ok(())
}
