use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chat Relay",
        version = "0.1.0",
        description = "Forwards a prompt to the configured chat-completion service and returns the answer text."
    ),
    servers(
        (url = "http://localhost:8080", description = "Local dev")
    ),
    tags(
        (name = "chat", description = "Prompt completion")
    ),
    paths(
        crate::routes::chat::completions,
    ),
    components(
        schemas(
            crate::models::common::ApiResponse
        )
    )
)]
pub struct ApiDoc;
